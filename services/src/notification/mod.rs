//! Template-driven notifications: an in-app history row plus a push fan-out.
//!
//! Delivery is best-effort. Nothing here returns an error to the caller; failures are
//! logged and reflected on the device rows (`failed_push_count`).

mod push;

pub use push::{FcmPushClient, NoopPushClient, PushClient, PushError, PushMessage, TokenResult};

use db::models::{device, notification, notification_template};
use sea_orm::{DatabaseConnection, DbErr};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Event trigger codes with seeded templates.
pub mod events {
    pub const SUCCESS_CHECK_IN: &str = "SUCCESS_CHECK_IN";
    pub const LATE_CHECK_IN: &str = "LATE_CHECK_IN";
    pub const SUCCESS_CHECK_OUT: &str = "SUCCESS_CHECK_OUT";
    pub const FACE_REGISTRATION_SUCCESS: &str = "FACE_REGISTRATION_SUCCESS";
}

/// What happened to one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub notification_id: i64,
    pub title: String,
    pub body: String,
    pub delivered: usize,
    pub failed: usize,
}

/// Replaces `{key}` tokens with values from `data`. Unknown tokens stay as they are.
/// Substituted values are never scanned again.
pub fn render(template: &str, data: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if !after[..close].contains('{') => {
                let key = &after[..close];
                match data.get(key) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[open..open + close + 2]),
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    db: DatabaseConnection,
    push: Arc<dyn PushClient>,
}

impl NotificationDispatcher {
    pub fn new(db: DatabaseConnection, push: Arc<dyn PushClient>) -> Self {
        Self { db, push }
    }

    pub fn push_configured(&self) -> bool {
        self.push.is_configured()
    }

    /// Renders the active template for `event`, records it and pushes it to the user's devices.
    ///
    /// Returns `None` when there is no active template or the store failed.
    pub async fn send(
        &self,
        user_id: i64,
        event: &str,
        data: &BTreeMap<String, String>,
    ) -> Option<DispatchReport> {
        match self.try_send(user_id, event, data).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(user_id, event, error = %e, "Failed to dispatch notification");
                None
            }
        }
    }

    async fn try_send(
        &self,
        user_id: i64,
        event: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<Option<DispatchReport>, DbErr> {
        let Some(template) = notification_template::Model::find_active(&self.db, event).await? else {
            tracing::debug!(user_id, event, "No active notification template");
            return Ok(None);
        };

        let title = render(&template.title_template, data);
        let body = render(&template.body_template, data);
        let payload = serde_json::to_value(data).ok();

        let entry = notification::Model::create(&self.db, user_id, event, &title, &body, payload).await?;

        let mut report = DispatchReport {
            notification_id: entry.id,
            title: title.clone(),
            body: body.clone(),
            ..Default::default()
        };

        let devices = device::Model::push_targets(&self.db, user_id).await?;
        if devices.is_empty() || !self.push.is_configured() {
            return Ok(Some(report));
        }

        let tokens: Vec<String> = devices.iter().map(|d| d.push_token.clone()).collect();
        let mut message_data = data.clone();
        message_data.insert("event_trigger".into(), event.to_owned());
        let message = PushMessage {
            title,
            body,
            data: message_data,
        };

        let results = match self.push.send(&tokens, &message).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(user_id, event, error = %e, "Push delivery failed");
                for d in &devices {
                    device::Model::mark_push_failure(&self.db, d.id).await?;
                }
                report.failed = devices.len();
                return Ok(Some(report));
            }
        };

        for result in results {
            let Some(d) = devices.iter().find(|d| d.push_token == result.token) else {
                continue;
            };
            match result.error {
                None => {
                    device::Model::mark_push_success(&self.db, d.id).await?;
                    report.delivered += 1;
                }
                Some(err) => {
                    tracing::warn!(user_id, device_id = d.id, error = %err, "Push rejected for token");
                    device::Model::mark_push_failure(&self.db, d.id).await?;
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            user_id,
            event,
            delivered = report.delivered,
            failed = report.failed,
            "Notification dispatched"
        );
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingPushClient;
    use db::models::{device::DeviceInfo, user};
    use db::test_utils::setup_test_db;

    fn data(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn render_substitutes_known_and_keeps_unknown_tokens() {
        let out = render(
            "Hi {employee_name}, at {check_in_time} ({status})",
            &data(&[("employee_name", "Ayu"), ("check_in_time", "08:01")]),
        );
        assert_eq!(out, "Hi Ayu, at 08:01 ({status})");
    }

    #[test]
    fn render_does_not_expand_tokens_inside_values() {
        let out = render(
            "{employee_name} is {status}",
            &data(&[("employee_name", "{status} Ayu"), ("status", "late")]),
        );
        assert_eq!(out, "{status} Ayu is late");

        let out = render("{{status}} and {unclosed", &data(&[("status", "late")]));
        assert_eq!(out, "{late} and {unclosed");
    }

    #[tokio::test]
    async fn send_records_history_and_pushes_to_enabled_devices() {
        let db = setup_test_db().await;
        let u = user::Model::create(&db, "Ayu", "ayu@example.com", user::Role::Karyawan, None)
            .await
            .unwrap();
        device::Model::upsert(&db, u.id, "tok-good", &DeviceInfo::default()).await.unwrap();
        let bad = device::Model::upsert(&db, u.id, "tok-bad", &DeviceInfo::default()).await.unwrap();

        let push = Arc::new(RecordingPushClient::new());
        push.fail_token("tok-bad");
        let dispatcher = NotificationDispatcher::new(db.clone(), push.clone());

        let report = dispatcher
            .send(
                u.id,
                events::SUCCESS_CHECK_IN,
                &data(&[("employee_name", "Ayu"), ("check_in_time", "08:00"), ("status", "tepat")]),
            )
            .await
            .unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert!(report.body.contains("Ayu"));
        assert_eq!(push.sent().len(), 1);

        let history = notification::Model::list_for_user(&db, u.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event_trigger, events::SUCCESS_CHECK_IN);

        let targets = device::Model::push_targets(&db, u.id).await.unwrap();
        let bad_now = targets.iter().find(|d| d.id == bad.id).unwrap();
        assert_eq!(bad_now.failed_push_count, 1);
    }

    #[tokio::test]
    async fn unknown_event_is_a_silent_no_op() {
        let db = setup_test_db().await;
        let u = user::Model::create(&db, "Ayu", "ayu@example.com", user::Role::Karyawan, None)
            .await
            .unwrap();
        let push = Arc::new(RecordingPushClient::new());
        let dispatcher = NotificationDispatcher::new(db.clone(), push.clone());

        assert!(dispatcher.send(u.id, "NOPE", &BTreeMap::new()).await.is_none());
        assert!(push.sent().is_empty());
        assert!(notification::Model::list_for_user(&db, u.id).await.unwrap().is_empty());
    }
}
