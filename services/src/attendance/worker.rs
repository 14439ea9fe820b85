use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use db::is_unique_violation;
use db::models::attendance_note;
use db::models::attendance_record::{self, Punctuality};
use db::models::queued_task::{self, TaskKind};
use db::models::{agenda_item, report_recipient, shift, user};
use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

use super::payload::{CheckinPayload, CheckoutPayload};
use crate::notification::{NotificationDispatcher, events};
use crate::queue::{TaskError, TaskHandler, TaskOutcome};

#[derive(Debug, Clone, Serialize)]
struct NoteView {
    id: i64,
    description: String,
    attachment_url: Option<String>,
}

impl From<&attendance_note::Model> for NoteView {
    fn from(n: &attendance_note::Model) -> Self {
        Self {
            id: n.id,
            description: n.description.clone(),
            attachment_url: n.attachment_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct CommitResult {
    outcome: &'static str,
    attendance_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    punctuality: Option<Punctuality>,
    agendas_linked: Vec<i64>,
    agendas_skipped: Vec<i64>,
    /// Every agenda item linked to the record, from both sides of the day.
    #[serde(skip_serializing_if = "Option::is_none")]
    agenda_ids: Option<Vec<i64>>,
    recipients_added: Vec<i64>,
    recipients_existing: Vec<i64>,
    recipients_unknown: Vec<i64>,
    notes: Vec<NoteView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    work_duration_seconds: Option<i64>,
}

/// Applies queued check-ins and check-outs. One task is one transaction.
pub struct AttendanceTaskHandler {
    db: DatabaseConnection,
    notifier: NotificationDispatcher,
}

/// `8 jam 5 menit`.
pub fn format_work_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{} jam {} menit", seconds / 3600, seconds % 3600 / 60)
}

fn punctuality_label(p: Punctuality) -> &'static str {
    match p {
        Punctuality::Tepat => "Tepat Waktu",
        Punctuality::Terlambat => "Terlambat",
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(task: &queued_task::Model) -> Result<T, TaskError> {
    serde_json::from_value(task.payload.clone())
        .map_err(|e| TaskError::Permanent(format!("malformed {} payload: {e}", task.kind)))
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, TaskError> {
    serde_json::to_value(value).map_err(|e| TaskError::Permanent(e.to_string()))
}

impl AttendanceTaskHandler {
    pub fn new(db: DatabaseConnection, notifier: NotificationDispatcher) -> Self {
        Self { db, notifier }
    }

    /// Late when the check-in time of day is after the scheduled start. No shift means on time.
    async fn punctuality(
        &self,
        user_id: i64,
        date: NaiveDate,
        at: NaiveDateTime,
    ) -> Result<(Punctuality, Option<NaiveTime>), TaskError> {
        let scheduled = shift::Model::resolve_for_day(&self.db, user_id, date)
            .await?
            .map(|(_, pattern)| pattern.start_time);
        let status = match scheduled {
            Some(start) if at.time() > start => Punctuality::Terlambat,
            _ => Punctuality::Tepat,
        };
        Ok((status, scheduled))
    }

    async fn checkin(&self, task: &queued_task::Model, p: CheckinPayload) -> Result<TaskOutcome, TaskError> {
        let (punctuality, scheduled_start) = self.punctuality(p.user_id, p.date, p.at).await?;

        let txn = self.db.begin().await?;
        let stamp = p.fix.stamp(p.at);
        let created =
            attendance_record::Model::create_check_in(&txn, &task.id, p.user_id, p.date, &stamp, punctuality).await;
        let record = match created {
            Ok(record) => record,
            Err(e) if is_unique_violation(&e) => {
                txn.rollback().await?;
                return self.resolve_duplicate_checkin(task, &p).await;
            }
            Err(e) => return Err(e.into()),
        };

        let notes = attendance_note::Model::append(&txn, record.id, &p.notes).await?;
        let links = agenda_item::Model::link_to_attendance(&txn, record.id, p.user_id, &p.agenda_ids).await?;
        let recipients = report_recipient::Model::add_missing(&txn, record.id, &p.recipient_ids).await?;
        txn.commit().await?;

        tracing::info!(
            user_id = p.user_id,
            attendance_id = record.id,
            punctuality = %punctuality,
            agendas_linked = links.linked.len(),
            agendas_skipped = links.skipped.len(),
            recipients_added = recipients.added.len(),
            "Check-in committed"
        );

        let mut data = self.base_template_data(p.user_id).await;
        data.insert("check_in_time".into(), p.at.format("%H:%M").to_string());
        data.insert("status".into(), punctuality_label(punctuality).into());
        data.insert("date".into(), p.date.to_string());
        if let Some(start) = scheduled_start {
            data.insert("scheduled_start".into(), start.format("%H:%M").to_string());
        }
        let event = match punctuality {
            Punctuality::Terlambat => events::LATE_CHECK_IN,
            Punctuality::Tepat => events::SUCCESS_CHECK_IN,
        };
        self.notifier.send(p.user_id, event, &data).await;

        Ok(TaskOutcome::Succeeded(to_json(&CommitResult {
            outcome: "applied",
            attendance_id: record.id,
            punctuality: Some(punctuality),
            agendas_linked: links.linked,
            agendas_skipped: links.skipped,
            agenda_ids: None,
            recipients_added: recipients.added,
            recipients_existing: recipients.existing,
            recipients_unknown: recipients.unknown,
            notes: notes.iter().map(NoteView::from).collect(),
            work_duration_seconds: None,
        })?))
    }

    /// The day already has a record. It is a replay only when this very task wrote it on
    /// an earlier delivery; any other writer makes this a genuine second check-in.
    async fn resolve_duplicate_checkin(
        &self,
        task: &queued_task::Model,
        p: &CheckinPayload,
    ) -> Result<TaskOutcome, TaskError> {
        let existing = attendance_record::Model::find_for_day(&self.db, p.user_id, p.date).await?;
        let replay = existing
            .as_ref()
            .is_some_and(|r| r.origin_task_id.as_deref() == Some(task.id.as_str()));
        match existing {
            Some(record) if replay => {
                tracing::info!(user_id = p.user_id, attendance_id = record.id, "Check-in already applied");
                Ok(TaskOutcome::Succeeded(json!({
                    "outcome": "already_applied",
                    "attendance_id": record.id,
                })))
            }
            other => {
                tracing::warn!(user_id = p.user_id, date = %p.date, "Duplicate check-in rejected");
                Ok(TaskOutcome::Rejected {
                    reason: "duplicate".into(),
                    result: json!({
                        "outcome": "duplicate",
                        "attendance_id": other.map(|r| r.id),
                    }),
                })
            }
        }
    }

    async fn checkout(&self, task: &queued_task::Model, p: CheckoutPayload) -> Result<TaskOutcome, TaskError> {
        let txn = self.db.begin().await?;

        let Some(record) = attendance_record::Entity::find_by_id(p.attendance_id).one(&txn).await? else {
            txn.rollback().await?;
            tracing::warn!(attendance_id = p.attendance_id, "Check-out for a missing record rejected");
            return Ok(TaskOutcome::Rejected {
                reason: "record_missing".into(),
                result: json!({ "outcome": "record_missing", "attendance_id": p.attendance_id }),
            });
        };

        let stamp = p.fix.stamp(p.at);
        let Some(updated) =
            attendance_record::Model::record_check_out(&txn, &task.id, record.id, &stamp, Punctuality::Tepat).await?
        else {
            txn.rollback().await?;
            if record.checkout_task_id.as_deref() == Some(task.id.as_str()) {
                return Ok(TaskOutcome::Succeeded(json!({
                    "outcome": "already_applied",
                    "attendance_id": record.id,
                })));
            }
            tracing::warn!(attendance_id = record.id, "Record already checked out, rejecting");
            return Ok(TaskOutcome::Rejected {
                reason: "already_checked_out".into(),
                result: json!({ "outcome": "already_checked_out", "attendance_id": record.id }),
            });
        };

        let notes = attendance_note::Model::sync_positional(&txn, record.id, &p.notes).await?;
        let links = agenda_item::Model::link_to_attendance(&txn, record.id, p.user_id, &p.agenda_ids).await?;
        let agenda_ids = agenda_item::Model::ids_for_attendance(&txn, record.id).await?;
        let recipients = report_recipient::Model::add_missing(&txn, record.id, &p.recipient_ids).await?;
        txn.commit().await?;

        let worked = updated
            .check_in_at
            .map(|start| (p.at - start).num_seconds().max(0))
            .unwrap_or(0);

        tracing::info!(
            user_id = p.user_id,
            attendance_id = record.id,
            notes = notes.len(),
            agendas_linked = links.linked.len(),
            recipients_added = recipients.added.len(),
            "Check-out committed"
        );

        let mut data = self.base_template_data(p.user_id).await;
        data.insert("check_out_time".into(), p.at.format("%H:%M").to_string());
        data.insert("work_duration".into(), format_work_duration(worked));
        data.insert("date".into(), p.date.to_string());
        self.notifier.send(p.user_id, events::SUCCESS_CHECK_OUT, &data).await;

        Ok(TaskOutcome::Succeeded(to_json(&CommitResult {
            outcome: "applied",
            attendance_id: record.id,
            punctuality: None,
            agendas_linked: links.linked,
            agendas_skipped: links.skipped,
            agenda_ids: Some(agenda_ids),
            recipients_added: recipients.added,
            recipients_existing: recipients.existing,
            recipients_unknown: recipients.unknown,
            notes: notes.iter().map(NoteView::from).collect(),
            work_duration_seconds: Some(worked),
        })?))
    }

    async fn base_template_data(&self, user_id: i64) -> BTreeMap<String, String> {
        let mut data = BTreeMap::new();
        match user::Model::find(&self.db, user_id).await {
            Ok(Some(u)) => {
                data.insert("employee_name".to_owned(), u.name);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(user_id, error = %e, "Could not load user for notification"),
        }
        data
    }
}

#[async_trait]
impl TaskHandler for AttendanceTaskHandler {
    async fn handle(&self, task: &queued_task::Model) -> Result<TaskOutcome, TaskError> {
        match task.kind {
            TaskKind::Checkin => self.checkin(task, parse_payload(task)?).await,
            TaskKind::Checkout => self.checkout(task, parse_payload(task)?).await,
        }
    }
}
