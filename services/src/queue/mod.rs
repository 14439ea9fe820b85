//! Durable task queue backed by the `queued_tasks` table.
//!
//! Tasks are delivered at least once: a worker that dies mid-task leaves its lease to
//! expire and the task is claimed again. Handlers must therefore be safe to re-run.

mod worker;

pub use worker::WorkerPool;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use db::models::queued_task::{self, TaskKind, TaskStatus};
use sea_orm::{DatabaseConnection, DbErr};
use serde::Serialize;
use serde_json::Value as Json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use util::config::AppConfig;

#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// How long a claimed task stays invisible to other workers.
    pub lease: Duration,
    pub max_attempts: i32,
    /// Idle workers re-poll at least this often even without a wake-up.
    pub poll_interval: Duration,
    /// Retry delay per attempt already made.
    pub retry_backoff: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            lease: Duration::from_secs(300),
            max_attempts: 5,
            poll_interval: Duration::from_millis(500),
            retry_backoff: Duration::from_secs(5),
        }
    }
}

impl From<&AppConfig> for QueueSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            lease: Duration::from_secs(cfg.task_lease_seconds.max(1) as u64),
            max_attempts: cfg.task_max_attempts.max(1),
            poll_interval: Duration::from_millis(cfg.worker_poll_ms.max(10)),
            ..Self::default()
        }
    }
}

/// How a handler finished a task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Succeeded(Json),
    /// The work cannot be applied (e.g. a duplicate); retrying would not help.
    Rejected { reason: String, result: Json },
}

#[derive(Debug, Error)]
pub enum TaskError {
    /// Transient failure; the task goes back to the queue until attempts run out.
    #[error("{0}")]
    Retryable(String),

    /// The task can never succeed (bad payload, unknown kind).
    #[error("{0}")]
    Permanent(String),
}

impl From<DbErr> for TaskError {
    fn from(err: DbErr) -> Self {
        TaskError::Retryable(err.to_string())
    }
}

/// Client-facing view of a task row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary {
    pub id: String,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub result: Option<Json>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&queued_task::Model> for TaskSummary {
    fn from(task: &queued_task::Model) -> Self {
        Self {
            id: task.id.clone(),
            kind: task.kind,
            status: task.status,
            attempts: task.attempts,
            max_attempts: task.max_attempts,
            last_error: task.last_error.clone(),
            result: task.result.clone(),
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &queued_task::Model) -> Result<TaskOutcome, TaskError>;
}

#[derive(Clone)]
pub struct TaskQueue {
    db: DatabaseConnection,
    notify: Arc<Notify>,
    settings: QueueSettings,
}

impl TaskQueue {
    pub fn new(db: DatabaseConnection, settings: QueueSettings) -> Self {
        Self {
            db,
            notify: Arc::new(Notify::new()),
            settings,
        }
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    /// Persists a task and wakes one idle worker. The returned row's id is the correlation id.
    pub async fn enqueue<P: Serialize>(
        &self,
        kind: TaskKind,
        user_id: i64,
        work_date: NaiveDate,
        payload: &P,
    ) -> Result<queued_task::Model, DbErr> {
        let payload = serde_json::to_value(payload).map_err(|e| DbErr::Custom(e.to_string()))?;
        let task = queued_task::Model::create(
            &self.db,
            kind,
            user_id,
            work_date,
            payload,
            self.settings.max_attempts,
        )
        .await?;
        tracing::info!(task_id = %task.id, kind = %kind, user_id, "Task enqueued");
        self.notify.notify_one();
        Ok(task)
    }

    pub async fn find(&self, id: &str) -> Result<Option<queued_task::Model>, DbErr> {
        queued_task::Model::find(&self.db, id).await
    }

    pub async fn latest_for_user_day(
        &self,
        user_id: i64,
        work_date: NaiveDate,
    ) -> Result<Option<queued_task::Model>, DbErr> {
        queued_task::Model::latest_for_user_day(&self.db, user_id, work_date).await
    }

    /// The newest queued or running task of `kind`, if any.
    pub async fn pending(
        &self,
        kind: TaskKind,
        user_id: i64,
        work_date: NaiveDate,
    ) -> Result<Option<queued_task::Model>, DbErr> {
        queued_task::Model::find_pending(&self.db, kind, user_id, work_date).await
    }

    /// Claims and runs one task. Returns `false` when nothing was claimable.
    pub async fn run_once(&self, handler: &dyn TaskHandler) -> Result<bool, DbErr> {
        let lease = chrono::Duration::from_std(self.settings.lease)
            .unwrap_or_else(|_| chrono::Duration::minutes(5));
        let Some(task) = queued_task::Model::claim_next(&self.db, lease).await? else {
            return Ok(false);
        };

        tracing::debug!(task_id = %task.id, kind = %task.kind, attempt = task.attempts, "Task claimed");

        match handler.handle(&task).await {
            Ok(TaskOutcome::Succeeded(result)) => {
                queued_task::Model::mark_succeeded(&self.db, &task.id, result).await?;
                tracing::info!(task_id = %task.id, kind = %task.kind, "Task succeeded");
            }
            Ok(TaskOutcome::Rejected { reason, result }) => {
                queued_task::Model::mark_rejected(&self.db, &task.id, result, &reason).await?;
                tracing::warn!(task_id = %task.id, kind = %task.kind, reason = %reason, "Task rejected");
            }
            Err(TaskError::Permanent(msg)) => {
                queued_task::Model::mark_failed(&self.db, &task.id, &msg).await?;
                tracing::error!(task_id = %task.id, kind = %task.kind, error = %msg, "Task failed permanently");
            }
            Err(TaskError::Retryable(msg)) if task.is_exhausted() => {
                queued_task::Model::mark_failed(&self.db, &task.id, &msg).await?;
                tracing::error!(
                    task_id = %task.id,
                    kind = %task.kind,
                    attempts = task.attempts,
                    error = %msg,
                    "Task failed, attempts exhausted"
                );
            }
            Err(TaskError::Retryable(msg)) => {
                let delay = self.settings.retry_backoff * task.attempts.max(1) as u32;
                let delay = chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::seconds(5));
                queued_task::Model::schedule_retry(&self.db, &task.id, &msg, delay).await?;
                tracing::warn!(
                    task_id = %task.id,
                    kind = %task.kind,
                    attempt = task.attempts,
                    error = %msg,
                    "Task will be retried"
                );
            }
        }

        Ok(true)
    }

    /// Runs tasks on the current task until none is claimable. Returns how many ran.
    pub async fn drain(&self, handler: &dyn TaskHandler) -> Result<usize, DbErr> {
        let mut ran = 0;
        while self.run_once(handler).await? {
            ran += 1;
        }
        Ok(ran)
    }

    /// Waits for an enqueue notification or the poll interval, whichever comes first.
    pub async fn wait_for_work(&self) {
        let _ = tokio::time::timeout(self.settings.poll_interval, self.notify.notified()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::models::user;
    use db::test_utils::setup_test_db;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails with a retryable error the first `failures` times, then succeeds.
    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TaskHandler for Flaky {
        async fn handle(&self, task: &queued_task::Model) -> Result<TaskOutcome, TaskError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(TaskError::Retryable(format!("transient #{}", n + 1)));
            }
            Ok(TaskOutcome::Succeeded(json!({ "echo": task.payload })))
        }
    }

    struct Rejecting;

    #[async_trait]
    impl TaskHandler for Rejecting {
        async fn handle(&self, _task: &queued_task::Model) -> Result<TaskOutcome, TaskError> {
            Ok(TaskOutcome::Rejected {
                reason: "duplicate".into(),
                result: json!({ "outcome": "duplicate" }),
            })
        }
    }

    fn settings(max_attempts: i32) -> QueueSettings {
        QueueSettings {
            max_attempts,
            retry_backoff: Duration::ZERO,
            ..QueueSettings::default()
        }
    }

    async fn seed_user(db: &DatabaseConnection) -> i64 {
        user::Model::create(db, "Ayu", "ayu@example.com", user::Role::Karyawan, None)
            .await
            .unwrap()
            .id
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    #[tokio::test]
    async fn retries_until_success() {
        let db = setup_test_db().await;
        let uid = seed_user(&db).await;
        let queue = TaskQueue::new(db.clone(), settings(5));
        let task = queue.enqueue(TaskKind::Checkin, uid, day(), &json!({"n": 1})).await.unwrap();

        let handler = Flaky {
            failures: 2,
            calls: AtomicUsize::new(0),
        };
        assert_eq!(queue.drain(&handler).await.unwrap(), 3);

        let done = queue.find(&task.id).await.unwrap().unwrap();
        assert_eq!(done.status, TaskStatus::Succeeded);
        assert_eq!(done.attempts, 3);
        assert_eq!(done.result, Some(json!({"echo": {"n": 1}})));
    }

    #[tokio::test]
    async fn exhausted_retries_mark_the_task_failed() {
        let db = setup_test_db().await;
        let uid = seed_user(&db).await;
        let queue = TaskQueue::new(db.clone(), settings(2));
        let task = queue.enqueue(TaskKind::Checkout, uid, day(), &json!({})).await.unwrap();

        let handler = Flaky {
            failures: usize::MAX,
            calls: AtomicUsize::new(0),
        };
        queue.drain(&handler).await.unwrap();

        let done = queue.find(&task.id).await.unwrap().unwrap();
        assert_eq!(done.status, TaskStatus::Failed);
        assert_eq!(done.attempts, 2);
        assert_eq!(done.last_error.as_deref(), Some("transient #2"));
        assert!(queue.pending(TaskKind::Checkout, uid, day()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejection_is_terminal_and_visible() {
        let db = setup_test_db().await;
        let uid = seed_user(&db).await;
        let queue = TaskQueue::new(db.clone(), settings(5));
        let task = queue.enqueue(TaskKind::Checkin, uid, day(), &json!({})).await.unwrap();
        assert_eq!(
            queue.pending(TaskKind::Checkin, uid, day()).await.unwrap().map(|t| t.id),
            Some(task.id.clone())
        );

        assert_eq!(queue.drain(&Rejecting).await.unwrap(), 1);

        let latest = queue.latest_for_user_day(uid, day()).await.unwrap().unwrap();
        assert_eq!(latest.id, task.id);
        assert_eq!(latest.status, TaskStatus::Rejected);
        assert_eq!(latest.last_error.as_deref(), Some("duplicate"));
    }
}
