use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Condition;
use sea_orm::{ConnectionTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A durable unit of deferred work. The id doubles as the correlation id handed to clients.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "queued_tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: TaskKind,
    pub user_id: i64,
    pub work_date: NaiveDate,
    pub payload: Json,
    pub status: TaskStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub result: Option<Json>,
    /// Not claimable before this instant (retry backoff).
    pub available_at: DateTime<Utc>,
    /// Lease expiry while running. An expired lease makes the task claimable again.
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "task_kind")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TaskKind {
    #[sea_orm(string_value = "checkin")]
    Checkin,
    #[sea_orm(string_value = "checkout")]
    Checkout,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "task_status")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TaskStatus {
    #[sea_orm(string_value = "queued")]
    Queued,
    #[sea_orm(string_value = "running")]
    Running,
    #[sea_orm(string_value = "succeeded")]
    Succeeded,
    /// Finished cleanly but the work was refused (e.g. duplicate check-in).
    #[sea_orm(string_value = "rejected")]
    Rejected,
    /// Gave up after exhausting retries.
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl TaskStatus {
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn claimable(now: DateTime<Utc>) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(Column::Status.eq(TaskStatus::Queued))
                .add(Column::AvailableAt.lte(now)),
        )
        .add(
            Condition::all()
                .add(Column::Status.eq(TaskStatus::Running))
                .add(Column::LockedUntil.lt(now)),
        )
}

impl Model {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        kind: TaskKind,
        user_id: i64,
        work_date: NaiveDate,
        payload: Json,
        max_attempts: i32,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            kind: Set(kind),
            user_id: Set(user_id),
            work_date: Set(work_date),
            payload: Set(payload),
            status: Set(TaskStatus::Queued),
            attempts: Set(0),
            max_attempts: Set(max_attempts.max(1)),
            last_error: Set(None),
            result: Set(None),
            available_at: Set(now),
            locked_until: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
    }

    pub async fn find<C: ConnectionTrait>(db: &C, id: &str) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id.to_owned()).one(db).await
    }

    /// Most recently created task of a user for a work day.
    pub async fn latest_for_user_day<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
        work_date: NaiveDate,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::WorkDate.eq(work_date))
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .one(db)
            .await
    }

    /// The newest queued or running task of `kind` for the user and day.
    pub async fn find_pending<C: ConnectionTrait>(
        db: &C,
        kind: TaskKind,
        user_id: i64,
        work_date: NaiveDate,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::Kind.eq(kind))
            .filter(Column::UserId.eq(user_id))
            .filter(Column::WorkDate.eq(work_date))
            .filter(Column::Status.is_in([TaskStatus::Queued, TaskStatus::Running]))
            .order_by_desc(Column::CreatedAt)
            .one(db)
            .await
    }

    /// Atomically takes the oldest claimable task and leases it for `lease`.
    ///
    /// The claim is a conditional UPDATE, so two workers racing for the same row
    /// cannot both win. Returns `None` when nothing is claimable.
    pub async fn claim_next<C: ConnectionTrait>(
        db: &C,
        lease: chrono::Duration,
    ) -> Result<Option<Model>, DbErr> {
        let now = Utc::now();

        // A handful of retries covers losing the race to another worker.
        for _ in 0..5 {
            let Some(candidate) = Entity::find()
                .filter(claimable(now))
                .order_by_asc(Column::AvailableAt)
                .order_by_asc(Column::CreatedAt)
                .one(db)
                .await?
            else {
                return Ok(None);
            };

            let res = Entity::update_many()
                .col_expr(Column::Status, Expr::value(TaskStatus::Running))
                .col_expr(Column::Attempts, Expr::col(Column::Attempts).add(1))
                .col_expr(Column::LockedUntil, Expr::value(Some(now + lease)))
                .col_expr(Column::UpdatedAt, Expr::value(now))
                .filter(Column::Id.eq(candidate.id.clone()))
                .filter(claimable(now))
                .exec(db)
                .await?;

            if res.rows_affected == 1 {
                return Self::find(db, &candidate.id).await;
            }
        }
        Ok(None)
    }

    pub async fn mark_succeeded<C: ConnectionTrait>(db: &C, id: &str, result: Json) -> Result<(), DbErr> {
        Self::finish(db, id, TaskStatus::Succeeded, Some(result), None).await
    }

    pub async fn mark_rejected<C: ConnectionTrait>(
        db: &C,
        id: &str,
        result: Json,
        reason: &str,
    ) -> Result<(), DbErr> {
        Self::finish(db, id, TaskStatus::Rejected, Some(result), Some(reason)).await
    }

    pub async fn mark_failed<C: ConnectionTrait>(db: &C, id: &str, error: &str) -> Result<(), DbErr> {
        Self::finish(db, id, TaskStatus::Failed, None, Some(error)).await
    }

    /// Puts a task back in the queue, claimable again after `delay`.
    pub async fn schedule_retry<C: ConnectionTrait>(
        db: &C,
        id: &str,
        error: &str,
        delay: chrono::Duration,
    ) -> Result<(), DbErr> {
        let now = Utc::now();
        Entity::update_many()
            .col_expr(Column::Status, Expr::value(TaskStatus::Queued))
            .col_expr(Column::LastError, Expr::value(Some(error.to_owned())))
            .col_expr(Column::AvailableAt, Expr::value(now + delay))
            .col_expr(Column::LockedUntil, Expr::value(Option::<DateTime<Utc>>::None))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(())
    }

    async fn finish<C: ConnectionTrait>(
        db: &C,
        id: &str,
        status: TaskStatus,
        result: Option<Json>,
        error: Option<&str>,
    ) -> Result<(), DbErr> {
        Entity::update_many()
            .col_expr(Column::Status, Expr::value(status))
            .col_expr(Column::Result, Expr::value(result))
            .col_expr(Column::LastError, Expr::value(error.map(str::to_owned)))
            .col_expr(Column::LockedUntil, Expr::value(Option::<DateTime<Utc>>::None))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(())
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user;
    use crate::test_utils::setup_test_db;
    use serde_json::json;

    #[tokio::test]
    async fn claim_is_exclusive_until_released() {
        let db = setup_test_db().await;
        let u = user::Model::create(&db, "Ayu", "ayu@example.com", user::Role::Karyawan, None)
            .await
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let task = Model::create(&db, TaskKind::Checkin, u.id, day, json!({"k": 1}), 3)
            .await
            .unwrap();
        assert!(Model::find_pending(&db, TaskKind::Checkin, u.id, day).await.unwrap().is_some());

        let claimed = Model::claim_next(&db, chrono::Duration::minutes(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, task.id);
        assert_eq!(claimed.status, TaskStatus::Running);
        assert_eq!(claimed.attempts, 1);

        // Leased: nothing else to claim.
        assert!(Model::claim_next(&db, chrono::Duration::minutes(5)).await.unwrap().is_none());

        Model::mark_succeeded(&db, &task.id, json!({"ok": true})).await.unwrap();
        let done = Model::find(&db, &task.id).await.unwrap().unwrap();
        assert_eq!(done.status, TaskStatus::Succeeded);
        assert_eq!(done.result, Some(json!({"ok": true})));
        assert!(Model::find_pending(&db, TaskKind::Checkin, u.id, day).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn retry_delays_next_claim() {
        let db = setup_test_db().await;
        let u = user::Model::create(&db, "Ayu", "ayu@example.com", user::Role::Karyawan, None)
            .await
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let task = Model::create(&db, TaskKind::Checkout, u.id, day, json!({}), 3)
            .await
            .unwrap();
        Model::claim_next(&db, chrono::Duration::minutes(5)).await.unwrap().unwrap();

        Model::schedule_retry(&db, &task.id, "database is locked", chrono::Duration::minutes(10))
            .await
            .unwrap();
        let queued = Model::find(&db, &task.id).await.unwrap().unwrap();
        assert_eq!(queued.status, TaskStatus::Queued);
        assert_eq!(queued.last_error.as_deref(), Some("database is locked"));
        assert!(Model::claim_next(&db, chrono::Duration::minutes(5)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_lease_is_reclaimed() {
        let db = setup_test_db().await;
        let u = user::Model::create(&db, "Ayu", "ayu@example.com", user::Role::Karyawan, None)
            .await
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let task = Model::create(&db, TaskKind::Checkin, u.id, day, json!({}), 3)
            .await
            .unwrap();

        // A negative lease is already expired: simulates a worker that died mid-task.
        Model::claim_next(&db, chrono::Duration::seconds(-10)).await.unwrap().unwrap();
        let again = Model::claim_next(&db, chrono::Duration::minutes(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.id, task.id);
        assert_eq!(again.attempts, 2);
    }
}
