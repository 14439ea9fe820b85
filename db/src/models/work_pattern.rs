use chrono::{DateTime, NaiveTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, Set};
use serde::Serialize;

/// Daily working hours, optionally with a permitted break window.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "work_patterns")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
    pub max_break_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Attributes of a new work pattern.
#[derive(Debug, Clone)]
pub struct NewWorkPattern {
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
    pub max_break_minutes: Option<i32>,
}

impl Model {
    pub async fn create<C: ConnectionTrait>(db: &C, new: NewWorkPattern) -> Result<Model, DbErr> {
        ActiveModel {
            name: Set(new.name),
            start_time: Set(new.start_time),
            end_time: Set(new.end_time),
            break_start: Set(new.break_start),
            break_end: Set(new.break_end),
            max_break_minutes: Set(new.max_break_minutes),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// The permitted break window, only when both ends are configured.
    pub fn break_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        self.break_start.zip(self.break_end)
    }
}
