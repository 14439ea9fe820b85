use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::ConnectionTrait;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "notification_templates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Event code such as `SUCCESS_CHECK_IN`.
    pub event_trigger: String,
    pub title_template: String,
    pub body_template: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn find_active<C: ConnectionTrait>(db: &C, event_trigger: &str) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::EventTrigger.eq(event_trigger))
            .filter(Column::IsActive.eq(true))
            .one(db)
            .await
    }
}
