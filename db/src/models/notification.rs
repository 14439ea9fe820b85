use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QueryOrder, Set};
use serde::Serialize;

/// In-app notification history entry.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub event_trigger: String,
    pub title: String,
    pub body: String,
    pub data: Option<Json>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
        event_trigger: &str,
        title: &str,
        body: &str,
        data: Option<Json>,
    ) -> Result<Model, DbErr> {
        ActiveModel {
            user_id: Set(user_id),
            event_trigger: Set(event_trigger.to_owned()),
            title: Set(title.to_owned()),
            body: Set(body.to_owned()),
            data: Set(data),
            read_at: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Newest first.
    pub async fn list_for_user<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_desc(Column::Id)
            .all(db)
            .await
    }
}
