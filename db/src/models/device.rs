use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, Set};
use serde::{Deserialize, Serialize};

/// A push-capable client installation registered by a user.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub push_token: String,
    pub device_identifier: Option<String>,
    pub device_label: Option<String>,
    pub platform: Option<String>,
    pub os_version: Option<String>,
    pub app_version: Option<String>,
    pub push_enabled: bool,
    pub failed_push_count: i32,
    pub last_push_at: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Optional metadata reported alongside a push token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_identifier: Option<String>,
    pub device_label: Option<String>,
    pub platform: Option<String>,
    pub os_version: Option<String>,
    pub app_version: Option<String>,
}

impl Model {
    /// Registers `token` for `user_id`, or refreshes the existing registration.
    ///
    /// Either way push is (re-)enabled and the failure counter reset. Metadata fields
    /// only overwrite when provided.
    pub async fn upsert<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
        token: &str,
        info: &DeviceInfo,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        let existing = Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::PushToken.eq(token))
            .one(db)
            .await?;

        match existing {
            Some(device) => {
                let mut active: ActiveModel = device.into();
                if info.device_identifier.is_some() {
                    active.device_identifier = Set(info.device_identifier.clone());
                }
                if info.device_label.is_some() {
                    active.device_label = Set(info.device_label.clone());
                }
                if info.platform.is_some() {
                    active.platform = Set(info.platform.clone());
                }
                if info.os_version.is_some() {
                    active.os_version = Set(info.os_version.clone());
                }
                if info.app_version.is_some() {
                    active.app_version = Set(info.app_version.clone());
                }
                active.push_enabled = Set(true);
                active.failed_push_count = Set(0);
                active.last_seen = Set(Some(now));
                active.updated_at = Set(now);
                active.update(db).await
            }
            None => {
                ActiveModel {
                    user_id: Set(user_id),
                    push_token: Set(token.to_owned()),
                    device_identifier: Set(info.device_identifier.clone()),
                    device_label: Set(info.device_label.clone()),
                    platform: Set(info.platform.clone()),
                    os_version: Set(info.os_version.clone()),
                    app_version: Set(info.app_version.clone()),
                    push_enabled: Set(true),
                    failed_push_count: Set(0),
                    last_push_at: Set(None),
                    last_seen: Set(Some(now)),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(db)
                .await
            }
        }
    }

    /// Devices of a user that should receive pushes.
    pub async fn push_targets<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::PushEnabled.eq(true))
            .filter(Column::PushToken.ne(""))
            .all(db)
            .await
    }

    pub async fn mark_push_success<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), DbErr> {
        Entity::update_many()
            .col_expr(Column::LastPushAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(())
    }

    pub async fn mark_push_failure<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), DbErr> {
        Entity::update_many()
            .col_expr(
                Column::FailedPushCount,
                Expr::col(Column::FailedPushCount).add(1),
            )
            .filter(Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(())
    }
}
