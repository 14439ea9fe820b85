use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Represents an employee in the `users` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Primary key ID (auto-incremented).
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name, snapshotted onto report recipients.
    pub name: String,
    /// User's unique email address.
    pub email: String,
    pub role: Role,
    /// Default office location.
    pub location_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_role")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Role {
    #[sea_orm(string_value = "KARYAWAN")]
    Karyawan,
    #[sea_orm(string_value = "HR")]
    Hr,
    #[sea_orm(string_value = "OPERASIONAL")]
    Operasional,
    #[sea_orm(string_value = "DIREKTUR")]
    Direktur,
    #[sea_orm(string_value = "SUPERADMIN")]
    Superadmin,
    #[sea_orm(string_value = "SUBADMIN")]
    Subadmin,
    #[sea_orm(string_value = "SUPERVISI")]
    Supervisi,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::LocationId",
        to = "super::location::Column::Id"
    )]
    Location,
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        name: &str,
        email: &str,
        role: Role,
        location_id: Option<i64>,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        ActiveModel {
            name: Set(name.to_owned()),
            email: Set(email.to_owned()),
            role: Set(role),
            location_id: Set(location_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    pub async fn find<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    pub async fn find_many<C: ConnectionTrait>(db: &C, ids: &[i64]) -> Result<Vec<Model>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Entity::find()
            .filter(Column::Id.is_in(ids.iter().copied()))
            .all(db)
            .await
    }
}
