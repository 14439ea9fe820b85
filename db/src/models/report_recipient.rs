use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, QueryOrder, Set, TryInsertResult};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::user::{self, Role};

/// A user who receives a copy of another user's attendance report.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "report_recipients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub attendance_id: i64,
    pub user_id: i64,
    /// Recipient's name at insertion time.
    pub recipient_name: String,
    /// Recipient's supervisory role at insertion time.
    pub recipient_role: Option<RecipientRole>,
    pub status: ReportStatus,
    pub notified_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub acted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "recipient_role")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum RecipientRole {
    #[sea_orm(string_value = "HR")]
    Hr,
    #[sea_orm(string_value = "OPERASIONAL")]
    Operasional,
    #[sea_orm(string_value = "DIREKTUR")]
    Direktur,
}

impl RecipientRole {
    /// Only supervisory roles are snapshotted; everyone else is recorded without a role.
    pub fn from_user_role(role: Role) -> Option<Self> {
        match role {
            Role::Hr => Some(Self::Hr),
            Role::Operasional => Some(Self::Operasional),
            Role::Direktur => Some(Self::Direktur),
            _ => None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "report_status")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ReportStatus {
    /// Sent.
    #[sea_orm(string_value = "terkirim")]
    Terkirim,
    /// Approved.
    #[sea_orm(string_value = "disetujui")]
    Disetujui,
    /// Rejected.
    #[sea_orm(string_value = "ditolak")]
    Ditolak,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance_record::Entity",
        from = "Column::AttendanceId",
        to = "super::attendance_record::Column::Id"
    )]
    Attendance,
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Result of [`Model::add_missing`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecipientSummary {
    /// Recipient user ids inserted by this call.
    pub added: Vec<i64>,
    /// Already present for the record.
    pub existing: Vec<i64>,
    /// No such user.
    pub unknown: Vec<i64>,
}

impl Model {
    /// Adds a recipient row per user id not yet present for the record.
    ///
    /// Duplicates are resolved by the `(attendance_id, user_id)` unique index with
    /// `ON CONFLICT DO NOTHING`, so concurrent callers never error.
    pub async fn add_missing<C: ConnectionTrait>(
        db: &C,
        attendance_id: i64,
        user_ids: &[i64],
    ) -> Result<RecipientSummary, DbErr> {
        let mut summary = RecipientSummary::default();
        let users = user::Model::find_many(db, user_ids).await?;
        let now = Utc::now();

        for &id in user_ids {
            let Some(u) = users.iter().find(|u| u.id == id) else {
                summary.unknown.push(id);
                continue;
            };

            let row = ActiveModel {
                attendance_id: Set(attendance_id),
                user_id: Set(u.id),
                recipient_name: Set(u.name.clone()),
                recipient_role: Set(RecipientRole::from_user_role(u.role)),
                status: Set(ReportStatus::Terkirim),
                notified_at: Set(None),
                read_at: Set(None),
                acted_at: Set(None),
                created_at: Set(now),
                ..Default::default()
            };

            let res = Entity::insert(row)
                .on_conflict(
                    OnConflict::columns([Column::AttendanceId, Column::UserId])
                        .do_nothing()
                        .to_owned(),
                )
                .do_nothing()
                .exec(db)
                .await?;

            match res {
                TryInsertResult::Inserted(_) => summary.added.push(id),
                TryInsertResult::Conflicted | TryInsertResult::Empty => summary.existing.push(id),
            }
        }

        Ok(summary)
    }

    pub async fn list_for_attendance<C: ConnectionTrait>(
        db: &C,
        attendance_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::AttendanceId.eq(attendance_id))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance_record::{self, Punctuality, Stamp};
    use crate::test_utils::setup_test_db;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn duplicates_are_ignored_and_roles_snapshotted() {
        let db = setup_test_db().await;
        let ayu = user::Model::create(&db, "Ayu", "ayu@example.com", Role::Karyawan, None)
            .await
            .unwrap();
        let hr = user::Model::create(&db, "Hana", "hana@example.com", Role::Hr, None)
            .await
            .unwrap();
        let peer = user::Model::create(&db, "Putu", "putu@example.com", Role::Supervisi, None)
            .await
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let stamp = Stamp {
            at: date.and_hms_opt(8, 0, 0).unwrap(),
            location_id: None,
            lat: 0.0,
            lng: 0.0,
            distance_m: None,
            face_verified: true,
        };
        let rec = attendance_record::Model::create_check_in(&db, "t-1", ayu.id, date, &stamp, Punctuality::Tepat)
            .await
            .unwrap();

        let first = Model::add_missing(&db, rec.id, &[hr.id, peer.id, 4242]).await.unwrap();
        assert_eq!(first.added, vec![hr.id, peer.id]);
        assert_eq!(first.unknown, vec![4242]);

        let second = Model::add_missing(&db, rec.id, &[hr.id]).await.unwrap();
        assert!(second.added.is_empty());
        assert_eq!(second.existing, vec![hr.id]);

        let rows = Model::list_for_attendance(&db, rec.id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].recipient_role, Some(RecipientRole::Hr));
        assert_eq!(rows[0].recipient_name, "Hana");
        assert_eq!(rows[0].status, ReportStatus::Terkirim);
        assert_eq!(rows[1].recipient_role, None);
    }
}
