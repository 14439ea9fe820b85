use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QueryOrder, QuerySelect, Set};
use serde::Serialize;

/// A pre-existing work agenda entry, optionally linked to the attendance day it was worked on.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "agenda_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub attendance_id: Option<i64>,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
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

/// Outcome of a link attempt, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkSummary {
    pub linked: Vec<i64>,
    pub skipped: Vec<i64>,
}

impl Model {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
        description: &str,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        ActiveModel {
            user_id: Set(user_id),
            attendance_id: Set(None),
            description: Set(description.to_owned()),
            status: Set("teragenda".to_owned()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Links each agenda item to `attendance_id` if it belongs to `user_id` and is not
    /// linked yet. Items that fail either condition are skipped, never overwritten.
    pub async fn link_to_attendance<C: ConnectionTrait>(
        db: &C,
        attendance_id: i64,
        user_id: i64,
        ids: &[i64],
    ) -> Result<LinkSummary, DbErr> {
        let mut summary = LinkSummary::default();
        let now = Utc::now();

        for &id in ids {
            let res = Entity::update_many()
                .col_expr(Column::AttendanceId, Expr::value(attendance_id))
                .col_expr(Column::UpdatedAt, Expr::value(now))
                .filter(Column::Id.eq(id))
                .filter(Column::UserId.eq(user_id))
                .filter(Column::AttendanceId.is_null())
                .exec(db)
                .await?;

            if res.rows_affected == 1 {
                summary.linked.push(id);
            } else {
                summary.skipped.push(id);
            }
        }

        Ok(summary)
    }

    /// Ids of every agenda item linked to a record, oldest first.
    pub async fn ids_for_attendance<C: ConnectionTrait>(
        db: &C,
        attendance_id: i64,
    ) -> Result<Vec<i64>, DbErr> {
        Entity::find()
            .select_only()
            .column(Column::Id)
            .filter(Column::AttendanceId.eq(attendance_id))
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .into_tuple()
            .all(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        attendance_record::{self, Punctuality, Stamp},
        user,
    };
    use crate::test_utils::setup_test_db;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn links_only_own_unlinked_items() {
        let db = setup_test_db().await;
        let ayu = user::Model::create(&db, "Ayu", "ayu@example.com", user::Role::Karyawan, None)
            .await
            .unwrap();
        let budi = user::Model::create(&db, "Budi", "budi@example.com", user::Role::Karyawan, None)
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

        let mine = Model::create(&db, ayu.id, "write report").await.unwrap();
        let theirs = Model::create(&db, budi.id, "audit").await.unwrap();

        let first = Model::link_to_attendance(&db, rec.id, ayu.id, &[mine.id, theirs.id, 9999])
            .await
            .unwrap();
        assert_eq!(first.linked, vec![mine.id]);
        assert_eq!(first.skipped, vec![theirs.id, 9999]);

        // Already linked: skipped the second time.
        let second = Model::link_to_attendance(&db, rec.id, ayu.id, &[mine.id]).await.unwrap();
        assert!(second.linked.is_empty());
        assert_eq!(second.skipped, vec![mine.id]);

        assert_eq!(Model::ids_for_attendance(&db, rec.id).await.unwrap(), vec![mine.id]);
    }
}
