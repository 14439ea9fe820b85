use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QueryOrder, Set};
use serde::Serialize;

/// One contiguous break within an attendance day.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "break_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub attendance_id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub started_at: NaiveDateTime,
    /// `None` while the break is open.
    pub ended_at: Option<NaiveDateTime>,
    pub start_lat: Option<f64>,
    pub start_lng: Option<f64>,
    pub end_lat: Option<f64>,
    pub end_lng: Option<f64>,
    pub created_at: DateTime<Utc>,
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

impl Model {
    pub async fn open_for_attendance<C: ConnectionTrait>(
        db: &C,
        attendance_id: i64,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::AttendanceId.eq(attendance_id))
            .filter(Column::EndedAt.is_null())
            .one(db)
            .await
    }

    pub async fn list_for_attendance<C: ConnectionTrait>(
        db: &C,
        attendance_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::AttendanceId.eq(attendance_id))
            .order_by_asc(Column::StartedAt)
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// Opens a break. A second open break on the same record trips the partial unique
    /// index and surfaces as a unique violation.
    pub async fn start<C: ConnectionTrait>(
        db: &C,
        attendance_id: i64,
        user_id: i64,
        date: NaiveDate,
        at: NaiveDateTime,
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> Result<Model, DbErr> {
        ActiveModel {
            attendance_id: Set(attendance_id),
            user_id: Set(user_id),
            date: Set(date),
            started_at: Set(at),
            ended_at: Set(None),
            start_lat: Set(lat),
            start_lng: Set(lng),
            end_lat: Set(None),
            end_lng: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Closes an open break. Returns `None` if it was already closed.
    pub async fn close<C: ConnectionTrait>(
        db: &C,
        id: i64,
        at: NaiveDateTime,
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> Result<Option<Model>, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::EndedAt, Expr::value(at))
            .col_expr(Column::EndLat, Expr::value(lat))
            .col_expr(Column::EndLng, Expr::value(lng))
            .filter(Column::Id.eq(id))
            .filter(Column::EndedAt.is_null())
            .exec(db)
            .await?;

        if res.rows_affected == 0 {
            return Ok(None);
        }
        Entity::find_by_id(id).one(db).await
    }

    /// Length of a closed break in whole seconds; zero while open.
    pub fn duration_seconds(&self) -> i64 {
        self.ended_at
            .map(|end| (end - self.started_at).num_seconds().max(0))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unique_violation;
    use crate::models::{
        attendance_record::{self, Punctuality, Stamp},
        user,
    };
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn only_one_open_break_per_record() {
        let db = setup_test_db().await;
        let u = user::Model::create(&db, "Ayu", "ayu@example.com", user::Role::Karyawan, None)
            .await
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let at = |h, m| date.and_hms_opt(h, m, 0).unwrap();
        let stamp = Stamp {
            at: at(8, 0),
            location_id: None,
            lat: 0.0,
            lng: 0.0,
            distance_m: None,
            face_verified: true,
        };
        let rec = attendance_record::Model::create_check_in(&db, "t-1", u.id, date, &stamp, Punctuality::Tepat)
            .await
            .unwrap();

        let open = Model::start(&db, rec.id, u.id, date, at(12, 0), None, None).await.unwrap();
        let err = Model::start(&db, rec.id, u.id, date, at(12, 1), None, None)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));

        let closed = Model::close(&db, open.id, at(12, 45), Some(1.0), Some(2.0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(closed.duration_seconds(), 45 * 60);
        assert!(Model::close(&db, open.id, at(13, 0), None, None).await.unwrap().is_none());

        // Once closed, a new break may start.
        Model::start(&db, rec.id, u.id, date, at(15, 0), None, None).await.unwrap();
        assert_eq!(Model::list_for_attendance(&db, rec.id).await.unwrap().len(), 2);
    }
}
