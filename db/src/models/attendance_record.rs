use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One row per (user, calendar day). Created on check-in, completed on check-out.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    /// Business-local calendar day.
    pub date: NaiveDate,
    /// Business-local wall-clock time.
    pub check_in_at: Option<NaiveDateTime>,
    pub check_out_at: Option<NaiveDateTime>,
    pub check_in_location_id: Option<i64>,
    pub check_out_location_id: Option<i64>,
    pub check_in_lat: Option<f64>,
    pub check_in_lng: Option<f64>,
    pub check_out_lat: Option<f64>,
    pub check_out_lng: Option<f64>,
    pub check_in_distance_m: Option<f64>,
    pub check_out_distance_m: Option<f64>,
    pub check_in_face_verified: bool,
    pub check_out_face_verified: bool,
    pub check_in_status: Option<Punctuality>,
    pub check_out_status: Option<Punctuality>,
    /// Queue task that created the record.
    pub origin_task_id: Option<String>,
    /// Queue task that completed it.
    pub checkout_task_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_punctuality")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Punctuality {
    /// On time.
    #[sea_orm(string_value = "tepat")]
    Tepat,
    /// Late.
    #[sea_orm(string_value = "terlambat")]
    Terlambat,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::attendance_note::Entity")]
    Notes,
    #[sea_orm(has_many = "super::report_recipient::Entity")]
    Recipients,
    #[sea_orm(has_many = "super::break_session::Entity")]
    Breaks,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::attendance_note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notes.def()
    }
}

impl Related<super::report_recipient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipients.def()
    }
}

impl Related<super::break_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Breaks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Where and how one side (in or out) of the day was recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stamp {
    pub at: NaiveDateTime,
    pub location_id: Option<i64>,
    pub lat: f64,
    pub lng: f64,
    pub distance_m: Option<f64>,
    pub face_verified: bool,
}

impl Model {
    pub async fn find_for_day<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Date.eq(date))
            .one(db)
            .await
    }

    /// Inserts the day's record, stamped with the task that wrote it. A second insert for
    /// the same (user, date) fails with a unique violation; see [`crate::is_unique_violation`].
    pub async fn create_check_in<C: ConnectionTrait>(
        db: &C,
        task_id: &str,
        user_id: i64,
        date: NaiveDate,
        stamp: &Stamp,
        status: Punctuality,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        ActiveModel {
            user_id: Set(user_id),
            date: Set(date),
            check_in_at: Set(Some(stamp.at)),
            check_out_at: Set(None),
            check_in_location_id: Set(stamp.location_id),
            check_out_location_id: Set(None),
            check_in_lat: Set(Some(stamp.lat)),
            check_in_lng: Set(Some(stamp.lng)),
            check_out_lat: Set(None),
            check_out_lng: Set(None),
            check_in_distance_m: Set(stamp.distance_m),
            check_out_distance_m: Set(None),
            check_in_face_verified: Set(stamp.face_verified),
            check_out_face_verified: Set(false),
            check_in_status: Set(Some(status)),
            check_out_status: Set(None),
            origin_task_id: Set(Some(task_id.to_owned())),
            checkout_task_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Completes the record. Only writes when check-out is still unset, so a concurrent
    /// second check-out cannot overwrite the first. Returns `None` when nothing changed.
    pub async fn record_check_out<C: ConnectionTrait>(
        db: &C,
        task_id: &str,
        id: i64,
        stamp: &Stamp,
        status: Punctuality,
    ) -> Result<Option<Model>, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::CheckOutAt, Expr::value(stamp.at))
            .col_expr(Column::CheckOutLocationId, Expr::value(stamp.location_id))
            .col_expr(Column::CheckOutLat, Expr::value(stamp.lat))
            .col_expr(Column::CheckOutLng, Expr::value(stamp.lng))
            .col_expr(Column::CheckOutDistanceM, Expr::value(stamp.distance_m))
            .col_expr(Column::CheckOutFaceVerified, Expr::value(stamp.face_verified))
            .col_expr(Column::CheckOutStatus, Expr::value(status))
            .col_expr(Column::CheckoutTaskId, Expr::value(Some(task_id.to_owned())))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .filter(Column::CheckOutAt.is_null())
            .exec(db)
            .await?;

        if res.rows_affected == 0 {
            return Ok(None);
        }
        Entity::find_by_id(id).one(db).await
    }

    pub fn is_checked_in(&self) -> bool {
        self.check_in_at.is_some() && self.check_out_at.is_none()
    }

    pub fn is_checked_out(&self) -> bool {
        self.check_out_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unique_violation;
    use crate::models::user;
    use crate::test_utils::setup_test_db;

    fn stamp(h: u32, m: u32) -> Stamp {
        Stamp {
            at: NaiveDate::from_ymd_opt(2025, 3, 3)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap(),
            location_id: None,
            lat: -8.65,
            lng: 115.22,
            distance_m: None,
            face_verified: true,
        }
    }

    #[tokio::test]
    async fn second_record_for_same_day_is_a_unique_violation() {
        let db = setup_test_db().await;
        let u = user::Model::create(&db, "Ayu", "ayu@example.com", user::Role::Karyawan, None)
            .await
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();

        Model::create_check_in(&db, "t-1", u.id, date, &stamp(8, 0), Punctuality::Tepat)
            .await
            .unwrap();
        let err = Model::create_check_in(&db, "t-2", u.id, date, &stamp(8, 5), Punctuality::Tepat)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err), "unexpected error: {err:?}");

        // A different day is fine.
        let next = date.succ_opt().unwrap();
        Model::create_check_in(&db, "t-3", u.id, next, &stamp(8, 0), Punctuality::Tepat)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn check_out_is_written_once() {
        let db = setup_test_db().await;
        let u = user::Model::create(&db, "Ayu", "ayu@example.com", user::Role::Karyawan, None)
            .await
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let rec = Model::create_check_in(&db, "t-1", u.id, date, &stamp(8, 0), Punctuality::Tepat)
            .await
            .unwrap();
        assert!(rec.is_checked_in());
        assert_eq!(rec.origin_task_id.as_deref(), Some("t-1"));

        let done = Model::record_check_out(&db, "t-2", rec.id, &stamp(17, 0), Punctuality::Tepat)
            .await
            .unwrap()
            .unwrap();
        assert!(done.is_checked_out());
        assert_eq!(done.check_out_at, Some(stamp(17, 0).at));
        assert_eq!(done.checkout_task_id.as_deref(), Some("t-2"));

        let again = Model::record_check_out(&db, "t-3", rec.id, &stamp(18, 0), Punctuality::Tepat)
            .await
            .unwrap();
        assert!(again.is_none());
    }
}
