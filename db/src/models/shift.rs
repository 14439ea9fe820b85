use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::work_pattern;

/// Assigns a work pattern to a user over a date range and set of weekdays.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "shifts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub work_pattern_id: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Comma separated weekday names (`mon,tue,...`). Empty means every day.
    pub work_days: String,
    pub status: ShiftStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "shift_status")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ShiftStatus {
    /// Working day.
    #[sea_orm(string_value = "KERJA")]
    Kerja,
    /// Day off.
    #[sea_orm(string_value = "LIBUR")]
    Libur,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::work_pattern::Entity",
        from = "Column::WorkPatternId",
        to = "super::work_pattern::Column::Id"
    )]
    WorkPattern,
}

impl Related<super::work_pattern::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkPattern.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Parses a single weekday name. English and Indonesian, short or long.
fn parse_weekday(raw: &str) -> Option<Weekday> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "mon" | "monday" | "senin" => Some(Weekday::Mon),
        "tue" | "tuesday" | "selasa" => Some(Weekday::Tue),
        "wed" | "wednesday" | "rabu" => Some(Weekday::Wed),
        "thu" | "thursday" | "kamis" => Some(Weekday::Thu),
        "fri" | "friday" | "jumat" => Some(Weekday::Fri),
        "sat" | "saturday" | "sabtu" => Some(Weekday::Sat),
        "sun" | "sunday" | "minggu" => Some(Weekday::Sun),
        _ => None,
    }
}

impl Model {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
        work_pattern_id: i64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        work_days: &str,
        status: ShiftStatus,
    ) -> Result<Model, DbErr> {
        ActiveModel {
            user_id: Set(user_id),
            work_pattern_id: Set(work_pattern_id),
            start_date: Set(start_date),
            end_date: Set(end_date),
            work_days: Set(work_days.to_owned()),
            status: Set(status),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Weekdays this shift applies to; `None` means every day.
    pub fn weekdays(&self) -> Option<Vec<Weekday>> {
        let days: Vec<Weekday> = self
            .work_days
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .filter_map(parse_weekday)
            .collect();
        if days.is_empty() { None } else { Some(days) }
    }

    /// True when `date` falls inside the shift's range and weekday pattern.
    pub fn covers(&self, date: NaiveDate) -> bool {
        if self.start_date.is_some_and(|start| date < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| date > end) {
            return false;
        }
        match self.weekdays() {
            Some(days) => days.contains(&date.weekday()),
            None => true,
        }
    }

    /// Resolves the working shift (and its pattern) that applies to `user_id` on `date`.
    ///
    /// Day-off shifts never resolve. When several shifts overlap, the most recently
    /// created one wins.
    pub async fn resolve_for_day<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<(Model, work_pattern::Model)>, DbErr> {
        let shifts = Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Status.eq(ShiftStatus::Kerja))
            .order_by_desc(Column::Id)
            .all(db)
            .await?;

        let Some(shift) = shifts.into_iter().find(|s| s.covers(date)) else {
            return Ok(None);
        };

        let pattern = work_pattern::Entity::find_by_id(shift.work_pattern_id)
            .one(db)
            .await?;
        Ok(pattern.map(|p| (shift, p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{user, work_pattern::NewWorkPattern};
    use crate::test_utils::setup_test_db;
    use chrono::NaiveTime;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn pattern(db: &sea_orm::DatabaseConnection, start: (u32, u32)) -> work_pattern::Model {
        work_pattern::Model::create(
            db,
            NewWorkPattern {
                name: "office".into(),
                start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                break_start: None,
                break_end: None,
                max_break_minutes: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn resolves_by_range_and_weekday() {
        let db = setup_test_db().await;
        let u = user::Model::create(&db, "Ayu", "ayu@example.com", user::Role::Karyawan, None)
            .await
            .unwrap();
        let p = pattern(&db, (8, 0)).await;
        Model::create(
            &db,
            u.id,
            p.id,
            Some(d(2025, 3, 1)),
            Some(d(2025, 3, 31)),
            "mon,tue,wed,thu,fri",
            ShiftStatus::Kerja,
        )
        .await
        .unwrap();

        // 2025-03-03 is a Monday, 2025-03-08 a Saturday.
        let hit = Model::resolve_for_day(&db, u.id, d(2025, 3, 3)).await.unwrap();
        assert_eq!(hit.map(|(_, p)| p.start_time.format("%H:%M").to_string()), Some("08:00".into()));
        assert!(Model::resolve_for_day(&db, u.id, d(2025, 3, 8)).await.unwrap().is_none());
        assert!(Model::resolve_for_day(&db, u.id, d(2025, 4, 1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn day_off_shift_is_ignored() {
        let db = setup_test_db().await;
        let u = user::Model::create(&db, "Budi", "budi@example.com", user::Role::Karyawan, None)
            .await
            .unwrap();
        let p = pattern(&db, (9, 0)).await;
        Model::create(&db, u.id, p.id, None, None, "", ShiftStatus::Libur)
            .await
            .unwrap();

        assert!(Model::resolve_for_day(&db, u.id, d(2025, 3, 3)).await.unwrap().is_none());
    }

    #[test]
    fn empty_work_days_mean_every_day() {
        let mut s = Model {
            id: 1,
            user_id: 1,
            work_pattern_id: 1,
            start_date: None,
            end_date: None,
            work_days: String::new(),
            status: ShiftStatus::Kerja,
            created_at: Utc::now(),
        };
        assert!(s.covers(d(2025, 3, 9)));
        s.work_days = "Senin, Selasa".into();
        assert!(s.covers(d(2025, 3, 3)));
        assert!(!s.covers(d(2025, 3, 9)));
    }
}
