use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use db::is_unique_violation;
use db::models::{attendance_record, break_session, shift};
use serde::Serialize;
use util::geo::GeoPoint;

use super::protocol::AttendanceProtocol;
use crate::error::AttendanceError;

#[derive(Debug, Clone, Serialize)]
pub struct BreakStarted {
    pub break_id: i64,
    pub attendance_id: i64,
    pub started_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakEnded {
    pub break_id: i64,
    pub attendance_id: i64,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    pub duration_seconds: i64,
    /// All closed breaks of the day, this one included.
    pub total_break_seconds: i64,
    pub max_break_minutes: Option<i32>,
    pub exceeded_limit: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakStatus {
    pub user_id: i64,
    pub date: NaiveDate,
    pub attendance_id: Option<i64>,
    pub on_break: bool,
    pub active: Option<break_session::Model>,
    pub sessions_today: usize,
    pub total_break_seconds: i64,
}

/// Inclusive on both ends. A window whose end is before its start wraps past midnight.
fn in_window(t: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start <= end {
        start <= t && t <= end
    } else {
        t >= start || t <= end
    }
}

fn checked_point(lat: Option<f64>, lng: Option<f64>) -> Result<(Option<f64>, Option<f64>), AttendanceError> {
    match (lat, lng) {
        (Some(lat), Some(lng)) if !GeoPoint::new(lat, lng).is_valid() => Err(
            AttendanceError::InvalidInput("lat/lng are not valid coordinates".into()),
        ),
        (Some(_), None) | (None, Some(_)) => Err(AttendanceError::InvalidInput(
            "lat and lng must be sent together".into(),
        )),
        other => Ok(other),
    }
}

impl AttendanceProtocol {
    /// Opens a break on today's record. Coordinates are optional: a break without them
    /// is accepted and stored without a position. When given they must come as a valid pair.
    pub async fn break_start(
        &self,
        user_id: i64,
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> Result<BreakStarted, AttendanceError> {
        let (lat, lng) = checked_point(lat, lng)?;
        let date = self.clock.today();
        let now = self.clock.now_local();

        let record = self.checked_in_record(user_id, date).await?;
        if record.is_checked_out() {
            return Err(AttendanceError::AlreadyCheckedOut);
        }
        if break_session::Model::open_for_attendance(&self.db, record.id)
            .await?
            .is_some()
        {
            return Err(AttendanceError::AlreadyOnBreak);
        }

        if let Some((_, pattern)) = shift::Model::resolve_for_day(&self.db, user_id, date).await? {
            if let Some((start, end)) = pattern.break_window() {
                if !in_window(now.time(), start, end) {
                    return Err(AttendanceError::OutsideBreakWindow { start, end });
                }
            }
        }

        let session = match break_session::Model::start(&self.db, record.id, user_id, date, now, lat, lng).await {
            Ok(s) => s,
            Err(e) if is_unique_violation(&e) => return Err(AttendanceError::AlreadyOnBreak),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(user_id, attendance_id = record.id, break_id = session.id, "Break started");
        Ok(BreakStarted {
            break_id: session.id,
            attendance_id: record.id,
            started_at: session.started_at,
        })
    }

    /// Closes the open break. Coordinates follow the same rule as [`Self::break_start`].
    pub async fn break_end(
        &self,
        user_id: i64,
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> Result<BreakEnded, AttendanceError> {
        let (lat, lng) = checked_point(lat, lng)?;
        let date = self.clock.today();
        let now = self.clock.now_local();

        let record = self.checked_in_record(user_id, date).await?;
        let open = break_session::Model::open_for_attendance(&self.db, record.id)
            .await?
            .ok_or(AttendanceError::NoActiveBreak)?;

        let closed = break_session::Model::close(&self.db, open.id, now, lat, lng)
            .await?
            .ok_or(AttendanceError::NoActiveBreak)?;

        let total_break_seconds = break_session::Model::list_for_attendance(&self.db, record.id)
            .await?
            .iter()
            .map(break_session::Model::duration_seconds)
            .sum::<i64>();

        let max_break_minutes = shift::Model::resolve_for_day(&self.db, user_id, date)
            .await?
            .and_then(|(_, pattern)| pattern.max_break_minutes)
            .filter(|m| *m > 0);
        let exceeded_limit = max_break_minutes.is_some_and(|m| total_break_seconds > i64::from(m) * 60);

        tracing::info!(
            user_id,
            attendance_id = record.id,
            break_id = closed.id,
            duration_seconds = closed.duration_seconds(),
            exceeded_limit,
            "Break ended"
        );
        Ok(BreakEnded {
            break_id: closed.id,
            attendance_id: record.id,
            started_at: closed.started_at,
            ended_at: now,
            duration_seconds: closed.duration_seconds(),
            total_break_seconds,
            max_break_minutes,
            exceeded_limit,
        })
    }

    pub async fn break_status(&self, user_id: i64) -> Result<BreakStatus, AttendanceError> {
        let date = self.clock.today();
        let Some(record) = attendance_record::Model::find_for_day(&self.db, user_id, date).await? else {
            return Ok(BreakStatus {
                user_id,
                date,
                attendance_id: None,
                on_break: false,
                active: None,
                sessions_today: 0,
                total_break_seconds: 0,
            });
        };

        let sessions = break_session::Model::list_for_attendance(&self.db, record.id).await?;
        let active = sessions.iter().find(|s| s.ended_at.is_none()).cloned();
        Ok(BreakStatus {
            user_id,
            date,
            attendance_id: Some(record.id),
            on_break: active.is_some(),
            active,
            sessions_today: sessions.len(),
            total_break_seconds: sessions.iter().map(break_session::Model::duration_seconds).sum(),
        })
    }

    async fn checked_in_record(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<attendance_record::Model, AttendanceError> {
        attendance_record::Model::find_for_day(&self.db, user_id, date)
            .await?
            .filter(|r| r.check_in_at.is_some())
            .ok_or(AttendanceError::NotCheckedIn)
    }
}
