use chrono::{NaiveDate, NaiveDateTime};
use db::models::queued_task::TaskKind;
use db::models::{agenda_item, attendance_record, location, user};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use util::clock::Clock;
use util::geo::{distance_m, effective_radius, within_radius};

use super::payload::{
    AttendanceSubmission, CheckinPayload, CheckoutPayload, CleanSubmission, LocationFix, ProtocolSettings,
};
use crate::error::AttendanceError;
use crate::face::{FaceMatch, FaceVerifier};
use crate::queue::{TaskQueue, TaskSummary};

/// Where a user stands for the current business day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayState {
    None,
    CheckedIn,
    CheckedOut,
}

/// Returned once the synchronous checks pass and the work is queued.
#[derive(Debug, Clone, Serialize)]
pub struct Accepted {
    pub task_id: String,
    pub mode: TaskKind,
    pub date: NaiveDate,
    pub at: NaiveDateTime,
    pub distance_m: Option<f64>,
    pub radius_m: Option<f64>,
    pub face: FaceMatch,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceStatus {
    pub user_id: i64,
    pub date: NaiveDate,
    pub state: DayState,
    pub attendance_id: Option<i64>,
    pub check_in_at: Option<NaiveDateTime>,
    pub check_out_at: Option<NaiveDateTime>,
    pub check_in_status: Option<attendance_record::Punctuality>,
    pub agenda_ids: Vec<i64>,
    /// Most recent deferred task for today, so a rejected or failed commit is visible.
    pub latest_task: Option<TaskSummary>,
}

/// Synchronous half of check-in/check-out: validate, geofence, verify the face,
/// precheck duplicates, then hand the write to the task queue.
pub struct AttendanceProtocol {
    pub(super) db: DatabaseConnection,
    face: Arc<FaceVerifier>,
    queue: TaskQueue,
    pub(super) clock: Arc<dyn Clock>,
    settings: ProtocolSettings,
}

impl AttendanceProtocol {
    pub fn new(
        db: DatabaseConnection,
        face: Arc<FaceVerifier>,
        queue: TaskQueue,
        clock: Arc<dyn Clock>,
        settings: ProtocolSettings,
    ) -> Self {
        Self {
            db,
            face,
            queue,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &ProtocolSettings {
        &self.settings
    }

    pub async fn checkin(&self, submission: AttendanceSubmission) -> Result<Accepted, AttendanceError> {
        let req = submission.into_clean(&self.settings)?;
        let (fix, face) = self.verify_presence(&req).await?;

        let date = self.clock.today();
        let at = self.clock.now_local();

        if attendance_record::Model::find_for_day(&self.db, req.user_id, date)
            .await?
            .is_some()
        {
            return Err(AttendanceError::DuplicateCheckin);
        }
        if let Some(task) = self.queue.pending(TaskKind::Checkin, req.user_id, date).await? {
            return Err(AttendanceError::CheckinInProgress { task_id: Some(task.id) });
        }

        let payload = CheckinPayload {
            user_id: req.user_id,
            date,
            at,
            fix: fix.clone(),
            face_score: face.score,
            agenda_ids: req.agenda_ids,
            recipient_ids: req.recipient_ids,
            notes: req.notes,
        };
        let task = self
            .queue
            .enqueue(TaskKind::Checkin, req.user_id, date, &payload)
            .await?;

        tracing::info!(user_id = req.user_id, task_id = %task.id, %date, "Check-in accepted");
        Ok(Accepted {
            task_id: task.id,
            mode: TaskKind::Checkin,
            date,
            at,
            distance_m: fix.distance_m,
            radius_m: fix.radius_m,
            face,
        })
    }

    pub async fn checkout(&self, submission: AttendanceSubmission) -> Result<Accepted, AttendanceError> {
        let req = submission.into_clean(&self.settings)?;
        let (fix, face) = self.verify_presence(&req).await?;

        let date = self.clock.today();
        let at = self.clock.now_local();

        let record = attendance_record::Model::find_for_day(&self.db, req.user_id, date)
            .await?
            .filter(|r| r.check_in_at.is_some());
        let Some(record) = record else {
            // The check-in may still be sitting in the queue.
            if let Some(task) = self.queue.pending(TaskKind::Checkin, req.user_id, date).await? {
                return Err(AttendanceError::CheckinInProgress { task_id: Some(task.id) });
            }
            return Err(AttendanceError::NotCheckedIn);
        };
        if record.is_checked_out() {
            return Err(AttendanceError::AlreadyCheckedOut);
        }
        if let Some(task) = self.queue.pending(TaskKind::Checkout, req.user_id, date).await? {
            return Err(AttendanceError::CheckoutInProgress { task_id: Some(task.id) });
        }

        let payload = CheckoutPayload {
            attendance_id: record.id,
            user_id: req.user_id,
            date,
            at,
            fix: fix.clone(),
            face_score: face.score,
            agenda_ids: req.agenda_ids,
            recipient_ids: req.recipient_ids,
            notes: req.notes,
        };
        let task = self
            .queue
            .enqueue(TaskKind::Checkout, req.user_id, date, &payload)
            .await?;

        tracing::info!(
            user_id = req.user_id,
            attendance_id = record.id,
            task_id = %task.id,
            "Check-out accepted"
        );
        Ok(Accepted {
            task_id: task.id,
            mode: TaskKind::Checkout,
            date,
            at,
            distance_m: fix.distance_m,
            radius_m: fix.radius_m,
            face,
        })
    }

    /// Read-only view of today's record. Never creates anything.
    pub async fn status(&self, user_id: i64) -> Result<AttendanceStatus, AttendanceError> {
        if user::Model::find(&self.db, user_id).await?.is_none() {
            return Err(AttendanceError::UserNotFound(user_id));
        }

        let date = self.clock.today();
        let record = attendance_record::Model::find_for_day(&self.db, user_id, date).await?;
        let latest_task = self
            .queue
            .latest_for_user_day(user_id, date)
            .await?
            .as_ref()
            .map(TaskSummary::from);

        let Some(record) = record else {
            return Ok(AttendanceStatus {
                user_id,
                date,
                state: DayState::None,
                attendance_id: None,
                check_in_at: None,
                check_out_at: None,
                check_in_status: None,
                agenda_ids: Vec::new(),
                latest_task,
            });
        };

        let state = if record.is_checked_out() {
            DayState::CheckedOut
        } else {
            DayState::CheckedIn
        };
        let agenda_ids = agenda_item::Model::ids_for_attendance(&self.db, record.id).await?;

        Ok(AttendanceStatus {
            user_id,
            date,
            state,
            attendance_id: Some(record.id),
            check_in_at: record.check_in_at,
            check_out_at: record.check_out_at,
            check_in_status: record.check_in_status,
            agenda_ids,
            latest_task,
        })
    }

    pub async fn task(&self, id: &str) -> Result<TaskSummary, AttendanceError> {
        self.queue
            .find(id)
            .await?
            .as_ref()
            .map(TaskSummary::from)
            .ok_or_else(|| AttendanceError::TaskNotFound(id.to_owned()))
    }

    /// Location, geofence, user and face checks shared by check-in and check-out.
    async fn verify_presence(&self, req: &CleanSubmission) -> Result<(LocationFix, FaceMatch), AttendanceError> {
        let mut fix = LocationFix {
            location_id: None,
            lat: req.point.lat,
            lng: req.point.lng,
            distance_m: None,
            radius_m: None,
        };

        if let Some(location_id) = req.location_id {
            let loc = location::Model::find_active(&self.db, location_id)
                .await?
                .ok_or(AttendanceError::LocationNotFound(location_id))?;

            let distance = distance_m(req.point, loc.point());
            let radius = effective_radius(loc.radius, self.settings.default_radius_m);
            if !within_radius(distance, radius) {
                tracing::info!(
                    user_id = req.user_id,
                    location_id,
                    distance_m = distance,
                    radius_m = radius,
                    "Rejected: outside geofence"
                );
                return Err(AttendanceError::OutsideGeofence {
                    distance_m: distance,
                    radius_m: radius,
                });
            }
            fix.location_id = Some(loc.id);
            fix.distance_m = Some(distance);
            fix.radius_m = Some(radius);
        }

        if user::Model::find(&self.db, req.user_id).await?.is_none() {
            return Err(AttendanceError::UserNotFound(req.user_id));
        }

        let face = self.face.verify(req.user_id, &req.image).await.map_err(|e| {
            tracing::warn!(user_id = req.user_id, error = %e, "Face verification could not run");
            AttendanceError::from(e)
        })?;
        if !face.matched {
            tracing::info!(user_id = req.user_id, score = face.score, "Rejected: face mismatch");
            return Err(AttendanceError::FaceMismatch {
                score: face.score,
                threshold: face.threshold,
            });
        }

        Ok((fix, face))
    }
}
