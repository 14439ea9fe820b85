//! Daily attendance: check-in, check-out, status and breaks.
//!
//! Requests are validated synchronously by [`AttendanceProtocol`] and the writes are
//! deferred to [`AttendanceTaskHandler`] through the task queue. The client polls
//! `status` (or the task) to observe the outcome.

mod breaks;
mod payload;
mod protocol;
mod worker;

pub use breaks::{BreakEnded, BreakStarted, BreakStatus};
pub use payload::{
    AttendanceSubmission, CheckinPayload, CheckoutPayload, CleanSubmission, LocationFix, ProtocolSettings,
};
pub use protocol::{Accepted, AttendanceProtocol, AttendanceStatus, DayState};
pub use worker::{AttendanceTaskHandler, format_work_duration};
