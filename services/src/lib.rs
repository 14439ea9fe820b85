pub mod attendance;
pub mod error;
pub mod face;
pub mod notification;
pub mod queue;
pub mod storage;
pub mod test_utils;
