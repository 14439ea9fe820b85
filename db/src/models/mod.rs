pub mod agenda_item;
pub mod attendance_note;
pub mod attendance_record;
pub mod break_session;
pub mod device;
pub mod location;
pub mod notification;
pub mod notification_template;
pub mod queued_task;
pub mod report_recipient;
pub mod shift;
pub mod user;
pub mod work_pattern;

pub use agenda_item::Entity as AgendaItem;
pub use attendance_note::Entity as AttendanceNote;
pub use attendance_record::Entity as AttendanceRecord;
pub use break_session::Entity as BreakSession;
pub use device::Entity as Device;
pub use location::Entity as Location;
pub use notification::Entity as Notification;
pub use notification_template::Entity as NotificationTemplate;
pub use queued_task::Entity as QueuedTask;
pub use report_recipient::Entity as ReportRecipient;
pub use shift::Entity as Shift;
pub use user::Entity as User;
pub use work_pattern::Entity as WorkPattern;
