pub mod m202510010001_create_locations;
pub mod m202510010002_create_users;
pub mod m202510010003_create_work_schedules;
pub mod m202510010004_create_attendance_records;
pub mod m202510010005_create_agenda_items;
pub mod m202510010006_create_report_recipients;
pub mod m202510010007_create_break_sessions;
pub mod m202510010008_create_devices;
pub mod m202510010009_create_notifications;
pub mod m202510010010_create_queued_tasks;
