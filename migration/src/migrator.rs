use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202510010001_create_locations::Migration),
            Box::new(migrations::m202510010002_create_users::Migration),
            Box::new(migrations::m202510010003_create_work_schedules::Migration),
            Box::new(migrations::m202510010004_create_attendance_records::Migration),
            Box::new(migrations::m202510010005_create_agenda_items::Migration),
            Box::new(migrations::m202510010006_create_report_recipients::Migration),
            Box::new(migrations::m202510010007_create_break_sessions::Migration),
            Box::new(migrations::m202510010008_create_devices::Migration),
            Box::new(migrations::m202510010009_create_notifications::Migration),
            Box::new(migrations::m202510010010_create_queued_tasks::Migration),
        ]
    }
}
