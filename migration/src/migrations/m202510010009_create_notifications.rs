use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202510010009_create_notifications"
    }
}

/// `(event_trigger, title, body)` rows installed with the schema.
const SEED_TEMPLATES: &[(&str, &str, &str)] = &[
    (
        "REMINDER_CHECK_IN",
        "Time to check in",
        "Hi {employee_name}, your shift starts at {scheduled_start}. Don't forget to check in.",
    ),
    (
        "SUCCESS_CHECK_IN",
        "Check-in recorded",
        "Hi {employee_name}, your check-in at {check_in_time} was recorded. Status: {status}.",
    ),
    (
        "LATE_CHECK_IN",
        "Late check-in",
        "Hi {employee_name}, you checked in at {check_in_time}, after the scheduled start of {scheduled_start}.",
    ),
    (
        "REMINDER_CHECK_OUT",
        "Time to check out",
        "Hi {employee_name}, your shift ends at {scheduled_end}. Remember to check out.",
    ),
    (
        "SUCCESS_CHECK_OUT",
        "Check-out recorded",
        "Hi {employee_name}, you checked out at {check_out_time}. Total working time: {work_duration}.",
    ),
    (
        "MISSED_CHECK_IN",
        "Missed check-in",
        "Hi {employee_name}, no check-in was recorded for {date}.",
    ),
    (
        "FACE_REGISTRATION_SUCCESS",
        "Face registered",
        "Hi {employee_name}, your face was registered successfully.",
    ),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // notification_templates
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("notification_templates"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("event_trigger")).string().not_null().unique_key())
                    .col(ColumnDef::new(Alias::new("title_template")).string().not_null())
                    .col(ColumnDef::new(Alias::new("body_template")).text().not_null())
                    .col(ColumnDef::new(Alias::new("is_active")).boolean().not_null().default(true))
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .col(ColumnDef::new(Alias::new("updated_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .to_owned(),
            )
            .await?;

        // notifications
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("notifications"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("user_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("event_trigger")).string().not_null())
                    .col(ColumnDef::new(Alias::new("title")).string().not_null())
                    .col(ColumnDef::new(Alias::new("body")).text().not_null())
                    .col(ColumnDef::new(Alias::new("data")).json().null())
                    .col(ColumnDef::new(Alias::new("read_at")).timestamp().null())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_user")
                            .from(Alias::new("notifications"), Alias::new("user_id"))
                            .to(Alias::new("users"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        let mut insert = Query::insert();
        insert.into_table(Alias::new("notification_templates")).columns([
            Alias::new("event_trigger"),
            Alias::new("title_template"),
            Alias::new("body_template"),
        ]);
        for (code, title, body) in SEED_TEMPLATES {
            insert
                .values([(*code).into(), (*title).into(), (*body).into()])
                .map_err(|e| DbErr::Custom(e.to_string()))?;
        }
        insert.on_conflict(
            OnConflict::column(Alias::new("event_trigger"))
                .do_nothing()
                .to_owned(),
        );
        manager.exec_stmt(insert).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("notifications")).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alias::new("notification_templates")).to_owned())
            .await
    }
}
