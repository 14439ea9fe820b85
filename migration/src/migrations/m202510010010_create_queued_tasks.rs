use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202510010010_create_queued_tasks"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("queued_tasks"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).string_len(36).not_null().primary_key())
                    .col(
                        ColumnDef::new(Alias::new("kind"))
                            .enumeration(
                                Alias::new("task_kind"),
                                vec![Alias::new("checkin"), Alias::new("checkout")],
                            )
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("user_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("work_date")).date().not_null())
                    .col(ColumnDef::new(Alias::new("payload")).json().not_null())
                    .col(
                        ColumnDef::new(Alias::new("status"))
                            .enumeration(
                                Alias::new("task_status"),
                                vec![
                                    Alias::new("queued"),
                                    Alias::new("running"),
                                    Alias::new("succeeded"),
                                    Alias::new("rejected"),
                                    Alias::new("failed"),
                                ],
                            )
                            .not_null()
                            .default("queued"),
                    )
                    .col(ColumnDef::new(Alias::new("attempts")).integer().not_null().default(0))
                    .col(ColumnDef::new(Alias::new("max_attempts")).integer().not_null().default(5))
                    .col(ColumnDef::new(Alias::new("last_error")).text().null())
                    .col(ColumnDef::new(Alias::new("result")).json().null())
                    .col(ColumnDef::new(Alias::new("available_at")).timestamp().not_null())
                    .col(ColumnDef::new(Alias::new("locked_until")).timestamp().null())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null())
                    .col(ColumnDef::new(Alias::new("updated_at")).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_queued_tasks_claim")
                    .table(Alias::new("queued_tasks"))
                    .col(Alias::new("status"))
                    .col(Alias::new("available_at"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_queued_tasks_user_day")
                    .table(Alias::new("queued_tasks"))
                    .col(Alias::new("user_id"))
                    .col(Alias::new("work_date"))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("queued_tasks")).to_owned())
            .await
    }
}
