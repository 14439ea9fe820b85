use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202510010003_create_work_schedules"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // work_patterns
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("work_patterns"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("name")).string().not_null())
                    .col(ColumnDef::new(Alias::new("start_time")).time().not_null())
                    .col(ColumnDef::new(Alias::new("end_time")).time().not_null())
                    .col(ColumnDef::new(Alias::new("break_start")).time().null())
                    .col(ColumnDef::new(Alias::new("break_end")).time().null())
                    .col(ColumnDef::new(Alias::new("max_break_minutes")).integer().null())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .to_owned(),
            )
            .await?;

        // shifts
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("shifts"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("user_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("work_pattern_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("start_date")).date().null())
                    .col(ColumnDef::new(Alias::new("end_date")).date().null())
                    .col(ColumnDef::new(Alias::new("work_days")).string().not_null().default(""))
                    .col(
                        ColumnDef::new(Alias::new("status"))
                            .enumeration(
                                Alias::new("shift_status"),
                                vec![Alias::new("KERJA"), Alias::new("LIBUR")],
                            )
                            .not_null()
                            .default("KERJA"),
                    )
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shifts_user")
                            .from(Alias::new("shifts"), Alias::new("user_id"))
                            .to(Alias::new("users"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shifts_pattern")
                            .from(Alias::new("shifts"), Alias::new("work_pattern_id"))
                            .to(Alias::new("work_patterns"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_shifts_user")
                    .table(Alias::new("shifts"))
                    .col(Alias::new("user_id"))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("shifts")).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alias::new("work_patterns")).to_owned())
            .await
    }
}
