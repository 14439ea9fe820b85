use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202510010006_create_report_recipients"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("report_recipients"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("attendance_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("user_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("recipient_name")).string().not_null())
                    .col(
                        ColumnDef::new(Alias::new("recipient_role"))
                            .enumeration(
                                Alias::new("recipient_role"),
                                vec![Alias::new("HR"), Alias::new("OPERASIONAL"), Alias::new("DIREKTUR")],
                            )
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("status"))
                            .enumeration(
                                Alias::new("report_status"),
                                vec![Alias::new("terkirim"), Alias::new("disetujui"), Alias::new("ditolak")],
                            )
                            .not_null()
                            .default("terkirim"),
                    )
                    .col(ColumnDef::new(Alias::new("notified_at")).timestamp().null())
                    .col(ColumnDef::new(Alias::new("read_at")).timestamp().null())
                    .col(ColumnDef::new(Alias::new("acted_at")).timestamp().null())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .index(
                        Index::create()
                            .name("uq_recipient_attendance_user")
                            .col(Alias::new("attendance_id"))
                            .col(Alias::new("user_id"))
                            .unique(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_recipient_attendance")
                            .from(Alias::new("report_recipients"), Alias::new("attendance_id"))
                            .to(Alias::new("attendance_records"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_recipient_user")
                            .from(Alias::new("report_recipients"), Alias::new("user_id"))
                            .to(Alias::new("users"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("report_recipients")).to_owned())
            .await
    }
}
