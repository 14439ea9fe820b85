use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202510010004_create_attendance_records"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("attendance_records"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("user_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("date")).date().not_null())
                    .col(ColumnDef::new(Alias::new("check_in_at")).date_time().null())
                    .col(ColumnDef::new(Alias::new("check_out_at")).date_time().null())
                    .col(ColumnDef::new(Alias::new("check_in_location_id")).integer().null())
                    .col(ColumnDef::new(Alias::new("check_out_location_id")).integer().null())
                    .col(ColumnDef::new(Alias::new("check_in_lat")).double().null())
                    .col(ColumnDef::new(Alias::new("check_in_lng")).double().null())
                    .col(ColumnDef::new(Alias::new("check_out_lat")).double().null())
                    .col(ColumnDef::new(Alias::new("check_out_lng")).double().null())
                    .col(ColumnDef::new(Alias::new("check_in_distance_m")).double().null())
                    .col(ColumnDef::new(Alias::new("check_out_distance_m")).double().null())
                    .col(ColumnDef::new(Alias::new("check_in_face_verified")).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alias::new("check_out_face_verified")).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Alias::new("check_in_status"))
                            .enumeration(
                                Alias::new("attendance_punctuality"),
                                vec![Alias::new("tepat"), Alias::new("terlambat")],
                            )
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("check_out_status"))
                            .enumeration(
                                Alias::new("attendance_punctuality"),
                                vec![Alias::new("tepat"), Alias::new("terlambat")],
                            )
                            .null(),
                    )
                    .col(ColumnDef::new(Alias::new("origin_task_id")).string().null())
                    .col(ColumnDef::new(Alias::new("checkout_task_id")).string().null())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .col(ColumnDef::new(Alias::new("updated_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .index(
                        Index::create()
                            .name("uq_attendance_user_date")
                            .col(Alias::new("user_id"))
                            .col(Alias::new("date"))
                            .unique(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendance_user")
                            .from(Alias::new("attendance_records"), Alias::new("user_id"))
                            .to(Alias::new("users"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendance_in_location")
                            .from(Alias::new("attendance_records"), Alias::new("check_in_location_id"))
                            .to(Alias::new("locations"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendance_out_location")
                            .from(Alias::new("attendance_records"), Alias::new("check_out_location_id"))
                            .to(Alias::new("locations"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // attendance_notes
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("attendance_notes"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("attendance_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("description")).text().not_null())
                    .col(ColumnDef::new(Alias::new("attachment_url")).string().null())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .col(ColumnDef::new(Alias::new("updated_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notes_attendance")
                            .from(Alias::new("attendance_notes"), Alias::new("attendance_id"))
                            .to(Alias::new("attendance_records"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notes_attendance")
                    .table(Alias::new("attendance_notes"))
                    .col(Alias::new("attendance_id"))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("attendance_notes")).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alias::new("attendance_records")).to_owned())
            .await
    }
}
