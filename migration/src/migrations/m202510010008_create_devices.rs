use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202510010008_create_devices"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("devices"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("user_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("push_token")).string().not_null())
                    .col(ColumnDef::new(Alias::new("device_identifier")).string().null())
                    .col(ColumnDef::new(Alias::new("device_label")).string().null())
                    .col(ColumnDef::new(Alias::new("platform")).string().null())
                    .col(ColumnDef::new(Alias::new("os_version")).string().null())
                    .col(ColumnDef::new(Alias::new("app_version")).string().null())
                    .col(ColumnDef::new(Alias::new("push_enabled")).boolean().not_null().default(true))
                    .col(ColumnDef::new(Alias::new("failed_push_count")).integer().not_null().default(0))
                    .col(ColumnDef::new(Alias::new("last_push_at")).timestamp().null())
                    .col(ColumnDef::new(Alias::new("last_seen")).timestamp().null())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .col(ColumnDef::new(Alias::new("updated_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .index(
                        Index::create()
                            .name("uq_devices_user_token")
                            .col(Alias::new("user_id"))
                            .col(Alias::new("push_token"))
                            .unique(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_devices_user")
                            .from(Alias::new("devices"), Alias::new("user_id"))
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
            .drop_table(Table::drop().table(Alias::new("devices")).to_owned())
            .await
    }
}
