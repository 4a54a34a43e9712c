use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Schools::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Schools::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Schools::Name).text().not_null())
                    .col(ColumnDef::new(Schools::Address).text().not_null())
                    .col(ColumnDef::new(Schools::City).text().not_null())
                    .col(ColumnDef::new(Schools::State).text().not_null())
                    .col(ColumnDef::new(Schools::Contact).string_len(15).not_null())
                    .col(ColumnDef::new(Schools::Image).text().not_null().default(""))
                    .col(ColumnDef::new(Schools::EmailId).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Schools::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx-schools-created_at")
                    .table(Schools::Table)
                    .col(Schools::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx-schools-created_at").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Schools::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Schools {
    Table,
    Id,
    Name,
    Address,
    City,
    State,
    Contact,
    Image,
    EmailId,
    CreatedAt,
}
