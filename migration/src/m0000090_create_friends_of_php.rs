use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FriendsOfPhp::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FriendsOfPhp::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FriendsOfPhp::AdvisoryId).string().not_null())
                    .col(
                        ColumnDef::new(FriendsOfPhp::Title)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(FriendsOfPhp::Cve).string().not_null().default(""))
                    .col(
                        ColumnDef::new(FriendsOfPhp::Link)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(FriendsOfPhp::Reference)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(FriendsOfPhp::Composer)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(FriendsOfPhp::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(FriendsOfPhp::Branches)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FriendsOfPhp::Published)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(FriendsOfPhp::Modified)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(FriendsOfPhp::Table)
                    .name(Indexes::FriendsOfPhpAdvisoryIdIdx.to_string())
                    .col(FriendsOfPhp::AdvisoryId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(FriendsOfPhp::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Indexes {
    FriendsOfPhpAdvisoryIdIdx,
}

#[derive(DeriveIden)]
enum FriendsOfPhp {
    Table,
    Id,
    AdvisoryId,
    Title,
    Cve,
    Link,
    Reference,
    Composer,
    Description,
    Branches,
    Published,
    Modified,
}
