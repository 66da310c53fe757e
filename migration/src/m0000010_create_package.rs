use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Package::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Package::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Package::Name).string().not_null())
                    .col(ColumnDef::new(Package::Language).string().not_null())
                    .col(
                        ColumnDef::new(Package::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Package::Homepage)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Package::LatestVersion)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Package::Time).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Package::Keywords)
                            .array(ColumnType::Text)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Package::Source).json_binary().not_null())
                    .col(
                        ColumnDef::new(Package::License)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Package::Licenses).json_binary().not_null())
                    .col(ColumnDef::new(Package::Extra).json_binary().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Package::Table)
                    .name(Indexes::PackageNameLanguageIdx.to_string())
                    .col(Package::Name)
                    .col(Package::Language)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Package::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Indexes {
    PackageNameLanguageIdx,
}

#[derive(DeriveIden)]
pub enum Package {
    Table,
    Id,
    Name,
    Language,
    Description,
    Homepage,
    LatestVersion,
    Time,
    Keywords,
    Source,
    License,
    Licenses,
    Extra,
}
