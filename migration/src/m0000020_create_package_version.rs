use crate::m0000010_create_package::Package;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PackageVersion::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PackageVersion::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PackageVersion::PackageId).uuid().not_null())
                    .col(ColumnDef::new(PackageVersion::Version).string().not_null())
                    .col(
                        ColumnDef::new(PackageVersion::Dependencies)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PackageVersion::DevDependencies)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PackageVersion::Extra)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PackageVersion::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKeyCreateStatement::new()
                            .from_tbl(PackageVersion::Table)
                            .from_col(PackageVersion::PackageId)
                            .to_tbl(Package::Table)
                            .to_col(Package::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(PackageVersion::Table)
                    .name(Indexes::PackageVersionIdx.to_string())
                    .col(PackageVersion::PackageId)
                    .col(PackageVersion::Version)
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
                    .table(PackageVersion::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Indexes {
    PackageVersionIdx,
}

#[derive(DeriveIden)]
pub enum PackageVersion {
    Table,
    Id,
    PackageId,
    Version,
    Dependencies,
    DevDependencies,
    Extra,
    UpdatedAt,
}
