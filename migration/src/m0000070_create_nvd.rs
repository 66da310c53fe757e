use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Nvd::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Nvd::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Nvd::NvdId).string().not_null())
                    .col(
                        ColumnDef::new(Nvd::SourceIdentifier)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Nvd::Published).string().not_null().default(""))
                    .col(
                        ColumnDef::new(Nvd::LastModified)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Nvd::VulnStatus)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Nvd::Descriptions).json_binary().not_null())
                    .col(ColumnDef::new(Nvd::Metrics).json_binary().not_null())
                    .col(ColumnDef::new(Nvd::Weaknesses).json_binary().not_null())
                    .col(ColumnDef::new(Nvd::Affected).json_binary().not_null())
                    .col(
                        ColumnDef::new(Nvd::AffectedFlattened)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Nvd::References).json_binary().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Nvd::Table)
                    .name(Indexes::NvdNvdIdIdx.to_string())
                    .col(Nvd::NvdId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Nvd::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Indexes {
    NvdNvdIdIdx,
}

#[derive(DeriveIden)]
enum Nvd {
    Table,
    Id,
    NvdId,
    SourceIdentifier,
    Published,
    LastModified,
    VulnStatus,
    Descriptions,
    Metrics,
    Weaknesses,
    Affected,
    AffectedFlattened,
    References,
}
