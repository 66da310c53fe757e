use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Gcve::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Gcve::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Gcve::GcveId).string().not_null())
                    .col(ColumnDef::new(Gcve::CveId).string().not_null())
                    .col(
                        ColumnDef::new(Gcve::DataVersion)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Gcve::State).string().not_null().default(""))
                    .col(
                        ColumnDef::new(Gcve::DatePublished)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Gcve::DateUpdated)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Gcve::AssignerOrgId)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Gcve::Descriptions).json_binary().not_null())
                    .col(ColumnDef::new(Gcve::Affected).json_binary().not_null())
                    .col(
                        ColumnDef::new(Gcve::AffectedFlattened)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Gcve::Metrics).json_binary().not_null())
                    .col(ColumnDef::new(Gcve::ProblemTypes).json_binary().not_null())
                    .col(ColumnDef::new(Gcve::References).json_binary().not_null())
                    .col(
                        ColumnDef::new(Gcve::AdpEnrichments)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Gcve::Cwes)
                            .array(ColumnType::Text)
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Gcve::Table)
                    .name(Indexes::GcveGcveIdIdx.to_string())
                    .col(Gcve::GcveId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // containment queries on the flattened (vendor, product) pairs
        manager
            .create_index(
                Index::create()
                    .table(Gcve::Table)
                    .name(Indexes::GcveAffectedFlattenedIdx.to_string())
                    .index_type(IndexType::Custom(gin()))
                    .col(Gcve::AffectedFlattened)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Gcve::Table).if_exists().to_owned())
            .await
    }
}

fn gin() -> DynIden {
    Alias::new("GIN").into_iden()
}

#[derive(DeriveIden)]
enum Indexes {
    GcveGcveIdIdx,
    GcveAffectedFlattenedIdx,
}

#[derive(DeriveIden)]
enum Gcve {
    Table,
    Id,
    GcveId,
    CveId,
    DataVersion,
    State,
    DatePublished,
    DateUpdated,
    AssignerOrgId,
    Descriptions,
    Affected,
    AffectedFlattened,
    Metrics,
    ProblemTypes,
    References,
    AdpEnrichments,
    Cwes,
}
