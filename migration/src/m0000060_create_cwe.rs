use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Cwe::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Cwe::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Cwe::CweId).string().not_null())
                    .col(ColumnDef::new(Cwe::Name).string().not_null().default(""))
                    .col(
                        ColumnDef::new(Cwe::Abstraction)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Cwe::Structure)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Cwe::Status).string().not_null().default(""))
                    .col(
                        ColumnDef::new(Cwe::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Cwe::ExtendedDescription)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Cwe::LikelihoodOfExploit)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Cwe::Categories).json_binary().not_null())
                    .col(
                        ColumnDef::new(Cwe::RelatedWeaknesses)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cwe::ApplicablePlatforms)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cwe::CommonConsequences)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cwe::ModesOfIntroduction)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cwe::DetectionMethods)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cwe::PotentialMitigations)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cwe::ObservedExamples)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cwe::AlternateTerms)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cwe::TaxonomyMappings)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cwe::AffectedResources)
                            .array(ColumnType::Text)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cwe::FunctionalAreas)
                            .array(ColumnType::Text)
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Cwe::Table)
                    .name(Indexes::CweCweIdIdx.to_string())
                    .col(Cwe::CweId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Cwe::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Indexes {
    CweCweIdIdx,
}

#[derive(DeriveIden)]
enum Cwe {
    Table,
    Id,
    CweId,
    Name,
    Abstraction,
    Structure,
    Status,
    Description,
    ExtendedDescription,
    LikelihoodOfExploit,
    Categories,
    RelatedWeaknesses,
    ApplicablePlatforms,
    CommonConsequences,
    ModesOfIntroduction,
    DetectionMethods,
    PotentialMitigations,
    ObservedExamples,
    AlternateTerms,
    TaxonomyMappings,
    AffectedResources,
    FunctionalAreas,
}
