use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Osv::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Osv::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Osv::OsvId).string().not_null())
                    .col(
                        ColumnDef::new(Osv::SchemaVersion)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Osv::Published).string().not_null().default(""))
                    .col(ColumnDef::new(Osv::Modified).string().not_null().default(""))
                    .col(ColumnDef::new(Osv::Withdrawn).string().not_null().default(""))
                    .col(ColumnDef::new(Osv::Summary).text().not_null().default(""))
                    .col(ColumnDef::new(Osv::Details).text().not_null().default(""))
                    .col(
                        ColumnDef::new(Osv::Aliases)
                            .array(ColumnType::Text)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Osv::Related)
                            .array(ColumnType::Text)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Osv::Severity).json_binary().not_null())
                    .col(ColumnDef::new(Osv::Affected).json_binary().not_null())
                    .col(ColumnDef::new(Osv::References).json_binary().not_null())
                    .col(ColumnDef::new(Osv::Credits).json_binary().not_null())
                    .col(
                        ColumnDef::new(Osv::DatabaseSpecific)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Osv::Cwes)
                            .array(ColumnType::Text)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Osv::Cve).string().not_null().default(""))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Osv::Table)
                    .name(Indexes::OsvOsvIdIdx.to_string())
                    .col(Osv::OsvId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Osv::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Indexes {
    OsvOsvIdIdx,
}

#[derive(DeriveIden)]
enum Osv {
    Table,
    Id,
    OsvId,
    SchemaVersion,
    Published,
    Modified,
    Withdrawn,
    Summary,
    Details,
    Aliases,
    Related,
    Severity,
    Affected,
    References,
    Credits,
    DatabaseSpecific,
    Cwes,
    Cve,
}
