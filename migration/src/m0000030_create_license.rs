use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(License::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(License::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(License::LicenseId).string().not_null())
                    .col(ColumnDef::new(License::Name).string().not_null())
                    .col(ColumnDef::new(License::Reference).string().not_null())
                    .col(ColumnDef::new(License::DetailsUrl).string().not_null())
                    .col(
                        ColumnDef::new(License::ReferenceNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(License::IsDeprecatedLicenseId)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(License::IsOsiApproved).boolean().not_null())
                    .col(
                        ColumnDef::new(License::SeeAlso)
                            .array(ColumnType::Text)
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(License::Table)
                    .name(Indexes::LicenseLicenseIdIdx.to_string())
                    .col(License::LicenseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(License::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Indexes {
    LicenseLicenseIdIdx,
}

#[derive(DeriveIden)]
enum License {
    Table,
    Id,
    LicenseId,
    Name,
    Reference,
    DetailsUrl,
    ReferenceNumber,
    IsDeprecatedLicenseId,
    IsOsiApproved,
    SeeAlso,
}
