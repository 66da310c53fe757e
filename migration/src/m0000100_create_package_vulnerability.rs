use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PackageVulnerability::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PackageVulnerability::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PackageVulnerability::PackageName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PackageVulnerability::PackageEcosystem)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PackageVulnerability::GcveId).uuid())
                    .col(ColumnDef::new(PackageVulnerability::OsvId).uuid())
                    .col(ColumnDef::new(PackageVulnerability::FriendsOfPhpId).uuid())
                    .col(ColumnDef::new(PackageVulnerability::NvdId).uuid())
                    .to_owned(),
            )
            .await?;

        // One partial unique index per vulnerability source: uniqueness is
        // over (package_name, package_ecosystem, <the populated fk>).
        // sea-query's index builder has no predicate support, so raw SQL.
        let conn = manager.get_connection();
        for (index, column) in [
            ("package_vulnerability_gcve_idx", "gcve_id"),
            ("package_vulnerability_osv_idx", "osv_id"),
            ("package_vulnerability_fop_idx", "friends_of_php_id"),
            ("package_vulnerability_nvd_idx", "nvd_id"),
        ] {
            conn.execute_unprepared(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {index} \
                 ON package_vulnerability (package_name, package_ecosystem, {column}) \
                 WHERE {column} IS NOT NULL"
            ))
            .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(PackageVulnerability::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum PackageVulnerability {
    Table,
    Id,
    PackageName,
    PackageEcosystem,
    GcveId,
    OsvId,
    FriendsOfPhpId,
    NvdId,
}
