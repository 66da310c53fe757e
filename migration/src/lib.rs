pub use sea_orm_migration::prelude::*;

mod m0000010_create_package;
mod m0000020_create_package_version;
mod m0000030_create_license;
mod m0000040_create_epss;
mod m0000050_create_osv;
mod m0000060_create_cwe;
mod m0000070_create_nvd;
mod m0000080_create_gcve;
mod m0000090_create_friends_of_php;
mod m0000100_create_package_vulnerability;
mod m0000110_create_mirror_state;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m0000010_create_package::Migration),
            Box::new(m0000020_create_package_version::Migration),
            Box::new(m0000030_create_license::Migration),
            Box::new(m0000040_create_epss::Migration),
            Box::new(m0000050_create_osv::Migration),
            Box::new(m0000060_create_cwe::Migration),
            Box::new(m0000070_create_nvd::Migration),
            Box::new(m0000080_create_gcve::Migration),
            Box::new(m0000090_create_friends_of_php::Migration),
            Box::new(m0000100_create_package_vulnerability::Migration),
            Box::new(m0000110_create_mirror_state::Migration),
        ]
    }
}
