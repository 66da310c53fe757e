use sea_orm::entity::prelude::*;

/// Junction between a package, identified by `(name, ecosystem)`, and a
/// vulnerability record.
///
/// Exactly one of the vulnerability foreign keys is populated per row;
/// partial unique indexes enforce uniqueness of
/// `(package_name, package_ecosystem, <fk>)` for each populated key.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "package_vulnerability")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub package_name: String,
    pub package_ecosystem: String,
    pub gcve_id: Option<Uuid>,
    pub osv_id: Option<Uuid>,
    pub friends_of_php_id: Option<Uuid>,
    pub nvd_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::gcve::Entity",
        from = "Column::GcveId",
        to = "super::gcve::Column::Id"
    )]
    Gcve,
    #[sea_orm(
        belongs_to = "super::osv::Entity",
        from = "Column::OsvId",
        to = "super::osv::Column::Id"
    )]
    Osv,
    #[sea_orm(
        belongs_to = "super::friends_of_php::Entity",
        from = "Column::FriendsOfPhpId",
        to = "super::friends_of_php::Column::Id"
    )]
    FriendsOfPhp,
    #[sea_orm(
        belongs_to = "super::nvd::Entity",
        from = "Column::NvdId",
        to = "super::nvd::Column::Id"
    )]
    Nvd,
}

impl ActiveModelBehavior for ActiveModel {}
