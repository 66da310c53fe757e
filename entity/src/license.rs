use sea_orm::entity::prelude::*;

/// SPDX license metadata, keyed by the SPDX `licenseId`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "license")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub license_id: String,
    pub name: String,
    pub reference: String,
    pub details_url: String,
    pub reference_number: i32,
    pub is_deprecated_license_id: bool,
    pub is_osi_approved: bool,
    pub see_also: Vec<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
