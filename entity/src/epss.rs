use sea_orm::entity::prelude::*;

/// An EPSS exploit-prediction score for a single CVE.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "epss")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub cve: String,
    pub score: f32,
    pub percentile: f32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
