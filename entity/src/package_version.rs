use sea_orm::{entity::prelude::*, FromJsonQueryResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A released version of a [`super::package`]. Pre-release versions are
/// filtered before they ever reach this table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "package_version")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub package_id: Uuid,
    pub version: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub dependencies: DependencyMap,
    #[sea_orm(column_type = "JsonBinary")]
    pub dev_dependencies: DependencyMap,
    #[sea_orm(column_type = "JsonBinary")]
    pub extra: Json,
    pub updated_at: TimeDateTimeWithTimeZone,
}

/// Dependency requirements, `name -> range`.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult,
)]
pub struct DependencyMap(pub BTreeMap<String, String>);

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::package::Entity",
        from = "Column::PackageId",
        to = "super::package::Column::Id",
        on_delete = "Cascade"
    )]
    Package,
}

impl Related<super::package::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Package.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
