use sea_orm::{entity::prelude::*, FromJsonQueryResult};
use serde::{Deserialize, Serialize};

/// A package observed in one of the mirrored registries.
///
/// `(name, language)` is the natural key; the surrogate id is what the
/// version and junction tables reference.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "package")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub language: String,
    pub description: String,
    pub homepage: String,
    pub latest_version: String,
    pub time: Option<TimeDateTimeWithTimeZone>,
    pub keywords: Vec<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub source: Source,
    pub license: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub licenses: LicenseRefs,
    #[sea_orm(column_type = "JsonBinary")]
    pub extra: Json,
}

/// Where the package sources live, as declared by the registry.
///
/// `r#type` is `"string"` when the upstream `repository` field was a bare
/// URL string rather than a `{type, url}` object.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult,
)]
pub struct Source {
    #[serde(rename = "Type", default)]
    pub r#type: String,
    #[serde(rename = "Url", default)]
    pub url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct LicenseRefs(pub Vec<LicenseRef>);

/// A single license edge; SPDX expressions are split into several of
/// these during normalisation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRef {
    #[serde(rename = "type", default)]
    pub r#type: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::package_version::Entity")]
    Versions,
}

impl Related<super::package_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Versions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
