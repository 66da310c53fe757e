use sea_orm::{entity::prelude::*, FromJsonQueryResult};
use serde::{Deserialize, Serialize};

/// One CVE Record v5 as distributed by CIRCL's vulnerability-lookup.
///
/// `affected_flattened` is the denormalised, lowercased `(vendor,
/// product)` set across the CNA container and every ADP enrichment; a GIN
/// index on it serves containment queries.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "gcve")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub gcve_id: String,
    pub cve_id: String,
    pub data_version: String,
    pub state: String,
    pub date_published: String,
    pub date_updated: String,
    pub assigner_org_id: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub descriptions: Descriptions,
    #[sea_orm(column_type = "JsonBinary")]
    pub affected: AffectedList,
    #[sea_orm(column_type = "JsonBinary")]
    pub affected_flattened: Products,
    #[sea_orm(column_type = "JsonBinary")]
    pub metrics: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub problem_types: ProblemTypes,
    #[sea_orm(column_type = "JsonBinary")]
    pub references: References,
    #[sea_orm(column_type = "JsonBinary")]
    pub adp_enrichments: AdpEnrichments,
    pub cwes: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Descriptions(pub Vec<Description>);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct AffectedList(pub Vec<Affected>);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Affected {
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub product: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_status: String,
    #[serde(default)]
    pub versions: Vec<VersionStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionStatus {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub less_than: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub less_than_or_equal: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version_type: String,
}

/// A `(vendor, product)` pair of the flattened containment index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub product: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Products(pub Vec<Product>);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ProblemTypes(pub Vec<ProblemType>);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemType {
    #[serde(default)]
    pub descriptions: Vec<ProblemTypeDescription>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemTypeDescription {
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cwe_id: String,
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub r#type: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct References(pub Vec<Reference>);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct AdpEnrichments(pub Vec<Adp>);

/// One Authorized Data Publisher container, e.g. the CISA enrichment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adp {
    #[serde(default)]
    pub provider_org_id: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default)]
    pub affected: Vec<Affected>,
    #[serde(default)]
    pub metrics: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
