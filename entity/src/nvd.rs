use sea_orm::{entity::prelude::*, FromJsonQueryResult};
use serde::{Deserialize, Serialize};

/// One NVD CVE record, keyed by its CVE identifier.
///
/// Configurations are not stored as-is: they are flattened to
/// application-class CPE matches during normalisation, which is what the
/// analysis side actually queries.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "nvd")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub nvd_id: String,
    pub source_identifier: String,
    pub published: String,
    pub last_modified: String,
    pub vuln_status: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub descriptions: Descriptions,
    #[sea_orm(column_type = "JsonBinary")]
    pub metrics: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub weaknesses: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub affected: AffectedList,
    #[sea_orm(column_type = "JsonBinary")]
    pub affected_flattened: CpeMatches,
    #[sea_orm(column_type = "JsonBinary")]
    pub references: References,
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
pub struct References(pub Vec<Reference>);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct AffectedList(pub Vec<Affected>);

/// One affected constellation: the vulnerable artifacts, and what they
/// run on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affected {
    #[serde(default)]
    pub sources: Vec<CpeMatch>,
    #[serde(rename = "running-on", default)]
    pub running_on: Vec<CpeMatch>,
    #[serde(rename = "running-on-applications-only", default)]
    pub running_on_applications_only: Vec<CpeMatch>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct CpeMatches(pub Vec<CpeMatch>);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpeMatch {
    #[serde(default)]
    pub vulnerable: bool,
    #[serde(default)]
    pub criteria: String,
    #[serde(default)]
    pub match_criteria_id: String,
    #[serde(default)]
    pub version_start_including: String,
    #[serde(default)]
    pub version_start_excluding: String,
    #[serde(default)]
    pub version_end_including: String,
    #[serde(default)]
    pub version_end_excluding: String,
    #[serde(default)]
    pub criteria_dict: CriteriaDict,
}

/// A CPE 2.3 criteria string, split into its components.
///
/// `part` is `a` for applications, `o` for operating systems and `h` for
/// hardware; only `a` entries survive normalisation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaDict {
    #[serde(default)]
    pub part: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub update: String,
    #[serde(default)]
    pub edition: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub sw_edition: String,
    #[serde(default)]
    pub target_sw: String,
    #[serde(default)]
    pub target_hw: String,
    #[serde(default)]
    pub other: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
