use sea_orm::{entity::prelude::*, FromJsonQueryResult};
use serde::{Deserialize, Serialize};

/// One CWE weakness, flattened from the MITRE catalog XML.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cwe")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub cwe_id: String,
    pub name: String,
    pub abstraction: String,
    pub structure: String,
    pub status: String,
    pub description: String,
    pub extended_description: String,
    pub likelihood_of_exploit: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub categories: Categories,
    #[sea_orm(column_type = "JsonBinary")]
    pub related_weaknesses: RelatedWeaknesses,
    #[sea_orm(column_type = "JsonBinary")]
    pub applicable_platforms: ApplicablePlatforms,
    #[sea_orm(column_type = "JsonBinary")]
    pub common_consequences: CommonConsequences,
    #[sea_orm(column_type = "JsonBinary")]
    pub modes_of_introduction: ModesOfIntroduction,
    #[sea_orm(column_type = "JsonBinary")]
    pub detection_methods: DetectionMethods,
    #[sea_orm(column_type = "JsonBinary")]
    pub potential_mitigations: PotentialMitigations,
    #[sea_orm(column_type = "JsonBinary")]
    pub observed_examples: ObservedExamples,
    #[sea_orm(column_type = "JsonBinary")]
    pub alternate_terms: AlternateTerms,
    #[sea_orm(column_type = "JsonBinary")]
    pub taxonomy_mappings: TaxonomyMappings,
    pub affected_resources: Vec<String>,
    pub functional_areas: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Categories(pub Vec<Category>);

/// Category membership, resolved from the catalog's `Has_Member` edges.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct RelatedWeaknesses(pub Vec<RelatedWeakness>);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedWeakness {
    #[serde(default)]
    pub nature: String,
    #[serde(default)]
    pub cwe_id: String,
    #[serde(default)]
    pub view_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ordinal: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub chain_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ApplicablePlatforms {
    #[serde(default)]
    pub language: Vec<PlatformEntry>,
    #[serde(default)]
    pub operating_system: Vec<PlatformEntry>,
    #[serde(default)]
    pub technology: Vec<PlatformEntry>,
    #[serde(default)]
    pub architecture: Vec<PlatformEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformEntry {
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub prevalence: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct CommonConsequences(pub Vec<Consequence>);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consequence {
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub impact: Vec<String>,
    #[serde(default)]
    pub likelihood: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ModesOfIntroduction(pub Vec<Introduction>);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Introduction {
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct DetectionMethods(pub Vec<DetectionMethod>);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionMethod {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct PotentialMitigations(pub Vec<Mitigation>);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mitigation {
    #[serde(default)]
    pub phases: Vec<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ObservedExamples(pub Vec<ObservedExample>);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedExample {
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct AlternateTerms(pub Vec<AlternateTerm>);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternateTerm {
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct TaxonomyMappings(pub Vec<TaxonomyMapping>);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyMapping {
    #[serde(default)]
    pub taxonomy_name: String,
    #[serde(default)]
    pub entry_id: String,
    #[serde(default)]
    pub entry_name: String,
    #[serde(default)]
    pub mapping_fit: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
