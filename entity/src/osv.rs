use sea_orm::entity::prelude::*;

/// One OSV advisory.
///
/// The nested documents (severity, affected, references, credits,
/// database_specific) are stored as they arrive; `cwes` and `cve` are
/// derived at ingestion time so the analysis side doesn't have to dig
/// through `database_specific` and `aliases`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "osv")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub osv_id: String,
    pub schema_version: String,
    pub published: String,
    pub modified: String,
    pub withdrawn: String,
    pub summary: String,
    pub details: String,
    pub aliases: Vec<String>,
    pub related: Vec<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub severity: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub affected: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub references: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub credits: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub database_specific: Json,
    /// CWE ids extracted from `database_specific.cwe_ids`.
    pub cwes: Vec<String>,
    /// The first alias starting with `CVE`, if any.
    pub cve: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
