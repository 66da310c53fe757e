use sea_orm::{entity::prelude::*, FromJsonQueryResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A PHP security advisory from the FriendsOfPHP database, as served by
/// the Packagist security-advisories API.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "friends_of_php")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub advisory_id: String,
    pub title: String,
    pub cve: String,
    pub link: String,
    pub reference: String,
    /// The composer package name the advisory applies to.
    pub composer: String,
    pub description: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub branches: Branches,
    pub published: String,
    pub modified: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Branches(pub BTreeMap<String, Branch>);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default)]
    pub time: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
