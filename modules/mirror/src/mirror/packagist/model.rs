//! Wire model for the Packagist `p2` metadata endpoint.
//!
//! The endpoint is lenient about shapes: requirement maps occasionally
//! arrive as strings, `license` as a string or an array, `funding` as an
//! object, an array, or a bare URL. Every irregular shape is normalised
//! here before anything touches the rest of the pipeline.

use crate::store::package::{PackageRecord, VersionInfo};
use knowledge_entity::{package, package_version};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct P2Response {
    #[serde(default)]
    pub packages: BTreeMap<String, Vec<P2Version>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct P2Version {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub version_normalized: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub source: SourceRef,
    #[serde(default)]
    pub dist: serde_json::Value,
    #[serde(default)]
    pub require: Requirements,
    #[serde(default, rename = "require-dev")]
    pub require_dev: Requirements,
    #[serde(default)]
    pub suggest: Requirements,
    #[serde(default)]
    pub provide: Requirements,
    #[serde(default)]
    pub replace: Requirements,
    #[serde(default)]
    pub conflict: Requirements,
    #[serde(default)]
    pub license: LicenseField,
    #[serde(default)]
    pub authors: serde_json::Value,
    #[serde(default)]
    pub autoload: serde_json::Value,
    #[serde(default)]
    pub support: serde_json::Value,
    #[serde(default)]
    pub funding: FundingField,
    #[serde(default)]
    pub extra: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct SourceRef {
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub reference: String,
}

/// A requirement map, or (irregularly) something else entirely, which
/// normalises to an empty map.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Requirements {
    Map(BTreeMap<String, String>),
    Irregular(serde_json::Value),
}

impl Default for Requirements {
    fn default() -> Self {
        Self::Map(BTreeMap::new())
    }
}

impl Requirements {
    pub fn into_map(self) -> BTreeMap<String, String> {
        match self {
            Self::Map(map) => map,
            Self::Irregular(_) => BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum LicenseField {
    One(String),
    Many(Vec<String>),
    Other(serde_json::Value),
}

impl Default for LicenseField {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl LicenseField {
    pub fn into_list(self) -> Vec<String> {
        match self {
            Self::One(license) => vec![license],
            Self::Many(licenses) => licenses,
            Self::Other(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize, serde::Serialize, Clone, PartialEq)]
pub struct FundingEntry {
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub url: String,
}

/// `funding` arrives as a single object, an array of objects, or a bare
/// URL string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FundingField {
    One(FundingEntry),
    Many(Vec<FundingEntry>),
    Url(String),
    Other(serde_json::Value),
}

impl Default for FundingField {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl FundingField {
    pub fn into_list(self) -> Vec<FundingEntry> {
        match self {
            Self::One(entry) => vec![entry],
            Self::Many(entries) => entries,
            Self::Url(url) => vec![FundingEntry {
                r#type: "custom".to_string(),
                url,
            }],
            Self::Other(_) => Vec::new(),
        }
    }
}

/// Normalise a `p2` response into a package record.
///
/// Package-level metadata is lifted from the latest stable version, with
/// "stable" meaning no `dev` marker and a parseable release time.
pub fn to_package(name: &str, response: P2Response) -> Option<PackageRecord> {
    let versions = response.packages.into_iter().find_map(|(key, versions)| {
        (key == name && !versions.is_empty()).then_some(versions)
    })?;

    let mut latest: Option<(OffsetDateTime, usize)> = None;
    for (index, info) in versions.iter().enumerate() {
        if info.version.contains("dev") {
            continue;
        }
        let Ok(stamp) = OffsetDateTime::parse(&info.time, &Rfc3339) else {
            continue;
        };
        if latest.is_none_or(|(best, _)| stamp > best) {
            latest = Some((stamp, index));
        }
    }

    let latest = &versions[latest.map(|(_, index)| index).unwrap_or_default()];

    let licenses = latest.license.clone();
    let license_list = licenses.into_list();

    let model = package::Model {
        id: Uuid::new_v4(),
        name: name.to_string(),
        language: "php".to_string(),
        description: latest.description.clone(),
        homepage: latest.homepage.clone(),
        latest_version: latest.version.clone(),
        time: Some(OffsetDateTime::now_utc()),
        keywords: latest.keywords.clone(),
        source: package::Source {
            r#type: latest.source.r#type.clone(),
            url: latest.source.url.clone(),
        },
        license: license_list.join(", "),
        licenses: package::LicenseRefs(
            license_list
                .iter()
                .map(|license| package::LicenseRef {
                    r#type: license.clone(),
                    url: String::new(),
                })
                .collect(),
        ),
        extra: json!({ "type": latest.r#type }),
    };

    let versions = versions
        .into_iter()
        .map(|info| VersionInfo {
            version: info.version.clone(),
            dependencies: package_version::DependencyMap(info.require.into_map()),
            dev_dependencies: package_version::DependencyMap(info.require_dev.into_map()),
            extra: json!({
                "type": info.r#type,
                "time": info.time,
                "source": {
                    "type": info.source.r#type,
                    "url": info.source.url,
                    "reference": info.source.reference,
                },
                "dist": info.dist,
                "license": info.license.into_list(),
                "authors": info.authors,
                "autoload": info.autoload,
                "support": info.support,
                "funding": info.funding.into_list(),
                "extra": info.extra,
                "suggest": info.suggest.into_map(),
                "provide": info.provide.into_map(),
                "replace": info.replace.into_map(),
                "conflict": info.conflict.into_map(),
            }),
        })
        .collect();

    Some(PackageRecord {
        package: model,
        versions,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn response(versions: serde_json::Value) -> P2Response {
        serde_json::from_value(json!({ "packages": { "acme/widget": versions } }))
            .expect("valid response")
    }

    #[test]
    fn lifts_metadata_from_latest_stable_version() {
        let record = to_package(
            "acme/widget",
            response(json!([
                {
                    "name": "acme/widget",
                    "version": "2.0.0",
                    "description": "widgets",
                    "time": "2024-05-01T10:00:00+00:00",
                    "license": ["MIT"],
                    "source": { "type": "git", "url": "https://git.invalid/widget.git", "reference": "abc" },
                    "require": { "php": ">=8.1" }
                },
                {
                    "name": "acme/widget",
                    "version": "2.1.0-dev",
                    "time": "2024-06-01T10:00:00+00:00"
                },
                {
                    "name": "acme/widget",
                    "version": "1.0.0",
                    "time": "2023-01-01T10:00:00+00:00"
                }
            ])),
        )
        .expect("record");

        assert_eq!(record.package.latest_version, "2.0.0");
        assert_eq!(record.package.language, "php");
        assert_eq!(record.package.license, "MIT");
        assert_eq!(record.package.source.r#type, "git");
        assert_eq!(record.versions.len(), 3);
    }

    #[test]
    fn irregular_requirements_become_empty_maps() {
        let record = to_package(
            "acme/widget",
            response(json!([
                {
                    "name": "acme/widget",
                    "version": "1.0.0",
                    "time": "2024-01-01T10:00:00+00:00",
                    "require": "php >=7.0",
                    "require-dev": { "phpunit/phpunit": "^10" }
                }
            ])),
        )
        .expect("record");

        assert!(record.versions[0].dependencies.0.is_empty());
        assert_eq!(
            record.versions[0].dev_dependencies.0.get("phpunit/phpunit"),
            Some(&"^10".to_string())
        );
    }

    #[test]
    fn license_and_funding_shapes_normalise() {
        assert_eq!(
            LicenseField::One("MIT".into()).into_list(),
            vec!["MIT".to_string()]
        );
        assert_eq!(
            LicenseField::Many(vec!["MIT".into(), "GPL-2.0".into()])
                .into_list()
                .len(),
            2
        );

        let funding: FundingField =
            serde_json::from_value(json!("https://sponsor.invalid")).expect("url form");
        assert_eq!(
            funding.into_list(),
            vec![FundingEntry {
                r#type: "custom".into(),
                url: "https://sponsor.invalid".into()
            }]
        );

        let funding: FundingField =
            serde_json::from_value(json!({ "type": "github", "url": "https://github.invalid" }))
                .expect("object form");
        assert_eq!(funding.into_list().len(), 1);

        let funding: FundingField = serde_json::from_value(json!([
            { "type": "github", "url": "https://github.invalid" },
            { "type": "opencollective", "url": "https://oc.invalid" }
        ]))
        .expect("array form");
        assert_eq!(funding.into_list().len(), 2);
    }
}
