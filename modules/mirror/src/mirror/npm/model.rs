//! Wire model for npm registry documents (CouchDB style: one document
//! per package, all versions embedded).
//!
//! Several fields arrive in more than one shape depending on the age of
//! the package; each of those is an untagged union normalised right
//! here, at the adapter edge.

use crate::store::package::{PackageRecord, VersionInfo};
use knowledge_common::version;
use knowledge_entity::{package, package_version};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct NpmPackage {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub versions: BTreeMap<String, NpmVersion>,
    #[serde(default)]
    pub time: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub repository: Option<Repository>,
    #[serde(default)]
    pub keywords: Option<Keywords>,
    #[serde(default, rename = "dist-tags")]
    pub dist_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub maintainers: serde_json::Value,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub license: Option<License>,
    #[serde(default)]
    pub licenses: Vec<LegacyLicense>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpmVersion {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub engines: serde_json::Value,
    #[serde(default)]
    pub dist: serde_json::Value,
    #[serde(default)]
    pub peer_dependencies: serde_json::Value,
    #[serde(default)]
    pub peer_dependencies_meta: serde_json::Value,
    #[serde(default)]
    pub bundle_dependencies: serde_json::Value,
    #[serde(default)]
    pub bundled_dependencies: serde_json::Value,
    #[serde(default)]
    pub optional_dependencies: serde_json::Value,
    #[serde(default)]
    pub deprecated: serde_json::Value,
}

/// `repository` is either a bare URL string or a `{type, url}` object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Repository {
    Url(String),
    Info {
        #[serde(default)]
        r#type: String,
        #[serde(default)]
        url: String,
    },
    Other(serde_json::Value),
}

/// `author` is either a plain name or a `{name, email}` object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Author {
    Name(String),
    Info {
        #[serde(default)]
        name: String,
        #[serde(default)]
        email: String,
    },
    Other(serde_json::Value),
}

/// `license` is either an SPDX expression or the legacy `{type, url}`
/// object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum License {
    Expression(String),
    Legacy(LegacyLicense),
    Other(serde_json::Value),
}

#[derive(Debug, Default, Deserialize)]
pub struct LegacyLicense {
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Keywords {
    One(String),
    Many(Vec<String>),
    Other(serde_json::Value),
}

/// Split an SPDX license expression into its identifiers.
///
/// `A OR B` yields `[A, B]`, with parentheses stripped. `AND`
/// expressions are split the same way; the compound meaning is not
/// preserved.
pub fn split_spdx(expression: &str) -> Vec<String> {
    if !expression.contains(" OR ") && !expression.contains(" AND ") {
        return vec![expression.to_string()];
    }

    let stripped = expression.replace(['(', ')'], "");
    let separator = if stripped.contains(" OR ") { " OR " } else { " AND " };

    stripped
        .split(separator)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}

/// Normalise a registry document into a package record.
pub fn to_package(npm: NpmPackage) -> PackageRecord {
    let latest_version =
        version::latest(npm.versions.values().map(|v| v.version.as_str())).unwrap_or_default();

    let source = match &npm.repository {
        Some(Repository::Url(url)) => package::Source {
            r#type: "string".to_string(),
            url: url.clone(),
        },
        Some(Repository::Info { r#type, url }) => package::Source {
            r#type: r#type.clone(),
            url: url.clone(),
        },
        _ => package::Source::default(),
    };

    let author = match &npm.author {
        Some(Author::Name(name)) => name.clone(),
        Some(Author::Info { name, .. }) => name.clone(),
        _ => String::new(),
    };

    let keywords = match npm.keywords {
        Some(Keywords::One(keyword)) => vec![keyword],
        Some(Keywords::Many(keywords)) => keywords,
        _ => Vec::new(),
    };

    let (license, license_refs) = match &npm.license {
        Some(License::Expression(expression)) => (
            expression.clone(),
            split_spdx(expression)
                .into_iter()
                .map(|id| package::LicenseRef {
                    r#type: id,
                    url: String::new(),
                })
                .collect(),
        ),
        Some(License::Legacy(legacy)) => (
            legacy.r#type.clone(),
            vec![package::LicenseRef {
                r#type: legacy.r#type.clone(),
                url: legacy.url.clone(),
            }],
        ),
        _ => (
            String::new(),
            npm.licenses
                .iter()
                .map(|legacy| package::LicenseRef {
                    r#type: legacy.r#type.clone(),
                    url: legacy.url.clone(),
                })
                .collect(),
        ),
    };

    let versions = npm
        .versions
        .into_values()
        .map(|info| VersionInfo {
            version: info.version.clone(),
            dependencies: package_version::DependencyMap(info.dependencies),
            dev_dependencies: package_version::DependencyMap(info.dev_dependencies),
            extra: json!({
                "Author": author,
                "Engines": info.engines,
                "Dist": info.dist,
                "PeerDependencies": info.peer_dependencies,
                "PeerDependenciesMeta": info.peer_dependencies_meta,
                "BundleDependencies": info.bundle_dependencies,
                "BundledDependencies": info.bundled_dependencies,
                "OptionalDependencies": info.optional_dependencies,
                "Deprecated": info.deprecated,
            }),
        })
        .collect();

    let model = package::Model {
        id: Uuid::new_v4(),
        name: npm.name,
        language: "javascript".to_string(),
        description: npm.description,
        homepage: npm.homepage,
        latest_version,
        time: Some(OffsetDateTime::now_utc()),
        keywords,
        source,
        license,
        licenses: package::LicenseRefs(license_refs),
        extra: json!({
            "Author": author,
            "Dist_tags": npm.dist_tags,
            "Maintainers": npm.maintainers,
        }),
    };

    PackageRecord {
        package: model,
        versions,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn spdx_expressions_split_into_edges() {
        assert_eq!(split_spdx("MIT"), vec!["MIT"]);
        assert_eq!(split_spdx("(MIT OR Apache-2.0)"), vec!["MIT", "Apache-2.0"]);
        assert_eq!(
            split_spdx("GPL-2.0 AND LGPL-2.1"),
            vec!["GPL-2.0", "LGPL-2.1"]
        );
    }

    #[test]
    fn normalises_a_fresh_document() -> anyhow::Result<()> {
        let npm: NpmPackage = serde_json::from_value(json!({
            "name": "foo",
            "description": "demo package",
            "homepage": "https://foo.invalid",
            "dist-tags": { "latest": "1.0.0" },
            "repository": { "type": "git", "url": "git://github.invalid/foo.git" },
            "author": { "name": "Jo Doe", "email": "jo@foo.invalid" },
            "license": "MIT OR Apache-2.0",
            "keywords": ["cli", "demo"],
            "versions": {
                "1.0.0": {
                    "version": "1.0.0",
                    "dependencies": { "bar": "^2.0.0" },
                    "devDependencies": { "jest": "^29.0.0" }
                },
                "1.0.0-beta": { "version": "1.0.0-beta" },
                "0.9.0": { "version": "0.9.0" }
            },
            "time": {
                "created": "2020-01-01T00:00:00Z",
                "1.0.0": "2021-01-01T00:00:00Z"
            }
        }))?;

        let record = to_package(npm);

        assert_eq!(record.package.name, "foo");
        assert_eq!(record.package.language, "javascript");
        assert_eq!(record.package.latest_version, "1.0.0");
        assert_eq!(record.package.source.r#type, "git");
        assert_eq!(record.package.license, "MIT OR Apache-2.0");
        assert_eq!(
            record
                .package
                .licenses
                .0
                .iter()
                .map(|l| l.r#type.as_str())
                .collect::<Vec<_>>(),
            vec!["MIT", "Apache-2.0"]
        );
        assert_eq!(record.package.extra["Author"], "Jo Doe");
        // all versions are handed over; filtering happens at the store
        assert_eq!(record.versions.len(), 3);
        Ok(())
    }

    #[test]
    fn tolerates_legacy_field_shapes() -> anyhow::Result<()> {
        let npm: NpmPackage = serde_json::from_value(json!({
            "name": "old-school",
            "repository": "git://github.invalid/old.git",
            "author": "Solo Maintainer",
            "license": { "type": "BSD-3-Clause", "url": "https://old.invalid/LICENSE" },
            "keywords": "single-keyword",
            "versions": { "1.0.0": { "version": "1.0.0" } }
        }))?;

        let record = to_package(npm);

        assert_eq!(record.package.source.r#type, "string");
        assert_eq!(record.package.source.url, "git://github.invalid/old.git");
        assert_eq!(record.package.license, "BSD-3-Clause");
        assert_eq!(record.package.licenses.0[0].url, "https://old.invalid/LICENSE");
        assert_eq!(record.package.keywords, vec!["single-keyword".to_string()]);
        assert_eq!(record.package.extra["Author"], "Solo Maintainer");
        Ok(())
    }
}
