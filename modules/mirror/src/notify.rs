//! Outbound "package update" events.
//!
//! When a follow run discovers new stable versions of a package, the
//! platform's results database is checked for SBOM results that use the
//! package as a direct dependency; each affected organization gets one
//! event per package on the `service_notifier` queue. Everything on this
//! path is best-effort: a failed lookup, marshal or publish is logged and
//! never affects the knowledge write that triggered it.

use crate::store::package::NewVersions;
use knowledge_common::{db::Database, version};
use sea_orm::{ConnectionTrait, Statement};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Queue the platform notifier service consumes.
pub const QUEUE: &str = "service_notifier";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    Production,
    Development,
}

/// The event published for an available package upgrade.
#[derive(Clone, Debug, Serialize)]
pub struct PackageUpdate {
    pub r#type: &'static str,
    pub analysis_id: String,
    pub organization_id: String,
    pub project_id: String,
    pub project_name: String,
    pub package_name: String,
    pub current_version: String,
    pub new_version: String,
    pub dependency_type: DependencyType,
    pub project_count: usize,
    pub release_notes_url: String,
}

/// Seam to the message bus.
///
/// The bus itself is an external collaborator of this service; the
/// default implementation just logs the event it would have published.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, queue: &str, payload: serde_json::Value) -> anyhow::Result<()>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, queue: &str, payload: serde_json::Value) -> anyhow::Result<()> {
        log::info!("{queue} <- {payload}");
        Ok(())
    }
}

struct SbomResult {
    result_id: Uuid,
    analysis_id: Uuid,
    project_id: Uuid,
    organization_id: Uuid,
    project_name: String,
}

/// Announce newly observed versions to the organizations whose SBOM
/// results use the package.
pub async fn announce_new_versions(
    results: &Database,
    notifier: &dyn Notifier,
    language: &str,
    new_versions: &[NewVersions],
) {
    for package in new_versions {
        if let Err(err) = announce_package(results, notifier, language, package).await {
            log::warn!(
                "failed to send update notification for {}: {err}",
                package.name
            );
        }
    }
}

async fn announce_package(
    results: &Database,
    notifier: &dyn Notifier,
    language: &str,
    package: &NewVersions,
) -> anyhow::Result<()> {
    let Some(latest_new) = version::latest(package.versions.iter().map(String::as_str)) else {
        return Ok(());
    };

    let rows = affected_results(results, language, &package.name).await?;
    if rows.is_empty() {
        return Ok(());
    }

    let mut org_projects: HashMap<Uuid, Vec<String>> = HashMap::new();
    for row in &rows {
        org_projects
            .entry(row.organization_id)
            .or_default()
            .push(row.project_name.clone());
    }

    let mut notified: HashSet<Uuid> = HashSet::new();

    for row in &rows {
        // one event per organization and package
        if notified.contains(&row.organization_id) {
            continue;
        }

        let document = result_document(results, row.result_id).await?;
        let Some((current, dependency_type)) = current_version(&document, &package.name) else {
            continue;
        };

        if !version::is_upgrade(&latest_new, &current) {
            continue;
        }

        let projects = &org_projects[&row.organization_id];
        let project_name = match projects.len() {
            0 | 1 => row.project_name.clone(),
            n => format!("{} and {} other projects", row.project_name, n - 1),
        };

        let event = PackageUpdate {
            r#type: "package_update",
            analysis_id: row.analysis_id.to_string(),
            organization_id: row.organization_id.to_string(),
            project_id: row.project_id.to_string(),
            project_name,
            package_name: package.name.clone(),
            current_version: current,
            new_version: latest_new.clone(),
            dependency_type,
            project_count: projects.len(),
            release_notes_url: release_notes_url(language, &package.name),
        };

        notifier.publish(QUEUE, serde_json::to_value(&event)?).await?;
        notified.insert(row.organization_id);
    }

    Ok(())
}

/// SBOM results that list the package as a direct dependency, found via
/// JSONB containment on the stored result document.
async fn affected_results(
    results: &Database,
    language: &str,
    package: &str,
) -> anyhow::Result<Vec<SbomResult>> {
    let plugin = match language {
        "javascript" => "js-sbom",
        "php" => "php-sbom",
        other => anyhow::bail!("no sbom plugin for language {other}"),
    };

    let needle = serde_json::json!({ ".": { "dependencies": { package: {} } } });

    let rows = results
        .query_all(Statement::from_sql_and_values(
            results.get_database_backend(),
            r#"SELECT DISTINCT r.id, r."analysisId", a."projectId", a."organizationId", p.name AS project_name
               FROM result r
               JOIN analysis a ON r."analysisId" = a.id
               JOIN project p ON a."projectId" = p.id
               WHERE r.plugin = $1 AND r.result::jsonb -> 'workspaces' @> $2::jsonb"#,
            [plugin.into(), needle.to_string().into()],
        ))
        .await?;

    let mut result = Vec::with_capacity(rows.len());
    for row in rows {
        result.push(SbomResult {
            result_id: row.try_get("", "id")?,
            analysis_id: row.try_get("", "analysisId")?,
            project_id: row.try_get("", "projectId")?,
            organization_id: row.try_get("", "organizationId")?,
            project_name: row.try_get("", "project_name")?,
        });
    }

    Ok(result)
}

async fn result_document(results: &Database, result_id: Uuid) -> anyhow::Result<serde_json::Value> {
    let row = results
        .query_one(Statement::from_sql_and_values(
            results.get_database_backend(),
            "SELECT result FROM result WHERE id = $1",
            [result_id.into()],
        ))
        .await?;

    match row {
        Some(row) => Ok(row.try_get("", "result")?),
        None => Ok(serde_json::Value::Null),
    }
}

fn release_notes_url(language: &str, package: &str) -> String {
    match language {
        "php" => format!("https://packagist.org/packages/{package}"),
        _ => format!("https://www.npmjs.com/package/{package}"),
    }
}

/// Extract the version of `package` currently used by an SBOM result,
/// with its dependency type, from the stored workspace document.
fn current_version(document: &serde_json::Value, package: &str) -> Option<(String, DependencyType)> {
    let workspaces = document.get("workspaces")?.as_object()?;

    for workspace in workspaces.values() {
        // the flat start lists name direct dependencies explicitly
        if let Some(start) = workspace.get("start") {
            for (field, dependency_type) in [
                ("dependencies", DependencyType::Production),
                ("dev_dependencies", DependencyType::Development),
            ] {
                let found = start
                    .get(field)
                    .and_then(|deps| deps.as_array())
                    .and_then(|deps| {
                        deps.iter().find(|dep| {
                            dep.get("name").and_then(|name| name.as_str()) == Some(package)
                        })
                    })
                    .and_then(|dep| dep.get("version"))
                    .and_then(|version| version.as_str());

                if let Some(version) = found {
                    return Some((version.to_string(), dependency_type));
                }
            }
        }

        // the detailed dependency map carries direct/prod/dev flags
        let versions = workspace
            .get("dependencies")
            .and_then(|deps| deps.get(package))
            .and_then(|versions| versions.as_object());

        if let Some(versions) = versions {
            for (version, info) in versions {
                let direct = info
                    .get("DirectCount")
                    .and_then(|count| count.as_f64())
                    .map(|count| count > 0.0)
                    .or_else(|| info.get("Direct").and_then(|direct| direct.as_bool()))
                    .unwrap_or(false);

                if !direct {
                    continue;
                }

                if info.get("Prod").and_then(|prod| prod.as_bool()) == Some(true) {
                    return Some((version.clone(), DependencyType::Production));
                }
                if info.get("Dev").and_then(|dev| dev.as_bool()) == Some(true) {
                    return Some((version.clone(), DependencyType::Development));
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_direct_dependency_in_start_lists() {
        let document = json!({
            "workspaces": {
                ".": {
                    "start": {
                        "dependencies": [
                            { "name": "left-pad", "version": "1.3.0" }
                        ],
                        "dev_dependencies": [
                            { "name": "jest", "version": "29.0.0" }
                        ]
                    }
                }
            }
        });

        assert_eq!(
            current_version(&document, "left-pad"),
            Some(("1.3.0".to_string(), DependencyType::Production))
        );
        assert_eq!(
            current_version(&document, "jest"),
            Some(("29.0.0".to_string(), DependencyType::Development))
        );
        assert_eq!(current_version(&document, "unknown"), None);
    }

    #[test]
    fn detailed_map_requires_direct_flag() {
        let document = json!({
            "workspaces": {
                ".": {
                    "dependencies": {
                        "express": {
                            "4.18.0": { "Direct": false, "Prod": true },
                            "4.19.0": { "DirectCount": 2, "Prod": true }
                        }
                    }
                }
            }
        });

        assert_eq!(
            current_version(&document, "express"),
            Some(("4.19.0".to_string(), DependencyType::Production))
        );
    }

    #[test]
    fn event_carries_the_notifier_contract_fields() {
        let event = PackageUpdate {
            r#type: "package_update",
            analysis_id: "a".into(),
            organization_id: "o".into(),
            project_id: "p".into(),
            project_name: "demo".into(),
            package_name: "left-pad".into(),
            current_version: "1.2.0".into(),
            new_version: "1.3.0".into(),
            dependency_type: DependencyType::Production,
            project_count: 1,
            release_notes_url: "https://www.npmjs.com/package/left-pad".into(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "package_update");
        assert_eq!(value["dependency_type"], "production");
        assert_eq!(value["project_count"], 1);
    }
}
