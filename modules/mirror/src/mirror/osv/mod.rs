use super::common::{require_ok, Error};
use crate::{
    report::{Phase, Report, ReportBuilder},
    store,
};
use knowledge_entity::osv;
use serde::Deserialize;
use std::io::{Cursor, Read};
use tracing::instrument;
use uuid::Uuid;
use zip::ZipArchive;

const OSV_BASE_URL: &str = "https://osv-vulnerabilities.storage.googleapis.com";

/// Ecosystems to mirror. OSV publishes one `all.zip` per ecosystem.
const ECOSYSTEMS: &[&str] = &["npm"];

const BATCH_SIZE: usize = 100;

/// The subset of an OSV advisory document we bind to; the nested
/// documents are carried through as-is.
#[derive(Debug, Deserialize)]
struct OsvDocument {
    id: String,
    #[serde(default)]
    schema_version: String,
    #[serde(default)]
    published: String,
    #[serde(default)]
    modified: String,
    #[serde(default)]
    withdrawn: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    details: String,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    related: Vec<String>,
    #[serde(default)]
    severity: serde_json::Value,
    #[serde(default)]
    affected: serde_json::Value,
    #[serde(default)]
    references: serde_json::Value,
    #[serde(default)]
    credits: serde_json::Value,
    #[serde(default)]
    database_specific: serde_json::Value,
}

fn normalize(document: OsvDocument) -> osv::Model {
    let cwes = extract_cwes(&document.database_specific);
    let cve = extract_cve(&document.aliases);

    osv::Model {
        id: Uuid::new_v4(),
        osv_id: document.id,
        schema_version: document.schema_version,
        published: document.published,
        modified: document.modified,
        withdrawn: document.withdrawn,
        summary: document.summary,
        details: document.details,
        aliases: document.aliases,
        related: document.related,
        severity: document.severity,
        affected: document.affected,
        references: document.references,
        credits: document.credits,
        database_specific: document.database_specific,
        cwes,
        cve,
    }
}

/// CWE ids from `database_specific.cwe_ids`; anything not starting with
/// `CWE` is discarded.
fn extract_cwes(database_specific: &serde_json::Value) -> Vec<String> {
    database_specific
        .get("cwe_ids")
        .and_then(|ids| ids.as_array())
        .map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_str())
                .filter(|id| id.starts_with("CWE"))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// The first alias that is a CVE identifier.
fn extract_cve(aliases: &[String]) -> String {
    aliases
        .iter()
        .find(|alias| alias.starts_with("CVE"))
        .cloned()
        .unwrap_or_default()
}

impl crate::Runner {
    /// Mirror OSV advisories for every configured ecosystem.
    ///
    /// One failing ecosystem is recorded in the report and does not stop
    /// the others.
    #[instrument(skip(self), err)]
    pub async fn run_osv(&self) -> Result<Report, Error> {
        log::info!("updating OSV advisories");
        let mut report = ReportBuilder::new();

        for ecosystem in ECOSYSTEMS {
            log::info!("processing ecosystem {ecosystem}");
            if let Err(err) = self.process_ecosystem(ecosystem, &mut report).await {
                log::warn!("ecosystem {ecosystem} failed: {err}");
                report.add_error(Phase::Retrieval, *ecosystem, err.to_string());
            }
        }

        Ok(report.build())
    }

    async fn process_ecosystem(
        &self,
        ecosystem: &str,
        report: &mut ReportBuilder,
    ) -> Result<(), Error> {
        let url = format!("{OSV_BASE_URL}/{ecosystem}/all.zip");
        let body = require_ok(self.client.get(url).send().await?)?
            .bytes()
            .await?;

        let mut archive = ZipArchive::new(Cursor::new(body))?;
        let mut batch: Vec<osv::Model> = Vec::with_capacity(BATCH_SIZE);

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let mut raw = Vec::with_capacity(entry.size() as usize);
            if let Err(err) = entry.read_to_end(&mut raw) {
                report.add_error(Phase::Retrieval, entry.name(), err.to_string());
                continue;
            }

            let document: OsvDocument = match serde_json::from_slice(&raw) {
                Ok(document) => document,
                Err(err) => {
                    report.add_error(Phase::Validation, entry.name(), err.to_string());
                    continue;
                }
            };

            batch.push(normalize(document));
            report.tick();

            if batch.len() >= BATCH_SIZE {
                if let Err(err) =
                    store::osv::batch_upsert(&self.db, std::mem::take(&mut batch)).await
                {
                    log::warn!("osv batch failed for {ecosystem}: {err}");
                    report.add_error(Phase::Storage, ecosystem, err.to_string());
                }
            }
        }

        if !batch.is_empty() {
            if let Err(err) = store::osv::batch_upsert(&self.db, batch).await {
                log::warn!("final osv batch failed for {ecosystem}: {err}");
                report.add_error(Phase::Storage, ecosystem, err.to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn derives_cve_and_cwes() -> anyhow::Result<()> {
        let document: OsvDocument = serde_json::from_value(serde_json::json!({
            "id": "GHSA-abcd-1234",
            "aliases": ["GHSA-x", "CVE-2024-1", "CVE-2024-2"],
            "database_specific": { "cwe_ids": ["CWE-79", "NOTCWE"] },
        }))?;

        let model = normalize(document);

        assert_eq!(model.osv_id, "GHSA-abcd-1234");
        assert_eq!(model.cve, "CVE-2024-1");
        assert_eq!(model.cwes, vec!["CWE-79".to_string()]);
        Ok(())
    }

    #[test]
    fn missing_database_specific_yields_empty_derivations() -> anyhow::Result<()> {
        let document: OsvDocument = serde_json::from_value(serde_json::json!({
            "id": "GHSA-no-extras",
        }))?;

        let model = normalize(document);

        assert!(model.cwes.is_empty());
        assert_eq!(model.cve, "");
        Ok(())
    }
}
