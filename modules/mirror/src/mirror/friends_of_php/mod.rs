use super::common::{require_ok, Error};
use crate::{
    report::{Phase, Report, ReportBuilder},
    store,
};
use knowledge_entity::{friends_of_php, package_vulnerability};
use serde::Deserialize;
use std::collections::BTreeMap;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::instrument;
use uuid::Uuid;

const ADVISORIES_URL: &str = "https://packagist.org/api/security-advisories/";

const BATCH_SIZE: usize = 10;

/// Packages to query advisories for.
///
/// A starting set of widely used packages, not a complete enumeration;
/// packages observed in analysed projects are the real population.
const SEED_PACKAGES: &[&str] = &[
    "symfony/symfony",
    "symfony/http-foundation",
    "symfony/security-core",
    "laravel/framework",
    "laravel/sanctum",
    "doctrine/orm",
    "doctrine/dbal",
    "guzzlehttp/guzzle",
    "guzzlehttp/psr7",
    "monolog/monolog",
    "phpmailer/phpmailer",
    "wordpress/wordpress",
    "drupal/core",
    "slim/slim",
    "cakephp/cakephp",
    "yiisoft/yii2",
    "laminas/laminas-mvc",
    "codeigniter4/framework",
    "phpunit/phpunit",
    "composer/composer",
];

#[derive(Debug, Deserialize)]
struct AdvisoriesResponse {
    #[serde(default)]
    advisories: BTreeMap<String, Vec<Advisory>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Advisory {
    advisory_id: String,
    #[serde(default)]
    package_name: String,
    #[serde(default)]
    remote_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    cve: Option<String>,
    #[serde(default)]
    affected_versions: String,
    #[serde(default)]
    reported_at: String,
}

impl From<Advisory> for friends_of_php::Model {
    fn from(advisory: Advisory) -> Self {
        let mut branches = BTreeMap::new();
        if !advisory.affected_versions.is_empty() {
            branches.insert(
                "affected".to_string(),
                friends_of_php::Branch {
                    versions: vec![advisory.affected_versions],
                    time: advisory.reported_at.clone(),
                },
            );
        }

        Self {
            id: Uuid::new_v4(),
            advisory_id: advisory.advisory_id,
            title: advisory.title.clone(),
            cve: advisory.cve.unwrap_or_default(),
            link: advisory.link,
            reference: advisory.remote_id,
            composer: advisory.package_name,
            // the API carries no separate description
            description: advisory.title,
            branches: friends_of_php::Branches(branches),
            published: advisory.reported_at,
            modified: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
        }
    }
}

impl crate::Runner {
    /// Mirror FriendsOfPHP security advisories via the Packagist API.
    #[instrument(skip(self), err)]
    pub async fn run_friends_of_php(&self) -> Result<Report, Error> {
        log::info!("updating FriendsOfPHP security advisories");
        let mut report = ReportBuilder::new();

        for batch in SEED_PACKAGES.chunks(BATCH_SIZE) {
            if let Err(err) = self.fetch_advisory_batch(batch, &mut report).await {
                log::warn!("advisory batch failed: {err}");
                report.add_error(Phase::Retrieval, batch.join(","), err.to_string());
            }
        }

        Ok(report.build())
    }

    async fn fetch_advisory_batch(
        &self,
        packages: &[&str],
        report: &mut ReportBuilder,
    ) -> Result<(), Error> {
        let query: Vec<(&str, &str)> = packages
            .iter()
            .map(|package| ("packages[]", *package))
            .collect();

        let response = require_ok(self.client.get(ADVISORIES_URL).query(&query).send().await?)?;
        let response: AdvisoriesResponse = response.json().await?;

        let mut advisories: Vec<friends_of_php::Model> = Vec::new();
        for (package, entries) in response.advisories {
            if !entries.is_empty() {
                log::info!("  - {package}: {} advisories", entries.len());
            }
            for advisory in entries {
                let mut model: friends_of_php::Model = advisory.into();
                // the map key is authoritative for the composer name
                if model.composer.is_empty() {
                    model.composer = package.clone();
                }
                advisories.push(model);
            }
        }

        if advisories.is_empty() {
            return Ok(());
        }

        report.tick_many(advisories.len());
        store::friends_of_php::batch_upsert(&self.db, advisories.clone()).await?;

        let advisory_ids: Vec<String> = advisories
            .iter()
            .map(|advisory| advisory.advisory_id.clone())
            .collect();
        let ids = store::friends_of_php::lookup_ids(&self.db, &advisory_ids).await?;

        let links: Vec<package_vulnerability::Model> = advisories
            .iter()
            .filter_map(|advisory| {
                ids.get(&advisory.advisory_id).map(|&uuid| {
                    package_vulnerability::Model {
                        id: Uuid::new_v4(),
                        package_name: advisory.composer.clone(),
                        package_ecosystem: "packagist".to_string(),
                        gcve_id: None,
                        osv_id: None,
                        friends_of_php_id: Some(uuid),
                        nvd_id: None,
                    }
                })
            })
            .collect();

        store::package_vulnerability::insert_links(&self.db, links).await?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_advisories_to_rows() -> anyhow::Result<()> {
        let response: AdvisoriesResponse = serde_json::from_value(json!({
            "advisories": {
                "symfony/symfony": [
                    {
                        "advisoryId": "PKSA-1234",
                        "packageName": "symfony/symfony",
                        "remoteId": "symfony/symfony/CVE-2024-1.yaml",
                        "title": "CSRF token bypass",
                        "link": "https://symfony.invalid/cve-2024-1",
                        "cve": "CVE-2024-1",
                        "affectedVersions": ">=5.4.0,<5.4.42",
                        "reportedAt": "2024-05-01T00:00:00+00:00"
                    },
                    {
                        "advisoryId": "PKSA-5678",
                        "packageName": "symfony/symfony",
                        "title": "Session fixation",
                        "cve": null,
                        "affectedVersions": ""
                    }
                ]
            }
        }))?;

        let advisories: Vec<friends_of_php::Model> = response
            .advisories
            .into_values()
            .flatten()
            .map(Into::into)
            .collect();

        assert_eq!(advisories.len(), 2);

        let first = &advisories[0];
        assert_eq!(first.advisory_id, "PKSA-1234");
        assert_eq!(first.composer, "symfony/symfony");
        assert_eq!(first.cve, "CVE-2024-1");
        assert_eq!(first.branches.0["affected"].versions, vec![">=5.4.0,<5.4.42"]);

        let second = &advisories[1];
        assert_eq!(second.cve, "");
        assert!(second.branches.0.is_empty());
        Ok(())
    }
}
