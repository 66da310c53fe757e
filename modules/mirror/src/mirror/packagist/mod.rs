pub mod model;

use super::common::{pool, Error};
use super::npm::FRESHNESS;
use crate::{
    notify,
    report::{Phase, Report, ReportBuilder},
    store,
};
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::{sync::Arc, time::Duration as StdDuration};
use time::OffsetDateTime;
use tracing::instrument;

const PACKAGIST_P2_URL: &str = "https://repo.packagist.org/p2";

const RATE_LIMIT_RETRIES: usize = 3;
const FOLLOW_CONCURRENCY: usize = 50;
const IMPORT_BATCH_SIZE: usize = 50;
const IMPORT_CONCURRENCY: usize = 5;
const DOWNLOAD_CONCURRENCY: usize = 10;

/// Fetch a package's `p2` metadata document.
async fn download(client: &reqwest::Client, name: &str) -> Result<model::P2Response, Error> {
    let url = format!("{PACKAGIST_P2_URL}/{name}.json");

    for attempt in 0..=RATE_LIMIT_RETRIES {
        let response = client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Err(Error::NotFound(name.to_string())),
            StatusCode::TOO_MANY_REQUESTS => {
                if attempt == RATE_LIMIT_RETRIES {
                    break;
                }
                log::warn!(
                    "rate limited for {name}, retrying in 60s ({}/{RATE_LIMIT_RETRIES})",
                    attempt + 1
                );
                tokio::time::sleep(StdDuration::from_secs(60)).await;
            }
            status if status.is_success() => return Ok(response.json().await?),
            status => {
                return Err(Error::Status {
                    status,
                    url: url.clone(),
                })
            }
        }
    }

    Err(Error::RateLimit {
        attempts: RATE_LIMIT_RETRIES,
        url,
    })
}

impl crate::Runner {
    /// Refresh every PHP package already known to the knowledge base.
    #[instrument(skip(self), err)]
    pub async fn run_packagist_follow(&self) -> Result<Report, Error> {
        log::info!("following packagist packages");

        let names = store::package::names_by_language(&self.db, "php").await?;
        let cutoff = OffsetDateTime::now_utc() - FRESHNESS;
        let fresh = store::package::fresh_names(&self.db, "php", &names, cutoff).await?;

        let stale: Vec<String> = names
            .into_iter()
            .filter(|name| !fresh.contains(name))
            .collect();
        log::info!(
            "packagist follow: {} stale packages, {} skipped as fresh",
            stale.len(),
            fresh.len()
        );

        let report = Arc::new(Mutex::new(ReportBuilder::new()));

        pool::run_all("packagist-follow", FOLLOW_CONCURRENCY, stale, |name| {
            let runner = self.clone();
            let report = report.clone();

            async move {
                match runner.update_php_package(&name).await {
                    Ok(()) => report.lock().tick(),
                    Err(err) => {
                        log::warn!("packagist follow: {name}: {err}");
                        report.lock().add_error(Phase::Retrieval, name.as_str(), err.to_string());
                    }
                }
                Ok::<_, Error>(())
            }
        })
        .await;

        let report = match Arc::try_unwrap(report) {
            Ok(report) => report.into_inner(),
            Err(report) => report.lock().clone(),
        };

        Ok(report.build())
    }

    /// Import an explicit list of PHP packages through the batch path.
    #[instrument(skip_all, fields(packages = names.len()), err)]
    pub async fn run_packagist_import(&self, names: Vec<String>) -> Result<Report, Error> {
        log::info!("importing {} packagist packages", names.len());
        let report = Arc::new(Mutex::new(ReportBuilder::new()));

        let batches: Vec<Vec<String>> = names
            .chunks(IMPORT_BATCH_SIZE)
            .map(|chunk| chunk.to_vec())
            .collect();

        pool::run_all("packagist-import", IMPORT_CONCURRENCY, batches, |batch| {
            let runner = self.clone();
            let report = report.clone();

            async move {
                if let Err(err) = runner.import_php_batch(batch, &report).await {
                    log::warn!("packagist import batch failed: {err}");
                    report.lock().add_error(Phase::Storage, "batch", err.to_string());
                }
                Ok::<_, Error>(())
            }
        })
        .await;

        let report = match Arc::try_unwrap(report) {
            Ok(report) => report.into_inner(),
            Err(report) => report.lock().clone(),
        };

        Ok(report.build())
    }

    async fn update_php_package(&self, name: &str) -> Result<(), Error> {
        let response = download(&self.client, name).await?;
        let Some(record) = model::to_package(name, response) else {
            return Err(Error::NotFound(name.to_string()));
        };

        let new_versions = store::package::upsert(&self.db, record).await?;

        if let Some(results) = &self.results {
            notify::announce_new_versions(results, self.notifier.as_ref(), "php", &new_versions)
                .await;
        }

        Ok(())
    }

    async fn import_php_batch(
        &self,
        names: Vec<String>,
        report: &Arc<Mutex<ReportBuilder>>,
    ) -> Result<(), Error> {
        let cutoff = OffsetDateTime::now_utc() - FRESHNESS;
        let fresh = store::package::fresh_names(&self.db, "php", &names, cutoff).await?;

        let stale: Vec<String> = names
            .into_iter()
            .filter(|name| !fresh.contains(name))
            .collect();
        if stale.is_empty() {
            return Ok(());
        }

        let records = Arc::new(Mutex::new(Vec::with_capacity(stale.len())));

        pool::run_all("packagist-download", DOWNLOAD_CONCURRENCY, stale, |name| {
            let client = self.client.clone();
            let records = records.clone();
            let report = report.clone();

            async move {
                match download(&client, &name).await {
                    Ok(response) => {
                        if let Some(record) = model::to_package(&name, response) {
                            records.lock().push(record);
                        }
                    }
                    Err(err) => {
                        log::warn!("packagist import: {name}: {err}");
                        report.lock().add_error(Phase::Retrieval, name.as_str(), err.to_string());
                    }
                }
                Ok::<_, Error>(())
            }
        })
        .await;

        let records = std::mem::take(&mut *records.lock());
        if records.is_empty() {
            return Ok(());
        }

        report.lock().tick_many(records.len());
        let new_versions = store::package::batch_upsert(&self.db, "php", records).await?;

        if let Some(results) = &self.results {
            notify::announce_new_versions(results, self.notifier.as_ref(), "php", &new_versions)
                .await;
        }

        Ok(())
    }
}
