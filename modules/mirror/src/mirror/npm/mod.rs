pub mod model;

use super::common::{pool, Error};
use crate::{
    notify,
    report::{Phase, Report, ReportBuilder},
    store,
};
use knowledge_common::config::Sources;
use parking_lot::Mutex;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::StatusCode;
use std::{sync::Arc, time::Duration as StdDuration};
use time::{Duration, OffsetDateTime};
use tracing::instrument;

/// A package fetched within this span is not fetched again.
pub(crate) const FRESHNESS: Duration = Duration::hours(4);

const RATE_LIMIT_RETRIES: usize = 3;
const FOLLOW_CONCURRENCY: usize = 50;
const IMPORT_BATCH_SIZE: usize = 50;
const IMPORT_CONCURRENCY: usize = 5;
const DOWNLOAD_CONCURRENCY: usize = 10;

/// Query-escaping, for replicas that expect scoped names URL-encoded.
const ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Fetch one registry document.
///
/// 404 means the package does not exist and is skipped by the caller;
/// 429 backs off linearly (30 s, 60 s, 90 s) for up to three retries.
async fn download(
    client: &reqwest::Client,
    sources: &Sources,
    name: &str,
) -> Result<model::NpmPackage, Error> {
    let escaped = if sources.npm_url.contains("registry.npmjs.org") {
        name.to_string()
    } else {
        utf8_percent_encode(name, ESCAPE).to_string()
    };
    let url = format!("{}{escaped}", sources.npm_url);

    for attempt in 0..=RATE_LIMIT_RETRIES {
        let mut request = client.get(&url);
        if let (Some(login), Some(password)) = (&sources.couch_login, &sources.couch_password) {
            request = request.basic_auth(login, Some(password));
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Err(Error::NotFound(name.to_string())),
            StatusCode::TOO_MANY_REQUESTS => {
                if attempt == RATE_LIMIT_RETRIES {
                    break;
                }
                let backoff = StdDuration::from_secs(30 * (attempt as u64 + 1));
                log::warn!(
                    "rate limited for {name}, retrying in {backoff:?} ({}/{RATE_LIMIT_RETRIES})",
                    attempt + 1
                );
                tokio::time::sleep(backoff).await;
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
    /// Refresh every npm package already known to the knowledge base.
    ///
    /// Packages fetched within the last four hours are skipped without a
    /// network round trip.
    #[instrument(skip(self), err)]
    pub async fn run_npm_follow(&self) -> Result<Report, Error> {
        log::info!("following npm packages");

        let names = store::package::names_by_language(&self.db, "javascript").await?;
        let cutoff = OffsetDateTime::now_utc() - FRESHNESS;
        let fresh = store::package::fresh_names(&self.db, "javascript", &names, cutoff).await?;

        let stale: Vec<String> = names
            .into_iter()
            .filter(|name| !fresh.contains(name))
            .collect();
        log::info!(
            "npm follow: {} stale packages, {} skipped as fresh",
            stale.len(),
            fresh.len()
        );

        let report = Arc::new(Mutex::new(ReportBuilder::new()));

        pool::run_all("npm-follow", FOLLOW_CONCURRENCY, stale, |name| {
            let runner = self.clone();
            let report = report.clone();

            async move {
                match runner.update_npm_package(&name).await {
                    Ok(()) => report.lock().tick(),
                    Err(err) => {
                        log::warn!("npm follow: {name}: {err}");
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

    /// Import an explicit list of npm packages through the batch path.
    #[instrument(skip_all, fields(packages = names.len()), err)]
    pub async fn run_npm_import(&self, names: Vec<String>) -> Result<Report, Error> {
        log::info!("importing {} npm packages", names.len());
        let report = Arc::new(Mutex::new(ReportBuilder::new()));

        let batches: Vec<Vec<String>> = names
            .chunks(IMPORT_BATCH_SIZE)
            .map(|chunk| chunk.to_vec())
            .collect();

        pool::run_all("npm-import", IMPORT_CONCURRENCY, batches, |batch| {
            let runner = self.clone();
            let report = report.clone();

            async move {
                if let Err(err) = runner.import_npm_batch(batch, &report).await {
                    log::warn!("npm import batch failed: {err}");
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

    async fn update_npm_package(&self, name: &str) -> Result<(), Error> {
        let document = download(&self.client, &self.sources, name).await?;
        let record = model::to_package(document);
        let new_versions = store::package::upsert(&self.db, record).await?;

        if let Some(results) = &self.results {
            notify::announce_new_versions(
                results,
                self.notifier.as_ref(),
                "javascript",
                &new_versions,
            )
            .await;
        }

        Ok(())
    }

    async fn import_npm_batch(
        &self,
        names: Vec<String>,
        report: &Arc<Mutex<ReportBuilder>>,
    ) -> Result<(), Error> {
        let cutoff = OffsetDateTime::now_utc() - FRESHNESS;
        let fresh = store::package::fresh_names(&self.db, "javascript", &names, cutoff).await?;

        let stale: Vec<String> = names
            .into_iter()
            .filter(|name| !fresh.contains(name))
            .collect();
        if stale.is_empty() {
            return Ok(());
        }

        let records = Arc::new(Mutex::new(Vec::with_capacity(stale.len())));

        pool::run_all("npm-download", DOWNLOAD_CONCURRENCY, stale, |name| {
            let client = self.client.clone();
            let sources = self.sources.clone();
            let records = records.clone();
            let report = report.clone();

            async move {
                match download(&client, &sources, &name).await {
                    Ok(document) => records.lock().push(model::to_package(document)),
                    Err(err) => {
                        log::warn!("npm import: {name}: {err}");
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
        let new_versions = store::package::batch_upsert(&self.db, "javascript", records).await?;

        if let Some(results) = &self.results {
            notify::announce_new_versions(
                results,
                self.notifier.as_ref(),
                "javascript",
                &new_versions,
            )
            .await;
        }

        Ok(())
    }
}
