pub mod model;

use super::common::{pool, Error};
use crate::{
    report::{Report, ReportBuilder},
    store,
};
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::{sync::Arc, time::Duration as StdDuration};
use time::{macros::format_description, Duration, OffsetDateTime};
use tokio::sync::mpsc;
use tracing::instrument;

const NVD_API_URL: &str = "https://services.nvd.nist.gov/rest/json/cves/2.0/";

const PAGE_SIZE: usize = 2000;
/// The API rejects `lastModStartDate`/`lastModEndDate` ranges wider than
/// 120 days, so a stale cursor is caught up window by window.
const WINDOW: Duration = Duration::days(120);
const MAX_RETRIES: usize = 5;

/// Date format the API expects for the modification window.
const DATE_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].000Z");

type Window = Option<(OffsetDateTime, OffsetDateTime)>;

/// Decide the fetch window for one pass.
///
/// No cursor means a full import without a date filter. A cursor further
/// back than the window limit gets a capped window and asks for a
/// restart; the caller loops until the cursor has caught up with `now`.
fn plan_window(cursor: Option<OffsetDateTime>, now: OffsetDateTime) -> (Window, bool) {
    match cursor {
        None => (None, false),
        Some(since) if now - since > WINDOW => (Some((since, since + WINDOW)), true),
        Some(since) => (Some((since, now)), false),
    }
}

impl crate::Runner {
    /// Mirror NVD CVE records modified since the cursor.
    #[instrument(skip(self), err)]
    pub async fn run_nvd(&self) -> Result<Report, Error> {
        log::info!("updating NVD");
        let report = Arc::new(Mutex::new(ReportBuilder::new()));

        loop {
            let restart = self.nvd_pass(&report).await?;
            if !restart {
                break;
            }
            log::info!("NVD window complete, continuing with the next one");
        }

        let report = match Arc::try_unwrap(report) {
            Ok(report) => report.into_inner(),
            Err(report) => report.lock().clone(),
        };

        Ok(report.build())
    }

    /// Fetch and store one window; returns whether another pass is due.
    async fn nvd_pass(&self, report: &Arc<Mutex<ReportBuilder>>) -> Result<bool, Error> {
        let cursor = store::cursor::read(&self.db, "nvd")
            .await
            .map_err(Error::Cursor)?;
        let now = OffsetDateTime::now_utc();

        let (window, restart) = plan_window(cursor, now);
        let window = window.map(|(since, until)| {
            (
                since.format(DATE_FORMAT).unwrap_or_default(),
                until.format(DATE_FORMAT).unwrap_or_default(),
            )
        });

        let total = self.nvd_total(&window).await?;
        let pages = total.div_ceil(PAGE_SIZE);
        log::info!("NVD: {total} records to fetch in {pages} pages");

        let api_key = self.sources.nvd_key().map(str::to_string);
        let (max_requests, refill) = match &api_key {
            Some(_) => (45, StdDuration::from_secs(30) / 45),
            None => (5, StdDuration::from_secs(60) / 5),
        };

        // one token per request, produced at the source rate limit
        let (token_tx, token_rx) = mpsc::channel::<()>(max_requests);
        let tokens = Arc::new(tokio::sync::Mutex::new(token_rx));
        tokio::spawn(async move {
            loop {
                if token_tx.send(()).await.is_err() {
                    break;
                }
                tokio::time::sleep(refill).await;
            }
        });

        pool::run_all("nvd", max_requests, (0..pages).collect(), |page| {
            let db = self.db.clone();
            let client = self.client.clone();
            let api_key = api_key.clone();
            let window = window.clone();
            let tokens = tokens.clone();
            let report = report.clone();

            async move {
                let response = fetch_page(&client, api_key, &window, page, &tokens).await?;
                let items = model::normalize(response);
                report.lock().tick_many(items.len());
                store::nvd::batch_upsert(&db, items).await?;
                Ok::<_, Error>(())
            }
        })
        .await;

        let cursor = match cursor {
            Some(since) => (since + WINDOW).min(now),
            None => now,
        };
        store::cursor::write(&self.db, "nvd", cursor)
            .await
            .map_err(Error::Cursor)?;

        Ok(restart)
    }

    /// Probe `totalResults` with a single-record request.
    async fn nvd_total(&self, window: &Option<(String, String)>) -> Result<usize, Error> {
        let mut request = self
            .client
            .get(NVD_API_URL)
            .query(&[("resultsPerPage", "1"), ("startIndex", "0")]);
        if let Some((since, until)) = window {
            request = request.query(&[("lastModStartDate", since), ("lastModEndDate", until)]);
        }
        if let Some(key) = self.sources.nvd_key() {
            request = request.header("apiKey", key);
        }

        let response = super::common::require_ok(request.send().await?)?;
        let stats: model::NvdResponse = response.json().await?;

        Ok(stats.total_results)
    }
}

/// Fetch one page, holding a rate-limit token per attempt, with
/// exponential backoff on 429 and network errors.
async fn fetch_page(
    client: &reqwest::Client,
    api_key: Option<String>,
    window: &Option<(String, String)>,
    page: usize,
    tokens: &tokio::sync::Mutex<mpsc::Receiver<()>>,
) -> Result<model::NvdResponse, Error> {
    let start_index = (page * PAGE_SIZE).to_string();
    let results_per_page = PAGE_SIZE.to_string();

    for attempt in 0..MAX_RETRIES {
        let mut request = client.get(NVD_API_URL).query(&[
            ("resultsPerPage", results_per_page.as_str()),
            ("startIndex", start_index.as_str()),
        ]);
        if let Some((since, until)) = window {
            request = request.query(&[("lastModStartDate", since), ("lastModEndDate", until)]);
        }
        if let Some(key) = &api_key {
            request = request.header("apiKey", key);
        }

        tokens.lock().await.recv().await;

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                log::warn!(
                    "NVD page {page}: request failed, retrying ({}/{MAX_RETRIES}): {err}",
                    attempt + 1
                );
                tokio::time::sleep(StdDuration::from_secs(1 << (attempt + 1))).await;
                continue;
            }
        };

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            log::warn!(
                "NVD page {page}: rate limited, retrying ({}/{MAX_RETRIES})",
                attempt + 1
            );
            tokio::time::sleep(StdDuration::from_secs(1 << (attempt + 1))).await;
            continue;
        }

        let response = super::common::require_ok(response)?;
        return Ok(response.json().await?);
    }

    Err(Error::RateLimit {
        attempts: MAX_RETRIES,
        url: format!("{NVD_API_URL}?startIndex={start_index}"),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn no_cursor_means_full_import() {
        let now = datetime!(2024-06-01 12:00 UTC);
        let (window, restart) = plan_window(None, now);
        assert!(window.is_none());
        assert!(!restart);
    }

    #[test]
    fn stale_cursor_gets_capped_window_and_restart() {
        let now = datetime!(2024-06-01 12:00 UTC);
        let cursor = now - Duration::days(200);

        let (window, restart) = plan_window(Some(cursor), now);

        let (since, until) = window.expect("window");
        assert_eq!(since, cursor);
        assert_eq!(until, cursor + Duration::days(120));
        assert!(restart);

        // the next pass starts from the advanced cursor and finishes
        let (window, restart) = plan_window(Some(until), now);
        let (since, until) = window.expect("window");
        assert_eq!(since, cursor + Duration::days(120));
        assert_eq!(until, now);
        assert!(!restart);
    }

    #[test]
    fn fresh_cursor_runs_to_now_without_restart() {
        let now = datetime!(2024-06-01 12:00 UTC);
        let cursor = now - Duration::days(3);

        let (window, restart) = plan_window(Some(cursor), now);

        assert_eq!(window, Some((cursor, now)));
        assert!(!restart);
    }

    #[test]
    fn window_dates_use_the_api_format() {
        let stamp = datetime!(2024-06-01 12:30:45 UTC);
        assert_eq!(
            stamp.format(DATE_FORMAT).expect("format"),
            "2024-06-01T12:30:45.000Z"
        );
    }
}
