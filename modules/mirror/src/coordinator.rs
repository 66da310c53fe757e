use crate::{mirror::common::Error, notify::Notifier, report::Report};
use knowledge_common::{config::Sources, db::Database};
use std::sync::Arc;
use tracing::instrument;

/// Shared state of one update cycle: the knowledge database, the pooled
/// HTTP client, source credentials, and the (optional) notification
/// plumbing. Cloning is cheap; every clone shares the same pools.
#[derive(Clone)]
pub struct Runner {
    pub db: Database,
    pub client: reqwest::Client,
    pub sources: Sources,
    /// The platform's results database, for update notifications. Absent
    /// when the daemon runs without it; notifications are then disabled.
    pub results: Option<Database>,
    pub notifier: Arc<dyn Notifier>,
}

impl Runner {
    pub fn new(db: Database, client: reqwest::Client, sources: Sources) -> Self {
        Self {
            db,
            client,
            sources,
            results: None,
            notifier: Arc::new(crate::notify::LogNotifier),
        }
    }

    pub fn with_results(mut self, results: Database) -> Self {
        self.results = Some(results);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Run every mirror once, in dependency order: licenses and scores
    /// first, vulnerability sources next, the registry follows last.
    ///
    /// A failing mirror is logged and the cycle continues; the next
    /// scheduled tick is its retry.
    #[instrument(skip(self))]
    pub async fn run_all(&self) {
        log_outcome("licenses", self.run_licenses().await);
        log_outcome("epss", self.run_epss().await);
        log_outcome("osv", self.run_osv().await);
        log_outcome("cwe", self.run_cwe().await);
        log_outcome("nvd", self.run_nvd().await);
        log_outcome("gcve", self.run_gcve().await);
        log_outcome("friends-of-php", self.run_friends_of_php().await);
        log_outcome("npm-follow", self.run_npm_follow().await);
        log_outcome("packagist-follow", self.run_packagist_follow().await);
    }
}

fn log_outcome(mirror: &str, outcome: Result<Report, Error>) {
    match outcome {
        Ok(report) => {
            let errors = report.errors();
            if errors > 0 {
                log::warn!(
                    "mirror {mirror}: {} items, {errors} errors",
                    report.number_of_items
                );
            } else {
                log::info!("mirror {mirror}: {} items", report.number_of_items);
            }
        }
        Err(err) => log::error!("mirror {mirror} failed: {err}"),
    }
}
