pub mod client;
pub mod pool;

use reqwest::StatusCode;

/// Errors a mirror can run into.
///
/// Transport problems (`Http`, `Status`, `Io`) are retried inside the
/// adapters with source-specific backoff schedules; what surfaces here is
/// what survived the retries. Malformed payloads (`Json`, `Xml`, `Zip`,
/// `Csv`) are absorbed per item where the batch can continue. `Storage`
/// rolls back the batch it belongs to, `Cursor` leaves the cursor
/// untouched. None of these abort the update cycle; the coordinator logs
/// and moves on to the next mirror.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} fetching {url}")]
    Status { status: StatusCode, url: String },
    #[error("rate limited after {attempts} attempts: {url}")]
    RateLimit { attempts: usize, url: String },
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Xml(#[from] roxmltree::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Storage(#[from] crate::store::Error),
    #[error("failed to access the mirror cursor: {0}")]
    Cursor(#[source] sea_orm::DbErr),
}

/// Turn a non-success response into a [`Error::Status`].
pub(crate) fn require_ok(response: reqwest::Response) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(Error::Status {
            status: response.status(),
            url: response.url().to_string(),
        })
    }
}
