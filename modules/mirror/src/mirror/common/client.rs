use std::time::Duration;

const USER_AGENT: &str = concat!("knowledge-service/", env!("CARGO_PKG_VERSION"));

/// Build the process-wide HTTP client.
///
/// One pooled client is shared by reference across every mirror and every
/// worker. Retry and backoff policies do not live here; the schedules are
/// source-specific and belong to the adapters.
pub fn build() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(20)
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(USER_AGENT)
        .build()
}
