/// Connection parameters for the platform's PostgreSQL cluster.
///
/// All four parameters are required; a missing value is a configuration
/// error surfaced by argument parsing, before any connection is made.
#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Database")]
#[group(id = "database")]
pub struct Database {
    #[arg(id = "db-host", long, env = "PG_DB_HOST")]
    pub host: String,
    #[arg(id = "db-port", long, env = "PG_DB_PORT")]
    pub port: u16,
    #[arg(id = "db-user", long, env = "PG_DB_USER")]
    pub username: String,
    #[arg(id = "db-password", long, env = "PG_DB_PASSWORD")]
    pub password: String,
}

impl Database {
    pub fn url(&self, name: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{name}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Settings for the upstream sources that take credentials or
/// non-default endpoints.
#[derive(clap::Args, Debug, Clone, Default)]
#[command(next_help_heading = "Sources")]
#[group(id = "sources")]
pub struct Sources {
    /// Base URL of the npm registry (or a CouchDB replica of it).
    #[arg(long, env = "NPM_URL", default_value = "http://localhost:5984/npm/")]
    pub npm_url: String,

    /// Basic-auth login for a private npm replica.
    #[arg(long, env = "COUCH_LOGIN")]
    pub couch_login: Option<String>,

    /// Basic-auth password for a private npm replica.
    #[arg(long, env = "COUCH_PASSWORD")]
    pub couch_password: Option<String>,

    /// NVD API key; raises the page fetch concurrency from 5 to 45.
    #[arg(long, env = "NVD_API_KEY")]
    pub nvd_api_key: Option<String>,

    /// API key for the vulnerability-lookup incremental endpoint.
    #[arg(long, env = "VULNERABILITY_LOOKUP_API_KEY")]
    pub vulnerability_lookup_api_key: Option<String>,
}

impl Sources {
    /// The NVD key, with unset placeholder values treated as absent.
    pub fn nvd_key(&self) -> Option<&str> {
        self.nvd_api_key
            .as_deref()
            .filter(|key| !key.is_empty() && *key != "!ChangeMe!")
    }

    pub fn vulnerability_lookup_key(&self) -> Option<&str> {
        self.vulnerability_lookup_api_key
            .as_deref()
            .filter(|key| !key.is_empty() && *key != "!ChangeMe!")
    }
}
