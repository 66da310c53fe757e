pub mod chunk;

use anyhow::Context;
use knowledge_migration::{Migrator, MigratorTrait};
use sea_orm::{
    ConnectOptions, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, ExecResult,
    QueryResult, Statement,
};
use std::{
    ops::{Deref, DerefMut},
    time::Duration,
};
use tracing::instrument;

/// Name of the knowledge database (mirrored sources + cursors).
pub const KNOWLEDGE: &str = "knowledge";
/// Name of the platform's analysis-results database.
pub const RESULTS: &str = "results";
/// Name of the platform's plugin registry database.
pub const PLUGINS: &str = "plugins";
/// Name of the platform's shared configuration database.
pub const CONFIG: &str = "config";

/// The knowledge database is written in large transactional batches and
/// gets a more generous driver timeout than the ancillary databases.
pub const KNOWLEDGE_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(50);

#[derive(Clone, Debug)]
pub struct Database {
    db: DatabaseConnection,
    name: String,
}

impl Database {
    /// Connect to a single named database of the cluster.
    pub async fn connect(
        config: &crate::config::Database,
        name: &str,
        timeout: Duration,
    ) -> Result<Self, anyhow::Error> {
        let url = config.url(name);
        log::debug!("connect to {}:{}/{name}", config.host, config.port);

        let mut opt = ConnectOptions::new(url);
        opt.connect_timeout(timeout);
        opt.acquire_timeout(timeout);
        opt.sqlx_logging_level(log::LevelFilter::Trace);

        let db = sea_orm::Database::connect(opt).await?;

        Ok(Self {
            db,
            name: name.to_string(),
        })
    }

    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), anyhow::Error> {
        log::debug!("applying migrations");
        Migrator::up(&self.db, None).await?;
        log::debug!("applied migrations");

        Ok(())
    }

    pub async fn close(self) -> anyhow::Result<()> {
        Ok(self.db.close().await?)
    }

    /// Ping the database.
    ///
    /// Used as the daemon-mode connectivity check, which must not create
    /// or modify anything.
    pub async fn ping(&self) -> anyhow::Result<()> {
        self.db
            .ping()
            .await
            .with_context(|| format!("failed to ping the '{}' database", self.name))?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Deref for Database {
    type Target = DatabaseConnection;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

impl DerefMut for Database {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.db
    }
}

#[async_trait::async_trait]
impl ConnectionTrait for Database {
    fn get_database_backend(&self) -> DbBackend {
        self.db.get_database_backend()
    }

    async fn execute(&self, stmt: Statement) -> Result<ExecResult, DbErr> {
        self.db.execute(stmt).await
    }

    async fn execute_unprepared(&self, sql: &str) -> Result<ExecResult, DbErr> {
        self.db.execute_unprepared(sql).await
    }

    async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, DbErr> {
        self.db.query_one(stmt).await
    }

    async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, DbErr> {
        self.db.query_all(stmt).await
    }

    fn support_returning(&self) -> bool {
        self.db.support_returning()
    }
}

/// Create every database the platform expects, skipping the ones that
/// already exist, then bring the knowledge schema up to date.
///
/// Nothing is ever dropped here.
#[instrument(skip(config), err)]
pub async fn setup(config: &crate::config::Database) -> anyhow::Result<()> {
    let maintenance = sea_orm::Database::connect(config.url("postgres"))
        .await
        .context("failed to connect to the maintenance database")?;

    for name in [KNOWLEDGE, RESULTS, PLUGINS, CONFIG] {
        create_database_if_missing(&maintenance, name).await?;
        create_database_if_missing(&maintenance, &format!("{name}_test")).await?;
    }

    maintenance.close().await?;

    let knowledge = Database::connect(config, KNOWLEDGE, KNOWLEDGE_TIMEOUT).await?;
    knowledge.migrate().await?;
    knowledge.close().await?;

    Ok(())
}

async fn create_database_if_missing(
    maintenance: &DatabaseConnection,
    name: &str,
) -> anyhow::Result<()> {
    let backend = maintenance.get_database_backend();

    let exists = maintenance
        .query_one(Statement::from_sql_and_values(
            backend,
            "SELECT 1 FROM pg_database WHERE datname = $1",
            [name.into()],
        ))
        .await?
        .is_some();

    if exists {
        log::debug!("database '{name}' already exists");
        return Ok(());
    }

    log::info!("creating database '{name}'");
    maintenance
        .execute(Statement::from_string(
            backend,
            format!("CREATE DATABASE \"{name}\";"),
        ))
        .await
        .with_context(|| format!("failed to create database '{name}'"))?;

    Ok(())
}
