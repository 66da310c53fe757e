use anyhow::Context;
use clap::{CommandFactory, Parser};
use knowledge_common::{config, db};
use knowledge_module_mirror::{mirror::common::client, server, Runner};
use std::process::{ExitCode, Termination};
use tracing_subscriber::EnvFilter;

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Action {
    /// Create the platform databases and migrate the knowledge schema
    Setup,
    /// Run one update cycle over all mirrors
    Update,
}

#[derive(clap::Parser, Debug)]
#[command(
    author,
    version = env!("CARGO_PKG_VERSION"),
    about = "knowd - knowledge-base ingestion service",
    long_about = None
)]
struct Knowd {
    /// Operate on the knowledge component (CLI mode)
    #[arg(long)]
    knowledge: bool,

    /// Action to perform in CLI mode
    #[arg(long, value_enum)]
    action: Option<Action>,

    /// Run as a daemon with the built-in scheduler
    #[arg(long)]
    daemon: bool,

    /// Daemon only: run updates every minute instead of every 6 hours
    #[arg(long)]
    debug: bool,

    #[command(flatten)]
    database: config::Database,

    #[command(flatten)]
    sources: config::Sources,
}

impl Knowd {
    async fn run(self) -> anyhow::Result<ExitCode> {
        if self.knowledge {
            match self.action {
                Some(Action::Setup) => {
                    log::info!("running knowledge setup");
                    db::setup(&self.database).await?;
                    log::info!("knowledge setup completed successfully");
                }
                Some(Action::Update) => {
                    log::info!("running knowledge update");
                    self.runner().await?.run_all().await;
                    log::info!("knowledge update completed");
                }
                None => {
                    Knowd::command().print_help()?;
                }
            }
            return Ok(ExitCode::SUCCESS);
        }

        if self.daemon {
            let runner = self.runner().await?;
            return server::daemon(runner, self.debug).await.map(|()| ExitCode::SUCCESS);
        }

        Knowd::command().print_help()?;
        Ok(ExitCode::SUCCESS)
    }

    /// Connect and verify; never creates databases. A missing knowledge
    /// database is fatal here; setup has to run first.
    async fn runner(&self) -> anyhow::Result<Runner> {
        let knowledge =
            db::Database::connect(&self.database, db::KNOWLEDGE, db::KNOWLEDGE_TIMEOUT)
                .await
                .context("cannot connect to the knowledge database; run setup first")?;
        knowledge
            .ping()
            .await
            .context("cannot reach the knowledge database; run setup first")?;

        let client = client::build()?;
        let mut runner = Runner::new(knowledge, client, self.sources.clone());

        // notifications need the results database; without it they are
        // disabled, which is not an error
        match db::Database::connect(&self.database, db::RESULTS, db::DEFAULT_TIMEOUT).await {
            Ok(results) => runner = runner.with_results(results),
            Err(err) => {
                log::warn!("results database unavailable, update notifications disabled: {err}")
            }
        }

        Ok(runner)
    }
}

#[tokio::main]
async fn main() -> impl Termination {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match Knowd::parse().run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            for (n, err) in err.chain().skip(1).enumerate() {
                if n == 0 {
                    eprintln!("Caused by:");
                }
                eprintln!("\t{err}");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        Knowd::command().debug_assert();
    }
}
