use std::path::{Path, PathBuf};

mod audit;
mod dump;
mod init;
mod terminal;
mod update;

use anyhow::Context;
use audit::Audit;
use clap::ArgAction;
use community_audit::{Config, SqliteStore};
use dump::Dump;
use update::UpdateDescription;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the configuration file
    #[arg(short, long, default_value = "community-audit.toml", global = true)]
    config: PathBuf,

    /// Path to the database (overrides the configuration file)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Host prefix for community URLs (overrides the configuration file)
    #[arg(long, global = true)]
    host: Option<String>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let mut config = load_config(&self.config)?;
        if let Some(database) = self.database {
            config.set_database(database);
        }
        if let Some(host) = self.host {
            config.set_host(host);
        }

        self.command.run(self.config, &config)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Write a default configuration and create the database schema
    Init(init::Command),

    /// Report official communities that fail a completeness check
    Audit(Audit),

    /// Replace the description of a community
    UpdateDescription(UpdateDescription),

    /// Export a database table as JSON
    Dump(Dump),
}

impl Command {
    fn run(self, config_path: PathBuf, config: &Config) -> anyhow::Result<()> {
        match self {
            Self::Init(command) => command.run(&config_path, config)?,
            Self::Audit(command) => command.run(config)?,
            Self::UpdateDescription(command) => command.run(config)?,
            Self::Dump(command) => command.run(config)?,
        }
        Ok(())
    }
}

/// Loads the configuration file, falling back to defaults only if it is absent.
fn load_config(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        Config::load(path).map_err(anyhow::Error::msg)
    } else {
        tracing::debug!("No config file at {}, using defaults", path.display());
        Ok(Config::default())
    }
}

/// Opens the database named in the configuration, which must already exist.
fn open_store(config: &Config) -> anyhow::Result<SqliteStore> {
    SqliteStore::open_existing(config.database()).with_context(|| {
        format!(
            "failed to open database {} (run `community-audit init` to create it)",
            config.database().display()
        )
    })
}

/// Opens the database named in the configuration, creating it if needed.
fn create_store(config: &Config) -> anyhow::Result<SqliteStore> {
    SqliteStore::open(config.database())
        .with_context(|| format!("failed to create database {}", config.database().display()))
}
