use clap::Parser;
use community_audit::{storage::Table, Config, UnitOfWork};
use tracing::instrument;

use super::open_store;

/// Parse a table name at the CLI boundary.
fn parse_table(s: &str) -> Result<Table, String> {
    s.to_lowercase().parse().map_err(|e| format!("{e}"))
}

#[derive(Debug, Parser)]
#[command(about = "Export a database table as JSON")]
pub struct Dump {
    /// The table to export (users, clusters, cluster_subscriptions, pages,
    /// page_versions, discussions)
    #[arg(value_parser = parse_table)]
    table: Table,

    /// Only print the column names
    #[arg(long)]
    columns: bool,
}

impl Dump {
    #[instrument(level = "debug", skip(config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let mut store = open_store(config)?;
        let session = store.session()?;

        if self.columns {
            for column in session.columns(self.table)? {
                println!("{column}");
            }
        } else {
            let rows = session.dump(self.table)?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }

        session.commit()?;
        Ok(())
    }
}
