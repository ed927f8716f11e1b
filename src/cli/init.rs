use std::path::Path;

use community_audit::{storage::SCHEMA_VERSION, Config};
use tracing::instrument;

use super::{create_store, terminal::Colorize};

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// Overwrite an existing configuration file
    #[arg(long)]
    force: bool,
}

impl Command {
    #[instrument(skip(config))]
    pub fn run(self, config_path: &Path, config: &Config) -> anyhow::Result<()> {
        if config_path.exists() && !self.force {
            println!("  Kept:    {} (already exists)", config_path.display());
        } else {
            config
                .save(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", config_path.display()))?;
            println!("  Created: {}", config_path.display());
        }

        create_store(config)?;
        println!(
            "  Created: {} (schema v{SCHEMA_VERSION})",
            config.database().display()
        );

        println!();
        println!("{}", "Next steps:".info());
        println!("  community-audit audit");
        println!("  community-audit update-description <NODE_ID> \"New description\"");

        Ok(())
    }
}
