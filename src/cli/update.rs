use std::process;

use clap::Parser;
use community_audit::{update_description, Config, NodeId, UpdateOutcome};
use dialoguer::Confirm;
use tracing::instrument;

use super::{open_store, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Replace the description of the community attached to a node")]
pub struct UpdateDescription {
    /// Parent node id of the community
    node_id: NodeId,

    /// The new description
    description: String,

    /// Write the description even if it is longer than the limit
    #[arg(long)]
    override_length_constraint: bool,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,
}

impl UpdateDescription {
    #[instrument(level = "debug", skip(self, config), fields(node = %self.node_id))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        if !self.yes {
            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "Replace the description of the community on node {}?",
                    self.node_id
                ))
                .default(false)
                .interact()?;
            if !confirmed {
                println!("{}", "Aborted, nothing was changed.".dim());
                return Ok(());
            }
        }

        let mut store = open_store(config)?;
        match update_description(
            &mut store,
            self.node_id,
            &self.description,
            self.override_length_constraint,
        )? {
            UpdateOutcome::Updated { name, description } => {
                println!(
                    "{}",
                    format!("The {name} community description has been updated to:").success()
                );
                println!("{description}");
            }
            UpdateOutcome::Rejected { length, limit } => {
                eprintln!(
                    "{}",
                    format!("The description length is {length}. The limit is {limit} characters.")
                        .warning()
                );
                eprintln!(
                    "{}",
                    "Pass --override-length-constraint to write it anyway.".dim()
                );
                process::exit(1);
            }
        }

        Ok(())
    }
}
