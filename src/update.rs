//! Overwriting a community description, subject to a length limit.
//!
//! The limit here is an editing policy and is unrelated to the minimum
//! length used by the audit.

use tracing::{info, instrument, warn};

use crate::{
    domain::NodeId,
    storage::{CommunityFilter, Repository, Storage, StorageError, UnitOfWork},
};

/// Longest description accepted without overriding the limit, in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Result of an update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The description was written and committed.
    Updated {
        /// Name of the updated community.
        name: String,
        /// The description as persisted.
        description: String,
    },

    /// The description was too long; nothing was written.
    Rejected {
        /// Length of the proposed description, in characters.
        length: usize,
        /// The limit it exceeded.
        limit: usize,
    },
}

/// Replaces the description of the community attached to `node`.
///
/// Descriptions longer than [`MAX_DESCRIPTION_LENGTH`] characters are
/// rejected unless `override_length_constraint` is set. Otherwise the
/// community is looked up, its description overwritten and the change
/// committed in one unit of work. The returned name and description are
/// read back afterwards from a fresh unit of work.
///
/// # Errors
///
/// Returns an error if no community or more than one community is attached
/// to `node`, or if the write or commit fails. Nothing is persisted in that
/// case.
#[instrument(skip(store, description))]
pub fn update_description<S: Storage>(
    store: &mut S,
    node: NodeId,
    description: &str,
    override_length_constraint: bool,
) -> Result<UpdateOutcome, StorageError> {
    let length = description.chars().count();
    if length > MAX_DESCRIPTION_LENGTH && !override_length_constraint {
        warn!(length, limit = MAX_DESCRIPTION_LENGTH, "Description rejected");
        return Ok(UpdateOutcome::Rejected {
            length,
            limit: MAX_DESCRIPTION_LENGTH,
        });
    }

    let filter = CommunityFilter::node(node);

    let session = store.begin()?;
    let community = session.unique_community(&filter)?;
    session.set_description(community.id, description)?;
    session.commit()?;

    let session = store.begin()?;
    let community = session.unique_community(&filter)?;
    session.commit()?;

    info!(community = %community.name, "Description updated");
    Ok(UpdateOutcome::Updated {
        name: community.name,
        description: community.description.unwrap_or_default(),
    })
}
