//! Storage-agnostic access to communities and related data.
//!
//! The audit and update logic only talk to these traits. A [`Storage`] hands
//! out units of work; each unit of work is a [`Repository`] that can also
//! write and must be committed explicitly. Dropping it without committing
//! discards any writes.

use std::fmt;

use crate::{
    domain::{Community, CommunityId, Discussion, NodeId, PageVersion, User},
    storage::StorageError,
};

/// Selects communities.
///
/// Unset fields do not constrain the selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommunityFilter {
    /// Only communities with this official flag.
    pub official: Option<bool>,
    /// Only communities attached to this node.
    pub parent_node_id: Option<NodeId>,
}

impl CommunityFilter {
    /// Every community.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            official: None,
            parent_node_id: None,
        }
    }

    /// Official communities only.
    #[must_use]
    pub const fn official() -> Self {
        Self {
            official: Some(true),
            parent_node_id: None,
        }
    }

    /// Communities attached to the given node.
    #[must_use]
    pub const fn node(parent_node_id: NodeId) -> Self {
        Self {
            official: None,
            parent_node_id: Some(parent_node_id),
        }
    }
}

impl fmt::Display for CommunityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.official, self.parent_node_id) {
            (None, None) => write!(f, "any community"),
            (Some(official), None) => write!(f, "is_official_cluster = {official}"),
            (None, Some(node)) => write!(f, "parent_node_id = {node}"),
            (Some(official), Some(node)) => {
                write!(f, "is_official_cluster = {official} and parent_node_id = {node}")
            }
        }
    }
}

/// Selects discussions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscussionFilter {
    /// Only discussions owned by this community.
    pub owner_cluster_id: Option<CommunityId>,
}

impl DiscussionFilter {
    /// Every discussion.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            owner_cluster_id: None,
        }
    }
}

/// Read access to communities and their related entities.
pub trait Repository {
    /// Lists communities matching the filter, ordered by primary key.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    fn communities(&self, filter: &CommunityFilter) -> Result<Vec<Community>, StorageError>;

    /// Fetches the single community matching the filter.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if nothing matches and
    /// [`StorageError::Ambiguous`] if more than one community matches.
    fn unique_community(&self, filter: &CommunityFilter) -> Result<Community, StorageError> {
        let mut matches = self.communities(filter)?;
        match matches.len() {
            0 => Err(StorageError::NotFound {
                entity: "community",
                filter: filter.to_string(),
            }),
            1 => Ok(matches.remove(0)),
            count => Err(StorageError::Ambiguous {
                entity: "community",
                filter: filter.to_string(),
                count,
            }),
        }
    }

    /// Lists discussions matching the filter, ordered by primary key.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    fn discussions(&self, filter: &DiscussionFilter) -> Result<Vec<Discussion>, StorageError>;

    /// Lists the admins of a community.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    fn admins(&self, community: &Community) -> Result<Vec<User>, StorageError>;

    /// Lists the versions of a community's main page, oldest first.
    ///
    /// Returns `None` if the community has no main page at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    fn main_page_versions(
        &self,
        community: &Community,
    ) -> Result<Option<Vec<PageVersion>>, StorageError>;
}

/// A scoped transaction over the store.
///
/// Writes become visible only after [`UnitOfWork::commit`]. Dropping the
/// unit of work without committing rolls it back.
pub trait UnitOfWork: Repository {
    /// Overwrites the description of a community.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or does not hit exactly one
    /// community.
    fn set_description(&self, community: CommunityId, description: &str)
    -> Result<(), StorageError>;

    /// Commits all writes made in this unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails, in which case nothing is
    /// persisted.
    fn commit(self) -> Result<(), StorageError>
    where
        Self: Sized;
}

/// A store that hands out units of work.
pub trait Storage {
    /// The unit of work type.
    type Session<'a>: UnitOfWork
    where
        Self: 'a;

    /// Begins a new unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot start a transaction.
    fn begin(&mut self) -> Result<Self::Session<'_>, StorageError>;
}
