use std::{fmt, num::ParseIntError, str::FromStr};

use chrono::{DateTime, Utc};
use nonempty::NonEmpty;
use serde::Serialize;

/// Primary key of a community.
///
/// Discussions reference their owning community by this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CommunityId(i64);

impl CommunityId {
    /// Wraps a raw database key.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw database key.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Identifier of the node a community is attached to.
///
/// This is the key used in community URLs and for looking a community up by
/// its place in the node hierarchy. It is unrelated to [`CommunityId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(i64);

impl NodeId {
    /// Wraps a raw node key.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw node key.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for NodeId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// A community (cluster) on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Community {
    /// Primary key.
    pub id: CommunityId,
    /// Node the community belongs to.
    pub parent_node_id: NodeId,
    /// Human-readable name.
    pub name: String,
    /// Free-text description.
    ///
    /// A missing description is a data problem, not an empty one.
    pub description: Option<String>,
    /// URL slug stored alongside the name.
    pub slug: String,
    /// When the community was created.
    pub created: DateTime<Utc>,
    /// Whether this is an official community. Test and placeholder
    /// communities are not official.
    pub is_official_cluster: bool,
}

impl Community {
    /// The canonical URL of the community under the given host prefix.
    ///
    /// Built as `<host>/community/<parent_node_id>/<slug>`.
    #[must_use]
    pub fn url(&self, host: &str) -> String {
        let host = host.trim_end_matches('/');
        format!("{host}/community/{}/{}", self.parent_node_id, self.slug)
    }
}

/// A discussion thread owned by a community.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discussion {
    /// Primary key.
    pub id: i64,
    /// The owning community.
    pub owner_cluster_id: CommunityId,
    /// Thread title.
    pub title: String,
    /// When the thread was started.
    pub created: DateTime<Utc>,
}

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Primary key.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Self-declared gender, stored as free text.
    pub gender: String,
}

/// One saved revision of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageVersion {
    /// Primary key. Versions are ordered by it.
    pub id: i64,
    /// Page content at this revision.
    pub content: String,
    /// When the revision was saved.
    pub created: DateTime<Utc>,
}

/// The main page of a community with its full revision history.
///
/// A main page always has at least one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainPage {
    versions: NonEmpty<PageVersion>,
}

impl MainPage {
    /// Builds a main page from versions in save order.
    ///
    /// Returns `None` if there are no versions.
    #[must_use]
    pub fn from_versions(versions: Vec<PageVersion>) -> Option<Self> {
        NonEmpty::from_vec(versions).map(|versions| Self { versions })
    }

    /// The current revision.
    #[must_use]
    pub fn latest(&self) -> &PageVersion {
        self.versions.last()
    }
}
