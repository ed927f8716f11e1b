//! A SQLite backed store of community data
//!
//! [`SqliteStore`] owns the connection. All reads and writes go through a
//! [`Session`], which wraps a single transaction.

use std::{fmt, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::{
    params, params_from_iter, Connection, OpenFlags, OptionalExtension, Row, Transaction,
};
use tracing::{debug, info, instrument};

use crate::{
    domain::{Community, CommunityId, Discussion, NodeId, PageVersion, User},
    storage::{
        repository::{CommunityFilter, DiscussionFilter, Repository, Storage, UnitOfWork},
        schema, StorageError,
    },
};

const COMMUNITY_COLUMNS: &str =
    "id, parent_node_id, name, description, slug, created, is_official_cluster";

/// Page type marking a community's main page.
const MAIN_PAGE: &str = "main_page";

/// A SQLite database holding communities, discussions, users and pages.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database at the given path and makes sure the
    /// schema is present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema cannot be
    /// created.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening SQLite database at {}", path.display());
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Opens the database at the given path, which must already exist.
    ///
    /// Unlike [`SqliteStore::open`], a missing file is an error rather than a
    /// new empty database.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, cannot be opened, or has
    /// an unsupported schema.
    pub fn open_existing(path: &Path) -> Result<Self, StorageError> {
        info!("Opening existing SQLite database at {}", path.display());
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::init(conn)
    }

    /// Opens an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        debug!("Opening in-memory SQLite database");
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Starts a new session (transaction).
    ///
    /// # Errors
    ///
    /// Returns an error if a transaction cannot be started.
    pub fn session(&mut self) -> Result<Session<'_>, StorageError> {
        let tx = self.conn.transaction()?;
        Ok(Session { tx })
    }
}

impl Storage for SqliteStore {
    type Session<'a> = Session<'a>;

    fn begin(&mut self) -> Result<Self::Session<'_>, StorageError> {
        self.session()
    }
}

/// A unit of work against a [`SqliteStore`].
///
/// Dropping a session without calling [`UnitOfWork::commit`] rolls back
/// every write made through it.
pub struct Session<'conn> {
    tx: Transaction<'conn>,
}

impl fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session<'_> {
    pub(super) fn connection(&self) -> &Connection {
        &self.tx
    }

    /// Inserts a user and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, for example on a duplicate
    /// username.
    pub fn insert_user(&self, username: &str, gender: &str) -> Result<i64, StorageError> {
        self.tx.execute(
            "INSERT INTO users (username, gender) VALUES (?1, ?2)",
            params![username, gender],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    /// Inserts a community and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_community(&self, community: &NewCommunity) -> Result<CommunityId, StorageError> {
        self.tx.execute(
            "INSERT INTO clusters (parent_node_id, name, description, slug, created, is_official_cluster)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                community.parent_node_id.get(),
                community.name,
                community.description,
                community.slug,
                community.created,
                community.is_official_cluster,
            ],
        )?;
        Ok(CommunityId::new(self.tx.last_insert_rowid()))
    }

    /// Subscribes a user to a community with the given role.
    ///
    /// # Errors
    ///
    /// Returns an error if either side does not exist or the user is already
    /// subscribed.
    pub fn subscribe(
        &self,
        community: CommunityId,
        user: i64,
        role: Role,
    ) -> Result<(), StorageError> {
        self.tx.execute(
            "INSERT INTO cluster_subscriptions (user_id, cluster_id, role) VALUES (?1, ?2, ?3)",
            params![user, community.get(), role.as_str()],
        )?;
        Ok(())
    }

    /// Creates the main page of a community and returns the page id.
    ///
    /// The page starts without versions.
    ///
    /// # Errors
    ///
    /// Returns an error if the community does not exist.
    pub fn insert_main_page(&self, community: CommunityId) -> Result<i64, StorageError> {
        self.tx.execute(
            "INSERT INTO pages (owner_cluster_id, type) VALUES (?1, ?2)",
            params![community.get(), MAIN_PAGE],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    /// Appends a version to a page and returns the version id.
    ///
    /// # Errors
    ///
    /// Returns an error if the page does not exist.
    pub fn insert_page_version(
        &self,
        page: i64,
        content: &str,
        created: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        self.tx.execute(
            "INSERT INTO page_versions (page_id, content, created) VALUES (?1, ?2, ?3)",
            params![page, content, created],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    /// Inserts a discussion owned by a community and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the community does not exist.
    pub fn insert_discussion(
        &self,
        owner: CommunityId,
        title: &str,
        created: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        self.tx.execute(
            "INSERT INTO discussions (owner_cluster_id, title, created) VALUES (?1, ?2, ?3)",
            params![owner.get(), title, created],
        )?;
        Ok(self.tx.last_insert_rowid())
    }
}

impl Repository for Session<'_> {
    #[instrument(level = "debug", skip(self))]
    fn communities(&self, filter: &CommunityFilter) -> Result<Vec<Community>, StorageError> {
        let mut sql = format!("SELECT {COMMUNITY_COLUMNS} FROM clusters");
        let mut conditions = Vec::new();
        let mut values: Vec<i64> = Vec::new();

        if let Some(official) = filter.official {
            conditions.push("is_official_cluster = ?");
            values.push(i64::from(official));
        }
        if let Some(node) = filter.parent_node_id {
            conditions.push("parent_node_id = ?");
            values.push(node.get());
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = self.tx.prepare(&sql)?;
        let communities = stmt
            .query_map(params_from_iter(values), community_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = communities.len(), "Fetched communities");
        Ok(communities)
    }

    #[instrument(level = "debug", skip(self))]
    fn discussions(&self, filter: &DiscussionFilter) -> Result<Vec<Discussion>, StorageError> {
        let mut sql = String::from("SELECT id, owner_cluster_id, title, created FROM discussions");
        let mut values: Vec<i64> = Vec::new();
        if let Some(owner) = filter.owner_cluster_id {
            sql.push_str(" WHERE owner_cluster_id = ?");
            values.push(owner.get());
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = self.tx.prepare(&sql)?;
        let discussions = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(Discussion {
                    id: row.get("id")?,
                    owner_cluster_id: CommunityId::new(row.get("owner_cluster_id")?),
                    title: row.get("title")?,
                    created: row.get("created")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = discussions.len(), "Fetched discussions");
        Ok(discussions)
    }

    fn admins(&self, community: &Community) -> Result<Vec<User>, StorageError> {
        let mut stmt = self.tx.prepare(
            "SELECT u.id, u.username, u.gender
             FROM users u
             JOIN cluster_subscriptions s ON s.user_id = u.id
             WHERE s.cluster_id = ?1 AND s.role = ?2
             ORDER BY u.id",
        )?;
        let admins = stmt
            .query_map(params![community.id.get(), Role::Admin.as_str()], |row| {
                Ok(User {
                    id: row.get("id")?,
                    username: row.get("username")?,
                    gender: row.get("gender")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(admins)
    }

    fn main_page_versions(
        &self,
        community: &Community,
    ) -> Result<Option<Vec<PageVersion>>, StorageError> {
        let page: Option<i64> = self
            .tx
            .query_row(
                "SELECT id FROM pages WHERE owner_cluster_id = ?1 AND type = ?2 ORDER BY id LIMIT 1",
                params![community.id.get(), MAIN_PAGE],
                |row| row.get(0),
            )
            .optional()?;

        let Some(page) = page else {
            return Ok(None);
        };

        let mut stmt = self
            .tx
            .prepare("SELECT id, content, created FROM page_versions WHERE page_id = ?1 ORDER BY id")?;
        let versions = stmt
            .query_map(params![page], |row| {
                Ok(PageVersion {
                    id: row.get("id")?,
                    content: row.get("content")?,
                    created: row.get("created")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(versions))
    }
}

impl UnitOfWork for Session<'_> {
    #[instrument(level = "debug", skip(self, description))]
    fn set_description(
        &self,
        community: CommunityId,
        description: &str,
    ) -> Result<(), StorageError> {
        let changed = self.tx.execute(
            "UPDATE clusters SET description = ?1 WHERE id = ?2",
            params![description, community.get()],
        )?;
        if changed != 1 {
            return Err(StorageError::UnexpectedRowCount {
                entity: "community",
                changed,
            });
        }
        Ok(())
    }

    fn commit(self) -> Result<(), StorageError> {
        self.tx.commit()?;
        debug!("Committed session");
        Ok(())
    }
}

fn community_from_row(row: &Row) -> Result<Community, rusqlite::Error> {
    Ok(Community {
        id: CommunityId::new(row.get("id")?),
        parent_node_id: NodeId::new(row.get("parent_node_id")?),
        name: row.get("name")?,
        description: row.get("description")?,
        slug: row.get("slug")?,
        created: row.get("created")?,
        is_official_cluster: row.get("is_official_cluster")?,
    })
}

/// Input for inserting a community.
#[derive(Debug, Clone)]
pub struct NewCommunity {
    /// Node the community belongs to.
    pub parent_node_id: NodeId,
    /// Human-readable name.
    pub name: String,
    /// Free-text description, if any.
    pub description: Option<String>,
    /// URL slug.
    pub slug: String,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Whether the community is official.
    pub is_official_cluster: bool,
}

/// Role of a user within a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Can manage the community.
    Admin,
    /// Regular member.
    Member,
}

impl Role {
    /// The value stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}
