mod export;
mod repository;
mod schema;
mod sqlite;

pub use export::{Table, UnknownTableError};
pub use repository::{CommunityFilter, DiscussionFilter, Repository, Storage, UnitOfWork};
pub use schema::SCHEMA_VERSION;
pub use sqlite::{NewCommunity, Role, Session, SqliteStore};

/// Errors raised by the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The underlying database reported an error.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A lookup that expects exactly one row found none.
    #[error("no {entity} matches {filter}")]
    NotFound {
        /// Kind of entity looked up.
        entity: &'static str,
        /// Rendered filter used for the lookup.
        filter: String,
    },

    /// A lookup that expects exactly one row found several.
    #[error("{count} {entity} rows match {filter}, expected exactly one")]
    Ambiguous {
        /// Kind of entity looked up.
        entity: &'static str,
        /// Rendered filter used for the lookup.
        filter: String,
        /// Number of matching rows.
        count: usize,
    },

    /// A write touched a different number of rows than it targeted.
    #[error("expected to change one {entity} row, changed {changed}")]
    UnexpectedRowCount {
        /// Kind of entity written.
        entity: &'static str,
        /// Number of rows actually changed.
        changed: usize,
    },

    /// The database carries a schema version this build does not know.
    #[error("database schema v{found} is not supported (expected v{supported})")]
    UnsupportedSchema {
        /// Version stored in the database.
        found: i32,
        /// Version this build creates.
        supported: i32,
    },
}
