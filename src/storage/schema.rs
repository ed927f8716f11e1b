//! Database schema definitions

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::storage::StorageError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{SCHEMA_VERSION}");
        conn.execute_batch(TABLES)?;
        conn.execute_batch(INDEXES)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version == SCHEMA_VERSION {
        info!("Database schema is up to date (v{current_version})");
    } else {
        return Err(StorageError::UnsupportedSchema {
            found: current_version,
            supported: SCHEMA_VERSION,
        });
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32, StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;

    let version = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), StorageError> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

const TABLES: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    gender TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS clusters (
    id INTEGER PRIMARY KEY,
    parent_node_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    slug TEXT NOT NULL,
    created TEXT NOT NULL,
    is_official_cluster INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS cluster_subscriptions (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id),
    cluster_id INTEGER NOT NULL REFERENCES clusters(id),
    role TEXT NOT NULL CHECK (role IN ('admin', 'member')),
    UNIQUE (user_id, cluster_id)
);

CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY,
    owner_cluster_id INTEGER NOT NULL REFERENCES clusters(id),
    type TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS page_versions (
    id INTEGER PRIMARY KEY,
    page_id INTEGER NOT NULL REFERENCES pages(id),
    content TEXT NOT NULL,
    created TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS discussions (
    id INTEGER PRIMARY KEY,
    owner_cluster_id INTEGER NOT NULL REFERENCES clusters(id),
    title TEXT NOT NULL,
    created TEXT NOT NULL
);
";

const INDEXES: &str = r"
CREATE INDEX IF NOT EXISTS idx_clusters_parent_node ON clusters(parent_node_id);
CREATE INDEX IF NOT EXISTS idx_clusters_official ON clusters(is_official_cluster);
CREATE INDEX IF NOT EXISTS idx_subscriptions_cluster ON cluster_subscriptions(cluster_id, role);
CREATE INDEX IF NOT EXISTS idx_pages_owner ON pages(owner_cluster_id, type);
CREATE INDEX IF NOT EXISTS idx_page_versions_page ON page_versions(page_id);
CREATE INDEX IF NOT EXISTS idx_discussions_owner ON discussions(owner_cluster_id);
";
