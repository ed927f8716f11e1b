//! Whole-table export for ad-hoc analysis.

use std::{fmt, str::FromStr};

use rusqlite::types::ValueRef;
use serde_json::{Map, Number, Value};
use tracing::instrument;

use crate::storage::{Session, StorageError};

/// Tables that can be exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    /// Platform users.
    Users,
    /// Communities.
    Clusters,
    /// Community memberships and roles.
    ClusterSubscriptions,
    /// Pages owned by communities.
    Pages,
    /// Saved page revisions.
    PageVersions,
    /// Discussion threads.
    Discussions,
}

impl Table {
    /// The SQL table name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Clusters => "clusters",
            Self::ClusterSubscriptions => "cluster_subscriptions",
            Self::Pages => "pages",
            Self::PageVersions => "page_versions",
            Self::Discussions => "discussions",
        }
    }

    /// Every exportable table.
    pub const ALL: [Self; 6] = [
        Self::Users,
        Self::Clusters,
        Self::ClusterSubscriptions,
        Self::Pages,
        Self::PageVersions,
        Self::Discussions,
    ];
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a table name is not exportable.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Unknown table '{0}'")]
pub struct UnknownTableError(String);

impl FromStr for Table {
    type Err = UnknownTableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|table| table.name() == s)
            .ok_or_else(|| UnknownTableError(s.to_string()))
    }
}

impl Session<'_> {
    /// Returns the column names of a table, in table order.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be queried.
    pub fn columns(&self, table: Table) -> Result<Vec<String>, StorageError> {
        let stmt = self
            .connection()
            .prepare(&format!("SELECT * FROM {} LIMIT 0", table.name()))?;
        Ok(stmt.column_names().into_iter().map(String::from).collect())
    }

    /// Reads every row of a table as a JSON object keyed by column name.
    ///
    /// Rows are ordered by their rowid.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    #[instrument(level = "debug", skip(self))]
    pub fn dump(&self, table: Table) -> Result<Vec<Map<String, Value>>, StorageError> {
        let columns = self.columns(table)?;
        let mut stmt = self
            .connection()
            .prepare(&format!("SELECT * FROM {} ORDER BY rowid", table.name()))?;
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut object = Map::with_capacity(columns.len());
            for (i, column) in columns.iter().enumerate() {
                object.insert(column.clone(), json_value(row.get_ref(i)?));
            }
            out.push(object);
        }
        Ok(out)
    }
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::from(bytes.to_vec()),
    }
}
