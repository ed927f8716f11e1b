//! Community Completeness Auditing
//!
//! Communities are checked against a fixed set of editorial rules: they must
//! have discussions, a long enough description and main page, and at least
//! one admin who is not exclusively male.

pub mod domain;
pub use domain::{
    Community, CommunityId, Config, Discussion, MainPage, NodeId, PageVersion, User,
};

/// Completeness evaluation and reporting of incomplete communities.
pub mod audit;
pub use audit::{AuditError, AuditRecord, AuditReport, Completeness};

/// Database access for communities and their related data.
pub mod storage;
pub use storage::{Repository, SqliteStore, Storage, StorageError, UnitOfWork};

/// Guarded updates of community descriptions.
pub mod update;
pub use update::{update_description, UpdateOutcome};

#[cfg(test)]
mod testing;
