//! Domain models for community auditing.
//!
//! This module contains the entities read from the platform database
//! (communities, discussions, users and main-page versions) and the tool
//! configuration.

/// Community, discussion and user entities.
pub mod community;
pub use community::{Community, CommunityId, Discussion, MainPage, NodeId, PageVersion, User};

mod config;
pub use config::Config;
