//! Session management module.
//!
//! This module provides types and utilities for managing browsing sessions,
//! including identifier generation, lifecycle tracking, directory views
//! and the shared session table.

mod id;
mod state;
mod store;
mod view;

pub use id::{truncate_digest, Identifier, TRUNCATION_STEP};
pub use state::SessionState;
pub use store::{Session, SessionSummary, SessionTable};
pub use view::{DirectoryView, Entity, EMPTY_MARKER, LISTING_SEPARATOR};
