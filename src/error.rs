//! Error types for dir-tunnel.

use thiserror::Error;

/// Failures produced while decoding a raw request.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The first field is not the protocol name.
    #[error("bad protocol name")]
    BadProtocolName,

    /// The second field is not the supported protocol version.
    #[error("bad protocol version")]
    BadVersion,

    /// No known verb was found in the command field.
    #[error("unknown command")]
    BadCommand,

    /// The argument is missing or shorter than two characters.
    #[error("missing or too short argument")]
    BadArgument,

    /// A dual-argument command did not carry exactly two identifiers.
    #[error("argument must hold exactly two identifiers")]
    NeedsTwoHashes,
}

/// Failures while changing the current directory of a session.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationError {
    /// The identifier is not among the cached subdirectories.
    #[error("no such entity in the current listing")]
    NoSuchEntity,

    /// The resolved path exists but is not a directory.
    #[error("not a directory")]
    NotADirectory,

    /// The resolved path no longer exists.
    #[error("path does not exist")]
    DoesNotExist,

    /// The directory exists but its entries could not be read.
    #[error("directory could not be listed")]
    Unreadable,
}

/// Failures while reading or stat-ing a listed entity.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityAccessError {
    /// The identifier is not among the cached entries.
    #[error("entity not found")]
    NotFound,

    /// The entity resolved to a directory where a file was required.
    #[error("entity is not a file")]
    IsNotAFile,

    /// The entity was listed but its path has since disappeared.
    #[error("entity no longer exists")]
    DoesNotExist,
}

/// Main error type for dir-tunnel operations.
#[derive(Error, Debug)]
pub enum DirTunnelError {
    /// No live session carries the given identifier.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Request decoding failed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Directory navigation failed.
    #[error("navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// Entity read or stat failed.
    #[error("entity access error: {0}")]
    EntityAccess(#[from] EntityAccessError),

    /// Recursive walk failed.
    #[error("walk failed: {0}")]
    WalkFailed(String),

    /// Metadata lookup failed for reasons other than a missing path.
    #[error("stat failed: {0}")]
    StatFailed(String),

    /// Invalid session state transition attempted.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: crate::session::SessionState,
        to: crate::session::SessionState,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

/// Convenience Result type for dir-tunnel operations.
pub type Result<T> = std::result::Result<T, DirTunnelError>;
