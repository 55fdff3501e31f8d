//! Response encoding.
//!
//! Wire format:
//!
//! ```text
//! <code> - <label>\n\n
//! [$<OPERATION>: <resolved-path>;\n]
//! <payload>\n\n
//! ```

use std::path::{Path, PathBuf};

use super::Command;
use crate::error::{DirTunnelError, EntityAccessError, NavigationError, ParseError};

/// Trailer appended after every payload.
pub const TERMINATOR: &[u8] = b"\n\n";

/// Numeric response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    InitOk,
    CdOk,
    ReadOk,
    StatOk,
    DirListed,
    FilesListed,
    SubdirsListed,
    StatesListed,
    DirWalked,
    ParseFailed,
    NeedsTwoHashes,
    NoDir,
    NoHash,
    NoState,
    NoExists,
    WalkFailed,
    ReadFailed,
    StatFailed,
    InternalFailed,
}

impl StatusCode {
    pub fn code(&self) -> u16 {
        match self {
            StatusCode::InitOk => 12,
            StatusCode::CdOk => 13,
            StatusCode::ReadOk => 22,
            StatusCode::StatOk => 23,
            StatusCode::DirListed => 32,
            StatusCode::FilesListed => 33,
            StatusCode::SubdirsListed => 34,
            StatusCode::StatesListed => 35,
            StatusCode::DirWalked => 42,
            StatusCode::ParseFailed => 100,
            StatusCode::NeedsTwoHashes => 105,
            StatusCode::NoDir => 110,
            StatusCode::NoHash => 120,
            StatusCode::NoState => 130,
            StatusCode::NoExists => 140,
            StatusCode::WalkFailed => 150,
            StatusCode::ReadFailed => 160,
            StatusCode::StatFailed => 170,
            StatusCode::InternalFailed => 190,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusCode::InitOk => "INIT_OK",
            StatusCode::CdOk => "CD_OK",
            StatusCode::ReadOk => "READ_OK",
            StatusCode::StatOk => "STAT_OK",
            StatusCode::DirListed => "DIR_LISTED",
            StatusCode::FilesListed => "FILES_LISTED",
            StatusCode::SubdirsListed => "SUBDIRS_LISTED",
            StatusCode::StatesListed => "STATES_LISTED",
            StatusCode::DirWalked => "DIR_WALKED",
            StatusCode::ParseFailed => "PARSE_FAILED",
            StatusCode::NeedsTwoHashes => "NEEDS_TWO_HASHES",
            StatusCode::NoDir => "NO_DIR",
            StatusCode::NoHash => "NO_HASH",
            StatusCode::NoState => "NO_STATE",
            StatusCode::NoExists => "NO_EXISTS",
            StatusCode::WalkFailed => "WALK_FAILED",
            StatusCode::ReadFailed => "READ_FAILED",
            StatusCode::StatFailed => "STAT_FAILED",
            StatusCode::InternalFailed => "INTERNAL_FAILED",
        }
    }

    pub fn is_success(&self) -> bool {
        self.code() < 100
    }

    /// Status line, including the blank line that follows it.
    pub fn status_line(&self) -> String {
        format!("{} - {}\n\n", self.code(), self.label())
    }
}

/// Status code and machine-readable token for an error.
pub fn classify(err: &DirTunnelError) -> (StatusCode, &'static str) {
    match err {
        DirTunnelError::SessionNotFound(_) => (StatusCode::NoState, "ERROR_NO_STATE"),
        DirTunnelError::Parse(parse) => match parse {
            ParseError::BadProtocolName => (StatusCode::ParseFailed, "ERROR_PARSE_PROTOCOL_NAME"),
            ParseError::BadVersion => (StatusCode::ParseFailed, "ERROR_PARSE_VERSION_CONTROL"),
            ParseError::BadCommand => (StatusCode::ParseFailed, "ERROR_PARSE_COMM"),
            ParseError::BadArgument => (StatusCode::ParseFailed, "ERROR_PARSE_PATH_OR_HASH"),
            ParseError::NeedsTwoHashes => (StatusCode::NeedsTwoHashes, "ERROR_NEEDS_TWO_HASHES"),
        },
        DirTunnelError::Navigation(nav) => match nav {
            NavigationError::NoSuchEntity => (StatusCode::NoHash, "ERROR_NO_HASH"),
            NavigationError::NotADirectory => (StatusCode::NoDir, "ERROR_NO_DIR"),
            NavigationError::DoesNotExist => (StatusCode::NoExists, "ERROR_NO_EXISTS"),
            NavigationError::Unreadable => (StatusCode::NoDir, "ERROR_DIR_UNREADABLE"),
        },
        DirTunnelError::EntityAccess(access) => match access {
            EntityAccessError::NotFound => (StatusCode::NoHash, "ERROR_NO_HASH"),
            EntityAccessError::IsNotAFile => (StatusCode::ReadFailed, "ERROR_IS_NOT_A_FILE"),
            EntityAccessError::DoesNotExist => (StatusCode::NoExists, "ERROR_NO_EXISTS"),
        },
        DirTunnelError::WalkFailed(_) => (StatusCode::WalkFailed, "ERROR_WALK_FAILED"),
        DirTunnelError::StatFailed(_) => (StatusCode::StatFailed, "ERROR_STAT_FAILED"),
        DirTunnelError::Io(_) => (StatusCode::ReadFailed, "ERROR_READ_FAILED"),
        DirTunnelError::InvalidStateTransition { .. } | DirTunnelError::LockPoisoned => {
            (StatusCode::InternalFailed, "ERROR_INTERNAL")
        }
    }
}

/// A response ready to be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    /// Operation and resolved path, for commands that touch a path.
    pub header: Option<(Command, PathBuf)>,
    pub payload: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            header: None,
            payload: payload.into(),
        }
    }

    /// Attach an operation header naming the resolved path.
    pub fn with_header(mut self, command: Command, path: impl AsRef<Path>) -> Self {
        self.header = Some((command, path.as_ref().to_path_buf()));
        self
    }

    /// Failure response carrying only the error token.
    pub fn failure(err: &DirTunnelError) -> Self {
        let (status, token) = classify(err);
        Self::new(status, token)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.status.status_line().into_bytes();
        if let Some((command, path)) = &self.header {
            out.extend_from_slice(
                format!("${}: {};\n", command.verb(), path.display()).as_bytes(),
            );
        }
        out.extend_from_slice(&self.payload);
        out.extend_from_slice(TERMINATOR);
        out
    }
}
