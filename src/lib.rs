//! # dir-tunnel
//!
//! Session-based remote directory browsing over a Unix socket.
//!
//! A client opens a session rooted at a server-side directory and then
//! navigates, lists, stats, reads and walks entries using opaque
//! identifiers handed out by earlier responses. Server-side paths are
//! never needed after the session is created.
//!
//! ## Features
//!
//! - **Text protocol**: `PTDP v1 <COMMAND> <argument>` requests, one per connection
//! - **Opaque addressing**: salted, truncated SHA-512 identifiers per listing
//! - **Session expiry**: time-to-live with tombstoning and periodic sweeps
//! - **Async I/O**: one tokio task per connection
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use dir_tunnel::{Dispatcher, SessionTable};
//!
//! let sessions = Arc::new(SessionTable::new(Duration::from_secs(600)));
//! let dispatcher = Dispatcher::new(sessions);
//!
//! let response = dispatcher.handle(b"PTDP v1 INIT_STATE /srv/data");
//! let session = String::from_utf8_lossy(&response.payload).into_owned();
//!
//! let response = dispatcher.handle(format!("PTDP v1 CD_SUBDIR {0};{0}", session).as_bytes());
//! println!("{}", String::from_utf8_lossy(&response.encode()));
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod logging;
pub mod protocol;
#[cfg(unix)]
pub mod server;
pub mod session;

// Re-export commonly used types
pub use error::{DirTunnelError, EntityAccessError, NavigationError, ParseError, Result};
pub use protocol::{Command, Dispatcher, Request, Response, StatusCode};
#[cfg(unix)]
pub use server::{serve, EngineConfig, Server};
pub use session::{DirectoryView, Entity, Identifier, Session, SessionState, SessionTable};
