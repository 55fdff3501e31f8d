//! Wire protocol for dir-tunnel.
//!
//! Requests are single text messages:
//!
//! ```text
//! PTDP v1 <COMMAND> <argument>
//! ```
//!
//! ## Commands
//!
//! - `INIT_STATE <root>` - Create a session rooted at a server path
//! - `LIST_STATES` - List live sessions
//! - `LIST_DIR <session>` - Subdirectories and files of the current listing
//! - `LIST_FILES <session>` - Files of the current listing
//! - `LIST_SUBDIRS <session>` - Subdirectories of the current listing
//! - `WALK_TREE <session>` - Everything below the current directory
//! - `CD_SUBDIR <session>;<entity>` - Enter a subdirectory (or the root,
//!   when `<entity>` is the session identifier itself)
//! - `READ_BYTES <session>;<entity>` - Read a file
//! - `STAT_ENTITY <session>;<entity>` - Stat a file or directory

mod dispatch;
mod request;
mod response;

pub use dispatch::Dispatcher;
pub use request::{
    split_pair, Arity, Command, Request, PROTOCOL_NAME, PROTOCOL_VERSION, TUPLE_SEPARATOR,
};
pub use response::{classify, Response, StatusCode, TERMINATOR};
