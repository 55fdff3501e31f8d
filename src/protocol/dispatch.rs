//! Command dispatch.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{Arity, Command, Request, Response, StatusCode};
use crate::error::{DirTunnelError, ParseError};
use crate::session::{SessionTable, EMPTY_MARKER};
use crate::Result;

/// Routes decoded requests to the session table.
///
/// [`Dispatcher::handle`] never fails: every error becomes a status code.
#[derive(Clone)]
pub struct Dispatcher {
    sessions: Arc<SessionTable>,
}

impl Dispatcher {
    pub fn new(sessions: Arc<SessionTable>) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionTable> {
        &self.sessions
    }

    /// Decode and execute one raw request.
    pub fn handle(&self, buffer: &[u8]) -> Response {
        match self.try_handle(buffer) {
            Ok(response) => response,
            Err(err) => {
                match &err {
                    DirTunnelError::Parse(_) | DirTunnelError::SessionNotFound(_) => {
                        debug!(error = %err, "request rejected")
                    }
                    _ => warn!(error = %err, "request failed"),
                }
                Response::failure(&err)
            }
        }
    }

    fn try_handle(&self, buffer: &[u8]) -> Result<Response> {
        let request = Request::decode(buffer)?;
        debug!(command = request.command.verb(), "dispatching");

        match request.command.arity() {
            Arity::None => self.list_states(),
            Arity::Single => self.single(request.command, &request.argument),
            Arity::Dual => {
                let (session, entity) = request.split_pair()?;
                self.dual(request.command, session, entity)
            }
        }
    }

    fn list_states(&self) -> Result<Response> {
        let live = self.sessions.list_live()?;
        let payload = if live.is_empty() {
            EMPTY_MARKER.to_string()
        } else {
            live.iter()
                .map(|s| {
                    format!(
                        "id={}+root={}+cwd={}",
                        s.id,
                        s.root.display(),
                        s.current.display()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };
        Ok(Response::new(StatusCode::StatesListed, payload))
    }

    fn single(&self, command: Command, argument: &str) -> Result<Response> {
        match command {
            Command::InitState => {
                let id = self.sessions.create(argument)?;
                Ok(Response::new(StatusCode::InitOk, id.as_str()))
            }
            Command::ListDir => self.sessions.with_session(argument, |s| {
                Ok(Response::new(StatusCode::DirListed, s.view.render_both()))
            }),
            Command::ListFiles => self.sessions.with_session(argument, |s| {
                Ok(Response::new(StatusCode::FilesListed, s.view.render_files()))
            }),
            Command::ListSubdirs => self.sessions.with_session(argument, |s| {
                Ok(Response::new(
                    StatusCode::SubdirsListed,
                    s.view.render_subdirectories(),
                ))
            }),
            Command::WalkTree => self.sessions.with_session(argument, |s| {
                let text = s.view.render_walk()?;
                Ok(Response::new(StatusCode::DirWalked, text)
                    .with_header(Command::WalkTree, s.view.working_dir()))
            }),
            other => Err(unroutable(other)),
        }
    }

    fn dual(&self, command: Command, session: &str, entity: &str) -> Result<Response> {
        self.sessions.with_session(session, |s| match command {
            Command::ChangeDirectory => {
                let path = s.change_directory(entity)?;
                Ok(Response::new(StatusCode::CdOk, Vec::new()).with_header(command, path))
            }
            Command::ReadBytes => {
                let (path, contents) = s.view.read_file(entity)?;
                Ok(Response::new(StatusCode::ReadOk, contents).with_header(command, path))
            }
            Command::StatEntity => {
                let (path, text) = s.view.stat_entity(entity)?;
                Ok(Response::new(StatusCode::StatOk, text).with_header(command, path))
            }
            other => Err(unroutable(other)),
        })
    }
}

/// Arity routing guarantees only the right group reaches each handler.
fn unroutable(command: Command) -> DirTunnelError {
    debug!(command = command.verb(), "command reached the wrong handler group");
    ParseError::BadCommand.into()
}
