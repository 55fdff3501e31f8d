//! Session storage and expiry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock, TryLockError};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::{DirectoryView, Identifier, SessionState};
use crate::error::{DirTunnelError, NavigationError};
use crate::fs;
use crate::Result;

/// A browsing session rooted at one server-side directory.
#[derive(Debug)]
pub struct Session {
    /// Identifier handed to the client.
    pub id: Identifier,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Navigation state.
    pub view: DirectoryView,
    /// Time when session was created.
    pub created_at: Instant,
    /// Time after which the session is dead.
    pub expires_at: Instant,
}

impl Session {
    /// Create a new session with the given ID, root and time-to-live.
    pub fn new(id: Identifier, root: impl Into<PathBuf>, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            id,
            state: SessionState::Uninitialized,
            view: DirectoryView::new(root),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn is_tombstoned(&self) -> bool {
        self.state == SessionState::Tombstoned
    }

    /// Mark the session dead. It stays in the table until the next sweep.
    pub fn tombstone(&mut self) {
        if !self.is_tombstoned() {
            debug!(session = %self.id, "session tombstoned");
            self.state = SessionState::Tombstoned;
        }
    }

    /// Change directory.
    ///
    /// `target` equal to the session's own identifier navigates to the
    /// root; anything else is looked up in the cached subdirectory list.
    pub fn change_directory(&mut self, target: &str) -> Result<PathBuf> {
        let (path, next) = if self.id == *target {
            (self.view.change_to_root()?, SessionState::AtRoot)
        } else {
            (
                self.view.change_to_subdirectory(target)?,
                SessionState::AtSubdirectory,
            )
        };
        self.state.transition_to(next)?;
        Ok(path)
    }
}

/// Summary of a live session, as reported by `LIST_STATES`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: Identifier,
    pub root: PathBuf,
    pub current: PathBuf,
}

/// Thread-safe table of sessions.
///
/// Lookups take the read lock; creation and sweeping take the write lock.
/// Each session has its own mutex so traffic against one session is
/// serialized without blocking the rest of the table.
pub struct SessionTable {
    sessions: RwLock<HashMap<Identifier, Arc<Mutex<Session>>>>,
    ttl: Duration,
}

impl SessionTable {
    /// Create a new empty table whose sessions live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a session rooted at `root`.
    ///
    /// The root must be an existing directory. Returns the new identifier.
    pub fn create(&self, root: impl AsRef<Path>) -> Result<Identifier> {
        let root = absolute(root.as_ref())?;
        fs::probe_dir(&root)?;

        let target = root.to_string_lossy().into_owned();
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| DirTunnelError::LockPoisoned)?;

        let mut id = Identifier::generate(&target);
        while sessions.contains_key(&id) {
            id = Identifier::generate(&target);
        }

        let mut session = Session::new(id.clone(), root, self.ttl);
        session.state.transition_to(SessionState::AtRoot)?;
        sessions.insert(id.clone(), Arc::new(Mutex::new(session)));

        info!(session = %id, root = %target, "session created");
        Ok(id)
    }

    /// Run `f` against the live session with the given identifier.
    ///
    /// Expired sessions are tombstoned on the spot and reported as missing.
    pub fn with_session<T, F>(&self, id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> Result<T>,
    {
        let entry = {
            let sessions = self
                .sessions
                .read()
                .map_err(|_| DirTunnelError::LockPoisoned)?;
            sessions
                .get(id)
                .cloned()
                .ok_or_else(|| DirTunnelError::SessionNotFound(id.to_string()))?
        };

        let mut session = entry.lock().map_err(|_| DirTunnelError::LockPoisoned)?;
        if session.is_expired(Instant::now()) {
            session.tombstone();
        }
        if session.is_tombstoned() {
            return Err(DirTunnelError::SessionNotFound(id.to_string()));
        }

        f(&mut session)
    }

    /// Check if a live session exists.
    pub fn contains(&self, id: &str) -> bool {
        self.with_session(id, |_| Ok(())).is_ok()
    }

    /// Get the number of sessions in the table, including tombstoned ones.
    pub fn count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Summaries of all live sessions, sorted by identifier.
    ///
    /// Session mutexes are locked only after the table lock is released, so
    /// a session busy with a long request delays this call but not the table.
    pub fn list_live(&self) -> Result<Vec<SessionSummary>> {
        let entries: Vec<Arc<Mutex<Session>>> = self
            .sessions
            .read()
            .map_err(|_| DirTunnelError::LockPoisoned)?
            .values()
            .cloned()
            .collect();

        let now = Instant::now();
        let mut live = Vec::new();
        for entry in &entries {
            let Ok(session) = entry.lock() else {
                continue;
            };
            if session.is_tombstoned() || session.is_expired(now) {
                continue;
            }
            live.push(SessionSummary {
                id: session.id.clone(),
                root: session.view.root().to_path_buf(),
                current: session.view.working_dir().to_path_buf(),
            });
        }

        live.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(live)
    }

    /// Tombstone expired sessions and evict every tombstoned one.
    ///
    /// Sessions busy serving a request are left for the next pass.
    /// Returns the number of sessions removed.
    pub fn sweep(&self) -> Result<usize> {
        let now = Instant::now();
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| DirTunnelError::LockPoisoned)?;

        let before = sessions.len();
        sessions.retain(|_, entry| match entry.try_lock() {
            Ok(mut session) => {
                if session.is_expired(now) {
                    session.tombstone();
                }
                !session.is_tombstoned()
            }
            Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Poisoned(_)) => false,
        });

        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, remaining = sessions.len(), "swept expired sessions");
        }
        Ok(removed)
    }
}

#[cfg(test)]
impl SessionTable {
    /// Poison the table lock by panicking while holding it.
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.sessions.write();
            panic!("poisoning session table");
        }));
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir().map_err(|_| NavigationError::DoesNotExist)?;
        Ok(cwd.join(path))
    }
}
