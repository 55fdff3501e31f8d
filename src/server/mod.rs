//! Unix socket server for dir-tunnel.
//!
//! Each accepted connection carries exactly one request and one response.
//! A background task sweeps expired sessions on a fixed interval for the
//! lifetime of the server.
//!
//! ## Example
//!
//! ```no_run
//! use dir_tunnel::server::{serve, EngineConfig};
//!
//! #[tokio::main]
//! async fn main() -> dir_tunnel::Result<()> {
//!     let config = EngineConfig::new("/tmp/dir-tunnel.sock");
//!     serve(config).await
//! }
//! ```

pub mod connection;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::DirTunnelError;
use crate::protocol::Dispatcher;
use crate::session::SessionTable;
use crate::Result;

/// Default socket path.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/dir-tunnel.sock";

/// Default session time-to-live.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(10 * 60);

/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(45);

/// Immutable runtime configuration handed to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Filesystem path of the listening socket.
    pub socket_path: PathBuf,
    /// How long a session lives after creation.
    pub session_ttl: Duration,
    /// Interval between sweeps of tombstoned sessions.
    pub sweep_interval: Duration,
}

impl EngineConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            ..Default::default()
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            session_ttl: DEFAULT_SESSION_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// A bound server, ready to accept connections.
pub struct Server {
    listener: UnixListener,
    config: EngineConfig,
    dispatcher: Dispatcher,
}

impl Server {
    /// Bind the listening socket, replacing a stale socket file if present.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(config: EngineConfig) -> Result<Self> {
        if let Some(parent) = config.socket_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        if config.socket_path.exists() {
            std::fs::remove_file(&config.socket_path)?;
        }

        let listener = UnixListener::bind(&config.socket_path)?;
        let sessions = Arc::new(SessionTable::new(config.session_ttl));
        info!(socket = %config.socket_path.display(), "listening");

        Ok(Self {
            listener,
            dispatcher: Dispatcher::new(sessions),
            config,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Accept connections until `shutdown` completes, then remove the
    /// socket file.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut sweeper = spawn_sweeper(
            Arc::clone(self.dispatcher.sessions()),
            self.config.sweep_interval,
        );
        tokio::pin!(shutdown);

        let outcome = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break Ok(());
                }
                swept = &mut sweeper => {
                    break match swept {
                        Ok(result) => result,
                        Err(e) => Err(DirTunnelError::Io(std::io::Error::other(e))),
                    };
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let dispatcher = self.dispatcher.clone();
                        tokio::spawn(async move {
                            if let Err(e) = connection::handle(stream, dispatcher).await {
                                debug!(error = %e, "connection closed with error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                },
            }
        };

        sweeper.abort();
        drop(self.listener);
        remove_socket(&self.config.socket_path);
        if let Err(e) = &outcome {
            error!(error = %e, "server stopping after sweeper failure");
        }
        outcome
    }
}

/// Periodically evict tombstoned sessions.
///
/// Runs until a sweep fails, and resolves to that error.
pub fn spawn_sweeper(sessions: Arc<SessionTable>, interval: Duration) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = sessions.sweep() {
                error!(error = %e, "session sweep failed");
                return Err(e);
            }
        }
    })
}

fn remove_socket(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => info!(socket = %path.display(), "socket removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(socket = %path.display(), error = %e, "failed to remove socket"),
    }
}

/// Resolve when the process receives Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Bind and serve until a termination signal arrives.
pub async fn serve(config: EngineConfig) -> Result<()> {
    Server::bind(config)?.run_until(shutdown_signal()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.socket_path, PathBuf::from(DEFAULT_SOCKET_PATH));
        assert_eq!(config.session_ttl, Duration::from_secs(600));
        assert_eq!(config.sweep_interval, Duration::from_secs(45));
    }

    #[test]
    fn test_engine_config_builder() {
        let config = EngineConfig::new("/run/dt.sock")
            .with_session_ttl(Duration::from_secs(5))
            .with_sweep_interval(Duration::from_secs(1));
        assert_eq!(config.socket_path, PathBuf::from("/run/dt.sock"));
        assert_eq!(config.session_ttl, Duration::from_secs(5));
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_bind_replaces_stale_socket_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dt.sock");
        std::fs::write(&path, b"stale").unwrap();

        let server = Server::bind(EngineConfig::new(&path)).unwrap();
        assert_eq!(server.socket_path(), path.as_path());

        server.run_until(async {}).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_sweeper_evicts_expired_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = Arc::new(SessionTable::new(Duration::from_millis(10)));
        sessions.create(dir.path()).unwrap();

        let handle = spawn_sweeper(Arc::clone(&sessions), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.abort();

        assert_eq!(sessions.count(), 0);
    }

    #[tokio::test]
    async fn test_sweeper_failure_stops_server() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dt.sock");
        let config = EngineConfig::new(&path).with_sweep_interval(Duration::from_millis(20));

        let server = Server::bind(config).unwrap();
        server.dispatcher().sessions().poison();

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            server.run_until(std::future::pending::<()>()),
        )
        .await
        .expect("server kept running without a sweeper");

        assert!(matches!(outcome, Err(DirTunnelError::LockPoisoned)));
        assert!(!path.exists());
    }
}
