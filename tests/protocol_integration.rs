//! Protocol integration tests.
//!
//! These tests run a real server on a temporary Unix socket and talk to it
//! the way a client would: one request per connection.

#![cfg(unix)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dir_tunnel::server::{EngineConfig, Server};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestServer {
    socket: PathBuf,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<dir_tunnel::Result<()>>,
    _dir: TempDir,
}

impl TestServer {
    fn start(ttl: Duration, sweep: Duration) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("dir-tunnel.sock");
        let config = EngineConfig::new(&socket)
            .with_session_ttl(ttl)
            .with_sweep_interval(sweep);

        let server = Server::bind(config).unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.run_until(async {
            let _ = rx.await;
        }));

        Self {
            socket,
            shutdown: Some(tx),
            handle,
            _dir: dir,
        }
    }

    fn with_defaults() -> Self {
        Self::start(Duration::from_secs(600), Duration::from_secs(60))
    }

    async fn send(&self, request: &str) -> Reply {
        let mut stream = UnixStream::connect(&self.socket).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        Reply::parse(&raw)
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        (&mut self.handle).await.unwrap().unwrap();
        assert!(!self.socket.exists());
    }
}

/// A decoded response.
#[derive(Debug)]
struct Reply {
    code: u16,
    label: String,
    header: Option<String>,
    payload: Vec<u8>,
}

impl Reply {
    fn parse(raw: &[u8]) -> Self {
        let split = raw
            .windows(2)
            .position(|w| w == b"\n\n")
            .expect("status line terminator");
        let status = String::from_utf8_lossy(&raw[..split]).into_owned();
        let (code, label) = status.split_once(" - ").unwrap();

        let mut body = &raw[split + 2..];
        assert!(body.ends_with(b"\n\n"), "missing trailing terminator");
        body = &body[..body.len() - 2];

        let mut header = None;
        if body.starts_with(b"$") {
            let end = body.iter().position(|&b| b == b'\n').unwrap();
            header = Some(String::from_utf8_lossy(&body[..end]).into_owned());
            body = &body[end + 1..];
        }

        Self {
            code: code.parse().unwrap(),
            label: label.to_string(),
            header,
            payload: body.to_vec(),
        }
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Identifier of the entry with the given relative path.
    fn id_of(&self, path: &str) -> String {
        self.text()
            .lines()
            .find_map(|line| {
                let rest = line
                    .strip_prefix("+d+path=")
                    .or_else(|| line.strip_prefix("*f*path="))?;
                let (p, id) = rest
                    .split_once("+id=")
                    .or_else(|| rest.split_once("*id="))?;
                (p == path).then(|| id.to_string())
            })
            .unwrap_or_else(|| panic!("{} not in listing:\n{}", path, self.text()))
    }

    /// Relative paths mentioned in a listing or walk.
    fn paths(&self) -> BTreeSet<String> {
        self.text()
            .lines()
            .filter_map(|line| {
                let rest = line
                    .strip_prefix("+d+path=")
                    .or_else(|| line.strip_prefix("*f*path="))?;
                let end = rest.find(['+', '*']).unwrap_or(rest.len());
                Some(rest[..end].to_string())
            })
            .collect()
    }
}

/// Root with `src/` and `README.md`, plus a couple of nested entries.
fn project_tree() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src/util")).unwrap();
    std::fs::write(dir.path().join("README.md"), b"# project\n").unwrap();
    std::fs::write(dir.path().join("src/main.rs"), b"fn main() {}\n").unwrap();
    std::fs::write(dir.path().join("src/util/mod.rs"), b"pub mod x;\n").unwrap();
    dir
}

async fn init(server: &TestServer, root: &Path) -> String {
    let reply = server
        .send(&format!("PTDP v1 INIT_STATE {}", root.display()))
        .await;
    assert_eq!(reply.code, 12, "{:?}", reply);
    assert_eq!(reply.label, "INIT_OK");
    reply.text()
}

// ============================================================================
// Navigation
// ============================================================================

#[tokio::test]
async fn test_full_navigation_scenario() {
    let tree = project_tree();
    let server = TestServer::with_defaults();
    let session = init(&server, tree.path()).await;

    let cd = server
        .send(&format!("PTDP v1 CD_SUBDIR {0};{0}", session))
        .await;
    assert_eq!(cd.code, 13);
    assert_eq!(cd.label, "CD_OK");
    assert_eq!(
        cd.header.as_deref(),
        Some(format!("$CD_SUBDIR: {};", tree.path().display()).as_str())
    );

    let listing = server.send(&format!("PTDP v1 LIST_DIR {}", session)).await;
    assert_eq!(listing.code, 32);
    assert_eq!(
        listing.paths(),
        BTreeSet::from(["README.md".to_string(), "src".to_string()])
    );
    let src = listing.id_of("src");

    let cd = server
        .send(&format!("PTDP v1 CD_SUBDIR {};{}", session, src))
        .await;
    assert_eq!(cd.code, 13);

    let files = server.send(&format!("PTDP v1 LIST_FILES {}", session)).await;
    assert_eq!(files.code, 33);
    assert_eq!(files.paths(), BTreeSet::from(["src/main.rs".to_string()]));

    let main_rs = files.id_of("src/main.rs");
    let read = server
        .send(&format!("PTDP v1 READ_BYTES {};{}", session, main_rs))
        .await;
    assert_eq!(read.code, 22);
    assert_eq!(read.payload, b"fn main() {}\n");
    assert_eq!(
        read.header.as_deref(),
        Some(format!("$READ_BYTES: {};", tree.path().join("src/main.rs").display()).as_str())
    );

    server.stop().await;
}

#[tokio::test]
async fn test_root_reset_lists_immediate_children() {
    let tree = project_tree();
    let server = TestServer::with_defaults();
    let session = init(&server, tree.path()).await;

    server
        .send(&format!("PTDP v1 CD_SUBDIR {0};{0}", session))
        .await;
    let src = server
        .send(&format!("PTDP v1 LIST_SUBDIRS {}", session))
        .await
        .id_of("src");
    server
        .send(&format!("PTDP v1 CD_SUBDIR {};{}", session, src))
        .await;

    // Own identifier always goes back to the root
    let cd = server
        .send(&format!("PTDP v1 CD_SUBDIR {0};{0}", session))
        .await;
    assert_eq!(cd.code, 13);

    let listing = server.send(&format!("PTDP v1 LIST_DIR {}", session)).await;
    let expected: BTreeSet<String> = std::fs::read_dir(tree.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(listing.paths(), expected);

    server.stop().await;
}

#[tokio::test]
async fn test_listing_matches_walk_depth_one() {
    let tree = project_tree();
    let server = TestServer::with_defaults();
    let session = init(&server, tree.path()).await;

    server
        .send(&format!("PTDP v1 CD_SUBDIR {0};{0}", session))
        .await;
    let src = server
        .send(&format!("PTDP v1 LIST_SUBDIRS {}", session))
        .await
        .id_of("src");
    server
        .send(&format!("PTDP v1 CD_SUBDIR {};{}", session, src))
        .await;

    let files = server.send(&format!("PTDP v1 LIST_FILES {}", session)).await;
    let dirs = server
        .send(&format!("PTDP v1 LIST_SUBDIRS {}", session))
        .await;
    let listed: BTreeSet<String> = files.paths().union(&dirs.paths()).cloned().collect();

    let walk = server.send(&format!("PTDP v1 WALK_TREE {}", session)).await;
    assert_eq!(walk.code, 42);
    assert_eq!(
        walk.header.as_deref(),
        Some(format!("$WALK_TREE: {};", tree.path().join("src").display()).as_str())
    );
    let depth_one: BTreeSet<String> = walk
        .paths()
        .into_iter()
        .filter(|p| p.matches('/').count() == 1)
        .collect();

    assert_eq!(listed, depth_one);
    assert!(walk.paths().contains("src/util/mod.rs"));

    server.stop().await;
}

#[tokio::test]
async fn test_stat_entity() {
    let tree = project_tree();
    let server = TestServer::with_defaults();
    let session = init(&server, tree.path()).await;
    server
        .send(&format!("PTDP v1 CD_SUBDIR {0};{0}", session))
        .await;

    let listing = server.send(&format!("PTDP v1 LIST_DIR {}", session)).await;

    let stat = server
        .send(&format!(
            "PTDP v1 STAT_ENTITY {};{}",
            session,
            listing.id_of("README.md")
        ))
        .await;
    assert_eq!(stat.code, 23);
    assert!(stat.text().contains("kind: file;"));
    assert!(stat.text().contains("size: 10;"));

    let stat = server
        .send(&format!(
            "PTDP v1 STAT_ENTITY {};{}",
            session,
            listing.id_of("src")
        ))
        .await;
    assert_eq!(stat.code, 23);
    assert!(stat.text().contains("kind: directory;"));

    server.stop().await;
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_unknown_session_and_entity() {
    let tree = project_tree();
    let server = TestServer::with_defaults();

    let reply = server.send("PTDP v1 LIST_FILES nosuchid").await;
    assert_eq!(reply.code, 130);
    assert_eq!(reply.text(), "ERROR_NO_STATE");

    let session = init(&server, tree.path()).await;
    let reply = server
        .send(&format!("PTDP v1 CD_SUBDIR {};zzzzzzz", session))
        .await;
    assert_eq!(reply.code, 120);

    let reply = server
        .send(&format!("PTDP v1 READ_BYTES {};zzzzzzz", session))
        .await;
    assert_eq!(reply.code, 120);

    server.stop().await;
}

#[tokio::test]
async fn test_dual_argument_split_failures() {
    let server = TestServer::with_defaults();

    for arg in ["abcdef", "abc;", ";abc", "a;b;c"] {
        let reply = server.send(&format!("PTDP v1 READ_BYTES {}", arg)).await;
        assert_eq!(reply.code, 105, "argument {:?}", arg);
        assert_eq!(reply.text(), "ERROR_NEEDS_TWO_HASHES");
    }

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_requests() {
    let server = TestServer::with_defaults();

    let cases = [
        ("", "ERROR_PARSE_PROTOCOL_NAME"),
        ("GET / HTTP/1.1", "ERROR_PARSE_PROTOCOL_NAME"),
        ("PTDP v9 LIST_DIR abc", "ERROR_PARSE_VERSION_CONTROL"),
        ("PTDP v1 LIST_DIR x", "ERROR_PARSE_PATH_OR_HASH"),
        ("PTDP v1 DELETE_ALL abc", "ERROR_PARSE_COMM"),
    ];
    for (request, token) in cases {
        let reply = server.send(request).await;
        assert_eq!(reply.code, 100, "request {:?}", request);
        assert_eq!(reply.label, "PARSE_FAILED");
        assert_eq!(reply.text(), token);
    }

    server.stop().await;
}

#[tokio::test]
async fn test_read_deleted_file() {
    let tree = project_tree();
    let server = TestServer::with_defaults();
    let session = init(&server, tree.path()).await;
    server
        .send(&format!("PTDP v1 CD_SUBDIR {0};{0}", session))
        .await;
    let readme = server
        .send(&format!("PTDP v1 LIST_FILES {}", session))
        .await
        .id_of("README.md");

    std::fs::remove_file(tree.path().join("README.md")).unwrap();
    let reply = server
        .send(&format!("PTDP v1 READ_BYTES {};{}", session, readme))
        .await;
    assert_eq!(reply.code, 140);

    server.stop().await;
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[tokio::test]
async fn test_list_states() {
    let tree = project_tree();
    let server = TestServer::with_defaults();

    let empty = server.send("PTDP v1 LIST_STATES").await;
    assert_eq!(empty.code, 35);
    assert_eq!(empty.text(), "NONE");

    let a = init(&server, tree.path()).await;
    let b = init(&server, tree.path()).await;
    let listed = server.send("PTDP v1 LIST_STATES").await.text();
    assert_eq!(listed.lines().count(), 2);
    assert!(listed.contains(&format!("id={}+", a)));
    assert!(listed.contains(&format!("id={}+", b)));

    server.stop().await;
}

#[tokio::test]
async fn test_expired_session_is_gone_after_sweep() {
    let tree = project_tree();
    let server = TestServer::start(Duration::from_millis(300), Duration::from_millis(50));
    let session = init(&server, tree.path()).await;

    let live = server.send(&format!("PTDP v1 LIST_DIR {}", session)).await;
    assert_eq!(live.code, 32);

    tokio::time::sleep(Duration::from_millis(700)).await;

    let reply = server.send(&format!("PTDP v1 LIST_DIR {}", session)).await;
    assert_eq!(reply.code, 130);
    let states = server.send("PTDP v1 LIST_STATES").await;
    assert_eq!(states.text(), "NONE");

    server.stop().await;
}

#[tokio::test]
async fn test_multi_chunk_request() {
    let tree = project_tree();
    // Deep enough that the request spans several read chunks
    let mut deep = tree.path().to_path_buf();
    for i in 0..40 {
        deep.push(format!("level-{:02}-padding", i));
    }
    std::fs::create_dir_all(&deep).unwrap();

    let server = TestServer::with_defaults();
    let request = format!("PTDP v1 INIT_STATE {}", deep.display());
    assert!(request.len() > 500 && request.len() % 500 != 0);

    let reply = server.send(&request).await;
    assert_eq!(reply.code, 12);

    server.stop().await;
}
