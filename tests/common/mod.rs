use anyhow::Result;
use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, Uri, header},
};
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

pub const CPU_STATS: &str = r#"{"CpuStats":[{"ProcessName":"Raven.Server","TotalProcessorTime":"00:01:30.0000000"}]}"#;
pub const MEMORY_STATS: &str = r#"{"WorkingSet":536870912}"#;
pub const NODE_INFO: &str = r#"{"NodeTag":"A","CurrentState":"Leader"}"#;
pub const SERVER_METRICS: &str = r#"{
    "Requests":{"RequestsPerSec":{"Count":250}},
    "Docs":{"PutsPerSec":{"Count":40},"BytesPutsPerSec":{"Count":8192}},
    "MapIndexes":{"MappedPerSec":{"Count":12}},
    "MapReduceIndexes":{"MappedPerSec":{"Count":3},"ReducedPerSec":{"Count":2}}
}"#;
pub const DATABASE_STATS: &str = r#"{
    "CountOfDocuments":1059,
    "CountOfIndexes":2,
    "Indexes":[{"Name":"Orders/Totals","IsStale":true},{"Name":"Products/Search","IsStale":false}],
    "SizeOnDisk":{"SizeInBytes":84148224}
}"#;
pub const DATABASE_METRICS: &str = r#"{
    "Requests":{"RequestsPerSec":{"Count":17}},
    "Docs":{"PutsPerSec":{"Count":4},"BytesPutsPerSec":{"Count":1024}},
    "MapIndexes":{"IndexedPerSec":{"Count":6}},
    "MapReduceIndexes":{"MappedPerSec":{"Count":1},"ReducedPerSec":{"Count":1}}
}"#;

/// An in-process stand-in for a RavenDB server. Responses are keyed by path
/// and query; anything unknown is a 404.
#[derive(Clone, Default)]
pub struct MockRavenDb {
    responses: HashMap<String, (StatusCode, String)>,
}

#[allow(dead_code)]
impl MockRavenDb {
    /// A healthy node hosting the given databases, each with the same stats.
    pub fn healthy(databases: &[&str]) -> Self {
        let list: Vec<String> = databases
            .iter()
            .map(|name| format!(r#"{{"Name":"{name}"}}"#))
            .collect();

        let mut mock = Self::default()
            .with("/admin/debug/cpu/stats", CPU_STATS)
            .with("/admin/debug/memory/stats", MEMORY_STATS)
            .with("/cluster/node-info", NODE_INFO)
            .with("/admin/metrics", SERVER_METRICS)
            .with("/databases", &format!(r#"{{"Databases":[{}]}}"#, list.join(",")));

        for name in databases {
            mock = mock
                .with(&format!("/databases/{name}/stats"), DATABASE_STATS)
                .with(&format!("/databases/{name}/metrics"), DATABASE_METRICS);
        }

        mock
    }

    pub fn with(self, path: &str, body: &str) -> Self {
        self.with_status(path, StatusCode::OK, body)
    }

    pub fn with_status(mut self, path: &str, status: StatusCode, body: &str) -> Self {
        self.responses
            .insert(path.to_string(), (status, body.to_string()));
        self
    }

    pub async fn start(self) -> Result<MockServer> {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            responses: Arc::new(self.responses),
            requests: Arc::clone(&requests),
        };

        let app = Router::new().fallback(respond).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(MockServer {
            port,
            requests,
            handle,
        })
    }
}

/// A received request: path with query, and the `Authorization` header.
pub type Received = (String, Option<String>);

#[derive(Clone)]
struct MockState {
    responses: Arc<HashMap<String, (StatusCode, String)>>,
    requests: Arc<Mutex<Vec<Received>>>,
}

async fn respond(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let key = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), |p| p.as_str().to_string());

    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    if let Ok(mut requests) = state.requests.lock() {
        requests.push((key.clone(), auth));
    }

    let (status, body) = state
        .responses
        .get(&key)
        .or_else(|| state.responses.get(uri.path()))
        .cloned()
        .unwrap_or((StatusCode::NOT_FOUND, String::new()));

    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

pub struct MockServer {
    pub port: u16,
    requests: Arc<Mutex<Vec<Received>>>,
    handle: JoinHandle<()>,
}

#[allow(dead_code)]
impl MockServer {
    pub fn url(&self) -> String {
        get_test_url(self.port)
    }

    pub fn requests(&self) -> Vec<Received> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn requested(&self, path: &str) -> bool {
        self.requests().iter().any(|(p, _)| p == path)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Get an available port for testing
#[allow(dead_code)]
pub fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to ephemeral port")
        .local_addr()
        .expect("Failed to get local address")
        .port()
}

/// Build test URL for HTTP requests
#[allow(dead_code)]
pub fn get_test_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}")
}

/// Wait for server to be ready
#[allow(dead_code)]
pub async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    for _ in 0..max_attempts {
        if tokio::net::TcpStream::connect(format!("127.0.0.1:{port}"))
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(100)).await;
    }
    false
}

/// Value of the sample whose name and labels are exactly `series`.
#[allow(dead_code)]
pub fn sample(text: &str, series: &str) -> Option<f64> {
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let (name, value) = line.rsplit_once(' ')?;
            (name == series).then(|| value.parse().ok()).flatten()
        })
}

/// Every sample line (no HELP/TYPE comments).
#[allow(dead_code)]
pub fn samples(text: &str) -> Vec<&str> {
    text.lines()
        .filter(|line| !line.starts_with('#') && !line.trim().is_empty())
        .collect()
}
