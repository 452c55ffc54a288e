use anyhow::Context as _;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::routing::any;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// An in-process HTTP server bound to an ephemeral localhost port.
///
/// The server is shut down when the value is dropped.
pub struct TestServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl TestServer {
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of requests served by the echo routes so far.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Stop the server and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the server task panicked or the listener failed.
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("server task join")?
                .context("server result")?;
        }
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Serve an echo API:
/// - `/status/{code}` answers with that status and a plain-text body `boom {code}`
/// - `/text` answers `200 text/plain` with a body that is not JSON
/// - `/slow` answers `200` with an empty JSON object after two seconds
/// - every other path answers `200` with a JSON description of the request it received
///
/// # Errors
///
/// Returns an error if binding the ephemeral port fails.
pub async fn spawn_echo_server() -> anyhow::Result<TestServer> {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/status/{code}", any(status_handler))
        .route("/text", any(text_handler))
        .route("/slow", any(slow_handler))
        .fallback(echo_handler)
        .with_state(hits.clone());
    spawn(app, hits).await
}

async fn spawn(app: Router, hits: Arc<AtomicUsize>) -> anyhow::Result<TestServer> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind ephemeral port")?;
    let addr = listener.local_addr().context("local_addr")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = shutdown_rx.await;
    });
    let handle = tokio::spawn(async move { server.await });

    Ok(TestServer {
        base_url: format!("http://{addr}"),
        hits,
        shutdown: Some(shutdown_tx),
        handle: Some(handle),
    })
}

async fn echo_handler(
    State(hits): State<Arc<AtomicUsize>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> axum::Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    axum::Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query().unwrap_or(""),
        "contentType": header("content-type"),
        "cacheControl": header("cache-control"),
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn status_handler(
    State(hits): State<Arc<AtomicUsize>>,
    Path(code): Path<u16>,
) -> (StatusCode, String) {
    hits.fetch_add(1, Ordering::SeqCst);
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, format!("boom {code}"))
}

async fn text_handler(
    State(hits): State<Arc<AtomicUsize>>,
) -> ([(axum::http::HeaderName, &'static str); 1], &'static str) {
    hits.fetch_add(1, Ordering::SeqCst);
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain")],
        "plain text, not json",
    )
}

async fn slow_handler(State(hits): State<Arc<AtomicUsize>>) -> axum::Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(2)).await;
    axum::Json(json!({}))
}
