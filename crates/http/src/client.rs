//! Request dispatch: stub fallback, URL resolution and the JSON HTTP call.

use crate::config::{ClientConfig, RouteTable, StubTable};
use crate::error::{ApiError, Result, SoftFailure, redact_url, sanitize_reqwest_error};
use crate::request::{ApiRequest, RequestDescriptor, RequestMethod};
use crate::resolver::{RequestParams, resolve_url};
use reqwest::Client;
use reqwest::header::CACHE_CONTROL;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Route-aware JSON client.
///
/// Cheap to clone; all clones share the same catalog and connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    config: ClientConfig,
    client: Client,
}

impl ApiClient {
    /// Build a client from a static config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder().build().map_err(ApiError::from)?;
        Ok(Self::with_http_client(config, client))
    }

    /// Build a client around an existing `reqwest::Client`.
    #[must_use]
    pub fn with_http_client(config: ClientConfig, client: Client) -> Self {
        Self {
            inner: Arc::new(ApiClientInner { config, client }),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.config.base_url
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.inner.config.routes
    }

    #[must_use]
    pub fn stubs(&self) -> &StubTable {
        &self.inner.config.stubs
    }

    /// Resolve a path key against this client's routes and base URL.
    #[must_use]
    pub fn resolve_url(&self, key: &str, params: &RequestParams) -> Option<String> {
        resolve_url(self.routes(), self.base_url(), key, params)
    }

    /// Build the JSON request descriptor for `method` and an optional payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn descriptor(
        &self,
        method: RequestMethod,
        payload: Option<&Value>,
    ) -> Result<RequestDescriptor> {
        RequestDescriptor::json(method, payload)
    }

    /// Dispatch a request.
    ///
    /// With `use_mock` set and a stub registered for the key, the stub is returned and no call is
    /// made. Otherwise the URL is resolved, the request sent, and the JSON body returned.
    ///
    /// # Errors
    ///
    /// - [`ApiError::MissingUrl`] if the key has no usable route
    /// - [`ApiError::Soft`] on a non-success status with `use_custom_error_handler`
    /// - [`ApiError::RequestFailed`] on a non-success status otherwise
    /// - [`ApiError::Transport`] / [`ApiError::Decode`] for network and body failures
    pub async fn dispatch(&self, request: &ApiRequest) -> Result<Value> {
        if request.use_mock
            && let Some(stub) = self.stubs().get(&request.key)
        {
            debug!(key = %request.key, "serving stub response");
            return Ok(stub.clone());
        }

        let Some(url) = self.resolve_url(&request.key, &request.params) else {
            warn!(key = %request.key, "no route for path key");
            return Err(ApiError::MissingUrl);
        };
        let url = Url::parse(&url)
            .map_err(|e| ApiError::Transport(format!("Invalid URL for '{}': {e}", request.key)))?;

        let descriptor = self.descriptor(request.method, request.payload.as_ref())?;
        self.execute(&request.key, url, descriptor, request).await
    }

    async fn execute(
        &self,
        key: &str,
        url: Url,
        descriptor: RequestDescriptor,
        request: &ApiRequest,
    ) -> Result<Value> {
        let redacted = redact_url(&url);
        debug!(key = %key, method = %descriptor.method, url = %redacted, "dispatching request");

        let mut builder = self
            .inner
            .client
            .request(descriptor.method.into(), url)
            .headers(descriptor.headers);
        if let Some(cache_control) = request.transport.cache_control() {
            builder = builder.header(CACHE_CONTROL, cache_control);
        }
        if let Some(body) = descriptor.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = self.timeout() {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            warn!(key = %key, status = status.as_u16(), url = %redacted, "request failed");
            if request.use_custom_error_handler {
                let body =
                    read_response_body_lossy(response, self.inner.config.max_response_bytes)
                        .await;
                return Err(ApiError::Soft(SoftFailure {
                    status,
                    url: redacted,
                    body,
                }));
            }
            return Err(ApiError::RequestFailed { status });
        }

        let bytes =
            read_response_body_limited_bytes(response, self.inner.config.max_response_bytes)
                .await?;
        serde_json::from_slice(&bytes).map_err(ApiError::Decode)
    }

    fn timeout(&self) -> Option<Duration> {
        match self.inner.config.timeout_secs {
            None | Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        }
    }
}

async fn read_response_body_limited_bytes(
    mut response: reqwest::Response,
    max_bytes: Option<usize>,
) -> Result<Vec<u8>> {
    let Some(max) = max_bytes else {
        let bytes = response.bytes().await.map_err(ApiError::from)?;
        return Ok(bytes.to_vec());
    };

    if let Some(len) = response.content_length()
        && len > max as u64
    {
        return Err(ApiError::Transport(format!(
            "Response too large: {len} bytes (limit {max})"
        )));
    }

    let mut out: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(ApiError::from)? {
        if out.len().saturating_add(chunk.len()) > max {
            return Err(ApiError::Transport(format!(
                "Response too large: exceeded {max} bytes"
            )));
        }
        out.extend_from_slice(&chunk);
    }

    Ok(out)
}

/// Read an error body for reporting: truncated to `max_bytes`, empty on read failure.
async fn read_response_body_lossy(
    mut response: reqwest::Response,
    max_bytes: Option<usize>,
) -> String {
    let mut out: Vec<u8> = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                out.extend_from_slice(&chunk);
                if let Some(max) = max_bytes
                    && out.len() >= max
                {
                    out.truncate(max);
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %sanitize_reqwest_error(&e), "failed to read error body");
                out.clear();
                break;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
