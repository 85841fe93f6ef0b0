//! Single HTTP exchange with a bounded timeout.
//!
//! [`Transport::send`] takes a [`SignedEnvelope`] and derives the `Signature`
//! header from it, so the transmitted bytes are always the signed bytes.
//! It never fails with an error type: every outcome, including connection
//! failures and timeouts, is reported as a [`TransportOutcome`]. A response whose body parses as JSON is `ok`
//! regardless of HTTP status, because the gateway reports business failures
//! through the body `code`.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use baokim::{GatewayConfig, SignedEnvelope};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method};
use reqwest::Client;
use serde_json::Value;

use crate::constants::JSON_CONTENT_TYPE;
use crate::headers::signed_headers;

/// A boxed, `Send` future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error string reported when the timeout elapses.
pub const TIMEOUT_ERROR: &str = "timeout";

/// Number of characters of the `Authorization` value kept in logs.
const LOGGED_AUTHORIZATION_CHARS: usize = 20;

/// Uniform result of one HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportOutcome {
    /// `true` iff a response arrived and its body parsed as JSON.
    pub ok: bool,
    /// HTTP status, or `0` if no response arrived.
    pub http_status: u16,
    /// The parsed body.
    pub body: Option<Value>,
    /// Failure cause.
    pub error: Option<String>,
}

impl TransportOutcome {
    /// A response with a parseable body.
    #[must_use]
    pub const fn parsed(http_status: u16, body: Value) -> Self {
        Self {
            ok: true,
            http_status,
            body: Some(body),
            error: None,
        }
    }

    /// A failed exchange.
    #[must_use]
    pub fn failed(http_status: u16, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            http_status,
            body: None,
            error: Some(error.into()),
        }
    }

    /// The timeout elapsed before a complete response arrived.
    #[must_use]
    pub fn timed_out() -> Self {
        Self::failed(0, TIMEOUT_ERROR)
    }

    /// Returns the body of a successful exchange, or the failure cause.
    ///
    /// # Errors
    ///
    /// Returns the cause string when `ok` is `false`.
    pub fn into_body(self) -> Result<Value, String> {
        match (self.ok, self.body) {
            (true, Some(body)) => Ok(body),
            _ => Err(self
                .error
                .unwrap_or_else(|| format!("HTTP error {}", self.http_status))),
        }
    }
}

/// Executes one HTTP call.
pub trait Transport: Send + Sync {
    /// Sends the envelope's body to `endpoint` with its `Signature` header,
    /// plus `Authorization` when given.
    ///
    /// `endpoint` is either a path relative to the base URL or an absolute
    /// `http(s)://` URL. `Content-Type` and `Accept` are always set to JSON.
    fn send<'a>(
        &'a self,
        method: Method,
        endpoint: &'a str,
        envelope: SignedEnvelope,
        authorization: Option<String>,
    ) -> BoxFuture<'a, TransportOutcome>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport for a base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            timeout,
        }
    }

    /// Creates a transport from gateway configuration.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(&config.base_url, config.timeout())
    }

    /// Uses a preconfigured `reqwest` client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Returns the base URL, without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Joins a relative endpoint to the base URL; absolute URLs pass through.
    #[must_use]
    pub fn resolve_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_owned()
        } else if endpoint.starts_with('/') {
            format!("{}{endpoint}", self.base_url)
        } else {
            format!("{}/{endpoint}", self.base_url)
        }
    }

    async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        envelope: SignedEnvelope,
        authorization: Option<String>,
    ) -> TransportOutcome {
        let url = self.resolve_url(endpoint);
        let mut headers = match signed_headers(envelope.signature(), authorization.as_deref()) {
            Ok(headers) => headers,
            Err(e) => return TransportOutcome::failed(0, format!("invalid header value: {e}")),
        };
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        log_request(&method, &url, &headers);

        let start = Instant::now();
        let request = self
            .client
            .request(method, &url)
            .headers(headers)
            .body(envelope.body().to_vec());
        let exchange = async {
            let response = request.send().await.map_err(|e| (0, error_chain(&e)))?;
            let status = response.status().as_u16();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| (status, error_chain(&e)))?;
            Ok::<_, (u16, String)>((status, bytes))
        };

        let outcome = match tokio::time::timeout(self.timeout, exchange).await {
            Err(_) => TransportOutcome::timed_out(),
            Ok(Err((status, cause))) => TransportOutcome::failed(status, cause),
            Ok(Ok((status, bytes))) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(body) => TransportOutcome::parsed(status, body),
                Err(e) => TransportOutcome::failed(status, format!("malformed response body: {e}")),
            },
        };

        log_outcome(&url, &outcome, start.elapsed());
        outcome
    }
}

impl Transport for HttpTransport {
    fn send<'a>(
        &'a self,
        method: Method,
        endpoint: &'a str,
        envelope: SignedEnvelope,
        authorization: Option<String>,
    ) -> BoxFuture<'a, TransportOutcome> {
        Box::pin(self.execute(method, endpoint, envelope, authorization))
    }
}

/// Renders headers for logging with the `Authorization` value truncated.
#[must_use]
pub fn sanitize_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes());
            let value = if name == AUTHORIZATION {
                truncate(&value, LOGGED_AUTHORIZATION_CHARS)
            } else {
                value.into_owned()
            };
            (name.as_str().to_owned(), value)
        })
        .collect()
}

fn truncate(value: &str, keep: usize) -> String {
    if value.chars().count() <= keep {
        value.to_owned()
    } else {
        let head: String = value.chars().take(keep).collect();
        format!("{head}...")
    }
}

/// Formats an error with its source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(feature = "telemetry")]
fn log_request(method: &Method, url: &str, headers: &HeaderMap) {
    tracing::debug!(
        %method,
        url,
        headers = ?sanitize_headers(headers),
        "Sending gateway request"
    );
}

#[cfg(not(feature = "telemetry"))]
const fn log_request(_method: &Method, _url: &str, _headers: &HeaderMap) {}

#[cfg(feature = "telemetry")]
fn log_outcome(url: &str, outcome: &TransportOutcome, elapsed: Duration) {
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    if outcome.ok {
        tracing::debug!(
            url,
            status = outcome.http_status,
            duration_ms,
            "Received gateway response"
        );
    } else {
        tracing::warn!(
            url,
            status = outcome.http_status,
            duration_ms,
            error = outcome.error.as_deref().unwrap_or_default(),
            "Gateway request failed"
        );
    }
}

#[cfg(not(feature = "telemetry"))]
const fn log_outcome(_url: &str, _outcome: &TransportOutcome, _elapsed: Duration) {}
