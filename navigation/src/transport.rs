use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// HTTP methods used against the upstream API
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// Caller supplied request options. They are part of the cache key, so two
/// requests with different options never share a cache entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestOptions {
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.headers.is_empty() && self.timeout.is_none()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Could not establish a connection
    Connect,
    Timeout,
    /// Upstream answered with a non-success status
    Status(u16),
    /// Anything else: invalid request, broken body, redirect loops
    Request,
}

/// A transport level failure.
///
/// Cloneable so a client can hand the very same failure to every later
/// caller once its upstream has proven unreachable.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        TransportError {
            kind,
            message: message.into(),
        }
    }

    /// Connection failures and 4xx answers. Only these qualify for the
    /// local fixture fallback.
    pub fn is_client_or_connect(&self) -> bool {
        match self.kind {
            TransportErrorKind::Connect | TransportErrorKind::Timeout => true,
            TransportErrorKind::Status(status) => (400..500).contains(&status),
            TransportErrorKind::Request => false,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if let Some(status) = err.status() {
            TransportErrorKind::Status(status.as_u16())
        } else {
            TransportErrorKind::Request
        };
        TransportError::new(kind, err.to_string())
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends the request and returns the raw response body of a 2xx answer.
    async fn send(&self, request: ApiRequest) -> Result<String, TransportError>;
}

#[derive(Clone, Debug)]
pub struct TransportSettings {
    pub tcp_keepalive: Duration,
    /// Skips TLS verification. Only ever enabled on local deployments.
    pub accept_invalid_certs: bool,
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(settings: &TransportSettings) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .tcp_keepalive(settings.tcp_keepalive)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()?;

        Ok(ReqwestTransport { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<String, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        builder = builder.timeout(request.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(status_error(status, &request.url));
        }

        Ok(response.text().await?)
    }
}

fn status_error(status: StatusCode, url: &str) -> TransportError {
    TransportError::new(
        TransportErrorKind::Status(status.as_u16()),
        format!("Request to {url} resulted in a `{status}` response"),
    )
}
