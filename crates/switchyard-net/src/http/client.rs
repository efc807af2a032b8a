//! reqwest client setup for the three HTTP adapters.

use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;

use super::request::HttpRequestBuilder;
use crate::error::{NetworkError, Result};

/// How connections are kept between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// A connection is closed once its response has been read.
    PerRequest,
    /// HTTP/1.1 keep-alive pool of at most `max_idle` idle connections per
    /// host, each recycled after `idle_timeout`.
    Pooled {
        max_idle: usize,
        idle_timeout: Duration,
    },
    /// Pooled, and HTTP/2 is negotiated through ALPN so concurrent requests
    /// share a connection. Servers without h2 stay on HTTP/1.1.
    Multiplexed {
        max_idle: usize,
        idle_timeout: Duration,
    },
}

impl ConnectionMode {
    pub fn reuses_connections(&self) -> bool {
        !matches!(self, Self::PerRequest)
    }
}

/// Settings an [`HttpClient`] was built with.
#[derive(Clone, Debug)]
pub struct HttpClientConfig {
    /// Limit on connecting and on the whole exchange. Redirects are never
    /// followed.
    pub timeout: Duration,
    pub mode: ConnectionMode,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            mode: ConnectionMode::PerRequest,
            user_agent: format!("Switchyard/{} (Rust)", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Default)]
pub struct HttpClientBuilder {
    config: HttpClientConfig,
    headers: HeaderMap,
}

impl HttpClientBuilder {
    /// Timeout for connecting and for the whole request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn mode(mut self, mode: ConnectionMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Header sent with every request unless the request sets its own.
    pub fn default_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn build(self) -> Result<HttpClient> {
        let config = self.config;

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .redirect(Policy::none())
            .user_agent(config.user_agent.as_str())
            .default_headers(self.headers);

        builder = match config.mode {
            ConnectionMode::PerRequest => builder.pool_max_idle_per_host(0).http1_only(),
            ConnectionMode::Pooled {
                max_idle,
                idle_timeout,
            } => builder
                .http1_only()
                .pool_max_idle_per_host(max_idle)
                .pool_idle_timeout(idle_timeout),
            ConnectionMode::Multiplexed {
                max_idle,
                idle_timeout,
            } => builder
                .pool_max_idle_per_host(max_idle)
                .pool_idle_timeout(idle_timeout)
                .http2_adaptive_window(true),
        };

        let client = builder.build().map_err(NetworkError::from)?;

        tracing::trace!(
            target: "switchyard_net::http",
            mode = ?config.mode,
            timeout = ?config.timeout,
            "built HTTP client"
        );

        Ok(HttpClient {
            inner: Arc::new(Inner { client, config }),
        })
    }
}

struct Inner {
    client: reqwest::Client,
    config: HttpClientConfig,
}

/// Cheaply cloneable handle to one reqwest connection pool.
///
/// ```ignore
/// let client = HttpClient::builder()
///     .timeout(Duration::from_secs(5))
///     .mode(ConnectionMode::Pooled { max_idle: 25, idle_timeout: Duration::from_secs(1800) })
///     .build()?;
///
/// let response = client
///     .post("https://api.example.com/graphql")
///     .json(&serde_json::json!({"query": "{ viewer { login } }"}))?
///     .send()
///     .await?;
/// ```
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<Inner>,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.inner.config
    }

    /// Start a POST to `url`.
    pub fn post(&self, url: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder::new(self.clone(), url.into())
    }

    pub(crate) fn reqwest_client(&self) -> &reqwest::Client {
        &self.inner.client
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HttpClient").field(&self.inner.config).finish()
    }
}

/// Credentials taken from the user-info part of an endpoint URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}
