//! Interchangeable transports for GraphQL operations.
//!
//! Every adapter implements [`Adapter`]: `execute` sends one operation and
//! `multiplex` sends a batch as `{"_json": [...]}`. Adapters are selected by
//! [`AdapterKind`] through [`build_adapter`].
//!
//! | kind | transport |
//! |---|---|
//! | `direct_http` | fresh connection per call |
//! | `persistent_http` | pooled HTTP/1.1 keep-alive client, idle connections recycled after 30 minutes |
//! | `multiplexed_http` | pooled client negotiating HTTP/2 |
//! | `multi_domain` | routes each call by the context `url` to a per-URL delegate |
//! | `test` | no I/O; records calls and answers from a [`StubRegistry`] |
//!
//! # Status classification
//!
//! HTTP adapters read 200 and 400 answers as envelopes, raise
//! [`NetworkError::GraphQLServerError`] for 5xx and degrade anything else to
//! `{"errors": [{"message": "<status> <body>"}]}`.

mod direct;
mod multi_domain;
mod multiplexed;
mod persistent;
mod transport;

pub use direct::DirectHttpAdapter;
pub use multi_domain::MultiDomainAdapter;
pub use multiplexed::MultiplexedHttpAdapter;
pub use persistent::PersistentHttpAdapter;
pub use test::TestAdapter;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::{NetworkError, Result};
use crate::graphql::{BatchQuery, GraphQLResponse, Variables};
use crate::stubs::StubRegistry;

/// Default whole-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection pool size.
pub const DEFAULT_POOL_SIZE: usize = 25;

/// Idle time after which pooled connections are recycled.
pub const IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Selects an adapter implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    /// A new connection for every call.
    #[default]
    DirectHttp,
    /// A pooled keep-alive client.
    PersistentHttp,
    /// A pooled client negotiating HTTP/2.
    MultiplexedHttp,
    /// Per-URL routing to a delegate adapter.
    MultiDomain,
    /// In-memory test double.
    Test,
}

impl AdapterKind {
    /// The configuration name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectHttp => "direct_http",
            Self::PersistentHttp => "persistent_http",
            Self::MultiplexedHttp => "multiplexed_http",
            Self::MultiDomain => "multi_domain",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdapterKind {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "direct_http" => Ok(Self::DirectHttp),
            "persistent_http" => Ok(Self::PersistentHttp),
            "multiplexed_http" => Ok(Self::MultiplexedHttp),
            "multi_domain" => Ok(Self::MultiDomain),
            "test" => Ok(Self::Test),
            other => Err(NetworkError::InvalidArgument(format!(
                "unknown adapter `{other}`"
            ))),
        }
    }
}

/// Everything an adapter needs at construction.
#[derive(Debug, Clone)]
pub struct AdapterOptions {
    /// Owning service name, used in logs.
    pub service_name: String,
    /// Endpoint URL. Required by the HTTP adapters.
    pub url: String,
    /// Connect and read timeout.
    pub timeout: Duration,
    /// Pool size for the pooled adapters.
    pub pool_size: usize,
    /// Kind the multi-domain router builds for each URL.
    pub delegate: AdapterKind,
    /// Registry consulted by the test adapter.
    pub stubs: Arc<StubRegistry>,
}

impl AdapterOptions {
    /// Options with default timeout, pool size and delegate.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            url: String::new(),
            timeout: DEFAULT_TIMEOUT,
            pool_size: DEFAULT_POOL_SIZE,
            delegate: AdapterKind::DirectHttp,
            stubs: Arc::new(StubRegistry::new()),
        }
    }

    /// Set the endpoint URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the pool size.
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Set the multi-domain delegate kind.
    pub fn delegate(mut self, delegate: AdapterKind) -> Self {
        self.delegate = delegate;
        self
    }

    /// Share a stub registry with the test adapter.
    pub fn stubs(mut self, stubs: Arc<StubRegistry>) -> Self {
        self.stubs = stubs;
        self
    }
}

/// A transport able to execute GraphQL operations.
#[async_trait]
pub trait Adapter: Send + Sync + fmt::Debug {
    /// Which implementation this is.
    fn kind(&self) -> AdapterKind;

    /// The service this adapter was built for.
    fn service_name(&self) -> &str;

    /// The fixed endpoint URL. `None` for adapters routing per call.
    fn url(&self) -> Option<&str>;

    /// Execute one operation.
    async fn execute(
        &self,
        document: &str,
        operation_name: Option<&str>,
        variables: &Variables,
        context: &Context,
    ) -> Result<GraphQLResponse>;

    /// Execute a batch in one request; envelopes come back in request order.
    async fn multiplex(
        &self,
        queries: &[BatchQuery],
        context: &Context,
    ) -> Result<Vec<GraphQLResponse>>;
}

/// Build an adapter of `kind`.
pub fn build_adapter(kind: AdapterKind, options: &AdapterOptions) -> Result<Arc<dyn Adapter>> {
    tracing::debug!(
        target: "switchyard_net::adapter",
        service = %options.service_name,
        adapter = %kind,
        "building adapter"
    );

    let adapter: Arc<dyn Adapter> = match kind {
        AdapterKind::DirectHttp => Arc::new(DirectHttpAdapter::new(options)?),
        AdapterKind::PersistentHttp => Arc::new(PersistentHttpAdapter::new(options)?),
        AdapterKind::MultiplexedHttp => Arc::new(MultiplexedHttpAdapter::new(options)?),
        AdapterKind::MultiDomain => Arc::new(MultiDomainAdapter::new(options)?),
        AdapterKind::Test => Arc::new(TestAdapter::new(options)),
    };
    Ok(adapter)
}
