//! Switchyard: file-defined GraphQL operations bound to per-service clients.
//!
//! Operations live in `.graphql` files, one per operation, grouped by
//! service:
//!
//! ```text
//! app/operations/
//!   github/
//!     repository.graphql
//!     user_repositories.graphql
//! ```
//!
//! A [`Switchyard`] hub owns the process-wide services: the
//! [`OperationStore`] that loads and caches those files, the
//! [`EndpointRegistry`] holding one adapter per service, and the stub
//! registry that test adapters answer from. Clients are built from the hub.
//!
//! # Example
//!
//! ```ignore
//! use switchyard::{Context, EndpointConfig, Switchyard};
//! use switchyard_net::AdapterKind;
//!
//! let hub = Switchyard::new(["app/operations"]);
//! hub.register(
//!     "github",
//!     EndpointConfig::new("https://api.github.com/graphql").adapter(AdapterKind::PersistentHttp),
//! );
//!
//! let github = hub.client("Github").build();
//! let response = github
//!     .execute("repository", json!({"owner": "rails", "name": "rails"}), Context::new())
//!     .await?;
//! let name: String = response.field("repository")?;
//! ```
//!
//! # Testing
//!
//! Register the service with the `test` adapter and stub operations from
//! fixture files; see [`testing`].

pub mod callbacks;
pub mod client;
pub mod config;
pub mod endpoint;
mod error;
pub mod inflect;
pub mod operation;
pub mod testing;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use callbacks::{AfterExecuteHook, BeforeExecuteHook, CallbackPipeline};
pub use client::{Client, ClientBuilder, MultiplexQueue, OperationCall};
pub use config::SwitchyardConfig;
pub use endpoint::{Endpoint, EndpointConfig, EndpointRegistry, Schema};
pub use error::{Error, HookError, Result};
pub use operation::{OperationDefinition, OperationKind, OperationStore, VariableDefinition};
pub use switchyard_net::{AdapterKind, Context, GraphQLError, GraphQLResponse, Variables};
pub use testing::{FixtureLibrary, GraphQLStubs};

use switchyard_net::StubRegistry;

/// Owner of the operation store, endpoint registry and stubs.
///
/// Tests build one hub each; nothing here is global.
#[derive(Debug)]
pub struct Switchyard {
    operations: Arc<OperationStore>,
    endpoints: Arc<EndpointRegistry>,
    stubs: Arc<StubRegistry>,
    testing: GraphQLStubs,
}

impl Switchyard {
    /// A hub searching `query_paths` for operation files, with no
    /// endpoints and no fixture root.
    pub fn new<I, P>(query_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::assemble(OperationStore::new(query_paths), None)
    }

    fn assemble(operations: OperationStore, fixture_path: Option<PathBuf>) -> Self {
        let stubs = Arc::new(StubRegistry::new());
        let endpoints = Arc::new(EndpointRegistry::new(Arc::clone(&stubs)));
        let testing = GraphQLStubs::new(
            Arc::new(FixtureLibrary::new(fixture_path)),
            Arc::clone(&stubs),
        );
        Self {
            operations: Arc::new(operations),
            endpoints,
            stubs,
            testing,
        }
    }

    /// Build a hub from a configuration document.
    pub fn from_config(config: &SwitchyardConfig) -> Self {
        let operations = OperationStore::new(config.query_paths.iter().cloned())
            .with_fragment_files(config.fragment_files);
        let hub = Self::assemble(operations, config.fixture_path.clone());

        hub.endpoints
            .set_suppress_warnings_on_schema_load(config.suppress_warnings_on_schema_load);
        hub.endpoints.register_all(&config.endpoints);

        tracing::debug!(
            target: "switchyard::config",
            query_paths = config.query_paths.len(),
            endpoints = config.endpoints.len(),
            "hub configured"
        );
        hub
    }

    /// [`SwitchyardConfig::load`] followed by [`from_config`](Self::from_config).
    pub fn load_config(path: impl AsRef<Path>) -> Result<Self> {
        SwitchyardConfig::load(path).map(|config| Self::from_config(&config))
    }

    /// Replace the fixture root used by [`testing`](Self::testing).
    pub fn with_fixture_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.testing = GraphQLStubs::new(
            Arc::new(FixtureLibrary::new(Some(path.into()))),
            Arc::clone(&self.stubs),
        );
        self
    }

    /// Register (or replace) a service endpoint.
    pub fn register(&self, name: &str, config: EndpointConfig) -> Arc<Endpoint> {
        self.endpoints.register(name, config)
    }

    /// Start building a client for `service`.
    pub fn client(&self, service: &str) -> ClientBuilder {
        ClientBuilder::new(
            service,
            Arc::clone(&self.endpoints),
            Arc::clone(&self.operations),
        )
    }

    pub fn operations(&self) -> &Arc<OperationStore> {
        &self.operations
    }

    pub fn endpoints(&self) -> &Arc<EndpointRegistry> {
        &self.endpoints
    }

    pub fn stub_registry(&self) -> &Arc<StubRegistry> {
        &self.stubs
    }

    pub fn testing(&self) -> &GraphQLStubs {
        &self.testing
    }

    /// Drop every endpoint, cached operation, fixture and stub.
    pub fn reset(&self) {
        self.endpoints.clear();
        self.operations.clear();
        self.testing.fixtures().clear();
        self.stubs.reset();
    }
}
