//! Service endpoints and their registry.
//!
//! An [`Endpoint`] owns one adapter and one schema, both built on first use
//! and kept for the endpoint's lifetime. The [`EndpointRegistry`] maps
//! service names to endpoints; `Github`, `github` and `GitHub`-style names
//! are normalised to the same snake_case key.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use switchyard_net::graphql::{INTROSPECTION_OPERATION, INTROSPECTION_QUERY};
use switchyard_net::{
    Adapter, AdapterKind, AdapterOptions, Context, DEFAULT_POOL_SIZE, DEFAULT_TIMEOUT,
    StubRegistry, Variables, build_adapter,
};
use tokio::sync::OnceCell;

use crate::error::{Error, Result};
use crate::inflect::service_slug;

/// Connection settings for one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// GraphQL endpoint URL.
    pub url: String,
    /// Transport used for this service.
    pub adapter: AdapterKind,
    /// Connect and read timeout, written in seconds.
    #[serde(deserialize_with = "seconds::deserialize", serialize_with = "seconds::serialize")]
    pub timeout: Duration,
    /// Pool size for the pooled adapters.
    pub pool_size: usize,
    /// Introspection JSON loaded instead of querying the server.
    pub schema_path: Option<PathBuf>,
    /// Kind the multi-domain router builds per URL.
    pub delegate: AdapterKind,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            adapter: AdapterKind::DirectHttp,
            timeout: DEFAULT_TIMEOUT,
            pool_size: DEFAULT_POOL_SIZE,
            schema_path: None,
            delegate: AdapterKind::DirectHttp,
        }
    }
}

impl EndpointConfig {
    /// Config for `url` with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Set the adapter kind.
    pub fn adapter(mut self, adapter: AdapterKind) -> Self {
        self.adapter = adapter;
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

    /// Load the schema from this file.
    pub fn schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_path = Some(path.into());
        self
    }

    /// Set the multi-domain delegate kind.
    pub fn delegate(mut self, delegate: AdapterKind) -> Self {
        self.delegate = delegate;
        self
    }
}

mod seconds {
    use super::{Deserialize, Deserializer, Duration, Serializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }

    pub fn serialize<S: Serializer>(
        timeout: &Duration,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f64(timeout.as_secs_f64())
    }
}

/// An introspection result.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    raw: Value,
}

impl Schema {
    /// Accepts `{"data": {"__schema": ..}}`, `{"__schema": ..}` or the bare
    /// `__schema` object.
    pub fn from_introspection(value: Value) -> Result<Self> {
        let raw = match value {
            Value::Object(mut map) => {
                if let Some(Value::Object(mut data)) = map.remove("data") {
                    data.remove("__schema")
                } else if let Some(schema) = map.remove("__schema") {
                    Some(schema)
                } else if map.contains_key("types") {
                    Some(Value::Object(map))
                } else {
                    None
                }
            }
            _ => None,
        };

        match raw {
            Some(raw @ Value::Object(_)) => Ok(Self { raw }),
            _ => Err(Error::Schema("introspection result has no `__schema`".into())),
        }
    }

    /// The raw `__schema` object.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Name of the query root type.
    pub fn query_type(&self) -> Option<&str> {
        self.raw.pointer("/queryType/name").and_then(Value::as_str)
    }

    /// Name of the mutation root type.
    pub fn mutation_type(&self) -> Option<&str> {
        self.raw.pointer("/mutationType/name").and_then(Value::as_str)
    }

    /// Names of every type in the schema.
    pub fn type_names(&self) -> Vec<&str> {
        self.raw
            .get("types")
            .and_then(Value::as_array)
            .map(|types| {
                types
                    .iter()
                    .filter_map(|t| t.get("name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a type with this name exists.
    pub fn has_type(&self, name: &str) -> bool {
        self.type_names().contains(&name)
    }
}

/// One registered service.
#[derive(Debug)]
pub struct Endpoint {
    name: String,
    config: EndpointConfig,
    stubs: Arc<StubRegistry>,
    suppress_schema_warnings: bool,
    connection: Mutex<Option<Arc<dyn Adapter>>>,
    schema: OnceCell<Arc<Schema>>,
}

impl Endpoint {
    fn new(
        name: String,
        config: EndpointConfig,
        stubs: Arc<StubRegistry>,
        suppress_schema_warnings: bool,
    ) -> Self {
        Self {
            name,
            config,
            stubs,
            suppress_schema_warnings,
            connection: Mutex::new(None),
            schema: OnceCell::new(),
        }
    }

    /// Registry key of this service.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registered configuration.
    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// GraphQL endpoint URL.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Configured adapter kind.
    pub fn adapter_kind(&self) -> AdapterKind {
        self.config.adapter
    }

    /// Configured timeout.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Configured pool size.
    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    /// Configured schema file.
    pub fn schema_path(&self) -> Option<&Path> {
        self.config.schema_path.as_deref()
    }

    /// The adapter for this service, built on first call.
    pub fn connection(&self) -> Result<Arc<dyn Adapter>> {
        let mut connection = self.connection.lock();
        if let Some(adapter) = connection.as_ref() {
            return Ok(adapter.clone());
        }

        let options = AdapterOptions::new(self.name.clone())
            .url(self.config.url.clone())
            .timeout(self.config.timeout)
            .pool_size(self.config.pool_size)
            .delegate(self.config.delegate)
            .stubs(self.stubs.clone());
        let adapter = build_adapter(self.config.adapter, &options)?;

        tracing::debug!(
            target: "switchyard::endpoint",
            service = %self.name,
            adapter = %self.config.adapter,
            "connection established"
        );

        *connection = Some(adapter.clone());
        Ok(adapter)
    }

    /// The schema for this service, loaded on first call.
    ///
    /// Read from `schema_path` when configured, otherwise fetched with an
    /// introspection query over [`connection`](Self::connection).
    pub async fn schema(&self) -> Result<Arc<Schema>> {
        self.schema
            .get_or_try_init(|| async { self.load_schema().await.map(Arc::new) })
            .await
            .cloned()
    }

    async fn load_schema(&self) -> Result<Schema> {
        if let Some(path) = &self.config.schema_path {
            let source = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| Error::io(path, e))?;
            let value: Value =
                serde_json::from_str(&source).map_err(|e| Error::parse(path, e.to_string()))?;

            tracing::debug!(
                target: "switchyard::endpoint",
                service = %self.name,
                path = %path.display(),
                "schema loaded from file"
            );
            return Schema::from_introspection(value);
        }

        let response = self
            .connection()?
            .execute(
                INTROSPECTION_QUERY,
                Some(INTROSPECTION_OPERATION),
                &Variables::new(),
                &Context::new(),
            )
            .await?;

        if let Some(message) = response.error_message() {
            if self.suppress_schema_warnings {
                tracing::debug!(
                    target: "switchyard::endpoint",
                    service = %self.name,
                    errors = %message,
                    "introspection returned errors"
                );
            } else {
                tracing::warn!(
                    target: "switchyard::endpoint",
                    service = %self.name,
                    errors = %message,
                    "introspection returned errors"
                );
            }
        }

        let data = response
            .data
            .ok_or_else(|| Error::Schema(format!("introspection for `{}` returned no data", self.name)))?;
        Schema::from_introspection(serde_json::json!({ "data": data }))
    }
}

/// Service name to endpoint map.
#[derive(Debug)]
pub struct EndpointRegistry {
    endpoints: RwLock<HashMap<String, Arc<Endpoint>>>,
    stubs: Arc<StubRegistry>,
    suppress_schema_warnings: AtomicBool,
}

impl EndpointRegistry {
    /// Create a registry whose test adapters record into `stubs`.
    pub fn new(stubs: Arc<StubRegistry>) -> Self {
        Self {
            endpoints: RwLock::new(HashMap::new()),
            stubs,
            suppress_schema_warnings: AtomicBool::new(false),
        }
    }

    /// Lower schema-load warnings to debug for endpoints registered afterwards.
    pub fn set_suppress_warnings_on_schema_load(&self, suppress: bool) {
        self.suppress_schema_warnings.store(suppress, Ordering::Relaxed);
    }

    /// Register or replace a service.
    pub fn register(&self, name: &str, config: EndpointConfig) -> Arc<Endpoint> {
        let key = service_slug(name);
        let endpoint = Arc::new(Endpoint::new(
            key.clone(),
            config,
            self.stubs.clone(),
            self.suppress_schema_warnings.load(Ordering::Relaxed),
        ));

        let replaced = self.endpoints.write().insert(key.clone(), endpoint.clone());
        tracing::debug!(
            target: "switchyard::endpoint",
            service = %key,
            adapter = %endpoint.adapter_kind(),
            replaced = replaced.is_some(),
            "registered endpoint"
        );
        endpoint
    }

    /// Register every endpoint in `endpoints`.
    pub fn register_all<'a>(
        &self,
        endpoints: impl IntoIterator<Item = (&'a String, &'a EndpointConfig)>,
    ) {
        for (name, config) in endpoints {
            self.register(name, config.clone());
        }
    }

    /// Look a service up.
    pub fn lookup(&self, name: &str) -> Result<Arc<Endpoint>> {
        self.endpoints
            .read()
            .get(&service_slug(name))
            .cloned()
            .ok_or_else(|| Error::endpoint_not_found(name))
    }

    /// Sorted registry keys.
    pub fn registered_service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.endpoints.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove a service.
    pub fn unregister(&self, name: &str) -> Option<Arc<Endpoint>> {
        self.endpoints.write().remove(&service_slug(name))
    }

    /// Remove every service.
    pub fn clear(&self) {
        self.endpoints.write().clear();
    }
}
