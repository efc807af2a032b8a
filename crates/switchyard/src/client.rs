//! Per-service clients.
//!
//! A [`Client`] binds a service name to its endpoint, its operation files
//! and its hooks. Calls go through one pipeline:
//!
//! 1. load the operation definition (cached after the first call)
//! 2. camel-case variable keys and check required variables
//! 3. merge contexts: default < `with_context` < per call
//! 4. run before-hooks, then the adapter, then after-hooks
//!
//! ```ignore
//! let github = hub
//!     .client("Github")
//!     .default_context(Context::new().header("Authorization", "token abc"))
//!     .build();
//!
//! let response = github
//!     .operation("repository")?
//!     .variable("owner", "rails")
//!     .variable("name", "rails")
//!     .send()
//!     .await?;
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use switchyard_net::{
    BatchQuery, Context, GraphQLError, GraphQLResponse, NetworkError, Variables, runtime,
};

use crate::callbacks::CallbackPipeline;
use crate::endpoint::{Endpoint, EndpointRegistry};
use crate::error::{Error, HookError, Result};
use crate::inflect::{camelize_map, type_name};
use crate::operation::{OperationDefinition, OperationStore};

/// Builds a [`Client`]. Hooks and the default context are fixed by
/// [`build`](Self::build).
pub struct ClientBuilder {
    name: String,
    endpoints: Arc<EndpointRegistry>,
    operations: Arc<OperationStore>,
    default_context: Context,
    callbacks: CallbackPipeline,
}

impl ClientBuilder {
    pub(crate) fn new(
        name: &str,
        endpoints: Arc<EndpointRegistry>,
        operations: Arc<OperationStore>,
    ) -> Self {
        Self {
            name: type_name(name),
            endpoints,
            operations,
            default_context: Context::new(),
            callbacks: CallbackPipeline::new(),
        }
    }

    /// Context merged under every call of this client.
    pub fn default_context(mut self, context: Context) -> Self {
        self.default_context = context;
        self
    }

    /// Append a before-hook; see [`CallbackPipeline::before_execute`].
    pub fn before_execute<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &str, &Variables, &mut Context) -> std::result::Result<(), HookError>
            + Send
            + Sync
            + 'static,
    {
        self.callbacks.before_execute(hook);
        self
    }

    /// Append an after-hook; see [`CallbackPipeline::after_execute`].
    pub fn after_execute<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<&Value>, &[GraphQLError], &Map<String, Value>) -> std::result::Result<(), HookError>
            + Send
            + Sync
            + 'static,
    {
        self.callbacks.after_execute(hook);
        self
    }

    pub fn build(self) -> Client {
        Client {
            inner: Arc::new(ClientInner {
                name: self.name,
                endpoints: self.endpoints,
                operations: self.operations,
                default_context: self.default_context,
                callbacks: self.callbacks,
            }),
            context: Context::new(),
        }
    }
}

struct ClientInner {
    name: String,
    endpoints: Arc<EndpointRegistry>,
    operations: Arc<OperationStore>,
    default_context: Context,
    callbacks: CallbackPipeline,
}

/// A client for one service.
///
/// Cloning is cheap. [`with_context`](Self::with_context) returns a copy
/// bound to an extra context layer; hooks and the default context are
/// shared.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
    context: Context,
}

impl Client {
    /// Type-style service name, e.g. `Github`.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn endpoint(&self) -> Result<Arc<Endpoint>> {
        self.inner.endpoints.lookup(&self.inner.name)
    }

    pub fn default_context(&self) -> &Context {
        &self.inner.default_context
    }

    /// Context added by [`with_context`](Self::with_context) calls.
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn callbacks(&self) -> &CallbackPipeline {
        &self.inner.callbacks
    }

    /// A copy of this client with `context` merged over its own.
    pub fn with_context(&self, context: Context) -> Client {
        Client {
            inner: Arc::clone(&self.inner),
            context: self.context.deep_merge(&context),
        }
    }

    /// Look up an operation and return a call bound to it.
    pub fn operation(&self, name: &str) -> Result<OperationCall> {
        let definition = self.inner.operations.load(&self.inner.name, name)?;
        Ok(OperationCall {
            client: self.clone(),
            definition,
            variables: Variables::new(),
            context: Context::new(),
            error: None,
        })
    }

    /// Load every operation file of this service.
    pub fn preload(&self) -> Result<Vec<Arc<OperationDefinition>>> {
        self.inner.operations.preload(&self.inner.name)
    }

    /// Run `operation` with `variables` and a per-call `context`.
    pub async fn execute(
        &self,
        operation: &str,
        variables: impl Serialize,
        context: Context,
    ) -> Result<GraphQLResponse> {
        let definition = self.inner.operations.load(&self.inner.name, operation)?;
        let variables = to_variables(variables)?;
        self.run(&definition, variables, &context).await
    }

    /// [`execute`](Self::execute) on the shared runtime.
    ///
    /// Fails with a network error when called from inside an async context.
    pub fn execute_blocking(
        &self,
        operation: &str,
        variables: impl Serialize,
        context: Context,
    ) -> Result<GraphQLResponse> {
        runtime::block_on(self.execute(operation, variables, context))?
    }

    /// Send every operation queued by `build` in one adapter call.
    ///
    /// Responses come back in queue order. Nothing is sent when the queue
    /// is empty. The request carries every entry's context, hook changes
    /// included, merged in queue order; entries naming different urls are
    /// refused.
    pub async fn multiplex<F>(&self, build: F) -> Result<Vec<GraphQLResponse>>
    where
        F: FnOnce(&mut MultiplexQueue<'_>) -> Result<()>,
    {
        let mut queue = MultiplexQueue {
            client: self,
            entries: Vec::new(),
        };
        build(&mut queue)?;
        if queue.entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut validated = Vec::with_capacity(queue.entries.len());
        for (definition, variables, context) in queue.entries {
            let variables = self.validate(&definition, variables)?;
            validated.push((definition, variables, context));
        }
        let adapter = self.endpoint()?.connection()?;

        let mut queries = Vec::with_capacity(validated.len());
        for (definition, variables, context) in validated {
            let context = self.before(&definition, &variables, &context)?;
            queries.push(BatchQuery::new(
                definition.query(),
                Some(definition.name().to_string()),
                variables,
                context,
            ));
        }

        let batch_context = batch_context(&queries)?;

        tracing::debug!(
            target: "switchyard::client",
            client = %self.inner.name,
            count = queries.len(),
            "multiplexing operations"
        );

        let responses = adapter.multiplex(&queries, &batch_context).await?;
        for response in &responses {
            self.inner.callbacks.run_after(response)?;
        }
        Ok(responses)
    }

    fn validate(&self, definition: &OperationDefinition, variables: Variables) -> Result<Variables> {
        if !definition.is_executable() {
            return Err(Error::invalid_operation(
                definition.name(),
                format!("{} definitions cannot be sent", definition.kind()),
            ));
        }

        let variables = camelize_map(variables);
        let missing = definition.missing_variables(&variables);
        if !missing.is_empty() {
            return Err(Error::MissingVariable {
                operation: definition.name().to_string(),
                variables: missing,
            });
        }
        Ok(variables)
    }

    // Merged per-call context after the before-hooks have seen it.
    fn before(
        &self,
        definition: &OperationDefinition,
        variables: &Variables,
        call_context: &Context,
    ) -> Result<Context> {
        let mut context = Context::merge_layers([
            &self.inner.default_context,
            &self.context,
            call_context,
        ]);
        self.inner.callbacks.run_before(
            definition.query(),
            definition.name(),
            variables,
            &mut context,
        )?;
        Ok(context)
    }

    async fn run(
        &self,
        definition: &OperationDefinition,
        variables: Variables,
        call_context: &Context,
    ) -> Result<GraphQLResponse> {
        let variables = self.validate(definition, variables)?;
        let adapter = self.endpoint()?.connection()?;
        let context = self.before(definition, &variables, call_context)?;

        tracing::debug!(
            target: "switchyard::client",
            client = %self.inner.name,
            operation = %definition.name(),
            adapter = %adapter.kind(),
            "executing operation"
        );

        let response = adapter
            .execute(
                definition.query(),
                Some(definition.name()),
                &variables,
                &context,
            )
            .await?;

        if response.has_errors() {
            tracing::debug!(
                target: "switchyard::client",
                operation = %definition.name(),
                errors = response.errors.len(),
                "response carried errors"
            );
        }

        self.inner.callbacks.run_after(&response)?;
        Ok(response)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("name", &self.inner.name)
            .field("default_context", &self.inner.default_context)
            .field("context", &self.context)
            .field("callbacks", &self.inner.callbacks)
            .finish()
    }
}

/// A call bound to one loaded operation.
///
/// Serialization failures from [`variable`](Self::variable) and
/// [`variables`](Self::variables) are kept and reported by
/// [`send`](Self::send).
#[derive(Debug)]
pub struct OperationCall {
    client: Client,
    definition: Arc<OperationDefinition>,
    variables: Variables,
    context: Context,
    error: Option<Error>,
}

impl OperationCall {
    pub fn definition(&self) -> &OperationDefinition {
        &self.definition
    }

    /// Names of the variables this call must be given.
    pub fn required_variables(&self) -> Vec<&str> {
        self.definition.required_variables().collect()
    }

    /// Set one variable.
    pub fn variable(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.variables.insert(name.into(), value);
            }
            Err(e) => self.fail(Error::InvalidVariables(e.to_string())),
        }
        self
    }

    /// Merge a struct or map of variables.
    pub fn variables(mut self, variables: impl Serialize) -> Self {
        match to_variables(variables) {
            Ok(variables) => self.variables.extend(variables),
            Err(e) => self.fail(e),
        }
        self
    }

    /// Context for this call only, merged over the client's.
    pub fn context(mut self, context: Context) -> Self {
        self.context = self.context.deep_merge(&context);
        self
    }

    fn fail(&mut self, error: Error) {
        self.error.get_or_insert(error);
    }

    pub async fn send(self) -> Result<GraphQLResponse> {
        if let Some(error) = self.error {
            return Err(error);
        }
        self.client
            .run(&self.definition, self.variables, &self.context)
            .await
    }

    /// [`send`](Self::send) on the shared runtime.
    pub fn send_blocking(self) -> Result<GraphQLResponse> {
        runtime::block_on(self.send())?
    }
}

/// Operations collected for one multiplexed request.
pub struct MultiplexQueue<'a> {
    client: &'a Client,
    entries: Vec<(Arc<OperationDefinition>, Variables, Context)>,
}

impl MultiplexQueue<'_> {
    /// Queue `operation`; the definition is loaded immediately.
    pub fn add(
        &mut self,
        operation: &str,
        variables: impl Serialize,
        context: Context,
    ) -> Result<&mut Self> {
        let definition = self
            .client
            .inner
            .operations
            .load(&self.client.inner.name, operation)?;
        let variables = to_variables(variables)?;
        self.entries.push((definition, variables, context));
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Each entry's context already holds the default and instance layers, so
// the batch context is the entries merged in queue order. One POST has one
// target, so entries routed to different urls are refused.
fn batch_context(queries: &[BatchQuery]) -> Result<Context> {
    let mut urls = queries.iter().filter_map(|q| q.context.routing_url());
    if let Some(first) = urls.next()
        && let Some(other) = urls.find(|url| *url != first)
    {
        return Err(Error::Network(NetworkError::InvalidArgument(format!(
            "multiplexed operations must share one url (got `{first}` and `{other}`)"
        ))));
    }
    Ok(Context::merge_layers(queries.iter().map(|q| &q.context)))
}

fn to_variables(variables: impl Serialize) -> Result<Variables> {
    match serde_json::to_value(variables) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Variables::new()),
        Ok(other) => Err(Error::InvalidVariables(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(Error::InvalidVariables(e.to_string())),
    }
}
