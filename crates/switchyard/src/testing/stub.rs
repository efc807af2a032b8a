//! Registering fixtures as canned responses.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use switchyard_net::{ArgumentMatcher, RecordedRequest, StubRegistry, TestResponse, Variables};

use super::fixtures::{FixtureLibrary, FixtureSet};
use crate::error::{Error, Result};
use crate::inflect::{camelize_map, namespaced};

/// Entry point for stubbing operations of services that use the test
/// adapter.
///
/// ```ignore
/// let stubs = hub.testing();
/// stubs.stub("Github", "repository")?.to_return("rails")?;
/// stubs
///     .stub_with("Github", "repository", json!({"owner": "rails", "name": "arel"}))?
///     .to_return("arel")?;
/// ```
#[derive(Debug, Clone)]
pub struct GraphQLStubs {
    fixtures: Arc<FixtureLibrary>,
    registry: Arc<StubRegistry>,
}

impl GraphQLStubs {
    pub fn new(fixtures: Arc<FixtureLibrary>, registry: Arc<StubRegistry>) -> Self {
        Self { fixtures, registry }
    }

    pub fn fixtures(&self) -> &FixtureLibrary {
        &self.fixtures
    }

    pub fn registry(&self) -> &Arc<StubRegistry> {
        &self.registry
    }

    /// Stub `operation` for any variables.
    pub fn stub(&self, service: &str, operation: &str) -> Result<StubBuilder> {
        self.builder(service, operation, ArgumentMatcher::Any)
    }

    /// Stub `operation` for exactly these variables. Keys are camel-cased
    /// the way call variables are.
    pub fn stub_with(
        &self,
        service: &str,
        operation: &str,
        arguments: impl Serialize,
    ) -> Result<StubBuilder> {
        let arguments = match serde_json::to_value(arguments) {
            Ok(Value::Object(map)) => camelize_map(map),
            Ok(other) => {
                return Err(Error::InvalidVariables(format!(
                    "stub arguments must be an object, got {other}"
                )));
            }
            Err(e) => return Err(Error::InvalidVariables(e.to_string())),
        };
        self.builder(service, operation, ArgumentMatcher::Exact(arguments))
    }

    fn builder(
        &self,
        service: &str,
        operation: &str,
        arguments: ArgumentMatcher,
    ) -> Result<StubBuilder> {
        let fixtures = self.fixtures.find(service, operation)?;
        Ok(StubBuilder {
            operation_name: namespaced(service, fixtures.name()),
            arguments,
            fixtures,
            registry: Arc::clone(&self.registry),
        })
    }

    /// Requests recorded by test adapters, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.registry.requests()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.registry.last_request()
    }

    pub fn responses(&self) -> Vec<TestResponse> {
        self.registry.responses()
    }

    /// Clear recorded requests and registered responses.
    pub fn reset(&self) {
        self.registry.reset();
    }
}

/// A pending stub; nothing is registered until [`to_return`](Self::to_return).
#[derive(Debug)]
pub struct StubBuilder {
    operation_name: String,
    arguments: ArgumentMatcher,
    fixtures: FixtureSet,
    registry: Arc<StubRegistry>,
}

impl StubBuilder {
    /// Namespaced operation the stub answers, e.g. `Github__Repository`.
    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    pub fn arguments(&self) -> &ArgumentMatcher {
        &self.arguments
    }

    /// Register the fixture under `key` as the response.
    pub fn to_return(&self, key: &str) -> Result<&Self> {
        let payload = self.fixtures.fixture(key)?.clone();
        self.registry.add_response(TestResponse {
            operation_name: self.operation_name.clone(),
            arguments: self.arguments.clone(),
            payload,
        });

        tracing::debug!(
            target: "switchyard::testing",
            operation = %self.operation_name,
            fixture = key,
            exact = self.arguments.is_exact(),
            "registered stub"
        );
        Ok(self)
    }

    /// The fixture under `key`, without registering it.
    pub fn get(&self, key: &str) -> Result<Value> {
        self.fixtures.fixture(key).cloned()
    }

    /// The variables this stub matches, if exact.
    pub fn exact_arguments(&self) -> Option<&Variables> {
        match &self.arguments {
            ArgumentMatcher::Exact(variables) => Some(variables),
            ArgumentMatcher::Any => None,
        }
    }
}
