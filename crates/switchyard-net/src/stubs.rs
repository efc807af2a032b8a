//! Request log and canned responses for the test adapter.

use parking_lot::Mutex;
use serde_json::Value;

use crate::context::Context;
use crate::graphql::{BatchQuery, Variables};

/// Which variables a canned response answers.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentMatcher {
    /// Any variables.
    Any,
    /// Exactly these variables.
    Exact(Variables),
}

impl ArgumentMatcher {
    /// Whether `variables` satisfies this matcher.
    pub fn matches(&self, variables: &Variables) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == variables,
        }
    }

    /// Whether this matcher names exact variables.
    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Exact(_))
    }
}

/// A canned response for one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct TestResponse {
    /// Full operation name, e.g. `Github__Repository`.
    pub operation_name: String,
    /// Variables this response answers.
    pub arguments: ArgumentMatcher,
    /// The response envelope.
    pub payload: Value,
}

/// A call observed by the test adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedRequest {
    /// One `execute` call.
    Execute {
        /// Serialized query document.
        document: String,
        /// Operation name.
        operation_name: Option<String>,
        /// Variables as sent.
        variables: Variables,
        /// Merged context.
        context: Context,
    },
    /// One `multiplex` call.
    Multiplex {
        /// Queued operations in order.
        queries: Vec<BatchQuery>,
        /// Context of the batch.
        context: Context,
    },
}

impl RecordedRequest {
    /// The operation name of a single execution.
    pub fn operation_name(&self) -> Option<&str> {
        match self {
            Self::Execute { operation_name, .. } => operation_name.as_deref(),
            Self::Multiplex { .. } => None,
        }
    }

    /// The query document of a single execution.
    pub fn document(&self) -> Option<&str> {
        match self {
            Self::Execute { document, .. } => Some(document),
            Self::Multiplex { .. } => None,
        }
    }

    /// The variables of a single execution.
    pub fn variables(&self) -> Option<&Variables> {
        match self {
            Self::Execute { variables, .. } => Some(variables),
            Self::Multiplex { .. } => None,
        }
    }

    /// The context the adapter received.
    pub fn context(&self) -> &Context {
        match self {
            Self::Execute { context, .. } | Self::Multiplex { context, .. } => context,
        }
    }

    /// The queued operations of a batch.
    pub fn queries(&self) -> &[BatchQuery] {
        match self {
            Self::Execute { .. } => &[],
            Self::Multiplex { queries, .. } => queries,
        }
    }
}

/// Shared request log and response list.
///
/// Among responses for the same operation an exact-argument match wins over
/// a wildcard; within each class the first registered wins.
#[derive(Debug, Default)]
pub struct StubRegistry {
    requests: Mutex<Vec<RecordedRequest>>,
    responses: Mutex<Vec<TestResponse>>,
}

impl StubRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request to the log.
    pub fn record(&self, request: RecordedRequest) {
        self.requests.lock().push(request);
    }

    /// Snapshot of the request log.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }

    /// Register a canned response.
    pub fn add_response(&self, response: TestResponse) {
        tracing::trace!(
            target: "switchyard_net::adapter",
            operation = %response.operation_name,
            exact = response.arguments.is_exact(),
            "registered test response"
        );
        self.responses.lock().push(response);
    }

    /// Snapshot of the registered responses.
    pub fn responses(&self) -> Vec<TestResponse> {
        self.responses.lock().clone()
    }

    /// The payload answering `operation_name` called with `variables`.
    pub fn find_response(&self, operation_name: &str, variables: &Variables) -> Option<Value> {
        let responses = self.responses.lock();
        let mut wildcard = None;
        for response in responses.iter().filter(|r| r.operation_name == operation_name) {
            match &response.arguments {
                ArgumentMatcher::Exact(expected) if expected == variables => {
                    return Some(response.payload.clone());
                }
                ArgumentMatcher::Any if wildcard.is_none() => wildcard = Some(response),
                _ => {}
            }
        }
        wildcard.map(|r| r.payload.clone())
    }

    /// Clear the request log.
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    /// Clear the registered responses.
    pub fn clear_responses(&self) {
        self.responses.lock().clear();
    }

    /// Clear both the log and the responses.
    pub fn reset(&self) {
        self.clear_requests();
        self.clear_responses();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(value: Value) -> Variables {
        value.as_object().cloned().unwrap_or_default()
    }

    fn response(arguments: ArgumentMatcher, payload: Value) -> TestResponse {
        TestResponse {
            operation_name: "Github__Repository".into(),
            arguments,
            payload,
        }
    }

    #[test]
    fn test_exact_beats_wildcard_regardless_of_order() {
        let stubs = StubRegistry::new();
        stubs.add_response(response(ArgumentMatcher::Any, json!({"data": "any"})));
        stubs.add_response(response(
            ArgumentMatcher::Exact(vars(json!({"name": "rails"}))),
            json!({"data": "rails"}),
        ));

        assert_eq!(
            stubs.find_response("Github__Repository", &vars(json!({"name": "rails"}))),
            Some(json!({"data": "rails"}))
        );
        assert_eq!(
            stubs.find_response("Github__Repository", &vars(json!({"name": "other"}))),
            Some(json!({"data": "any"}))
        );
    }

    #[test]
    fn test_first_registered_wins_within_class() {
        let stubs = StubRegistry::new();
        stubs.add_response(response(ArgumentMatcher::Any, json!(1)));
        stubs.add_response(response(ArgumentMatcher::Any, json!(2)));

        assert_eq!(
            stubs.find_response("Github__Repository", &Variables::new()),
            Some(json!(1))
        );
    }

    #[test]
    fn test_operation_name_must_match() {
        let stubs = StubRegistry::new();
        stubs.add_response(response(ArgumentMatcher::Any, json!(1)));
        assert_eq!(stubs.find_response("Github__User", &Variables::new()), None);
    }

    #[test]
    fn test_reset() {
        let stubs = StubRegistry::new();
        stubs.add_response(response(ArgumentMatcher::Any, json!(1)));
        stubs.record(RecordedRequest::Multiplex {
            queries: Vec::new(),
            context: Context::new(),
        });

        stubs.reset();
        assert!(stubs.requests().is_empty());
        assert!(stubs.responses().is_empty());
    }
}
