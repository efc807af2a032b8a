use serde::Serialize;
use serde_json::{Map, Value};

use crate::context::Context;

pub type Variables = Map<String, Value>;

/// Wire body of a single operation, borrowed from its caller.
///
/// Empty variables and a missing operation name are left out of the JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GraphQLRequest<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub variables: &'a Variables,
    #[serde(rename = "operationName", skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<&'a str>,
}

/// An operation waiting in a multiplex queue.
///
/// `context` is what callbacks and the test adapter see for this entry. It
/// is not serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchQuery {
    pub query: String,
    pub operation_name: Option<String>,
    pub variables: Variables,
    pub context: Context,
}

impl BatchQuery {
    pub fn new(
        query: impl Into<String>,
        operation_name: Option<String>,
        variables: Variables,
        context: Context,
    ) -> Self {
        Self {
            query: query.into(),
            operation_name,
            variables,
            context,
        }
    }

    pub fn to_request(&self) -> GraphQLRequest<'_> {
        GraphQLRequest {
            query: &self.query,
            variables: &self.variables,
            operation_name: self.operation_name.as_deref(),
        }
    }
}

/// `{"_json": [...]}`, the body of a multiplexed POST.
#[derive(Debug, Serialize)]
pub struct MultiplexBody<'a> {
    #[serde(rename = "_json")]
    pub queries: Vec<GraphQLRequest<'a>>,
}

impl<'a> MultiplexBody<'a> {
    pub fn from_batch(queries: &'a [BatchQuery]) -> Self {
        Self {
            queries: queries.iter().map(BatchQuery::to_request).collect(),
        }
    }
}

/// Operation name of [`INTROSPECTION_QUERY`].
pub const INTROSPECTION_OPERATION: &str = "IntrospectionQuery";

/// Sent by the endpoint registry to load a schema from a live server.
pub const INTROSPECTION_QUERY: &str = r#"
    query IntrospectionQuery {
        __schema {
            queryType { name }
            mutationType { name }
            subscriptionType { name }
            types {
                ...FullType
            }
            directives {
                name
                description
                locations
                args {
                    ...InputValue
                }
            }
        }
    }

    fragment FullType on __Type {
        kind
        name
        description
        fields(includeDeprecated: true) {
            name
            description
            args {
                ...InputValue
            }
            type {
                ...TypeRef
            }
            isDeprecated
            deprecationReason
        }
        inputFields {
            ...InputValue
        }
        interfaces {
            ...TypeRef
        }
        enumValues(includeDeprecated: true) {
            name
            description
            isDeprecated
            deprecationReason
        }
        possibleTypes {
            ...TypeRef
        }
    }

    fragment InputValue on __InputValue {
        name
        description
        type {
            ...TypeRef
        }
        defaultValue
    }

    fragment TypeRef on __Type {
        kind
        name
        ofType {
            kind
            name
            ofType {
                kind
                name
                ofType {
                    kind
                    name
                    ofType {
                        kind
                        name
                        ofType {
                            kind
                            name
                            ofType {
                                kind
                                name
                                ofType {
                                    kind
                                    name
                                }
                            }
                        }
                    }
                }
            }
        }
    }
"#;
