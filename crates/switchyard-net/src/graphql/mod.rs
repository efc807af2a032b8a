//! GraphQL wire envelopes.
//!
//! Requests are serialized as `{"query", "variables"?, "operationName"?}` and
//! responses parsed as `{"data"?, "errors"?, "extensions"?}`. Nothing here
//! validates documents against a schema.

mod request;
mod response;

pub use request::{
    BatchQuery, GraphQLRequest, INTROSPECTION_OPERATION, INTROSPECTION_QUERY, MultiplexBody,
    Variables,
};
pub use response::{GraphQLError, GraphQLLocation, GraphQLResponse, PathSegment};
