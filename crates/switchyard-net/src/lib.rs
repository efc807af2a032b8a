//! Transport layer for Switchyard.
//!
//! This crate knows how to put a GraphQL operation on the wire and how to
//! read the answer back:
//!
//! - **Envelopes**: [`GraphQLRequest`], [`GraphQLResponse`] and the
//!   multiplexed `{"_json": [...]}` body
//! - **Context**: the deep-mergeable [`Context`] carrying headers and the
//!   routing URL
//! - **Adapters**: the [`Adapter`] trait with direct, persistent,
//!   multiplexed, multi-domain and test implementations
//! - **Stubs**: the [`StubRegistry`] the test adapter records into
//!
//! # Executing an operation
//!
//! ```ignore
//! use switchyard_net::{AdapterKind, AdapterOptions, Context, build_adapter};
//!
//! let options = AdapterOptions::new("github").url("https://api.github.com/graphql");
//! let adapter = build_adapter(AdapterKind::PersistentHttp, &options)?;
//!
//! let response = adapter
//!     .execute(
//!         "query Github__Viewer { viewer { login } }",
//!         Some("Github__Viewer"),
//!         &Default::default(),
//!         &Context::new().header("Authorization", "token abc"),
//!     )
//!     .await?;
//! ```
//!
//! # Error classification
//!
//! 200 and 400 answers are parsed as envelopes. 5xx answers fail with
//! [`NetworkError::GraphQLServerError`]. Any other status becomes an
//! envelope holding one `"<status> <body>"` error. Timeouts surface as
//! [`NetworkError::Timeout`].
//!
//! # Blocking callers
//!
//! [`runtime::block_on`] drives a future on a shared multi-thread runtime.

pub mod adapter;
pub mod context;
mod error;
pub mod graphql;
pub mod http;
pub mod runtime;
pub mod stubs;

pub use adapter::{
    Adapter, AdapterKind, AdapterOptions, DEFAULT_POOL_SIZE, DEFAULT_TIMEOUT, DirectHttpAdapter,
    IDLE_CONNECTION_TIMEOUT, MultiDomainAdapter, MultiplexedHttpAdapter, PersistentHttpAdapter,
    TestAdapter, build_adapter,
};
pub use context::Context;
pub use error::{NetworkError, Result};
pub use graphql::{
    BatchQuery, GraphQLError, GraphQLLocation, GraphQLRequest, GraphQLResponse, PathSegment,
    Variables,
};
pub use stubs::{ArgumentMatcher, RecordedRequest, StubRegistry, TestResponse};
