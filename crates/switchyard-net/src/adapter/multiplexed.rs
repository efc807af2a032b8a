use async_trait::async_trait;

use super::transport::HttpTarget;
use super::{Adapter, AdapterKind, AdapterOptions, IDLE_CONNECTION_TIMEOUT};
use crate::context::Context;
use crate::error::Result;
use crate::graphql::{BatchQuery, GraphQLResponse, Variables};
use crate::http::{ConnectionMode, HttpClient};

/// A pooled client that negotiates HTTP/2 so concurrent calls share one
/// connection.
///
/// Servers that do not offer h2 through ALPN are spoken to over HTTP/1.1
/// with the same pooling as [`PersistentHttpAdapter`](super::PersistentHttpAdapter).
#[derive(Debug)]
pub struct MultiplexedHttpAdapter {
    target: HttpTarget,
    client: HttpClient,
}

impl MultiplexedHttpAdapter {
    /// Build the adapter and its shared client.
    pub fn new(options: &AdapterOptions) -> Result<Self> {
        let target = HttpTarget::parse(&options.service_name, &options.url)?;
        let client = HttpClient::builder()
            .timeout(options.timeout)
            .mode(ConnectionMode::Multiplexed {
                max_idle: options.pool_size,
                idle_timeout: IDLE_CONNECTION_TIMEOUT,
            })
            .build()?;

        Ok(Self { target, client })
    }
}

#[async_trait]
impl Adapter for MultiplexedHttpAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::MultiplexedHttp
    }

    fn service_name(&self) -> &str {
        self.target.service_name()
    }

    fn url(&self) -> Option<&str> {
        Some(self.target.url())
    }

    async fn execute(
        &self,
        document: &str,
        operation_name: Option<&str>,
        variables: &Variables,
        context: &Context,
    ) -> Result<GraphQLResponse> {
        self.target
            .execute(&self.client, document, operation_name, variables, context)
            .await
    }

    async fn multiplex(
        &self,
        queries: &[BatchQuery],
        context: &Context,
    ) -> Result<Vec<GraphQLResponse>> {
        self.target.multiplex(&self.client, queries, context).await
    }
}
