use async_trait::async_trait;

use super::transport::HttpTarget;
use super::{Adapter, AdapterKind, AdapterOptions, IDLE_CONNECTION_TIMEOUT};
use crate::context::Context;
use crate::error::Result;
use crate::graphql::{BatchQuery, GraphQLResponse, Variables};
use crate::http::{ConnectionMode, HttpClient};

/// Keeps a pool of keep-alive connections for one service.
///
/// At most `pool_size` idle connections are kept per host; a connection
/// idle for longer than thirty minutes is closed.
#[derive(Debug)]
pub struct PersistentHttpAdapter {
    target: HttpTarget,
    client: HttpClient,
}

impl PersistentHttpAdapter {
    /// Build the adapter and its connection pool.
    pub fn new(options: &AdapterOptions) -> Result<Self> {
        let target = HttpTarget::parse(&options.service_name, &options.url)?;
        let client = HttpClient::builder()
            .timeout(options.timeout)
            .mode(ConnectionMode::Pooled {
                max_idle: options.pool_size,
                idle_timeout: IDLE_CONNECTION_TIMEOUT,
            })
            .build()?;

        Ok(Self { target, client })
    }
}

#[async_trait]
impl Adapter for PersistentHttpAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::PersistentHttp
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
