use std::time::Duration;

use async_trait::async_trait;

use super::transport::HttpTarget;
use super::{Adapter, AdapterKind, AdapterOptions};
use crate::context::Context;
use crate::error::Result;
use crate::graphql::{BatchQuery, GraphQLResponse, Variables};
use crate::http::{ConnectionMode, HttpClient};

/// Opens a fresh connection for every call and never reuses it.
#[derive(Debug)]
pub struct DirectHttpAdapter {
    target: HttpTarget,
    timeout: Duration,
}

impl DirectHttpAdapter {
    /// Build the adapter. Fails when the URL is blank or malformed.
    pub fn new(options: &AdapterOptions) -> Result<Self> {
        Ok(Self {
            target: HttpTarget::parse(&options.service_name, &options.url)?,
            timeout: options.timeout,
        })
    }

    fn connection(&self) -> Result<HttpClient> {
        HttpClient::builder()
            .timeout(self.timeout)
            .mode(ConnectionMode::PerRequest)
            .build()
    }
}

#[async_trait]
impl Adapter for DirectHttpAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::DirectHttp
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
        let client = self.connection()?;
        self.target
            .execute(&client, document, operation_name, variables, context)
            .await
    }

    async fn multiplex(
        &self,
        queries: &[BatchQuery],
        context: &Context,
    ) -> Result<Vec<GraphQLResponse>> {
        let client = self.connection()?;
        self.target.multiplex(&client, queries, context).await
    }
}
