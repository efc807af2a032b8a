use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Adapter, AdapterKind, AdapterOptions, build_adapter};
use crate::context::Context;
use crate::error::{NetworkError, Result};
use crate::graphql::{BatchQuery, GraphQLResponse, Variables};

/// Routes every call to the URL found in `context.url`.
///
/// One delegate adapter of the configured kind is built per distinct URL
/// and kept for the router's lifetime.
///
/// ```ignore
/// let response = client
///     .with_context(Context::new().url("https://tenant-a.example.com/graphql"))
///     .operation("repository")?
///     .send()
///     .await?;
/// ```
#[derive(Debug)]
pub struct MultiDomainAdapter {
    options: AdapterOptions,
    connections: Mutex<HashMap<String, Arc<dyn Adapter>>>,
}

impl MultiDomainAdapter {
    /// Build the router. Fails if asked to delegate to itself.
    pub fn new(options: &AdapterOptions) -> Result<Self> {
        if options.delegate == AdapterKind::MultiDomain {
            return Err(NetworkError::InvalidArgument(
                "the multi-domain adapter cannot delegate to itself".into(),
            ));
        }

        Ok(Self {
            options: options.clone(),
            connections: Mutex::new(HashMap::new()),
        })
    }

    /// The delegate for `url`, built on first use.
    pub fn adapter_for(&self, url: &str) -> Result<Arc<dyn Adapter>> {
        let mut connections = self.connections.lock();
        if let Some(adapter) = connections.get(url) {
            return Ok(adapter.clone());
        }

        let options = self.options.clone().url(url);
        let adapter = build_adapter(self.options.delegate, &options)?;
        connections.insert(url.to_string(), adapter.clone());

        tracing::debug!(
            target: "switchyard_net::adapter",
            service = %self.options.service_name,
            delegate = %self.options.delegate,
            connections = connections.len(),
            "built multi-domain delegate"
        );

        Ok(adapter)
    }

    /// Number of delegates built so far.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    fn route(&self, context: &Context) -> Result<Arc<dyn Adapter>> {
        let url = context.routing_url().ok_or_else(|| {
            NetworkError::InvalidArgument(
                "the multi-domain adapter requires a `url` in the request context; \
                 set it with `with_context(Context::new().url(..))`"
                    .into(),
            )
        })?;
        self.adapter_for(url)
    }
}

#[async_trait]
impl Adapter for MultiDomainAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::MultiDomain
    }

    fn service_name(&self) -> &str {
        &self.options.service_name
    }

    fn url(&self) -> Option<&str> {
        None
    }

    async fn execute(
        &self,
        document: &str,
        operation_name: Option<&str>,
        variables: &Variables,
        context: &Context,
    ) -> Result<GraphQLResponse> {
        self.route(context)?
            .execute(document, operation_name, variables, context)
            .await
    }

    async fn multiplex(
        &self,
        queries: &[BatchQuery],
        context: &Context,
    ) -> Result<Vec<GraphQLResponse>> {
        self.route(context)?.multiplex(queries, context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_delegation_rejected() {
        let options = AdapterOptions::new("github").delegate(AdapterKind::MultiDomain);
        assert!(matches!(
            MultiDomainAdapter::new(&options),
            Err(NetworkError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_one_delegate_per_url() {
        let adapter = MultiDomainAdapter::new(&AdapterOptions::new("github")).unwrap();

        let a1 = adapter.adapter_for("https://a.example.com/graphql").unwrap();
        let a2 = adapter.adapter_for("https://a.example.com/graphql").unwrap();
        let b = adapter.adapter_for("https://b.example.com/graphql").unwrap();

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_eq!(adapter.connection_count(), 2);
        assert_eq!(a1.kind(), AdapterKind::DirectHttp);
        assert_eq!(b.url(), Some("https://b.example.com/graphql"));
    }

    #[test]
    fn test_missing_url_in_context() {
        let adapter = MultiDomainAdapter::new(&AdapterOptions::new("github")).unwrap();
        let err = adapter.route(&Context::new()).unwrap_err();
        assert!(matches!(err, NetworkError::InvalidArgument(msg) if msg.contains("with_context")));
    }

    #[test]
    fn test_delegate_build_failure_not_cached() {
        let adapter = MultiDomainAdapter::new(&AdapterOptions::new("github")).unwrap();
        assert!(adapter.adapter_for("not a url").is_err());
        assert_eq!(adapter.connection_count(), 0);
    }
}
