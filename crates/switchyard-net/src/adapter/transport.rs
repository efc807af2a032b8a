//! Request building and status classification shared by the HTTP adapters.

use http::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use url::Url;

use crate::context::Context;
use crate::error::{NetworkError, Result};
use crate::graphql::{BatchQuery, GraphQLRequest, GraphQLResponse, MultiplexBody, Variables};
use crate::http::{BasicAuth, HttpClient};

/// How a status code is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusClass {
    /// 200 or 400: the body is a GraphQL envelope.
    Envelope,
    /// 5xx: raised as a server error.
    ServerError,
    /// Anything else: degraded to a synthetic error envelope.
    Degraded,
}

impl StatusClass {
    pub(crate) fn of(status: u16) -> Self {
        match status {
            200 | 400 => Self::Envelope,
            500..=599 => Self::ServerError,
            _ => Self::Degraded,
        }
    }
}

/// A parsed endpoint URL.
///
/// User-info in the URL is stripped from the request target and sent as
/// HTTP Basic credentials instead.
#[derive(Debug, Clone)]
pub(crate) struct HttpTarget {
    service_name: String,
    url: String,
    endpoint: String,
    auth: Option<BasicAuth>,
}

impl HttpTarget {
    pub(crate) fn parse(service_name: &str, url: &str) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(NetworkError::InvalidArgument(format!(
                "url is required for service `{service_name}` (given {url:?})"
            )));
        }

        let mut parsed = Url::parse(url)?;
        let auth = if parsed.username().is_empty() {
            None
        } else {
            Some(BasicAuth {
                username: parsed.username().to_string(),
                password: parsed.password().map(str::to_string),
            })
        };
        // Only fails for cannot-be-a-base URLs, which carry no user-info.
        let _ = parsed.set_username("");
        let _ = parsed.set_password(None);

        Ok(Self {
            service_name: service_name.to_string(),
            url: url.to_string(),
            endpoint: parsed.into(),
            auth,
        })
    }

    pub(crate) fn service_name(&self) -> &str {
        &self.service_name
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    pub(crate) async fn execute(
        &self,
        client: &HttpClient,
        document: &str,
        operation_name: Option<&str>,
        variables: &Variables,
        context: &Context,
    ) -> Result<GraphQLResponse> {
        let request = GraphQLRequest {
            query: document,
            variables,
            operation_name,
        };

        let (status, body) = self.post(client, &request, context).await?;
        match StatusClass::of(status) {
            StatusClass::Envelope => Ok(serde_json::from_str(&body)?),
            StatusClass::ServerError => Err(NetworkError::GraphQLServerError { status, body }),
            StatusClass::Degraded => Ok(GraphQLResponse::from_error_message(format!(
                "{status} {body}"
            ))),
        }
    }

    /// The degraded case yields one synthetic envelope per queued query.
    pub(crate) async fn multiplex(
        &self,
        client: &HttpClient,
        queries: &[BatchQuery],
        context: &Context,
    ) -> Result<Vec<GraphQLResponse>> {
        let body = MultiplexBody::from_batch(queries);

        let (status, text) = self.post(client, &body, context).await?;
        match StatusClass::of(status) {
            StatusClass::Envelope => Ok(serde_json::from_str(&text)?),
            StatusClass::ServerError => Err(NetworkError::GraphQLServerError { status, body: text }),
            StatusClass::Degraded => Ok(queries
                .iter()
                .map(|_| GraphQLResponse::from_error_message(format!("{status} {text}")))
                .collect()),
        }
    }

    async fn post<B: Serialize>(
        &self,
        client: &HttpClient,
        body: &B,
        context: &Context,
    ) -> Result<(u16, String)> {
        let headers = request_headers(context)?;

        tracing::debug!(
            target: "switchyard_net::adapter",
            service = %self.service_name,
            endpoint = %self.endpoint,
            "sending GraphQL request"
        );

        let response = client
            .post(&self.endpoint)
            .headers(headers)
            .basic_auth(self.auth.clone())
            .json(body)?
            .send()
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    target: "switchyard_net::adapter",
                    service = %self.service_name,
                    error = %e,
                    "GraphQL request failed"
                );
            })?;

        let status = response.status.as_u16();

        tracing::debug!(
            target: "switchyard_net::adapter",
            service = %self.service_name,
            status,
            class = ?StatusClass::of(status),
            "received GraphQL response"
        );

        Ok((status, response.body))
    }
}

/// Default JSON headers overridden by `context.headers`.
pub(crate) fn request_headers(context: &Context) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in context.headers() {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(&value)?;
        headers.insert(name, value);
    }

    Ok(headers)
}
