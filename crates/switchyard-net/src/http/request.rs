use http::HeaderMap;
use serde::Serialize;

use super::client::{BasicAuth, HttpClient};
use super::response::HttpResponse;
use crate::error::Result;

/// A POST waiting to be sent on an [`HttpClient`].
pub struct HttpRequestBuilder {
    client: HttpClient,
    url: String,
    headers: HeaderMap,
    body: Vec<u8>,
    auth: Option<BasicAuth>,
}

impl HttpRequestBuilder {
    pub(crate) fn new(client: HttpClient, url: String) -> Self {
        Self {
            client,
            url,
            headers: HeaderMap::new(),
            body: Vec::new(),
            auth: None,
        }
    }

    /// Merge `headers` in; a name already present is overwritten.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Body bytes are the JSON encoding of `payload`. No content type is
    /// implied.
    pub fn json<T: Serialize>(mut self, payload: &T) -> Result<Self> {
        self.body = serde_json::to_vec(payload)?;
        Ok(self)
    }

    pub fn basic_auth(mut self, auth: Option<BasicAuth>) -> Self {
        self.auth = auth;
        self
    }

    /// Send and read the full response body.
    pub async fn send(self) -> Result<HttpResponse> {
        let target = url::Url::parse(&self.url)?;
        let body_len = self.body.len();

        let mut request = self
            .client
            .reqwest_client()
            .post(target)
            .headers(self.headers)
            .body(self.body);
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.username, auth.password.as_deref());
        }

        tracing::trace!(target: "switchyard_net::http", url = %self.url, body_len, "POST");
        let response = request.send().await?;
        HttpResponse::read(response).await
    }
}
