use http::{HeaderMap, StatusCode, Version};

use crate::error::Result;

/// A fully read HTTP answer.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response.text().await?;
        Ok(Self {
            status,
            version,
            headers,
            body,
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Any 2xx status.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
