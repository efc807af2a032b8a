//! Failures raised while talking to a GraphQL endpoint.

use thiserror::Error;

/// Everything an adapter can fail with.
///
/// Payloads are rendered strings so the error stays `Clone` and can be
/// recorded by the test adapter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    /// reqwest gave up for a reason other than connect or timeout.
    #[error("request failed: {0}")]
    Request(String),
    #[error("malformed endpoint url: {0}")]
    InvalidUrl(String),
    #[error("request timed out")]
    Timeout,
    #[error("could not connect: {0}")]
    Connection(String),
    #[error("unusable header: {0}")]
    InvalidHeader(String),
    /// A request body could not be encoded, or a response body is not the
    /// expected JSON.
    #[error("malformed JSON: {0}")]
    Json(String),
    #[error("{0}")]
    InvalidArgument(String),
    /// The endpoint answered 5xx. Never degraded into an envelope.
    #[error("Received server error status {status}: {body}")]
    GraphQLServerError { status: u16, body: String },
}

impl NetworkError {
    pub fn is_timeout(&self) -> bool {
        *self == Self::Timeout
    }

    pub fn is_server_error(&self) -> bool {
        self.status().is_some()
    }

    /// HTTP status of a 5xx answer.
    pub fn status(&self) -> Option<u16> {
        if let Self::GraphQLServerError { status, .. } = self {
            Some(*status)
        } else {
            None
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_decode() {
            Self::Json(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

macro_rules! rendered_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(impl From<$source> for NetworkError {
            fn from(err: $source) -> Self {
                Self::$variant(err.to_string())
            }
        })*
    };
}

rendered_from! {
    url::ParseError => InvalidUrl,
    serde_json::Error => Json,
    http::header::InvalidHeaderName => InvalidHeader,
    http::header::InvalidHeaderValue => InvalidHeader,
}

pub type Result<T> = std::result::Result<T, NetworkError>;
