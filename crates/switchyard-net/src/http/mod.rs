//! Thin reqwest wrapper used by the HTTP adapters.

mod client;
mod request;
mod response;

pub use client::{BasicAuth, ConnectionMode, HttpClient, HttpClientBuilder, HttpClientConfig};
pub use request::HttpRequestBuilder;
pub use response::HttpResponse;
