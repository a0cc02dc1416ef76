// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::header::{ETAG, HeaderMap, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};

use crate::feed::Validators;

/// A streaming response body
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// HTTP status returned by a server when a conditional request matched
pub const STATUS_NOT_MODIFIED: u16 = 304;

/// HTTP response with status, content length, and body stream
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Content-Length header value, if present; a shorter body is a failed download
    pub content_length: Option<u64>,
    /// Response body as a stream of bytes
    pub body: ByteStream,
}

/// Fully buffered response to a conditional feed request
#[derive(Debug, Clone)]
pub struct FeedResponse {
    /// HTTP status code
    pub status: u16,
    /// `ETag` response header, if present
    pub etag: Option<String>,
    /// `Last-Modified` response header, if present
    pub last_modified: Option<String>,
    /// Response body (empty for 304)
    pub body: Bytes,
}

/// HTTP client abstraction for testability
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetch a feed document, sending `If-None-Match` / `If-Modified-Since`
    /// for whichever validators are present
    async fn get_conditional(
        &self,
        url: &str,
        validators: &Validators,
    ) -> Result<FeedResponse, reqwest::Error>;

    /// Get a streaming response for large downloads
    async fn get_stream(&self, url: &str) -> Result<HttpResponse, reqwest::Error>;
}

/// Default HTTP client implementation using reqwest
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a ReqwestClient whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_conditional(
        &self,
        url: &str,
        validators: &Validators,
    ) -> Result<FeedResponse, reqwest::Error> {
        let mut request = self.client.get(url);
        if let Some(etag) = &validators.etag {
            request = request.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = &validators.last_modified {
            request = request.header(IF_MODIFIED_SINCE, last_modified);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let etag = header_string(response.headers(), ETAG);
        let last_modified = header_string(response.headers(), LAST_MODIFIED);
        let body = response.bytes().await?;

        Ok(FeedResponse {
            status,
            etag,
            last_modified,
            body,
        })
    }

    async fn get_stream(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let content_length = response.content_length();

        let body: ByteStream = Box::pin(response.bytes_stream());

        Ok(HttpResponse {
            status,
            content_length,
            body,
        })
    }
}
