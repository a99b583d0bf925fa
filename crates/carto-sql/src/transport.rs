//! HTTP plumbing for the SQL and batch job endpoints.

use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Byte stream of a response body.
pub type Body = BoxStream<'static, Result<Bytes>>;

/// A 2xx answer from the SQL endpoint whose body has not been read yet.
pub struct SqlResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl std::fmt::Debug for SqlResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Sends requests for one configured endpoint.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl Transport {
    pub fn new(http: reqwest::Client, config: Arc<ClientConfig>) -> Self {
        Self { http, config }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Posts `sql` to `<base>/sql` as `api_key=…&q=…`.
    ///
    /// A request that fails before any response headers arrive is sent once
    /// more with the identical body. Once a response has started nothing is
    /// retried, and a broken body surfaces as an error on [`SqlResponse::body`].
    ///
    /// # Errors
    ///
    /// [`Error::Transport`] if the retry fails too, [`Error::Remote`] for a
    /// non-2xx status.
    pub async fn send(&self, sql: &str) -> Result<SqlResponse> {
        debug!(%sql, "posting query");
        let url = self.config.sql_url();
        let form = [("api_key", self.config.api_key.as_str()), ("q", sql)];
        let request = || self.http.post(&url).form(&form);

        let response = send_with_retry(request).await?;
        let response = check_status(response).await?;
        Ok(SqlResponse {
            status: response.status(),
            headers: response.headers().clone(),
            body: response
                .bytes_stream()
                .map(|chunk| chunk.map_err(Error::Transport))
                .boxed(),
        })
    }

    /// Posts a JSON document to `url?api_key=…` and parses the JSON answer.
    ///
    /// # Errors
    ///
    /// [`Error::Remote`] for a non-2xx status, [`Error::Decode`] when the
    /// answer is not JSON.
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let response = self
            .http
            .post(url)
            .query(&[("api_key", self.config.api_key.as_str())])
            .json(body)
            .send()
            .await?;
        read_json(response).await
    }

    /// Fetches `url?api_key=…` and parses the JSON answer.
    ///
    /// # Errors
    ///
    /// Same as [`post_json`](Self::post_json).
    pub async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self
            .http
            .get(url)
            .query(&[("api_key", self.config.api_key.as_str())])
            .send()
            .await?;
        read_json(response).await
    }
}

async fn send_with_retry(request: impl Fn() -> RequestBuilder) -> Result<Response> {
    match request().send().await {
        Ok(response) => Ok(response),
        Err(err) => {
            warn!(error = %err, "request failed before a response, retrying once");
            Ok(request().send().await?)
        }
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    debug!(status = status.as_u16(), "response");
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await?;
    debug!(%body, "error body");
    Err(Error::Remote {
        status: status.as_u16(),
        body,
    })
}

async fn read_json(response: Response) -> Result<Value> {
    let response = check_status(response).await?;
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| Error::Decode(format!("{e}: {text}")))
}
