//! Connection to the backend.

use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, redirect, StatusCode};
use tracing::debug;

use crate::relay::Transport;

/// Upper bound on one request, connect included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

/// HTTP client bound to one backend.
///
/// The underlying client keeps at most one idle connection, so consecutive
/// posts share a single keep-alive connection. It is created on the first
/// request. Posting takes `&mut self`: the client has exactly one user.
#[derive(Debug)]
pub struct HttpClient {
    base_url: String,
    timeout: Duration,
    client: Option<reqwest::Client>,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            client: None,
        }
    }

    fn client(&mut self) -> Result<&reqwest::Client, Error> {
        let client = match self.client.take() {
            Some(client) => client,
            None => reqwest::Client::builder()
                .timeout(self.timeout)
                .redirect(redirect::Policy::none())
                .pool_max_idle_per_host(1)
                .build()
                .map_err(Error::Build)?,
        };
        Ok(self.client.insert(client))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl Transport for HttpClient {
    type Error = Error;

    async fn post(&mut self, path: &str, body: String) -> Result<StatusCode, Error> {
        let url = self.url(path);
        let response = self
            .client()?
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        // read to the end so the connection goes back to the pool
        let len = response.bytes().await.map(|b| b.len()).unwrap_or(0);
        debug!(%url, %status, len, "POST");

        Ok(status)
    }
}
