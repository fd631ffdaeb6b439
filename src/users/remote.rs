use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::error::FetchError;

use super::api_types::ApiUsersResponse;
use super::types::User;

/// Source of user pages from the network.
#[async_trait]
pub trait RemoteSource: Send + Sync {
  /// Fetch one page (1-indexed). An empty result means there are no more pages.
  async fn fetch_page(&self, page: NonZeroU32) -> Result<Vec<User>, FetchError>;
}

/// randomuser.me API client
#[derive(Clone)]
pub struct HttpRemoteSource {
  client: reqwest::Client,
  base_url: String,
  results_per_page: u32,
  seed: Option<String>,
  connectivity: ConnectivityMonitor,
}

impl HttpRemoteSource {
  pub fn new(config: &ApiConfig, connectivity: ConnectivityMonitor) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self::with_client(client, config, connectivity))
  }

  pub fn with_client(
    client: reqwest::Client,
    config: &ApiConfig,
    connectivity: ConnectivityMonitor,
  ) -> Self {
    Self {
      client,
      base_url: config.base_url.clone(),
      results_per_page: config.results_per_page,
      seed: config.seed.clone(),
      connectivity,
    }
  }

  /// Build the request URL; only `page` varies between calls.
  fn page_url(&self, page: NonZeroU32) -> Result<Url, FetchError> {
    let mut url = Url::parse(&self.base_url).map_err(|_| FetchError::InvalidRequest)?;
    if url.cannot_be_a_base() {
      return Err(FetchError::InvalidRequest);
    }

    {
      let mut query = url.query_pairs_mut();
      query.append_pair("results", &self.results_per_page.to_string());
      if let Some(seed) = &self.seed {
        query.append_pair("seed", seed);
      }
      query.append_pair("page", &page.to_string());
    }

    Ok(url)
  }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
  async fn fetch_page(&self, page: NonZeroU32) -> Result<Vec<User>, FetchError> {
    if !self.connectivity.is_connected() {
      return Err(FetchError::NoConnection);
    }

    let url = self.page_url(page)?;
    debug!(%url, "Fetching users page");

    let response = self
      .client
      .get(url)
      .send()
      .await
      .map_err(|e| send_error(&e))?;

    let status = response.status().as_u16();
    if let Some(err) = FetchError::from_status(status) {
      debug!(status, "Users page request failed");
      return Err(err);
    }

    let body = response
      .bytes()
      .await
      .map_err(|_| FetchError::InvalidResponse)?;

    decode_page(&body)
  }
}

/// Classify a failed `send()`.
///
/// Connect, timeout and socket errors are transport failures. Anything else
/// past the builder means the peer answered with something that isn't HTTP.
fn send_error(e: &reqwest::Error) -> FetchError {
  if e.is_builder() {
    FetchError::InvalidRequest
  } else if e.is_connect() || e.is_timeout() || has_io_source(e) {
    FetchError::TransportFailure(e.to_string())
  } else {
    FetchError::InvalidResponse
  }
}

fn has_io_source(e: &(dyn std::error::Error + 'static)) -> bool {
  let mut source = e.source();
  while let Some(err) = source {
    if err.is::<std::io::Error>() {
      return true;
    }
    source = err.source();
  }
  false
}

/// Decode a 2xx response body into the page's users.
fn decode_page(body: &[u8]) -> Result<Vec<User>, FetchError> {
  let response: ApiUsersResponse =
    serde_json::from_slice(body).map_err(|e| FetchError::DecodeFailure(e.to_string()))?;

  debug!(
    page = response.info.page,
    results = response.info.results,
    seed = %response.info.seed,
    version = %response.info.version,
    "Decoded users page"
  );

  Ok(response.results)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::connectivity::Connectivity;
  use crate::users::fixtures::SAMPLE_RESPONSE;
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpListener;
  use tokio::sync::oneshot;

  fn page(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap()
  }

  fn source(base_url: &str, connectivity: Connectivity) -> HttpRemoteSource {
    let config = ApiConfig {
      base_url: base_url.to_string(),
      seed: Some("abc123".to_string()),
      ..ApiConfig::default()
    };
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    HttpRemoteSource::with_client(client, &config, ConnectivityMonitor::new(connectivity))
  }

  /// Serve a single canned HTTP response; the receiver yields the raw request.
  async fn serve_once(status_line: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
    let response = format!(
      "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
      status_line,
      body.len(),
      body
    );
    serve_raw(response).await
  }

  /// Write `reply` verbatim after reading the request, then close.
  async fn serve_raw(reply: String) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
      let (mut socket, _) = listener.accept().await.unwrap();
      let mut buf = vec![0u8; 8192];
      let n = socket.read(&mut buf).await.unwrap();
      let _ = tx.send(String::from_utf8_lossy(&buf[..n]).to_string());

      socket.write_all(reply.as_bytes()).await.unwrap();
      let _ = socket.shutdown().await;
    });

    (format!("http://{}/api/", addr), rx)
  }

  #[test]
  fn test_page_url_only_varies_page() {
    let source = source("https://randomuser.me/api/", Connectivity::Connected);

    assert_eq!(
      source.page_url(page(1)).unwrap().as_str(),
      "https://randomuser.me/api/?results=10&seed=abc123&page=1"
    );
    assert_eq!(
      source.page_url(page(7)).unwrap().as_str(),
      "https://randomuser.me/api/?results=10&seed=abc123&page=7"
    );
  }

  #[tokio::test]
  async fn test_malformed_base_url_is_invalid_request() {
    let bad_url = source("not a url", Connectivity::Connected);
    assert_eq!(bad_url.fetch_page(page(1)).await, Err(FetchError::InvalidRequest));

    let no_base = source("mailto:someone@example.com", Connectivity::Connected);
    assert_eq!(no_base.fetch_page(page(1)).await, Err(FetchError::InvalidRequest));
  }

  #[tokio::test]
  async fn test_disconnected_fails_without_request() {
    let (url, request) = serve_once("200 OK", SAMPLE_RESPONSE).await;
    let source = source(&url, Connectivity::Disconnected);

    assert_eq!(source.fetch_page(page(1)).await, Err(FetchError::NoConnection));

    // The server never saw a request
    let seen = tokio::time::timeout(Duration::from_millis(50), request).await;
    assert!(seen.is_err());
  }

  #[tokio::test]
  async fn test_success_decodes_users() {
    let (url, request) = serve_once("200 OK", SAMPLE_RESPONSE).await;
    let source = source(&url, Connectivity::Connected);

    let users = source.fetch_page(page(3)).await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].email, "jane.smith@example.com");

    let request = request.await.unwrap();
    assert!(request.starts_with("GET /api/?results=10&seed=abc123&page=3 "));
  }

  #[tokio::test]
  async fn test_server_error_status() {
    let (url, _request) = serve_once("503 Service Unavailable", "").await;
    let source = source(&url, Connectivity::Connected);

    assert_eq!(source.fetch_page(page(1)).await, Err(FetchError::ServerError(503)));
  }

  #[tokio::test]
  async fn test_client_error_status() {
    let (url, _request) = serve_once("404 Not Found", "{}").await;
    let source = source(&url, Connectivity::Connected);

    assert_eq!(source.fetch_page(page(1)).await, Err(FetchError::ServerError(404)));
  }

  #[tokio::test]
  async fn test_unexpected_status_is_unknown() {
    let (url, _request) = serve_once("304 Not Modified", "").await;
    let source = source(&url, Connectivity::Connected);

    assert_eq!(source.fetch_page(page(1)).await, Err(FetchError::Unknown));
  }

  #[tokio::test]
  async fn test_bad_body_is_decode_failure() {
    let (url, _request) = serve_once("200 OK", r#"{"results": "nope"}"#).await;
    let source = source(&url, Connectivity::Connected);

    let result = source.fetch_page(page(1)).await;
    assert!(matches!(result, Err(FetchError::DecodeFailure(_))));
  }

  #[tokio::test]
  async fn test_non_http_reply_is_invalid_response() {
    let (url, _request) = serve_raw("this is not http at all\r\n\r\n".to_string()).await;
    let source = source(&url, Connectivity::Connected);

    assert_eq!(source.fetch_page(page(1)).await, Err(FetchError::InvalidResponse));
  }

  #[tokio::test]
  async fn test_truncated_body_is_invalid_response() {
    let reply = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 500\r\n\r\n{\"results\": [";
    let (url, _request) = serve_raw(reply.to_string()).await;
    let source = source(&url, Connectivity::Connected);

    assert_eq!(source.fetch_page(page(1)).await, Err(FetchError::InvalidResponse));
  }

  #[tokio::test]
  async fn test_refused_connection_is_transport_failure() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = source(&format!("http://{}/api/", addr), Connectivity::Connected);
    let result = source.fetch_page(page(1)).await;
    assert!(matches!(result, Err(FetchError::TransportFailure(_))));
  }
}
