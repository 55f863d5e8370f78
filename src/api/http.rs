//! HTTP adapter: request building, cancellation and status mapping.
//!
//! This is the only place that interprets status codes. [`StudentApi`](super::StudentApi)
//! works with decoded bodies and [`ApiError`] values.

use reqwest::header::HeaderMap;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::error::ApiError;
use super::types::ValidationBody;
use crate::config::ApiConfig;

/// Structured response for any 2xx status
#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: StatusCode,
  pub headers: HeaderMap,
  pub body: String,
}

impl HttpResponse {
  /// Decode the body as JSON
  pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
    serde_json::from_str(&self.body).map_err(|e| ApiError::Decode {
      message: e.to_string(),
    })
  }

  /// Parse a numeric header, `None` if absent or malformed
  pub fn header_u64(&self, name: &str) -> Option<u64> {
    self
      .headers
      .get(name)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.trim().parse().ok())
  }
}

/// Thin wrapper around `reqwest::Client` bound to a base URL
#[derive(Debug, Clone)]
pub struct HttpClient {
  client: reqwest::Client,
  base_url: Url,
}

impl HttpClient {
  pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
    // Trailing slash so relative joins append instead of replacing the last segment
    let mut raw = config.url.trim_end_matches('/').to_string();
    raw.push('/');
    let base_url = Url::parse(&raw).map_err(|e| ApiError::Network {
      message: format!("invalid base url {}: {}", config.url, e),
    })?;

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.request_timeout_secs))
      .build()
      .map_err(|e| ApiError::Network {
        message: format!("failed to create HTTP client: {}", e),
      })?;

    Ok(Self { client, base_url })
  }

  #[cfg(test)]
  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  pub async fn get(
    &self,
    path: &str,
    query: &[(&str, String)],
    cancel: Option<&CancellationToken>,
  ) -> Result<HttpResponse, ApiError> {
    let builder = self.request(Method::GET, path)?.query(query);
    self.send(path, builder, cancel).await
  }

  pub async fn post<B: Serialize + ?Sized>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<HttpResponse, ApiError> {
    let builder = self.request(Method::POST, path)?.json(body);
    self.send(path, builder, None).await
  }

  pub async fn put<B: Serialize + ?Sized>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<HttpResponse, ApiError> {
    let builder = self.request(Method::PUT, path)?.json(body);
    self.send(path, builder, None).await
  }

  pub async fn delete(&self, path: &str) -> Result<HttpResponse, ApiError> {
    let builder = self.request(Method::DELETE, path)?;
    self.send(path, builder, None).await
  }

  fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
    let url = self.base_url.join(path).map_err(|e| ApiError::Network {
      message: format!("invalid request path {}: {}", path, e),
    })?;
    debug!(method = method.as_str(), url = url.as_str(), "sending request");
    Ok(self.client.request(method, url))
  }

  async fn send(
    &self,
    path: &str,
    builder: RequestBuilder,
    cancel: Option<&CancellationToken>,
  ) -> Result<HttpResponse, ApiError> {
    let exchange = async {
      let response = builder.send().await?;
      let status = response.status();
      let headers = response.headers().clone();
      let body = response.text().await?;
      Ok::<_, ApiError>(HttpResponse {
        status,
        headers,
        body,
      })
    };

    // Dropping the exchange future aborts the underlying connection
    let response = match cancel {
      Some(token) => tokio::select! {
        biased;
        _ = token.cancelled() => {
          debug!(path, "request cancelled");
          return Err(ApiError::Cancelled);
        }
        result = exchange => result?,
      },
      None => exchange.await?,
    };

    debug!(path, status = %response.status, "response received");
    check_status(path, response)
  }
}

/// Map non-2xx responses onto the error taxonomy
fn check_status(path: &str, response: HttpResponse) -> Result<HttpResponse, ApiError> {
  let status = response.status;
  if status.is_success() {
    return Ok(response);
  }

  match status {
    StatusCode::UNPROCESSABLE_ENTITY => match serde_json::from_str::<ValidationBody>(&response.body)
    {
      Ok(body) => Err(ApiError::Validation(body.error)),
      Err(_) => Err(ApiError::Server {
        status: status.as_u16(),
        message: response.body,
      }),
    },
    StatusCode::NOT_FOUND => Err(ApiError::NotFound {
      path: path.to_string(),
    }),
    _ => Err(ApiError::Server {
      status: status.as_u16(),
      message: response.body,
    }),
  }
}
