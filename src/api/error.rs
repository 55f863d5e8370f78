//! Error taxonomy for calls against the student backend.

use super::types::FieldErrors;

/// Errors returned by the HTTP adapter and passed through unmodified by
/// [`StudentApi`](super::StudentApi).
///
/// `Clone` so the same error can live in a cache entry and in a mutation state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
  /// Transport failure (connection refused, reset, TLS, ...)
  #[error("network error: {message}")]
  Network { message: String },

  /// The caller gave up waiting for the response
  #[error("request timed out")]
  Timeout,

  /// The request was aborted through its cancellation token
  #[error("request cancelled")]
  Cancelled,

  /// 422 with a field-error payload
  #[error("validation failed for {} field(s)", .0.len())]
  Validation(FieldErrors),

  /// 404
  #[error("not found: {path}")]
  NotFound { path: String },

  /// Any other non-2xx status
  #[error("server responded with {status}: {message}")]
  Server { status: u16, message: String },

  /// 2xx response whose body could not be decoded
  #[error("invalid response body: {message}")]
  Decode { message: String },
}

impl ApiError {
  /// Transport failure, timeout or cancellation
  pub fn is_network(&self) -> bool {
    matches!(
      self,
      ApiError::Network { .. } | ApiError::Timeout | ApiError::Cancelled
    )
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self, ApiError::Cancelled)
  }

  /// Field errors when this is a 422 validation failure
  pub fn field_errors(&self) -> Option<&FieldErrors> {
    match self {
      ApiError::Validation(errors) => Some(errors),
      _ => None,
    }
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() {
      ApiError::Timeout
    } else if e.is_decode() {
      ApiError::Decode {
        message: e.to_string(),
      }
    } else {
      ApiError::Network {
        message: e.to_string(),
      }
    }
  }
}
