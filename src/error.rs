use thiserror::Error;

/// Failure of a user page fetch.
///
/// Causes are carried as rendered strings so results can be sent between
/// tasks and compared in tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  /// The request URL could not be built
  #[error("Invalid URL")]
  InvalidRequest,
  /// Connection, TLS or timeout failure before a response arrived
  #[error("Request failed: {0}")]
  TransportFailure(String),
  /// A response arrived but could not be read
  #[error("Invalid server response")]
  InvalidResponse,
  /// 2xx response whose body did not match the expected schema
  #[error("Failed to decode data: {0}")]
  DecodeFailure(String),
  /// 4xx or 5xx status
  #[error("Server error with code: {0}")]
  ServerError(u16),
  /// Connectivity monitor reported the network as unreachable
  #[error("No internet connection available")]
  NoConnection,
  #[error("An unknown error occurred")]
  Unknown,
}

impl FetchError {
  /// Message suitable for showing to the user.
  pub fn user_message(&self) -> String {
    self.to_string()
  }

  /// Map a final HTTP status to an error, or `None` for success codes.
  pub fn from_status(status: u16) -> Option<Self> {
    match status {
      200..=299 => None,
      400..=599 => Some(FetchError::ServerError(status)),
      _ => Some(FetchError::Unknown),
    }
  }
}
