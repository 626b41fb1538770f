//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Missing, malformed or expired bearer token.
  #[error("unauthorized")]
  Unauthorized,
  /// Bad Basic credentials on the token endpoint.
  #[error("invalid operator credentials")]
  BadCredentials,
  #[error("not found: {0}")]
  NotFound(String),
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Store(Box::new(e))
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let (status, challenge) = match &self {
      Error::Unauthorized => (StatusCode::UNAUTHORIZED, Some("Bearer realm=\"turnstile\"")),
      Error::BadCredentials => (StatusCode::UNAUTHORIZED, Some("Basic realm=\"turnstile\"")),
      Error::NotFound(_) => (StatusCode::NOT_FOUND, None),
      Error::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
      Error::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
    };

    let mut res = (status, Json(json!({ "error": self.to_string() }))).into_response();
    if let Some(challenge) = challenge {
      res
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
    }
    res
  }
}
