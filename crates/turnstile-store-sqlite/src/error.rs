//! Error type for `turnstile-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] turnstile_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Every generated code collided with an existing one.
  #[error("could not allocate a unique code after {0} attempts")]
  CodeExhausted(usize),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
