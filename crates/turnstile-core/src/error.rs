//! Error types for `turnstile-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A stored or transmitted discriminant did not match any known variant.
  #[error("unknown {kind} value: {value:?}")]
  UnknownVariant { kind: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
