//! Error taxonomy for a scan cycle.
//!
//! Denials are not errors; they are decisions. Everything here ends the
//! current cycle with [`Feedback::Error`](turnstile_core::feedback::Feedback).

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Which write of the two-step effect sequence failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStage {
  LogAppend,
  StatusUpdate,
}

/// A failed collaborator call.
#[derive(Debug, Error)]
pub enum CallError {
  #[error("timed out after {0:?}")]
  Timeout(Duration),

  #[error("{0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The row to update disappeared between resolution and the write.
  #[error("record vanished before it could be updated")]
  Vanished,
}

#[derive(Debug, Error)]
pub enum Error {
  /// The scanned string is not a visitor pass or credential code.
  #[error("invalid code {0:?}")]
  InvalidCode(String),

  /// A read needed for the decision failed. Distinct from "not found".
  #[error("could not check code: {0}")]
  ResolutionFailed(#[source] CallError),

  /// A write failed after a decision was made. The scan is not registered,
  /// even if `log_written` says the canonical entry made it.
  #[error("access not registered ({stage:?} failed): {source}")]
  ApplyFailed {
    stage:       ApplyStage,
    log_written: bool,
    #[source]
    source:      CallError,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
