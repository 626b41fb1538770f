//! The terminal outcome of a scan cycle, and the presenter that receives it.

use serde::{Deserialize, Serialize};

use crate::{access::Direction, decision::DenyReason};

/// Exactly one of these is produced per scan cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Feedback {
  Success {
    subject_name: String,
    direction:    Direction,
  },
  Blocked {
    reason:  DenyReason,
    message: String,
  },
  Error {
    message: String,
  },
}

impl Feedback {
  pub fn success(subject_name: impl Into<String>, direction: Direction) -> Self {
    Self::Success { subject_name: subject_name.into(), direction }
  }

  pub fn blocked(reason: DenyReason) -> Self {
    Self::Blocked { reason, message: reason.message().to_owned() }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self::Error { message: message.into() }
  }

  pub fn is_success(&self) -> bool { matches!(self, Self::Success { .. }) }
}

/// Whatever turns a [`Feedback`] into sound, vibration or pixels.
///
/// The engine calls [`present`](Self::present) once per completed scan and
/// never for a debounced one.
pub trait FeedbackPresenter: Send + Sync {
  fn present(&self, feedback: &Feedback);
}

/// A presenter that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl FeedbackPresenter for Silent {
  fn present(&self, _feedback: &Feedback) {}
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wire_format_is_tagged() {
    let json = serde_json::to_value(Feedback::success("Ada", Direction::In)).unwrap();
    assert_eq!(json["outcome"], "success");
    assert_eq!(json["direction"], "in");

    let json = serde_json::to_value(Feedback::blocked(DenyReason::Expired)).unwrap();
    assert_eq!(json["outcome"], "blocked");
    assert_eq!(json["reason"], "expired");
    assert_eq!(json["message"], "pass has expired");
  }
}
