//! The toggle decision state machine.
//!
//! There is no "currently inside" set anywhere. The next direction is always
//! re-derived from the subject's last access-log entry, so the inputs here
//! must come from a fresh read, never from client-held state.
//!
//! Visitors and employees deliberately run separate machines: a visitor pass
//! is single-visit (its exit closes it), an employee credential cycles in and
//! out forever.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  access::Direction,
  subject::{BlockStatus, EmployeeCredential, Subject, VisitorPass, VisitorStatus},
};

/// Outcome of one toggle decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
  AdmitIn,
  AdmitOut,
  DenyBlocked,
  DenyExpired,
  DenyClosed,
  DenyNotFound,
}

/// Why a scan was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
  Blocked,
  Expired,
  Closed,
  NotFound,
}

impl DenyReason {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Blocked => "blocked",
      Self::Expired => "expired",
      Self::Closed => "closed",
      Self::NotFound => "not_found",
    }
  }

  /// Operator-facing wording.
  pub fn message(self) -> &'static str {
    match self {
      Self::Blocked => "credential is blocked",
      Self::Expired => "pass has expired",
      Self::Closed => "pass is already closed",
      Self::NotFound => "no pass or credential with this code",
    }
  }
}

impl Decision {
  /// The direction to record, for admit decisions.
  pub fn direction(self) -> Option<Direction> {
    match self {
      Self::AdmitIn => Some(Direction::In),
      Self::AdmitOut => Some(Direction::Out),
      _ => None,
    }
  }

  pub fn deny_reason(self) -> Option<DenyReason> {
    match self {
      Self::DenyBlocked => Some(DenyReason::Blocked),
      Self::DenyExpired => Some(DenyReason::Expired),
      Self::DenyClosed => Some(DenyReason::Closed),
      Self::DenyNotFound => Some(DenyReason::NotFound),
      Self::AdmitIn | Self::AdmitOut => None,
    }
  }

  pub fn is_admit(self) -> bool { self.direction().is_some() }

  fn toggle(last: Option<Direction>) -> Self {
    match last {
      Some(Direction::In) => Self::AdmitOut,
      Some(Direction::Out) | None => Self::AdmitIn,
    }
  }
}

/// Decide for a visitor pass. Precedence: closed, expired, toggle.
pub fn decide_visitor(
  pass: &VisitorPass,
  last: Option<Direction>,
  now: DateTime<Utc>,
) -> Decision {
  if pass.status == VisitorStatus::Closed {
    return Decision::DenyClosed;
  }
  if pass.is_expired_at(now) {
    return Decision::DenyExpired;
  }
  Decision::toggle(last)
}

/// Decide for an employee or vehicle credential. Precedence: blocked, toggle.
pub fn decide_employee(credential: &EmployeeCredential, last: Option<Direction>) -> Decision {
  if credential.status == BlockStatus::Blocked {
    return Decision::DenyBlocked;
  }
  Decision::toggle(last)
}

/// Decide for a resolved subject, or [`Decision::DenyNotFound`] if the code
/// matched nothing.
pub fn decide(
  subject: Option<&Subject>,
  last: Option<Direction>,
  now: DateTime<Utc>,
) -> Decision {
  match subject {
    None => Decision::DenyNotFound,
    Some(Subject::Visitor(pass)) => decide_visitor(pass, last, now),
    Some(Subject::Employee(credential)) => decide_employee(credential, last),
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;
  use uuid::Uuid;

  use super::*;
  use crate::subject::CredentialKind;

  fn pass(status: VisitorStatus, valid_until: DateTime<Utc>) -> Subject {
    Subject::Visitor(VisitorPass {
      pass_id: Uuid::new_v4(),
      code: "VP-AAAA1111".into(),
      full_name: "Ada Visitor".into(),
      document_number: "D-1".into(),
      company: None,
      valid_from: valid_until - Duration::days(1),
      valid_until,
      status,
      created_at: valid_until - Duration::days(1),
    })
  }

  fn credential(status: BlockStatus) -> Subject {
    Subject::Employee(EmployeeCredential {
      credential_id: Uuid::new_v4(),
      code: "EC-BBBB2222".into(),
      kind: CredentialKind::Personal,
      full_name: "Bob Employee".into(),
      document: "E-2".into(),
      status,
      created_at: Utc::now(),
    })
  }

  #[test]
  fn not_found_denies() {
    assert_eq!(decide(None, None, Utc::now()), Decision::DenyNotFound);
    assert_eq!(
      decide(None, Some(Direction::In), Utc::now()),
      Decision::DenyNotFound
    );
  }

  #[test]
  fn fresh_visitor_is_admitted_in() {
    let now = Utc::now();
    let p = pass(VisitorStatus::Pending, now + Duration::hours(4));
    assert_eq!(decide(Some(&p), None, now), Decision::AdmitIn);
  }

  #[test]
  fn visitor_inside_is_admitted_out() {
    let now = Utc::now();
    let p = pass(VisitorStatus::Inside, now + Duration::hours(4));
    assert_eq!(decide(Some(&p), Some(Direction::In), now), Decision::AdmitOut);
  }

  #[test]
  fn closed_takes_precedence_over_expiry() {
    let now = Utc::now();
    let p = pass(VisitorStatus::Closed, now - Duration::days(1));
    assert_eq!(decide(Some(&p), Some(Direction::Out), now), Decision::DenyClosed);
  }

  #[test]
  fn expired_visitor_denied_even_when_inside() {
    let now = Utc::now();
    let p = pass(VisitorStatus::Inside, now - Duration::days(1));
    assert_eq!(decide(Some(&p), Some(Direction::In), now), Decision::DenyExpired);
  }

  #[test]
  fn expiry_boundary_is_exclusive() {
    let now = Utc::now();
    let p = pass(VisitorStatus::Pending, now);
    assert_eq!(decide(Some(&p), None, now), Decision::AdmitIn);
    assert_eq!(
      decide(Some(&p), None, now + Duration::milliseconds(1)),
      Decision::DenyExpired
    );
  }

  #[test]
  fn blocked_credential_denied_regardless_of_history() {
    let c = credential(BlockStatus::Blocked);
    for last in [None, Some(Direction::In), Some(Direction::Out)] {
      assert_eq!(decide(Some(&c), last, Utc::now()), Decision::DenyBlocked);
    }
  }

  #[test]
  fn employee_alternates_with_history() {
    let c = credential(BlockStatus::Allowed);
    let now = Utc::now();
    assert_eq!(decide(Some(&c), None, now), Decision::AdmitIn);
    assert_eq!(decide(Some(&c), Some(Direction::In), now), Decision::AdmitOut);
    assert_eq!(decide(Some(&c), Some(Direction::Out), now), Decision::AdmitIn);
  }

  #[test]
  fn alternation_over_long_history() {
    let c = credential(BlockStatus::Allowed);
    let now = Utc::now();
    let mut last = None;
    for i in 0..10 {
      let d = decide(Some(&c), last, now);
      let expected = if i % 2 == 0 { Direction::In } else { Direction::Out };
      assert_eq!(d.direction(), Some(expected));
      last = d.direction();
    }
  }

  #[test]
  fn deny_reasons_map() {
    assert_eq!(Decision::DenyClosed.deny_reason(), Some(DenyReason::Closed));
    assert_eq!(Decision::AdmitIn.deny_reason(), None);
    assert!(!Decision::DenyNotFound.is_admit());
  }
}
