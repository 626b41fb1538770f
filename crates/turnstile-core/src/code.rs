//! Scanned-code classification.
//!
//! Every input source (keyboard wedge, camera decoder, manual typing) hands a
//! raw string to [`classify`]. The result is matched on thereafter; nothing
//! downstream looks at prefixes again.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::SubjectType;

/// Prefix of every visitor pass code.
pub const VISITOR_PREFIX: &str = "VP-";
/// Prefix of every employee or vehicle credential code.
pub const EMPLOYEE_PREFIX: &str = "EC-";

/// A raw scan after normalisation and prefix dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum ClassifiedCode {
  VisitorCode(String),
  EmployeeCode(String),
  Invalid,
}

impl ClassifiedCode {
  pub fn subject_type(&self) -> Option<SubjectType> {
    match self {
      Self::VisitorCode(_) => Some(SubjectType::Visitor),
      Self::EmployeeCode(_) => Some(SubjectType::Employee),
      Self::Invalid => None,
    }
  }

  pub fn code(&self) -> Option<&str> {
    match self {
      Self::VisitorCode(c) | Self::EmployeeCode(c) => Some(c),
      Self::Invalid => None,
    }
  }
}

/// Trim and uppercase a raw scan.
pub fn normalize(raw: &str) -> String { raw.trim().to_uppercase() }

/// Normalise `raw` and classify it by prefix. Pure.
///
/// A bare prefix with nothing after it is not a code.
pub fn classify(raw: &str) -> ClassifiedCode {
  let code = normalize(raw);
  if code.len() > VISITOR_PREFIX.len() && code.starts_with(VISITOR_PREFIX) {
    ClassifiedCode::VisitorCode(code)
  } else if code.len() > EMPLOYEE_PREFIX.len() && code.starts_with(EMPLOYEE_PREFIX) {
    ClassifiedCode::EmployeeCode(code)
  } else {
    ClassifiedCode::Invalid
  }
}

/// Generate a fresh code for `subject_type`: prefix plus eight uppercase hex
/// digits.
pub fn generate(subject_type: SubjectType) -> String {
  let prefix = match subject_type {
    SubjectType::Visitor => VISITOR_PREFIX,
    SubjectType::Employee => EMPLOYEE_PREFIX,
  };
  let simple = Uuid::new_v4().simple().to_string().to_uppercase();
  format!("{prefix}{}", &simple[..8])
}
