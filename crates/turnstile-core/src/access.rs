//! Access log and audit records.
//!
//! The access log is append-only and is the only source of truth for a
//! subject's direction history. Audit events are a separate, best-effort
//! trail (denied scans land here, never in the access log).

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// The direction of a single access event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  In,
  Out,
}

impl Direction {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::In => "in",
      Self::Out => "out",
    }
  }

  pub fn opposite(self) -> Self {
    match self {
      Self::In => Self::Out,
      Self::Out => Self::In,
    }
  }
}

impl fmt::Display for Direction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Direction {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "in" => Ok(Self::In),
      "out" => Ok(Self::Out),
      other => Err(Error::UnknownVariant {
        kind:  "direction",
        value: other.to_owned(),
      }),
    }
  }
}

/// Which collection a log entry's subject id points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
  Visitor,
  Employee,
}

impl SubjectType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Visitor => "visitor",
      Self::Employee => "employee",
    }
  }
}

impl fmt::Display for SubjectType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for SubjectType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "visitor" => Ok(Self::Visitor),
      "employee" => Ok(Self::Employee),
      other => Err(Error::UnknownVariant {
        kind:  "subject type",
        value: other.to_owned(),
      }),
    }
  }
}

// ─── Access log ──────────────────────────────────────────────────────────────

/// A persisted access event. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogEntry {
  pub entry_id:     Uuid,
  pub subject_type: SubjectType,
  /// Weak reference into the visitor or credential collection.
  pub subject_id:   Uuid,
  pub direction:    Direction,
  pub gate:         String,
  /// Operator who performed the scan, as identified by the auth service.
  pub operator:     String,
  /// Server-assigned.
  pub recorded_at:  DateTime<Utc>,
}

/// Input for [`AccessStore::append_access_log`](crate::store::AccessStore::append_access_log).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccessLogEntry {
  pub subject_type: SubjectType,
  pub subject_id:   Uuid,
  pub direction:    Direction,
  pub gate:         String,
  pub operator:     String,
}

/// Equality filters for listing access log entries. Results are always
/// newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessLogQuery {
  pub subject_type: Option<SubjectType>,
  pub subject_id:   Option<Uuid>,
  pub gate:         Option<String>,
  pub limit:        Option<usize>,
}

impl AccessLogQuery {
  /// The query the direction resolver issues: latest entry for one subject.
  pub fn latest_for(subject_type: SubjectType, subject_id: Uuid) -> Self {
    Self {
      subject_type: Some(subject_type),
      subject_id:   Some(subject_id),
      gate:         None,
      limit:        Some(1),
    }
  }
}

// ─── Audit trail ─────────────────────────────────────────────────────────────

/// A best-effort audit record, e.g. a denied scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
  pub event_id:     Uuid,
  pub action:       String,
  pub subject_type: Option<SubjectType>,
  pub subject_id:   Option<Uuid>,
  /// The code as scanned, after normalisation.
  pub code:         String,
  pub gate:         String,
  pub operator:     String,
  pub detail:       Option<String>,
  pub recorded_at:  DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEvent {
  pub action:       String,
  pub subject_type: Option<SubjectType>,
  pub subject_id:   Option<Uuid>,
  pub code:         String,
  pub gate:         String,
  pub operator:     String,
  pub detail:       Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn direction_opposite_alternates() {
    assert_eq!(Direction::In.opposite(), Direction::Out);
    assert_eq!(Direction::Out.opposite(), Direction::In);
  }

  #[test]
  fn subject_type_parse_rejects_unknown() {
    assert_eq!("visitor".parse::<SubjectType>().unwrap(), SubjectType::Visitor);
    assert!(matches!(
      "vendor".parse::<SubjectType>(),
      Err(Error::UnknownVariant { kind: "subject type", .. })
    ));
  }

  #[test]
  fn direction_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Direction::Out).unwrap(), "\"out\"");
  }
}
