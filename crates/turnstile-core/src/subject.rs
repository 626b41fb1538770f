//! Subjects: the things a scanned code can refer to.
//!
//! A visitor pass is a single-visit authorization with a validity window and
//! a status that the toggle engine advances. An employee credential is a
//! standing authorization that scanning never mutates; only its access log
//! grows.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, access::SubjectType};

// ─── Visitor pass ────────────────────────────────────────────────────────────

/// Where a visitor stands in the single-visit lifecycle.
///
/// The engine only ever moves `pending|outside → inside → closed`. A closed
/// pass is never reopened by scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitorStatus {
  #[default]
  Pending,
  Inside,
  Outside,
  Closed,
}

impl VisitorStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Inside => "inside",
      Self::Outside => "outside",
      Self::Closed => "closed",
    }
  }
}

impl FromStr for VisitorStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pending" => Ok(Self::Pending),
      "inside" => Ok(Self::Inside),
      "outside" => Ok(Self::Outside),
      "closed" => Ok(Self::Closed),
      other => Err(Error::UnknownVariant {
        kind:  "visitor status",
        value: other.to_owned(),
      }),
    }
  }
}

/// A registered visitor pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorPass {
  pub pass_id:         Uuid,
  /// Scannable code, always `VP-` followed by the opaque part.
  pub code:            String,
  pub full_name:       String,
  pub document_number: String,
  pub company:         Option<String>,
  pub valid_from:      DateTime<Utc>,
  pub valid_until:     DateTime<Utc>,
  pub status:          VisitorStatus,
  pub created_at:      DateTime<Utc>,
}

impl VisitorPass {
  /// Whether the validity window has ended at `now`.
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    now > self.valid_until
  }
}

/// Input for registering a visitor pass. The store assigns id, code and
/// creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVisitorPass {
  pub full_name:       String,
  pub document_number: String,
  #[serde(default)]
  pub company:         Option<String>,
  pub valid_from:      DateTime<Utc>,
  pub valid_until:     DateTime<Utc>,
}

// ─── Employee credential ─────────────────────────────────────────────────────

/// Whether the credential identifies a person or a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
  Personal,
  Vehicle,
}

impl CredentialKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Personal => "personal",
      Self::Vehicle => "vehicle",
    }
  }
}

impl FromStr for CredentialKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "personal" => Ok(Self::Personal),
      "vehicle" => Ok(Self::Vehicle),
      other => Err(Error::UnknownVariant {
        kind:  "credential kind",
        value: other.to_owned(),
      }),
    }
  }
}

/// Administrative block flag on a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
  #[default]
  Allowed,
  Blocked,
}

impl BlockStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Allowed => "allowed",
      Self::Blocked => "blocked",
    }
  }
}

impl FromStr for BlockStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "allowed" => Ok(Self::Allowed),
      "blocked" => Ok(Self::Blocked),
      other => Err(Error::UnknownVariant {
        kind:  "block status",
        value: other.to_owned(),
      }),
    }
  }
}

/// A standing employee or vehicle credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeCredential {
  pub credential_id: Uuid,
  /// Scannable code, always `EC-` followed by the opaque part.
  pub code:          String,
  pub kind:          CredentialKind,
  pub full_name:     String,
  pub document:      String,
  pub status:        BlockStatus,
  pub created_at:    DateTime<Utc>,
}

/// Input for registering a credential. New credentials start `allowed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCredential {
  pub kind:      CredentialKind,
  pub full_name: String,
  pub document:  String,
}

// ─── Resolved subject ────────────────────────────────────────────────────────

/// Either kind of subject, as resolved from a classified code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Subject {
  Visitor(VisitorPass),
  Employee(EmployeeCredential),
}

impl Subject {
  pub fn subject_type(&self) -> SubjectType {
    match self {
      Self::Visitor(_) => SubjectType::Visitor,
      Self::Employee(_) => SubjectType::Employee,
    }
  }

  pub fn id(&self) -> Uuid {
    match self {
      Self::Visitor(p) => p.pass_id,
      Self::Employee(c) => c.credential_id,
    }
  }

  pub fn code(&self) -> &str {
    match self {
      Self::Visitor(p) => &p.code,
      Self::Employee(c) => &c.code,
    }
  }

  pub fn display_name(&self) -> &str {
    match self {
      Self::Visitor(p) => &p.full_name,
      Self::Employee(c) => &c.full_name,
    }
  }
}

impl fmt::Display for Subject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {} ({})", self.subject_type(), self.code(), self.display_name())
  }
}
