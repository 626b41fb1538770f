//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as fixed-width RFC 3339 UTC strings with
//! microsecond precision, so lexical order equals chronological order.
//! Enumerations are stored as their lowercase names. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use turnstile_core::{
  access::{AccessLogEntry, AuditEvent},
  subject::{EmployeeCredential, VisitorPass},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Drop sub-microsecond precision, so values returned from writes compare
/// equal to values read back.
pub fn truncate(dt: DateTime<Utc>) -> DateTime<Utc> {
  DateTime::from_timestamp_micros(dt.timestamp_micros()).unwrap_or(dt)
}

/// The store's clock.
pub fn now() -> DateTime<Utc> { truncate(Utc::now()) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `visitor_passes` row.
pub struct RawVisitorPass {
  pub pass_id:         String,
  pub code:            String,
  pub full_name:       String,
  pub document_number: String,
  pub company:         Option<String>,
  pub valid_from:      String,
  pub valid_until:     String,
  pub status:          String,
  pub created_at:      String,
}

pub const VISITOR_COLUMNS: &str = "pass_id, code, full_name, document_number, company, \
                                   valid_from, valid_until, status, created_at";

impl RawVisitorPass {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      pass_id:         row.get(0)?,
      code:            row.get(1)?,
      full_name:       row.get(2)?,
      document_number: row.get(3)?,
      company:         row.get(4)?,
      valid_from:      row.get(5)?,
      valid_until:     row.get(6)?,
      status:          row.get(7)?,
      created_at:      row.get(8)?,
    })
  }

  pub fn into_pass(self) -> Result<VisitorPass> {
    Ok(VisitorPass {
      pass_id:         decode_uuid(&self.pass_id)?,
      code:            self.code,
      full_name:       self.full_name,
      document_number: self.document_number,
      company:         self.company,
      valid_from:      decode_dt(&self.valid_from)?,
      valid_until:     decode_dt(&self.valid_until)?,
      status:          self.status.parse()?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `employee_credentials` row.
pub struct RawCredential {
  pub credential_id: String,
  pub code:          String,
  pub kind:          String,
  pub full_name:     String,
  pub document:      String,
  pub status:        String,
  pub created_at:    String,
}

pub const CREDENTIAL_COLUMNS: &str =
  "credential_id, code, kind, full_name, document, status, created_at";

impl RawCredential {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      credential_id: row.get(0)?,
      code:          row.get(1)?,
      kind:          row.get(2)?,
      full_name:     row.get(3)?,
      document:      row.get(4)?,
      status:        row.get(5)?,
      created_at:    row.get(6)?,
    })
  }

  pub fn into_credential(self) -> Result<EmployeeCredential> {
    Ok(EmployeeCredential {
      credential_id: decode_uuid(&self.credential_id)?,
      code:          self.code,
      kind:          self.kind.parse()?,
      full_name:     self.full_name,
      document:      self.document,
      status:        self.status.parse()?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `access_logs` row.
pub struct RawAccessLogEntry {
  pub entry_id:     String,
  pub subject_type: String,
  pub subject_id:   String,
  pub direction:    String,
  pub gate:         String,
  pub operator:     String,
  pub recorded_at:  String,
}

impl RawAccessLogEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entry_id:     row.get(0)?,
      subject_type: row.get(1)?,
      subject_id:   row.get(2)?,
      direction:    row.get(3)?,
      gate:         row.get(4)?,
      operator:     row.get(5)?,
      recorded_at:  row.get(6)?,
    })
  }

  pub fn into_entry(self) -> Result<AccessLogEntry> {
    Ok(AccessLogEntry {
      entry_id:     decode_uuid(&self.entry_id)?,
      subject_type: self.subject_type.parse()?,
      subject_id:   decode_uuid(&self.subject_id)?,
      direction:    self.direction.parse()?,
      gate:         self.gate,
      operator:     self.operator,
      recorded_at:  decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw strings read directly from an `audit_events` row.
pub struct RawAuditEvent {
  pub event_id:     String,
  pub action:       String,
  pub subject_type: Option<String>,
  pub subject_id:   Option<String>,
  pub code:         String,
  pub gate:         String,
  pub operator:     String,
  pub detail:       Option<String>,
  pub recorded_at:  String,
}

impl RawAuditEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:     row.get(0)?,
      action:       row.get(1)?,
      subject_type: row.get(2)?,
      subject_id:   row.get(3)?,
      code:         row.get(4)?,
      gate:         row.get(5)?,
      operator:     row.get(6)?,
      detail:       row.get(7)?,
      recorded_at:  row.get(8)?,
    })
  }

  pub fn into_event(self) -> Result<AuditEvent> {
    Ok(AuditEvent {
      event_id:     decode_uuid(&self.event_id)?,
      action:       self.action,
      subject_type: self.subject_type.map(|s| s.parse()).transpose()?,
      subject_id:   self.subject_id.as_deref().map(decode_uuid).transpose()?,
      code:         self.code,
      gate:         self.gate,
      operator:     self.operator,
      detail:       self.detail,
      recorded_at:  decode_dt(&self.recorded_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_are_fixed_width() {
    let a = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let b = Utc.timestamp_opt(1_700_000_000, 500_000_000).unwrap();
    let (ea, eb) = (encode_dt(a), encode_dt(b));
    assert_eq!(ea.len(), eb.len());
    assert!(ea < eb);
    assert_eq!(decode_dt(&eb).unwrap(), b);
  }

  #[test]
  fn now_roundtrips_exactly() {
    let t = now();
    assert_eq!(decode_dt(&encode_dt(t)).unwrap(), t);
  }
}
