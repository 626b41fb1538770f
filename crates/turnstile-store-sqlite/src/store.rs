//! [`SqliteStore`]: the SQLite implementation of [`AccessStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use turnstile_core::{
  access::{
    AccessLogEntry, AccessLogQuery, AuditEvent, NewAccessLogEntry, NewAuditEvent, SubjectType,
  },
  code,
  store::AccessStore,
  subject::{
    BlockStatus, CredentialKind, EmployeeCredential, NewCredential, NewVisitorPass,
    VisitorPass, VisitorStatus,
  },
};
use uuid::Uuid;

use crate::{
  encode::{
    CREDENTIAL_COLUMNS, RawAccessLogEntry, RawAuditEvent, RawCredential, RawVisitorPass,
    VISITOR_COLUMNS, encode_dt, encode_uuid, now, truncate,
  },
  schema::SCHEMA,
  Error, Result,
};

/// How many fresh codes to try before giving up on a registration.
const CODE_ATTEMPTS: usize = 8;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Turnstile store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Pick a code for `subject_type` that is not yet present in `table`.
  ///
  /// Must run inside a `call` closure so the check and the following insert
  /// are not interleaved with other writers.
  fn unused_code(
    conn: &rusqlite::Connection,
    table: &str,
    subject_type: SubjectType,
  ) -> rusqlite::Result<Option<String>> {
    let sql = format!("SELECT 1 FROM {table} WHERE code = ?1");
    for _ in 0..CODE_ATTEMPTS {
      let candidate = code::generate(subject_type);
      let taken = conn
        .query_row(&sql, rusqlite::params![candidate], |_| Ok(()))
        .optional()?
        .is_some();
      if !taken {
        return Ok(Some(candidate));
      }
    }
    Ok(None)
  }

  async fn query_visitor(&self, column: &'static str, value: String) -> Result<Option<VisitorPass>> {
    let raw: Option<RawVisitorPass> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {VISITOR_COLUMNS} FROM visitor_passes WHERE {column} = ?1");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![value], RawVisitorPass::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVisitorPass::into_pass).transpose()
  }

  async fn query_credential(
    &self,
    column: &'static str,
    value: String,
  ) -> Result<Option<EmployeeCredential>> {
    let raw: Option<RawCredential> = self
      .conn
      .call(move |conn| {
        let sql =
          format!("SELECT {CREDENTIAL_COLUMNS} FROM employee_credentials WHERE {column} = ?1");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![value], RawCredential::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCredential::into_credential).transpose()
  }
}

// ─── AccessStore impl ────────────────────────────────────────────────────────

impl AccessStore for SqliteStore {
  type Error = Error;

  // ── Visitor passes ────────────────────────────────────────────────────────

  async fn add_visitor_pass(&self, input: NewVisitorPass) -> Result<VisitorPass> {
    let pass_id    = Uuid::new_v4();
    let created_at = now();

    let id_str      = encode_uuid(pass_id);
    let created_str = encode_dt(created_at);
    let from_str    = encode_dt(input.valid_from);
    let until_str   = encode_dt(input.valid_until);
    let status_str  = VisitorStatus::Pending.as_str();
    let name        = input.full_name.clone();
    let document    = input.document_number.clone();
    let company     = input.company.clone();

    let code: Option<String> = self
      .conn
      .call(move |conn| {
        let Some(code) = Self::unused_code(conn, "visitor_passes", SubjectType::Visitor)? else {
          return Ok(None);
        };
        conn.execute(
          "INSERT INTO visitor_passes (
             pass_id, code, full_name, document_number, company,
             valid_from, valid_until, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            code,
            name,
            document,
            company,
            from_str,
            until_str,
            status_str,
            created_str,
          ],
        )?;
        Ok(Some(code))
      })
      .await?;

    let code = code.ok_or(Error::CodeExhausted(CODE_ATTEMPTS))?;

    Ok(VisitorPass {
      pass_id,
      code,
      full_name: input.full_name,
      document_number: input.document_number,
      company: input.company,
      valid_from: truncate(input.valid_from),
      valid_until: truncate(input.valid_until),
      status: VisitorStatus::Pending,
      created_at,
    })
  }

  async fn get_visitor_pass(&self, id: Uuid) -> Result<Option<VisitorPass>> {
    self.query_visitor("pass_id", encode_uuid(id)).await
  }

  async fn find_visitor_pass(&self, code: String) -> Result<Option<VisitorPass>> {
    self.query_visitor("code", code).await
  }

  async fn set_visitor_status(
    &self,
    id:     Uuid,
    status: VisitorStatus,
  ) -> Result<Option<VisitorPass>> {
    let id_str     = encode_uuid(id);
    let status_str = status.as_str();

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE visitor_passes SET status = ?2 WHERE pass_id = ?1",
          rusqlite::params![id_str, status_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_visitor_pass(id).await
  }

  async fn list_visitor_passes(&self, status: Option<VisitorStatus>) -> Result<Vec<VisitorPass>> {
    let status_str = status.map(VisitorStatus::as_str);

    let raws: Vec<RawVisitorPass> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {VISITOR_COLUMNS} FROM visitor_passes
           WHERE (?1 IS NULL OR status = ?1)
           ORDER BY created_at DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![status_str], RawVisitorPass::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVisitorPass::into_pass).collect()
  }

  // ── Employee credentials ──────────────────────────────────────────────────

  async fn add_credential(&self, input: NewCredential) -> Result<EmployeeCredential> {
    let credential_id = Uuid::new_v4();
    let created_at    = now();

    let id_str      = encode_uuid(credential_id);
    let created_str = encode_dt(created_at);
    let kind_str    = input.kind.as_str();
    let status_str  = BlockStatus::Allowed.as_str();
    let name        = input.full_name.clone();
    let document    = input.document.clone();

    let code: Option<String> = self
      .conn
      .call(move |conn| {
        let Some(code) =
          Self::unused_code(conn, "employee_credentials", SubjectType::Employee)?
        else {
          return Ok(None);
        };
        conn.execute(
          "INSERT INTO employee_credentials (
             credential_id, code, kind, full_name, document, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, code, kind_str, name, document, status_str, created_str],
        )?;
        Ok(Some(code))
      })
      .await?;

    let code = code.ok_or(Error::CodeExhausted(CODE_ATTEMPTS))?;

    Ok(EmployeeCredential {
      credential_id,
      code,
      kind: input.kind,
      full_name: input.full_name,
      document: input.document,
      status: BlockStatus::Allowed,
      created_at,
    })
  }

  async fn get_credential(&self, id: Uuid) -> Result<Option<EmployeeCredential>> {
    self.query_credential("credential_id", encode_uuid(id)).await
  }

  async fn find_credential(&self, code: String) -> Result<Option<EmployeeCredential>> {
    self.query_credential("code", code).await
  }

  async fn set_credential_status(
    &self,
    id:     Uuid,
    status: BlockStatus,
  ) -> Result<Option<EmployeeCredential>> {
    let id_str     = encode_uuid(id);
    let status_str = status.as_str();

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE employee_credentials SET status = ?2 WHERE credential_id = ?1",
          rusqlite::params![id_str, status_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_credential(id).await
  }

  async fn list_credentials(
    &self,
    kind: Option<CredentialKind>,
  ) -> Result<Vec<EmployeeCredential>> {
    let kind_str = kind.map(CredentialKind::as_str);

    let raws: Vec<RawCredential> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {CREDENTIAL_COLUMNS} FROM employee_credentials
           WHERE (?1 IS NULL OR kind = ?1)
           ORDER BY created_at DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![kind_str], RawCredential::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCredential::into_credential).collect()
  }

  // ── Access log ────────────────────────────────────────────────────────────

  async fn append_access_log(&self, input: NewAccessLogEntry) -> Result<AccessLogEntry> {
    let entry_id     = Uuid::new_v4();
    let id_str       = encode_uuid(entry_id);
    let type_str     = input.subject_type.as_str();
    let subject_str  = encode_uuid(input.subject_id);
    let dir_str      = input.direction.as_str();
    let gate         = input.gate.clone();
    let operator     = input.operator.clone();

    // Stamped on the connection thread, so `recorded_at` follows `seq`
    // unless the wall clock steps back.
    let recorded_at = self
      .conn
      .call(move |conn| {
        let recorded_at = now();
        conn.execute(
          "INSERT INTO access_logs (
             entry_id, subject_type, subject_id, direction, gate, operator, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            type_str,
            subject_str,
            dir_str,
            gate,
            operator,
            encode_dt(recorded_at),
          ],
        )?;
        Ok(recorded_at)
      })
      .await?;

    Ok(AccessLogEntry {
      entry_id,
      subject_type: input.subject_type,
      subject_id:   input.subject_id,
      direction:    input.direction,
      gate:         input.gate,
      operator:     input.operator,
      recorded_at,
    })
  }

  async fn list_access_logs(&self, query: AccessLogQuery) -> Result<Vec<AccessLogEntry>> {
    let type_str    = query.subject_type.map(SubjectType::as_str);
    let subject_str = query.subject_id.map(encode_uuid);
    let gate        = query.gate;
    let limit_val   = query.limit.map_or(-1, |l| l as i64);

    let raws: Vec<RawAccessLogEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT entry_id, subject_type, subject_id, direction, gate, operator, recorded_at
           FROM access_logs
           WHERE (?1 IS NULL OR subject_type = ?1)
             AND (?2 IS NULL OR subject_id   = ?2)
             AND (?3 IS NULL OR gate         = ?3)
           ORDER BY seq DESC
           LIMIT ?4",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![type_str, subject_str, gate, limit_val],
            RawAccessLogEntry::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAccessLogEntry::into_entry).collect()
  }

  // ── Audit trail ───────────────────────────────────────────────────────────

  async fn record_audit_event(&self, input: NewAuditEvent) -> Result<AuditEvent> {
    let event = AuditEvent {
      event_id:     Uuid::new_v4(),
      action:       input.action,
      subject_type: input.subject_type,
      subject_id:   input.subject_id,
      code:         input.code,
      gate:         input.gate,
      operator:     input.operator,
      detail:       input.detail,
      recorded_at:  now(),
    };

    let id_str       = encode_uuid(event.event_id);
    let action       = event.action.clone();
    let type_str     = event.subject_type.map(SubjectType::as_str);
    let subject_str  = event.subject_id.map(encode_uuid);
    let code         = event.code.clone();
    let gate         = event.gate.clone();
    let operator     = event.operator.clone();
    let detail       = event.detail.clone();
    let recorded_str = encode_dt(event.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO audit_events (
             event_id, action, subject_type, subject_id, code, gate, operator, detail, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            action,
            type_str,
            subject_str,
            code,
            gate,
            operator,
            detail,
            recorded_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(event)
  }

  async fn list_audit_events(&self, limit: usize) -> Result<Vec<AuditEvent>> {
    let limit_val = limit as i64;

    let raws: Vec<RawAuditEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT event_id, action, subject_type, subject_id, code, gate, operator, detail,
                  recorded_at
           FROM audit_events
           ORDER BY seq DESC
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val], RawAuditEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAuditEvent::into_event).collect()
  }
}
