//! The `AccessStore` trait, the persistence collaborator.
//!
//! The trait is implemented by storage backends (e.g.
//! `turnstile-store-sqlite`). The scan engine and the HTTP layer depend on
//! this abstraction, not on any concrete backend.
//!
//! Each collection offers the same primitives: get-by-id, get-by-code,
//! insert, update-by-id and filtered list. Nothing here is transactional
//! across collections.

use std::future::Future;

use uuid::Uuid;

use crate::{
  access::{AccessLogEntry, AccessLogQuery, AuditEvent, NewAccessLogEntry, NewAuditEvent},
  subject::{
    BlockStatus, CredentialKind, EmployeeCredential, NewCredential, NewVisitorPass,
    VisitorPass, VisitorStatus,
  },
};

/// Abstraction over a Turnstile storage backend.
///
/// Ids, codes and timestamps are assigned by the store. The access log is
/// append-only; there is no method to change or remove an entry.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait AccessStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Visitor passes ────────────────────────────────────────────────────

  /// Register a pass with a freshly generated `VP-` code and status
  /// `pending`.
  fn add_visitor_pass(
    &self,
    input: NewVisitorPass,
  ) -> impl Future<Output = Result<VisitorPass, Self::Error>> + Send + '_;

  fn get_visitor_pass(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<VisitorPass>, Self::Error>> + Send + '_;

  /// Look a pass up by its (normalised) code. Returns `None` if not found.
  fn find_visitor_pass(
    &self,
    code: String,
  ) -> impl Future<Output = Result<Option<VisitorPass>, Self::Error>> + Send + '_;

  /// Overwrite the status of pass `id`. Returns the updated pass, or `None`
  /// if no such pass exists.
  fn set_visitor_status(
    &self,
    id: Uuid,
    status: VisitorStatus,
  ) -> impl Future<Output = Result<Option<VisitorPass>, Self::Error>> + Send + '_;

  fn list_visitor_passes(
    &self,
    status: Option<VisitorStatus>,
  ) -> impl Future<Output = Result<Vec<VisitorPass>, Self::Error>> + Send + '_;

  // ── Employee credentials ──────────────────────────────────────────────

  /// Register a credential with a freshly generated `EC-` code and status
  /// `allowed`.
  fn add_credential(
    &self,
    input: NewCredential,
  ) -> impl Future<Output = Result<EmployeeCredential, Self::Error>> + Send + '_;

  fn get_credential(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<EmployeeCredential>, Self::Error>> + Send + '_;

  fn find_credential(
    &self,
    code: String,
  ) -> impl Future<Output = Result<Option<EmployeeCredential>, Self::Error>> + Send + '_;

  fn set_credential_status(
    &self,
    id: Uuid,
    status: BlockStatus,
  ) -> impl Future<Output = Result<Option<EmployeeCredential>, Self::Error>> + Send + '_;

  fn list_credentials(
    &self,
    kind: Option<CredentialKind>,
  ) -> impl Future<Output = Result<Vec<EmployeeCredential>, Self::Error>> + Send + '_;

  // ── Access log (append-only) ──────────────────────────────────────────

  /// Append an entry. `recorded_at` is assigned by the store.
  fn append_access_log(
    &self,
    input: NewAccessLogEntry,
  ) -> impl Future<Output = Result<AccessLogEntry, Self::Error>> + Send + '_;

  /// List entries matching `query`, newest first. Entries with equal
  /// timestamps come back in reverse insertion order.
  fn list_access_logs(
    &self,
    query: AccessLogQuery,
  ) -> impl Future<Output = Result<Vec<AccessLogEntry>, Self::Error>> + Send + '_;

  // ── Audit trail ───────────────────────────────────────────────────────

  fn record_audit_event(
    &self,
    input: NewAuditEvent,
  ) -> impl Future<Output = Result<AuditEvent, Self::Error>> + Send + '_;

  /// The most recent `limit` audit events, newest first.
  fn list_audit_events(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<AuditEvent>, Self::Error>> + Send + '_;
}
