//! Read-only views of the access log and audit trail.

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use turnstile_core::{
  access::{AccessLogEntry, AccessLogQuery, AuditEvent},
  store::AccessStore,
};

use crate::{AppState, auth::Operator, error::Error};

/// `GET /access-logs[?subject_type=&subject_id=&gate=&limit=]`, newest first.
pub async fn access_logs<S>(
  State(state): State<AppState<S>>,
  _: Operator,
  Query(query): Query<AccessLogQuery>,
) -> Result<Json<Vec<AccessLogEntry>>, Error>
where
  S: AccessStore + Clone + 'static,
{
  let entries = state.store.list_access_logs(query).await.map_err(Error::store)?;
  Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct AuditParams {
  #[serde(default = "default_limit")]
  pub limit: usize,
}

fn default_limit() -> usize { 50 }

/// `GET /audit-events[?limit=]`, newest first.
pub async fn audit_events<S>(
  State(state): State<AppState<S>>,
  _: Operator,
  Query(params): Query<AuditParams>,
) -> Result<Json<Vec<AuditEvent>>, Error>
where
  S: AccessStore + Clone + 'static,
{
  let events = state
    .store
    .list_audit_events(params.limit)
    .await
    .map_err(Error::store)?;
  Ok(Json(events))
}
