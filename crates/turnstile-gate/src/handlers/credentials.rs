//! Handlers for `/credentials` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/credentials` | Optional `?kind=personal\|vehicle` |
//! | `POST` | `/credentials` | Body: [`NewCredential`]; code is generated |
//! | `GET`  | `/credentials/{code}` | 404 if not found |
//! | `POST` | `/credentials/{code}/block` | Audited |
//! | `POST` | `/credentials/{code}/unblock` | Audited |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tracing::{info, warn};
use turnstile_core::{
  access::{NewAuditEvent, SubjectType},
  code::{ClassifiedCode, classify},
  store::AccessStore,
  subject::{BlockStatus, CredentialKind, EmployeeCredential, NewCredential},
};

use crate::{AppState, auth::Operator, error::Error};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub kind: Option<CredentialKind>,
}

/// `GET /credentials[?kind=<kind>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _: Operator,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<EmployeeCredential>>, Error>
where
  S: AccessStore + Clone + 'static,
{
  let credentials = state
    .store
    .list_credentials(params.kind)
    .await
    .map_err(Error::store)?;
  Ok(Json(credentials))
}

/// `POST /credentials`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Operator(operator): Operator,
  Json(body): Json<NewCredential>,
) -> Result<impl IntoResponse, Error>
where
  S: AccessStore + Clone + 'static,
{
  if body.full_name.trim().is_empty() {
    return Err(Error::BadRequest("full_name must not be empty".into()));
  }
  let credential = state.store.add_credential(body).await.map_err(Error::store)?;
  info!(code = %credential.code, kind = credential.kind.as_str(), %operator, "credential registered");
  Ok((StatusCode::CREATED, Json(credential)))
}

/// `GET /credentials/{code}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _: Operator,
  Path(code): Path<String>,
) -> Result<Json<EmployeeCredential>, Error>
where
  S: AccessStore + Clone + 'static,
{
  find(&state, &code).await.map(Json)
}

/// `POST /credentials/{code}/block`
pub async fn block<S>(
  State(state): State<AppState<S>>,
  Operator(operator): Operator,
  Path(code): Path<String>,
) -> Result<Json<EmployeeCredential>, Error>
where
  S: AccessStore + Clone + 'static,
{
  set_status(&state, &code, BlockStatus::Blocked, operator).await.map(Json)
}

/// `POST /credentials/{code}/unblock`
pub async fn unblock<S>(
  State(state): State<AppState<S>>,
  Operator(operator): Operator,
  Path(code): Path<String>,
) -> Result<Json<EmployeeCredential>, Error>
where
  S: AccessStore + Clone + 'static,
{
  set_status(&state, &code, BlockStatus::Allowed, operator).await.map(Json)
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

async fn find<S: AccessStore>(state: &AppState<S>, raw: &str) -> Result<EmployeeCredential, Error> {
  let ClassifiedCode::EmployeeCode(code) = classify(raw) else {
    return Err(Error::NotFound(format!("credential {raw}")));
  };
  state
    .store
    .find_credential(code.clone())
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(format!("credential {code}")))
}

async fn set_status<S: AccessStore>(
  state: &AppState<S>,
  raw: &str,
  status: BlockStatus,
  operator: String,
) -> Result<EmployeeCredential, Error> {
  let credential = find(state, raw).await?;
  let updated = state
    .store
    .set_credential_status(credential.credential_id, status)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(format!("credential {}", credential.code)))?;

  let action = match status {
    BlockStatus::Blocked => "credential.blocked",
    BlockStatus::Allowed => "credential.unblocked",
  };
  let event = NewAuditEvent {
    action:       action.into(),
    subject_type: Some(SubjectType::Employee),
    subject_id:   Some(updated.credential_id),
    code:         updated.code.clone(),
    gate:         String::new(),
    operator:     operator.clone(),
    detail:       None,
  };
  if let Err(e) = state.store.record_audit_event(event).await {
    warn!(code = %updated.code, "audit event not recorded: {e}");
  }

  info!(code = %updated.code, status = status.as_str(), %operator, "credential status changed");
  Ok(updated)
}
