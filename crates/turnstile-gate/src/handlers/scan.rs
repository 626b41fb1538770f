//! `POST /scan`: run one scan cycle on behalf of the calling operator.
//!
//! Responds `200` with the completed [`ScanOutcome`] (denials and scan
//! errors included, since both carry feedback for the operator) and `409`
//! when the device already has a scan in flight.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use turnstile_core::store::AccessStore;
use turnstile_scan::{ScanOutcome, ScanRequest};

use crate::{AppState, auth::Operator, error::Error};

#[derive(Debug, Deserialize)]
pub struct ScanBody {
  pub code:   String,
  pub gate:   String,
  /// Debounce key; defaults to `gate`.
  #[serde(default)]
  pub device: Option<String>,
}

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Operator(operator): Operator,
  Json(body): Json<ScanBody>,
) -> Result<(StatusCode, Json<ScanOutcome>), Error>
where
  S: AccessStore + Clone + 'static,
{
  let gate = body.gate.trim().to_owned();
  if gate.is_empty() {
    return Err(Error::BadRequest("gate must not be empty".into()));
  }
  let device = body
    .device
    .map(|d| d.trim().to_owned())
    .filter(|d| !d.is_empty())
    .unwrap_or_else(|| gate.clone());

  let outcome = state
    .engine
    .scan(ScanRequest { raw: body.code, gate, device, operator })
    .await;

  let status = match outcome {
    ScanOutcome::Completed(_) => StatusCode::OK,
    ScanOutcome::Debounced => StatusCode::CONFLICT,
  };
  Ok((status, Json(outcome)))
}
