//! `POST /auth/token`: exchange operator Basic credentials for a bearer token.

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use tracing::{info, warn};
use turnstile_core::store::AccessStore;

use crate::{AppState, error::Error};

pub async fn issue<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<impl IntoResponse, Error>
where
  S: AccessStore + Clone + 'static,
{
  let operator = state.auth.verify_basic(&headers).inspect_err(|_| {
    warn!("operator login rejected");
  })?;
  let issued = state.auth.issue(&operator);
  info!(%operator, expires_at = %issued.expires_at, "operator logged in");
  Ok((StatusCode::CREATED, Json(issued)))
}
