//! Handlers for `/visitors` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/visitors` | Optional `?status=pending\|inside\|outside\|closed` |
//! | `POST` | `/visitors` | Body: [`NewVisitorPass`]; code is generated |
//! | `GET`  | `/visitors/{code}` | 404 if not found |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;
use turnstile_core::{
  code::{ClassifiedCode, classify},
  store::AccessStore,
  subject::{NewVisitorPass, VisitorPass, VisitorStatus},
};

use crate::{AppState, auth::Operator, error::Error};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<VisitorStatus>,
}

/// `GET /visitors[?status=<status>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _: Operator,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<VisitorPass>>, Error>
where
  S: AccessStore + Clone + 'static,
{
  let passes = state
    .store
    .list_visitor_passes(params.status)
    .await
    .map_err(Error::store)?;
  Ok(Json(passes))
}

/// `POST /visitors`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Operator(operator): Operator,
  Json(body): Json<NewVisitorPass>,
) -> Result<impl IntoResponse, Error>
where
  S: AccessStore + Clone + 'static,
{
  if body.full_name.trim().is_empty() {
    return Err(Error::BadRequest("full_name must not be empty".into()));
  }
  if body.valid_until <= body.valid_from {
    return Err(Error::BadRequest("valid_until must be after valid_from".into()));
  }

  let pass = state.store.add_visitor_pass(body).await.map_err(Error::store)?;
  info!(code = %pass.code, %operator, "visitor pass registered");
  Ok((StatusCode::CREATED, Json(pass)))
}

/// `GET /visitors/{code}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _: Operator,
  Path(code): Path<String>,
) -> Result<Json<VisitorPass>, Error>
where
  S: AccessStore + Clone + 'static,
{
  let ClassifiedCode::VisitorCode(code) = classify(&code) else {
    return Err(Error::NotFound(format!("visitor pass {code}")));
  };
  state
    .store
    .find_visitor_pass(code.clone())
    .await
    .map_err(Error::store)?
    .map(Json)
    .ok_or_else(|| Error::NotFound(format!("visitor pass {code}")))
}
