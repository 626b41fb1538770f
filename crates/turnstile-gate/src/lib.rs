//! HTTP gate service for Turnstile.
//!
//! Exposes an axum [`Router`] that accepts scans from operator terminals,
//! registers visitor passes and credentials, and serves the access log and
//! audit trail. Backed by any [`AccessStore`].

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use turnstile_core::store::AccessStore;
use turnstile_scan::{EngineConfig, ScanEngine};

use auth::{OperatorConfig, TokenAuth};
use handlers::{credentials, logs, scan, token, visitors};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  pub store_path:            PathBuf,
  #[serde(default = "defaults::call_timeout_ms")]
  pub call_timeout_ms:       u64,
  #[serde(default = "defaults::status_retry_attempts")]
  pub status_retry_attempts: u32,
  #[serde(default = "defaults::token_ttl_secs")]
  pub token_ttl_secs:        u64,
  #[serde(default)]
  pub operators:             Vec<OperatorConfig>,
}

mod defaults {
  pub fn call_timeout_ms() -> u64 { 5_000 }
  pub fn status_retry_attempts() -> u32 { 3 }
  pub fn token_ttl_secs() -> u64 { 12 * 60 * 60 }
}

impl ServerConfig {
  pub fn engine_config(&self) -> EngineConfig {
    EngineConfig {
      call_timeout: Duration::from_millis(self.call_timeout_ms),
      status_retry_attempts: self.status_retry_attempts,
      ..EngineConfig::default()
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: AccessStore> {
  pub store:  Arc<S>,
  pub engine: Arc<ScanEngine<S>>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<TokenAuth>,
}

impl<S: AccessStore + 'static> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Self {
    let store = Arc::new(store);
    let engine = ScanEngine::new(store.clone(), config.engine_config());
    let auth = TokenAuth::new(config.operators.clone(), config.token_ttl_secs);
    Self {
      store,
      engine: Arc::new(engine),
      config: Arc::new(config),
      auth: Arc::new(auth),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the gate service.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: AccessStore + Clone + 'static,
{
  Router::new()
    .route("/auth/token",                  post(token::issue::<S>))
    .route("/scan",                        post(scan::handler::<S>))
    .route("/visitors",                    get(visitors::list::<S>).post(visitors::create::<S>))
    .route("/visitors/{code}",             get(visitors::get_one::<S>))
    .route("/credentials",                 get(credentials::list::<S>).post(credentials::create::<S>))
    .route("/credentials/{code}",          get(credentials::get_one::<S>))
    .route("/credentials/{code}/block",    post(credentials::block::<S>))
    .route("/credentials/{code}/unblock",  post(credentials::unblock::<S>))
    .route("/access-logs",                 get(logs::access_logs::<S>))
    .route("/audit-events",                get(logs::audit_events::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
