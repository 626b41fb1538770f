//! Operator authentication.
//!
//! Operators log in once with HTTP Basic credentials checked against argon2
//! hashes from the config, and receive an opaque bearer token. Only the
//! SHA-256 digest of each token is kept in memory; tokens do not survive a
//! restart.

use std::{collections::HashMap, sync::Mutex, sync::PoisonError};

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{DateTime, TimeDelta, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use turnstile_core::store::AccessStore;

use crate::{AppState, error::Error};

/// One operator account, as configured.
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Returned by the token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
  pub token:      String,
  pub operator:   String,
  pub expires_at: DateTime<Utc>,
}

struct Session {
  operator:   String,
  expires_at: DateTime<Utc>,
}

/// Issues and verifies operator bearer tokens.
pub struct TokenAuth {
  operators:  Vec<OperatorConfig>,
  /// Checked in place of a real hash when the username is unknown, so both
  /// rejections cost one argon2 verification.
  dummy_hash: String,
  ttl:        TimeDelta,
  sessions:   Mutex<HashMap<[u8; 32], Session>>,
}

impl TokenAuth {
  pub fn new(operators: Vec<OperatorConfig>, ttl_secs: u64) -> Self {
    let ttl = i64::try_from(ttl_secs)
      .ok()
      .and_then(TimeDelta::try_seconds)
      .unwrap_or(TimeDelta::MAX);
    Self {
      operators,
      dummy_hash: dummy_hash(),
      ttl,
      sessions: Mutex::new(HashMap::new()),
    }
  }

  /// Check `Authorization: Basic …` and return the operator's username.
  pub fn verify_basic(&self, headers: &HeaderMap) -> Result<String, Error> {
    let encoded = headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.strip_prefix("Basic "))
      .ok_or(Error::BadCredentials)?;

    let decoded = B64.decode(encoded).map_err(|_| Error::BadCredentials)?;
    let creds = std::str::from_utf8(&decoded).map_err(|_| Error::BadCredentials)?;
    let (username, password) = creds.split_once(':').ok_or(Error::BadCredentials)?;

    let (hash, known) = match self.operators.iter().find(|op| op.username == username) {
      Some(op) => (op.password_hash.as_str(), true),
      None => (self.dummy_hash.as_str(), false),
    };

    let verified = PasswordHash::new(hash).is_ok_and(|parsed| {
      Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
    });

    if known && verified {
      Ok(username.to_owned())
    } else {
      Err(Error::BadCredentials)
    }
  }

  /// Mint a fresh token for `operator`. Expired sessions are pruned here.
  pub fn issue(&self, operator: &str) -> IssuedToken {
    let mut raw = [0u8; 32];
    OsRng.fill_bytes(&mut raw);
    let token = hex::encode(raw);

    let now = Utc::now();
    let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

    let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
    sessions.retain(|_, s| s.expires_at > now);
    sessions.insert(digest(&token), Session { operator: operator.to_owned(), expires_at });

    IssuedToken { token, operator: operator.to_owned(), expires_at }
  }

  /// Check `Authorization: Bearer …` and return the operator it was issued to.
  pub fn verify_bearer(&self, headers: &HeaderMap) -> Result<String, Error> {
    let token = headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.strip_prefix("Bearer "))
      .map(str::trim)
      .ok_or(Error::Unauthorized)?;

    let key = digest(token);
    let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
    match sessions.get(&key) {
      Some(s) if s.expires_at > Utc::now() => Ok(s.operator.clone()),
      Some(_) => {
        sessions.remove(&key);
        Err(Error::Unauthorized)
      }
      None => Err(Error::Unauthorized),
    }
  }
}

fn digest(token: &str) -> [u8; 32] { Sha256::digest(token.as_bytes()).into() }

/// Hash of a random password nobody knows.
fn dummy_hash() -> String {
  let mut password = [0u8; 32];
  OsRng.fill_bytes(&mut password);
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(&password, &salt)
    .map(|h| h.to_string())
    .unwrap_or_default()
}

/// The verified operator behind a request.
pub struct Operator(pub String);

impl<S> FromRequestParts<AppState<S>> for Operator
where
  S: AccessStore + Clone + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    state.auth.verify_bearer(&parts.headers).map(Operator)
  }
}
