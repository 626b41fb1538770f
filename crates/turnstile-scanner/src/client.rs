//! Async HTTP client for the gate API.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use turnstile_core::feedback::Feedback;

/// Connection settings for the gate API.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
  pub gate:     String,
  /// Debounce key sent with every scan; the server falls back to `gate`.
  pub device:   Option<String>,
}

/// What the server made of one submitted code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanReply {
  Completed(Feedback),
  /// Another scan from this device was still being processed.
  Debounced,
}

#[derive(Deserialize)]
struct TokenBody {
  token: String,
}

#[derive(Deserialize)]
struct CompletedBody {
  feedback: Feedback,
}

#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

/// Logged-in client. Cheap to clone; clones share the HTTP connection pool
/// and the current token.
#[derive(Clone)]
pub struct ScannerClient {
  client: Client,
  config: ScannerConfig,
  bearer: Arc<RwLock<String>>,
}

impl ScannerClient {
  /// Build a client and exchange the operator credentials for a token.
  pub async fn connect(config: ScannerConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(15))
      .build()
      .context("failed to build HTTP client")?;

    let token = login(&client, &config).await?;
    Ok(Self { client, config, bearer: Arc::new(RwLock::new(token)) })
  }

  pub fn config(&self) -> &ScannerConfig { &self.config }

  /// `POST /scan`
  ///
  /// A `401` means the token expired; the client logs in again and retries
  /// once. The server rejects unauthenticated scans before touching the
  /// engine, so the retry cannot double-admit.
  pub async fn scan(&self, code: &str) -> Result<ScanReply> {
    let bearer = self.bearer.read().await.clone();
    let mut resp = self.post_scan(code, &bearer).await?;

    if resp.status() == StatusCode::UNAUTHORIZED {
      tracing::info!(operator = %self.config.username, "token rejected, logging in again");
      let fresh = login(&self.client, &self.config).await?;
      *self.bearer.write().await = fresh.clone();
      resp = self.post_scan(code, &fresh).await?;
    }

    match resp.status() {
      StatusCode::OK => {
        let body: CompletedBody = resp.json().await.context("deserialising scan outcome")?;
        Ok(ScanReply::Completed(body.feedback))
      }
      StatusCode::CONFLICT => Ok(ScanReply::Debounced),
      status => {
        let detail = resp
          .json::<ErrorBody>()
          .await
          .map(|b| b.error)
          .unwrap_or_default();
        Err(anyhow!("POST /scan → {status} {detail}"))
      }
    }
  }

  async fn post_scan(&self, code: &str, bearer: &str) -> Result<reqwest::Response> {
    self
      .client
      .post(url(&self.config.base_url, "/scan"))
      .bearer_auth(bearer)
      .json(&json!({
        "code":   code,
        "gate":   self.config.gate,
        "device": self.config.device,
      }))
      .send()
      .await
      .context("POST /scan failed")
  }
}

/// `POST /auth/token` with the operator's basic credentials.
async fn login(client: &Client, config: &ScannerConfig) -> Result<String> {
  let resp = client
    .post(url(&config.base_url, "/auth/token"))
    .basic_auth(&config.username, Some(&config.password))
    .send()
    .await
    .context("POST /auth/token failed")?;

  if !resp.status().is_success() {
    return Err(anyhow!("login as {} → {}", config.username, resp.status()));
  }
  let body: TokenBody = resp.json().await.context("deserialising token")?;
  tracing::debug!(operator = %config.username, "logged in");
  Ok(body.token)
}

fn url(base: &str, path: &str) -> String { format!("{}{}", base.trim_end_matches('/'), path) }
