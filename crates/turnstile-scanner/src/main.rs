//! `turnstile-scanner`: operator terminal for a turnstile gate.
//!
//! # Usage
//!
//! ```
//! turnstile-scanner --url http://localhost:8080 --user guard --password secret --gate north manual
//! turnstile-scanner --config ~/.config/turnstile/scanner.toml kiosk
//! ```

mod app;
mod client;
mod present;
mod ui;

use std::{
  io,
  path::{Path, PathBuf},
  sync::Mutex,
  time::Duration,
};

use anyhow::{Context, Result};
use app::{App, KeyAction};
use clap::{Parser, Subcommand};
use client::{ScanReply, ScannerClient, ScannerConfig};
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use present::Console;
use ratatui::{Terminal, backend::CrosstermBackend};
use serde::Deserialize;
use tokio::{
  io::{AsyncBufReadExt, BufReader},
  task::JoinHandle,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use turnstile_core::feedback::FeedbackPresenter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "turnstile-scanner", about = "Operator terminal for a turnstile gate")]
struct Args {
  /// Path to a TOML config file (url, username, password, gate, device).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the gate server (default: http://localhost:8080).
  #[arg(long, env = "TURNSTILE_URL")]
  url: Option<String>,

  /// Operator username.
  #[arg(long, env = "TURNSTILE_USER")]
  user: Option<String>,

  /// Operator password (plaintext).
  #[arg(long, env = "TURNSTILE_PASSWORD")]
  password: Option<String>,

  /// Gate recorded on every access-log entry.
  #[arg(long, env = "TURNSTILE_GATE")]
  gate: Option<String>,

  /// Input device id used for debouncing (default: the gate).
  #[arg(long, env = "TURNSTILE_DEVICE")]
  device: Option<String>,

  /// Kiosk log file (default: turnstile-scanner.log in the temp dir).
  #[arg(long, env = "TURNSTILE_LOG_FILE", value_name = "FILE")]
  log_file: Option<PathBuf>,

  #[command(subcommand)]
  mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
  /// Read one code per line from stdin.
  Manual,
  /// Fullscreen kiosk fed by a keyboard-wedge reader.
  Kiosk,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
  #[serde(default)]
  gate:     String,
  #[serde(default)]
  device:   Option<String>,
}

fn non_empty(s: &str) -> Option<String> { (!s.is_empty()).then(|| s.to_owned()) }

// ─── Logging ──────────────────────────────────────────────────────────────────

fn env_filter() -> EnvFilter {
  EnvFilter::builder()
    .with_default_directive(LevelFilter::WARN.into())
    .from_env_lossy()
}

fn log_path(explicit: Option<&Path>) -> PathBuf {
  explicit
    .map(Path::to_path_buf)
    .unwrap_or_else(|| std::env::temp_dir().join("turnstile-scanner.log"))
}

/// The kiosk owns the terminal, so its logs are appended to a file.
fn init_file_logging(path: &Path) -> Result<()> {
  let file = std::fs::OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .with_context(|| format!("opening log file {}", path.display()))?;
  tracing_subscriber::fmt()
    .with_writer(Mutex::new(file))
    .with_ansi(false)
    .with_env_filter(env_filter())
    .init();
  Ok(())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let config = ScannerConfig {
    base_url: args
      .url
      .or_else(|| non_empty(&file_cfg.url))
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
    username: args.user.or_else(|| non_empty(&file_cfg.username)).unwrap_or_default(),
    password: args.password.or_else(|| non_empty(&file_cfg.password)).unwrap_or_default(),
    gate:     args
      .gate
      .or_else(|| non_empty(&file_cfg.gate))
      .context("no gate configured (use --gate or set `gate` in the config file)")?,
    device:   args.device.or(file_cfg.device),
  };

  match args.mode {
    Mode::Manual => {
      tracing_subscriber::fmt().with_writer(io::stderr).with_env_filter(env_filter()).init();
      let client = ScannerClient::connect(config).await?;
      run_manual(client).await
    }
    Mode::Kiosk => {
      init_file_logging(&log_path(args.log_file.as_deref()))?;
      let client = ScannerClient::connect(config).await?;
      run_kiosk(client).await
    }
  }
}

// ─── Manual mode ──────────────────────────────────────────────────────────────

async fn run_manual(client: ScannerClient) -> Result<()> {
  println!(
    "gate {} ready; one code per line, Ctrl-D to quit",
    client.config().gate
  );
  let mut lines = BufReader::new(tokio::io::stdin()).lines();

  while let Some(line) = lines.next_line().await.context("reading stdin")? {
    let code = line.trim();
    if code.is_empty() {
      continue;
    }
    match client.scan(code).await {
      Ok(ScanReply::Completed(feedback)) => Console.present(&feedback),
      Ok(ScanReply::Debounced) => println!("{code}: previous scan still in progress, ignored"),
      Err(e) => {
        tracing::warn!("scan request failed: {e:#}");
        Console.present(&turnstile_core::feedback::Feedback::error(format!("{e:#}")));
      }
    }
  }

  Ok(())
}

// ─── Kiosk mode ───────────────────────────────────────────────────────────────

async fn run_kiosk(client: ScannerClient) -> Result<()> {
  let mut app = App::new(client.config().gate.clone());

  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  let run_result = run_event_loop(&mut terminal, &mut app, client).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
  client: ScannerClient,
) -> Result<()> {
  let mut pending: Option<JoinHandle<Result<ScanReply>>> = None;

  loop {
    if pending.as_ref().is_some_and(JoinHandle::is_finished)
      && let Some(handle) = pending.take()
    {
      let reply = handle.await.context("scan task panicked")?;
      if let Err(e) = &reply {
        tracing::warn!("scan request failed: {e:#}");
      }
      app.finish(reply);
    }

    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event {
      match app.handle_key(key) {
        KeyAction::Continue => {}
        KeyAction::Quit => break,
        KeyAction::Submit(code) => {
          let client = client.clone();
          pending = Some(tokio::spawn(async move { client.scan(&code).await }));
        }
      }
    }
  }

  Ok(())
}
