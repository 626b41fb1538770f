//! Kiosk state machine and key dispatcher.
//!
//! A keyboard-wedge reader types the code followed by Enter, so the kiosk
//! accumulates printable keys into a buffer and submits on Enter. While a
//! submission is in flight every key except Ctrl-C is dropped.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use turnstile_core::feedback::Feedback;

use crate::client::ScanReply;

const HISTORY: usize = 8;

/// Result of feeding one key to the [`App`].
#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
  Continue,
  Quit,
  /// Submit this code; the caller runs the request.
  Submit(String),
}

/// A scan shown on screen.
#[derive(Debug, Clone)]
pub struct Shown {
  pub code:     String,
  pub feedback: Feedback,
  pub at:       DateTime<Local>,
}

/// Top-level kiosk state.
pub struct App {
  pub gate:      String,
  /// Keys typed since the last Enter.
  pub buffer:    String,
  /// Code of the scan currently being processed.
  pub in_flight: Option<String>,
  /// Most recent first.
  pub history:   VecDeque<Shown>,
  pub status_msg: String,
}

impl App {
  pub fn new(gate: impl Into<String>) -> Self {
    Self {
      gate:       gate.into(),
      buffer:     String::new(),
      in_flight:  None,
      history:    VecDeque::with_capacity(HISTORY),
      status_msg: String::new(),
    }
  }

  pub fn last(&self) -> Option<&Shown> { self.history.front() }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return KeyAction::Quit;
    }
    if self.in_flight.is_some() {
      return KeyAction::Continue;
    }

    match key.code {
      KeyCode::Esc => {
        if self.buffer.is_empty() {
          return KeyAction::Quit;
        }
        self.buffer.clear();
      }
      KeyCode::Backspace => {
        self.buffer.pop();
      }
      KeyCode::Enter => {
        let code = std::mem::take(&mut self.buffer).trim().to_owned();
        if !code.is_empty() {
          self.in_flight = Some(code.clone());
          self.status_msg = format!("checking {code}…");
          return KeyAction::Submit(code);
        }
      }
      KeyCode::Char(c) if !c.is_control() => self.buffer.push(c),
      _ => {}
    }
    KeyAction::Continue
  }

  /// Record the answer for the in-flight scan.
  pub fn finish(&mut self, reply: anyhow::Result<ScanReply>) {
    let Some(code) = self.in_flight.take() else {
      return;
    };
    let feedback = match reply {
      Ok(ScanReply::Completed(feedback)) => feedback,
      Ok(ScanReply::Debounced) => {
        self.status_msg = format!("{code}: still processing the previous scan");
        return;
      }
      Err(e) => Feedback::error(format!("{e:#}")),
    };
    self.status_msg.clear();
    if self.history.len() == HISTORY {
      self.history.pop_back();
    }
    self.history.push_front(Shown { code, feedback, at: Local::now() });
  }
}
