//! Text rendering of scan feedback, shared by both modes.

use crossterm::style::{StyledContent, Stylize};
use turnstile_core::{
  access::Direction,
  feedback::{Feedback, FeedbackPresenter},
};

/// One-line summary an operator can read at a glance.
pub fn headline(feedback: &Feedback) -> String {
  match feedback {
    Feedback::Success { subject_name, direction } => {
      let arrow = match direction {
        Direction::In => "IN  →",
        Direction::Out => "OUT ←",
      };
      format!("{arrow} {subject_name}")
    }
    Feedback::Blocked { message, .. } => format!("DENIED: {message}"),
    Feedback::Error { message } => format!("ERROR: {message}"),
  }
}

/// The headline coloured by outcome: green, red or yellow.
pub fn styled(feedback: &Feedback) -> StyledContent<String> {
  let line = headline(feedback);
  match feedback {
    Feedback::Success { .. } => line.green(),
    Feedback::Blocked { .. } => line.red(),
    Feedback::Error { .. } => line.yellow(),
  }
}

/// Line-mode presenter: one line on stdout per scan.
pub struct Console;

impl FeedbackPresenter for Console {
  fn present(&self, feedback: &Feedback) { println!("{}", styled(feedback)); }
}

#[cfg(test)]
mod tests {
  use crossterm::style::Color;
  use turnstile_core::decision::DenyReason;

  use super::*;

  #[test]
  fn headlines() {
    assert_eq!(headline(&Feedback::success("Ada", Direction::In)), "IN  → Ada");
    assert_eq!(headline(&Feedback::success("Ada", Direction::Out)), "OUT ← Ada");
    assert!(headline(&Feedback::blocked(DenyReason::Blocked)).starts_with("DENIED"));
    assert_eq!(headline(&Feedback::error("offline")), "ERROR: offline");
  }

  #[test]
  fn colour_follows_outcome() {
    let colour = |f: &Feedback| styled(f).style().foreground_color;
    assert_eq!(colour(&Feedback::success("Ada", Direction::In)), Some(Color::Green));
    assert_eq!(colour(&Feedback::blocked(DenyReason::Closed)), Some(Color::Red));
    assert_eq!(colour(&Feedback::error("offline")), Some(Color::Yellow));
    assert_eq!(styled(&Feedback::error("offline")).content(), "ERROR: offline");
  }
}
