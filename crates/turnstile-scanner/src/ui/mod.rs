//! Kiosk rendering.

use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, Paragraph},
};
use turnstile_core::feedback::Feedback;

use crate::{app::App, present::headline};

// ─── Root draw ────────────────────────────────────────────────────────────────

pub fn draw(f: &mut Frame, app: &App) {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(7),    // outcome
      Constraint::Length(3), // input
      Constraint::Length(10), // history
      Constraint::Length(1), // status bar
    ])
    .split(f.area());

  draw_header(f, rows[0], app);
  draw_outcome(f, rows[1], app);
  draw_input(f, rows[2], app);
  draw_history(f, rows[3], app);
  draw_status(f, rows[4], app);
}

fn colour(feedback: &Feedback) -> Color {
  match feedback {
    Feedback::Success { .. } => Color::Green,
    Feedback::Blocked { .. } => Color::Red,
    Feedback::Error { .. } => Color::Yellow,
  }
}

// ─── Panes ────────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
  let line = Line::from(vec![Span::styled(
    format!(" turnstile  gate {}  [Esc] quit", app.gate),
    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
  )]);
  f.render_widget(Paragraph::new(line).style(Style::default().bg(Color::DarkGray)), area);
}

fn draw_outcome(f: &mut Frame, area: Rect, app: &App) {
  let (text, style) = match (&app.in_flight, app.last()) {
    (Some(code), _) => (format!("Checking {code}…"), Style::default().fg(Color::Cyan)),
    (None, Some(last)) => (
      headline(&last.feedback),
      Style::default()
        .fg(Color::Black)
        .bg(colour(&last.feedback))
        .add_modifier(Modifier::BOLD),
    ),
    (None, None) => ("Ready to scan".to_string(), Style::default().fg(Color::DarkGray)),
  };

  let block = Block::default().borders(Borders::ALL).style(style);
  let inner = block.inner(area);
  f.render_widget(block, area);

  // Centre vertically.
  let pad = inner.height.saturating_sub(1) / 2;
  let mut lines = vec![Line::raw(""); pad as usize];
  lines.push(Line::from(text));
  f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}

fn draw_input(f: &mut Frame, area: Rect, app: &App) {
  let block = Block::default()
    .title(" Code ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  f.render_widget(Paragraph::new(format!("{}▏", app.buffer)).block(block), area);
}

fn draw_history(f: &mut Frame, area: Rect, app: &App) {
  let items: Vec<ListItem> = app
    .history
    .iter()
    .map(|shown| {
      ListItem::new(Line::from(vec![
        Span::styled(
          format!("{} ", shown.at.format("%H:%M:%S")),
          Style::default().fg(Color::DarkGray),
        ),
        Span::raw(format!("{:<12} ", shown.code)),
        Span::styled(headline(&shown.feedback), Style::default().fg(colour(&shown.feedback))),
      ]))
    })
    .collect();

  let block = Block::default()
    .title(" Recent ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  f.render_widget(List::new(items).block(block), area);
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
  let status = if app.status_msg.is_empty() {
    "Scan or type a code, Enter to submit".to_string()
  } else {
    app.status_msg.clone()
  };
  let line = Line::from(vec![Span::styled(
    format!("  {status}"),
    Style::default().fg(Color::DarkGray),
  )]);
  f.render_widget(Paragraph::new(line).style(Style::default().bg(Color::Black)), area);
}
