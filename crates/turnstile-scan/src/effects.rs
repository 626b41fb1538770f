//! Persisting a decision.
//!
//! The store offers no transaction spanning the access log and the visitor
//! table, so an admit is two independent writes. The log append goes first:
//! it is the canonical record the direction resolver reads, and a failed
//! append must never leave a status change behind. The append itself is
//! never retried, since a timed-out append may still have landed.

use tracing::{error, warn};
use turnstile_core::{
  access::{AccessLogEntry, Direction, NewAccessLogEntry, NewAuditEvent},
  decision::DenyReason,
  store::AccessStore,
  subject::{Subject, VisitorStatus},
};

use crate::{
  engine::{EngineConfig, ScanRequest},
  error::{ApplyStage, CallError, Error, Result},
  resolve::bounded,
};

/// The status a visitor pass moves to after a successful admit.
///
/// A visitor pass is single-visit: leaving closes it for good.
pub fn visitor_status_after(direction: Direction) -> VisitorStatus {
  match direction {
    Direction::In => VisitorStatus::Inside,
    Direction::Out => VisitorStatus::Closed,
  }
}

/// Record an admitted passage for `subject`.
pub async fn apply_admit<S: AccessStore>(
  store: &S,
  config: &EngineConfig,
  subject: &Subject,
  direction: Direction,
  request: &ScanRequest,
) -> Result<AccessLogEntry> {
  let entry = bounded(
    config.call_timeout,
    store.append_access_log(NewAccessLogEntry {
      subject_type: subject.subject_type(),
      subject_id: subject.id(),
      direction,
      gate: request.gate.clone(),
      operator: request.operator.clone(),
    }),
  )
  .await
  .map_err(|source| Error::ApplyFailed {
    stage: ApplyStage::LogAppend,
    log_written: false,
    source,
  })?;

  // Employees carry no presence status; the log is all there is.
  let Subject::Visitor(pass) = subject else {
    return Ok(entry);
  };

  let status = visitor_status_after(direction);
  if let Err(source) = update_visitor_status(store, config, pass.pass_id, status).await {
    error!(
      code = %pass.code,
      entry_id = %entry.entry_id,
      status = status.as_str(),
      "visitor status update failed after log append: {source}"
    );
    record_best_effort(
      store,
      config,
      NewAuditEvent {
        action:       "scan.partial".into(),
        subject_type: Some(subject.subject_type()),
        subject_id:   Some(subject.id()),
        code:         pass.code.clone(),
        gate:         request.gate.clone(),
        operator:     request.operator.clone(),
        detail:       Some(format!(
          "log entry {} written, status {} not applied: {source}",
          entry.entry_id,
          status.as_str()
        )),
      },
    )
    .await;
    return Err(Error::ApplyFailed {
      stage: ApplyStage::StatusUpdate,
      log_written: true,
      source,
    });
  }

  Ok(entry)
}

/// Overwrite a visitor's status, retrying up to the configured attempt
/// count with a linear backoff.
async fn update_visitor_status<S: AccessStore>(
  store: &S,
  config: &EngineConfig,
  pass_id: uuid::Uuid,
  status: VisitorStatus,
) -> std::result::Result<(), CallError> {
  let attempts = config.status_retry_attempts.max(1);
  let mut last_error = CallError::Vanished;

  for attempt in 1..=attempts {
    match bounded(config.call_timeout, store.set_visitor_status(pass_id, status)).await {
      Ok(Some(_)) => return Ok(()),
      // A missing row will not reappear on retry.
      Ok(None) => return Err(CallError::Vanished),
      Err(e) => {
        warn!(%pass_id, attempt, attempts, "visitor status update failed: {e}");
        last_error = e;
      }
    }
    if attempt < attempts {
      tokio::time::sleep(config.status_retry_backoff * attempt).await;
    }
  }

  Err(last_error)
}

/// Write an audit-only record of a denied scan. Never touches the subject
/// or the access log, and never fails the scan.
pub async fn record_denial<S: AccessStore>(
  store: &S,
  config: &EngineConfig,
  subject: Option<&Subject>,
  code: &str,
  reason: DenyReason,
  request: &ScanRequest,
) {
  record_best_effort(
    store,
    config,
    NewAuditEvent {
      action:       "scan.denied".into(),
      subject_type: subject.map(Subject::subject_type),
      subject_id:   subject.map(Subject::id),
      code:         code.to_owned(),
      gate:         request.gate.clone(),
      operator:     request.operator.clone(),
      detail:       Some(reason.as_str().to_owned()),
    },
  )
  .await;
}

async fn record_best_effort<S: AccessStore>(store: &S, config: &EngineConfig, event: NewAuditEvent) {
  let action = event.action.clone();
  if let Err(e) = bounded(config.call_timeout, store.record_audit_event(event)).await {
    warn!(action = %action, "audit event not recorded: {e}");
  }
}
