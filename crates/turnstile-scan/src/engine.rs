//! [`ScanEngine`] drives one scan cycle end to end.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use turnstile_core::{
  access::AccessLogEntry,
  code::{classify, normalize},
  decision::{Decision, DenyReason, decide},
  feedback::{Feedback, FeedbackPresenter, Silent},
  store::AccessStore,
  subject::Subject,
};

use crate::{
  effects,
  error::{Error, Result},
  guard::DeviceGuards,
  resolve,
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Tunables for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Deadline for every individual store call.
  pub call_timeout:          Duration,
  /// Attempts for the visitor status update (the log append is never
  /// retried). Clamped to at least one.
  pub status_retry_attempts: u32,
  /// Base delay between status update attempts; grows linearly.
  pub status_retry_backoff:  Duration,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      call_timeout:          Duration::from_secs(5),
      status_retry_attempts: 3,
      status_retry_backoff:  Duration::from_millis(100),
    }
  }
}

// ─── Request / outcome ───────────────────────────────────────────────────────

/// One raw scan as delivered by an input source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
  /// The string exactly as scanned or typed.
  pub raw:      String,
  /// Gate recorded on the access-log entry.
  pub gate:     String,
  /// Input device the scan came from; the debounce key.
  pub device:   String,
  /// Operator identity as verified by the auth service.
  pub operator: String,
}

/// What a completed scan cycle produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
  pub feedback: Feedback,
  /// `None` when the cycle failed before a decision was reached.
  pub decision: Option<Decision>,
  pub subject:  Option<Subject>,
  /// The access-log entry written by an admit.
  pub entry:    Option<AccessLogEntry>,
}

impl ScanReport {
  fn failed(error: &Error) -> Self { Self::with_error(error.to_string()) }

  /// The cycle's task panicked or was cancelled by runtime shutdown.
  fn aborted(error: &tokio::task::JoinError) -> Self {
    Self::with_error(format!("scan aborted: {error}"))
  }

  fn with_error(message: String) -> Self {
    Self {
      feedback: Feedback::error(message),
      decision: None,
      subject:  None,
      entry:    None,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
  Completed(ScanReport),
  /// The device already had a scan in flight; nothing was read, written or
  /// presented.
  Debounced,
}

impl ScanOutcome {
  pub fn report(&self) -> Option<&ScanReport> {
    match self {
      Self::Completed(report) => Some(report),
      Self::Debounced => None,
    }
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The access toggle engine.
///
/// Shared by every input source; the manual-entry and kiosk front ends differ
/// only in how they present the [`Feedback`].
pub struct ScanEngine<S, P = Silent> {
  cycle:  Arc<Cycle<S, P>>,
  guards: Arc<DeviceGuards>,
}

/// Everything one scan cycle needs, shareable with a spawned task.
struct Cycle<S, P> {
  store:     Arc<S>,
  presenter: P,
  config:    EngineConfig,
}

impl<S: AccessStore + 'static> ScanEngine<S, Silent> {
  /// An engine whose only feedback channel is the returned [`ScanOutcome`].
  pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
    Self::with_presenter(store, Silent, config)
  }
}

impl<S, P> ScanEngine<S, P>
where
  S: AccessStore + 'static,
  P: FeedbackPresenter + 'static,
{
  pub fn with_presenter(store: Arc<S>, presenter: P, config: EngineConfig) -> Self {
    Self {
      cycle:  Arc::new(Cycle { store, presenter, config }),
      guards: Arc::new(DeviceGuards::new()),
    }
  }

  pub fn store(&self) -> &Arc<S> { &self.cycle.store }

  pub fn config(&self) -> &EngineConfig { &self.cycle.config }

  /// Whether `device` currently has a scan in flight.
  pub fn is_busy(&self, device: &str) -> bool { self.guards.is_busy(device) }

  /// Run one scan cycle for `request`.
  ///
  /// The cycle runs on its own task holding the device slot, so dropping
  /// the returned future does not stop it halfway through its writes; the
  /// slot is only released once the cycle reaches a terminal outcome. The
  /// presenter is notified exactly once for a completed cycle and not at
  /// all for a debounced one.
  pub async fn scan(&self, request: ScanRequest) -> ScanOutcome {
    let Some(in_flight) = self.guards.try_acquire(&request.device) else {
      debug!(device = %request.device, "scan ignored: device busy");
      return ScanOutcome::Debounced;
    };

    let cycle = Arc::clone(&self.cycle);
    let task = tokio::spawn(async move {
      let _in_flight = in_flight;
      let report = cycle.run(&request).await;
      cycle.presenter.present(&report.feedback);
      report
    });

    match task.await {
      Ok(report) => ScanOutcome::Completed(report),
      Err(e) => {
        error!("scan task failed: {e}");
        let report = ScanReport::aborted(&e);
        self.cycle.presenter.present(&report.feedback);
        ScanOutcome::Completed(report)
      }
    }
  }
}

impl<S, P> Cycle<S, P>
where
  S: AccessStore,
  P: FeedbackPresenter,
{
  async fn run(&self, request: &ScanRequest) -> ScanReport {
    match self.decide_and_apply(request).await {
      Ok(report) => report,
      Err(e) => {
        warn!(device = %request.device, gate = %request.gate, "scan failed: {e}");
        ScanReport::failed(&e)
      }
    }
  }

  async fn decide_and_apply(&self, request: &ScanRequest) -> Result<ScanReport> {
    let classified = classify(&request.raw);
    let Some(code) = classified.code().map(str::to_owned) else {
      return Err(Error::InvalidCode(normalize(&request.raw)));
    };

    let limit = self.config.call_timeout;
    let subject = resolve::subject(&*self.store, &classified, limit).await?;
    let last = match &subject {
      Some(s) => resolve::last_direction(&*self.store, s.subject_type(), s.id(), limit).await?,
      None => None,
    };

    let decision = decide(subject.as_ref(), last, Utc::now());

    // `decide` only admits a resolved subject.
    let (Some(direction), Some(subject)) = (decision.direction(), subject.clone()) else {
      let reason = decision.deny_reason().unwrap_or(DenyReason::NotFound);
      return Ok(self.deny(request, &code, decision, reason, subject).await);
    };

    let entry =
      effects::apply_admit(&*self.store, &self.config, &subject, direction, request).await?;
    info!(
      code = %code,
      direction = direction.as_str(),
      gate = %request.gate,
      operator = %request.operator,
      "admitted {}",
      subject.display_name()
    );

    Ok(ScanReport {
      feedback: Feedback::success(subject.display_name(), direction),
      decision: Some(decision),
      subject:  Some(subject),
      entry:    Some(entry),
    })
  }

  async fn deny(
    &self,
    request: &ScanRequest,
    code: &str,
    decision: Decision,
    reason: DenyReason,
    subject: Option<Subject>,
  ) -> ScanReport {
    warn!(code, reason = reason.as_str(), gate = %request.gate, "scan denied");
    effects::record_denial(&*self.store, &self.config, subject.as_ref(), code, reason, request)
      .await;
    ScanReport {
      feedback: Feedback::blocked(reason),
      decision: Some(decision),
      subject,
      entry: None,
    }
  }
}
