//! Engine tests against an in-memory SQLite store, with failure injection.

use std::{
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU32, Ordering},
  },
  time::Duration,
};

use chrono::{Duration as Span, Utc};
use turnstile_core::{
  access::{
    AccessLogEntry, AccessLogQuery, AuditEvent, Direction, NewAccessLogEntry, NewAuditEvent,
    SubjectType,
  },
  decision::{Decision, DenyReason},
  feedback::{Feedback, FeedbackPresenter},
  store::AccessStore,
  subject::{
    BlockStatus, CredentialKind, EmployeeCredential, NewCredential, NewVisitorPass,
    VisitorPass, VisitorStatus,
  },
};
use turnstile_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{
  ApplyStage, EngineConfig, Error, ScanEngine, ScanOutcome, ScanReport, ScanRequest, resolve,
};

// ─── Failure-injecting store ─────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
enum FlakyError {
  #[error("injected failure")]
  Injected,
  #[error(transparent)]
  Inner(#[from] turnstile_store_sqlite::Error),
}

#[derive(Default)]
struct Faults {
  fail_reads:          AtomicBool,
  fail_log_append:     AtomicBool,
  /// Number of upcoming status updates that fail.
  failing_status_sets: AtomicU32,
  status_set_calls:    AtomicU32,
  /// Delay before every access-log append, in milliseconds.
  append_delay_ms:     AtomicU32,
  /// Delay before every visitor status update, in milliseconds.
  status_delay_ms:     AtomicU32,
}

/// Wraps a [`SqliteStore`] and fails or delays selected calls on demand.
struct FlakyStore {
  inner:  SqliteStore,
  faults: Faults,
}

impl FlakyStore {
  async fn new() -> Self {
    Self {
      inner:  SqliteStore::open_in_memory().await.expect("in-memory store"),
      faults: Faults::default(),
    }
  }

  fn read_guard(&self) -> Result<(), FlakyError> {
    if self.faults.fail_reads.load(Ordering::SeqCst) {
      Err(FlakyError::Injected)
    } else {
      Ok(())
    }
  }
}

impl AccessStore for FlakyStore {
  type Error = FlakyError;

  async fn add_visitor_pass(&self, input: NewVisitorPass) -> Result<VisitorPass, FlakyError> {
    Ok(self.inner.add_visitor_pass(input).await?)
  }

  async fn get_visitor_pass(&self, id: Uuid) -> Result<Option<VisitorPass>, FlakyError> {
    self.read_guard()?;
    Ok(self.inner.get_visitor_pass(id).await?)
  }

  async fn find_visitor_pass(&self, code: String) -> Result<Option<VisitorPass>, FlakyError> {
    self.read_guard()?;
    Ok(self.inner.find_visitor_pass(code).await?)
  }

  async fn set_visitor_status(
    &self,
    id: Uuid,
    status: VisitorStatus,
  ) -> Result<Option<VisitorPass>, FlakyError> {
    self.faults.status_set_calls.fetch_add(1, Ordering::SeqCst);
    let delay = self.faults.status_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
      tokio::time::sleep(Duration::from_millis(u64::from(delay))).await;
    }
    let failing = self.faults.failing_status_sets.load(Ordering::SeqCst);
    if failing > 0 {
      self.faults.failing_status_sets.store(failing - 1, Ordering::SeqCst);
      return Err(FlakyError::Injected);
    }
    Ok(self.inner.set_visitor_status(id, status).await?)
  }

  async fn list_visitor_passes(
    &self,
    status: Option<VisitorStatus>,
  ) -> Result<Vec<VisitorPass>, FlakyError> {
    Ok(self.inner.list_visitor_passes(status).await?)
  }

  async fn add_credential(&self, input: NewCredential) -> Result<EmployeeCredential, FlakyError> {
    Ok(self.inner.add_credential(input).await?)
  }

  async fn get_credential(&self, id: Uuid) -> Result<Option<EmployeeCredential>, FlakyError> {
    self.read_guard()?;
    Ok(self.inner.get_credential(id).await?)
  }

  async fn find_credential(
    &self,
    code: String,
  ) -> Result<Option<EmployeeCredential>, FlakyError> {
    self.read_guard()?;
    Ok(self.inner.find_credential(code).await?)
  }

  async fn set_credential_status(
    &self,
    id: Uuid,
    status: BlockStatus,
  ) -> Result<Option<EmployeeCredential>, FlakyError> {
    Ok(self.inner.set_credential_status(id, status).await?)
  }

  async fn list_credentials(
    &self,
    kind: Option<CredentialKind>,
  ) -> Result<Vec<EmployeeCredential>, FlakyError> {
    Ok(self.inner.list_credentials(kind).await?)
  }

  async fn append_access_log(
    &self,
    input: NewAccessLogEntry,
  ) -> Result<AccessLogEntry, FlakyError> {
    let delay = self.faults.append_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
      tokio::time::sleep(Duration::from_millis(u64::from(delay))).await;
    }
    if self.faults.fail_log_append.load(Ordering::SeqCst) {
      return Err(FlakyError::Injected);
    }
    Ok(self.inner.append_access_log(input).await?)
  }

  async fn list_access_logs(
    &self,
    query: AccessLogQuery,
  ) -> Result<Vec<AccessLogEntry>, FlakyError> {
    self.read_guard()?;
    Ok(self.inner.list_access_logs(query).await?)
  }

  async fn record_audit_event(&self, input: NewAuditEvent) -> Result<AuditEvent, FlakyError> {
    Ok(self.inner.record_audit_event(input).await?)
  }

  async fn list_audit_events(&self, limit: usize) -> Result<Vec<AuditEvent>, FlakyError> {
    Ok(self.inner.list_audit_events(limit).await?)
  }
}

// ─── Recording presenter ─────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Feedback>>>);

impl Recorder {
  fn calls(&self) -> Vec<Feedback> { self.0.lock().unwrap().clone() }
}

impl FeedbackPresenter for Recorder {
  fn present(&self, feedback: &Feedback) { self.0.lock().unwrap().push(feedback.clone()); }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn fast_config() -> EngineConfig {
  EngineConfig {
    call_timeout:          Duration::from_millis(500),
    status_retry_attempts: 3,
    status_retry_backoff:  Duration::from_millis(1),
  }
}

async fn engine() -> (Arc<FlakyStore>, Recorder, ScanEngine<FlakyStore, Recorder>) {
  let store = Arc::new(FlakyStore::new().await);
  let recorder = Recorder::default();
  let engine = ScanEngine::with_presenter(store.clone(), recorder.clone(), fast_config());
  (store, recorder, engine)
}

fn request(raw: &str) -> ScanRequest {
  ScanRequest {
    raw:      raw.into(),
    gate:     "north".into(),
    device:   "north-wedge".into(),
    operator: "guard-1".into(),
  }
}

async fn visitor(store: &FlakyStore, valid_until_offset: Span) -> VisitorPass {
  let now = Utc::now();
  store
    .add_visitor_pass(NewVisitorPass {
      full_name:       "Ada Visitor".into(),
      document_number: "P-1".into(),
      company:         None,
      valid_from:      now - Span::days(2),
      valid_until:     now + valid_until_offset,
    })
    .await
    .unwrap()
}

async fn employee(store: &FlakyStore) -> EmployeeCredential {
  store
    .add_credential(NewCredential {
      kind:      CredentialKind::Personal,
      full_name: "Bob Employee".into(),
      document:  "E-2".into(),
    })
    .await
    .unwrap()
}

fn completed(outcome: ScanOutcome) -> ScanReport {
  match outcome {
    ScanOutcome::Completed(report) => report,
    ScanOutcome::Debounced => panic!("scan was debounced"),
  }
}

async fn logs_for(store: &FlakyStore, subject_id: Uuid) -> Vec<AccessLogEntry> {
  store
    .list_access_logs(AccessLogQuery {
      subject_id: Some(subject_id),
      ..Default::default()
    })
    .await
    .unwrap()
}

// ─── Visitor scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn visitor_full_visit() {
  let (store, recorder, engine) = engine().await;
  let pass = visitor(&store, Span::hours(4)).await;

  // Fresh pass: in, status inside.
  let first = completed(engine.scan(request(&pass.code.to_lowercase())).await);
  assert_eq!(first.decision, Some(Decision::AdmitIn));
  assert_eq!(first.feedback, Feedback::success("Ada Visitor", Direction::In));
  let entry = first.entry.expect("log entry");
  assert_eq!(entry.operator, "guard-1");
  assert_eq!(entry.gate, "north");
  let stored = store.get_visitor_pass(pass.pass_id).await.unwrap().unwrap();
  assert_eq!(stored.status, VisitorStatus::Inside);

  // Last direction in: out, status closed.
  let second = completed(engine.scan(request(&pass.code)).await);
  assert_eq!(second.decision, Some(Decision::AdmitOut));
  let stored = store.get_visitor_pass(pass.pass_id).await.unwrap().unwrap();
  assert_eq!(stored.status, VisitorStatus::Closed);

  // Closed: denied, nothing written.
  let third = completed(engine.scan(request(&pass.code)).await);
  assert_eq!(third.decision, Some(Decision::DenyClosed));
  assert_eq!(third.feedback, Feedback::blocked(DenyReason::Closed));
  assert_eq!(logs_for(&store, pass.pass_id).await.len(), 2);

  assert_eq!(recorder.calls().len(), 3);
}

#[tokio::test]
async fn expired_visitor_is_denied_and_audited() {
  let (store, _, engine) = engine().await;
  let pass = visitor(&store, -Span::days(1)).await;

  let report = completed(engine.scan(request(&pass.code)).await);
  assert_eq!(report.decision, Some(Decision::DenyExpired));

  let stored = store.get_visitor_pass(pass.pass_id).await.unwrap().unwrap();
  assert_eq!(stored.status, VisitorStatus::Pending);
  assert!(logs_for(&store, pass.pass_id).await.is_empty());

  let audit = store.list_audit_events(10).await.unwrap();
  assert_eq!(audit.len(), 1);
  assert_eq!(audit[0].action, "scan.denied");
  assert_eq!(audit[0].detail.as_deref(), Some("expired"));
  assert_eq!(audit[0].subject_id, Some(pass.pass_id));
}

#[tokio::test]
async fn repeated_denial_is_idempotent() {
  let (store, _, engine) = engine().await;
  let pass = visitor(&store, Span::hours(1)).await;
  store.set_visitor_status(pass.pass_id, VisitorStatus::Closed).await.unwrap();

  for _ in 0..5 {
    let report = completed(engine.scan(request(&pass.code)).await);
    assert_eq!(report.decision, Some(Decision::DenyClosed));
  }
  let stored = store.get_visitor_pass(pass.pass_id).await.unwrap().unwrap();
  assert_eq!(stored.status, VisitorStatus::Closed);
  assert!(logs_for(&store, pass.pass_id).await.is_empty());
}

// ─── Employee scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn employee_alternates_and_is_never_mutated() {
  let (store, _, engine) = engine().await;
  let cred = employee(&store).await;

  let mut expected = Direction::In;
  for _ in 0..4 {
    let report = completed(engine.scan(request(&cred.code)).await);
    assert_eq!(report.feedback, Feedback::success("Bob Employee", expected));
    expected = expected.opposite();
  }

  let dirs: Vec<_> = logs_for(&store, cred.credential_id)
    .await
    .into_iter()
    .map(|e| e.direction)
    .collect();
  assert_eq!(dirs, vec![Direction::Out, Direction::In, Direction::Out, Direction::In]);
  assert_eq!(store.faults.status_set_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blocked_employee_denied_regardless_of_history() {
  let (store, _, engine) = engine().await;
  let cred = employee(&store).await;
  completed(engine.scan(request(&cred.code)).await);
  store
    .set_credential_status(cred.credential_id, BlockStatus::Blocked)
    .await
    .unwrap();

  for _ in 0..3 {
    let report = completed(engine.scan(request(&cred.code)).await);
    assert_eq!(report.decision, Some(Decision::DenyBlocked));
    assert_eq!(report.feedback, Feedback::blocked(DenyReason::Blocked));
  }
  assert_eq!(logs_for(&store, cred.credential_id).await.len(), 1);
}

#[tokio::test]
async fn round_trip_direction_reflects_last_scan() {
  let (store, _, engine) = engine().await;
  let cred = employee(&store).await;

  completed(engine.scan(request(&cred.code)).await);
  let last = resolve::last_direction(
    &*store,
    SubjectType::Employee,
    cred.credential_id,
    Duration::from_secs(1),
  )
  .await
  .unwrap();
  assert_eq!(last, Some(Direction::In));
}

// ─── Classification / resolution ─────────────────────────────────────────────

#[tokio::test]
async fn invalid_code_never_reaches_the_store() {
  let (store, recorder, engine) = engine().await;
  store.faults.fail_reads.store(true, Ordering::SeqCst);

  let report = completed(engine.scan(request("XX-0000")).await);
  assert_eq!(report.decision, None);
  assert_eq!(report.feedback, Feedback::error("invalid code \"XX-0000\""));
  assert_eq!(recorder.calls().len(), 1);
}

#[tokio::test]
async fn unknown_code_is_denied_not_found() {
  let (store, _, engine) = engine().await;

  let report = completed(engine.scan(request("VP-FFFFFFFF")).await);
  assert_eq!(report.decision, Some(Decision::DenyNotFound));
  assert_eq!(report.feedback, Feedback::blocked(DenyReason::NotFound));

  let audit = store.list_audit_events(10).await.unwrap();
  assert_eq!(audit[0].subject_id, None);
  assert_eq!(audit[0].code, "VP-FFFFFFFF");
}

#[tokio::test]
async fn read_failure_is_not_conflated_with_not_found() {
  let (store, _, engine) = engine().await;
  let cred = employee(&store).await;
  store.faults.fail_reads.store(true, Ordering::SeqCst);

  let report = completed(engine.scan(request(&cred.code)).await);
  assert_eq!(report.decision, None);
  assert!(matches!(report.feedback, Feedback::Error { .. }));

  let err = crate::resolve::subject(
    &*store,
    &turnstile_core::code::classify(&cred.code),
    Duration::from_secs(1),
  )
  .await
  .unwrap_err();
  assert!(matches!(err, Error::ResolutionFailed(_)));
}

// ─── Effect failures ─────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_log_append_leaves_status_untouched() {
  let (store, _, engine) = engine().await;
  let pass = visitor(&store, Span::hours(4)).await;
  store.faults.fail_log_append.store(true, Ordering::SeqCst);

  let report = completed(engine.scan(request(&pass.code)).await);
  assert!(matches!(report.feedback, Feedback::Error { .. }));
  assert_eq!(store.faults.status_set_calls.load(Ordering::SeqCst), 0);
  let stored = store.get_visitor_pass(pass.pass_id).await.unwrap().unwrap();
  assert_eq!(stored.status, VisitorStatus::Pending);
}

#[tokio::test]
async fn status_update_retried_then_succeeds() {
  let (store, _, engine) = engine().await;
  let pass = visitor(&store, Span::hours(4)).await;
  store.faults.failing_status_sets.store(2, Ordering::SeqCst);

  let report = completed(engine.scan(request(&pass.code)).await);
  assert_eq!(report.decision, Some(Decision::AdmitIn));
  assert_eq!(store.faults.status_set_calls.load(Ordering::SeqCst), 3);
  let stored = store.get_visitor_pass(pass.pass_id).await.unwrap().unwrap();
  assert_eq!(stored.status, VisitorStatus::Inside);
}

#[tokio::test]
async fn status_update_exhaustion_is_apply_failed_with_log_written() {
  let (store, _, engine) = engine().await;
  let pass = visitor(&store, Span::hours(4)).await;
  store.faults.failing_status_sets.store(10, Ordering::SeqCst);

  let subject = turnstile_core::subject::Subject::Visitor(pass.clone());
  let err = crate::effects::apply_admit(
    &*store,
    engine.config(),
    &subject,
    Direction::In,
    &request(&pass.code),
  )
  .await
  .unwrap_err();
  assert!(matches!(
    err,
    Error::ApplyFailed { stage: ApplyStage::StatusUpdate, log_written: true, .. }
  ));
  assert_eq!(store.faults.status_set_calls.load(Ordering::SeqCst), 3);

  // The canonical entry stays; the partial write is audited.
  assert_eq!(logs_for(&store, pass.pass_id).await.len(), 1);
  let audit = store.list_audit_events(10).await.unwrap();
  assert_eq!(audit[0].action, "scan.partial");
}

#[tokio::test]
async fn slow_store_times_out() {
  let store = Arc::new(FlakyStore::new().await);
  let engine = ScanEngine::new(
    store.clone(),
    EngineConfig {
      call_timeout: Duration::from_millis(20),
      ..fast_config()
    },
  );
  let cred = employee(&store).await;
  store.faults.append_delay_ms.store(200, Ordering::SeqCst);

  let report = completed(engine.scan(request(&cred.code)).await);
  match report.feedback {
    Feedback::Error { message } => assert!(message.contains("timed out"), "{message}"),
    other => panic!("unexpected feedback {other:?}"),
  }
  assert!(!engine.is_busy("north-wedge"));
}

#[tokio::test]
async fn abandoned_scan_still_finishes_its_writes() {
  let (store, recorder, engine) = engine().await;
  let pass = visitor(&store, Span::hours(4)).await;
  completed(engine.scan(request(&pass.code)).await);
  store.faults.status_delay_ms.store(200, Ordering::SeqCst);

  // The caller gives up after the log append, while the status update sleeps.
  let abandoned =
    tokio::time::timeout(Duration::from_millis(50), engine.scan(request(&pass.code))).await;
  assert!(abandoned.is_err());
  assert!(engine.is_busy("north-wedge"));

  for _ in 0..100 {
    if !engine.is_busy("north-wedge") {
      break;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
  }
  assert!(!engine.is_busy("north-wedge"));

  let stored = store.get_visitor_pass(pass.pass_id).await.unwrap().unwrap();
  assert_eq!(stored.status, VisitorStatus::Closed);
  assert_eq!(logs_for(&store, pass.pass_id).await.len(), 2);
  assert_eq!(recorder.calls().len(), 2);

  store.faults.status_delay_ms.store(0, Ordering::SeqCst);
  let next = completed(engine.scan(request(&pass.code)).await);
  assert_eq!(next.decision, Some(Decision::DenyClosed));
}

// ─── Debounce ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rapid_rescan_admits_once() {
  let (store, recorder, engine) = engine().await;
  let cred = employee(&store).await;
  store.faults.append_delay_ms.store(50, Ordering::SeqCst);

  let (a, b) = tokio::join!(
    engine.scan(request(&cred.code)),
    engine.scan(request(&cred.code))
  );

  let outcomes = [a, b];
  let debounced = outcomes
    .iter()
    .filter(|o| matches!(o, ScanOutcome::Debounced))
    .count();
  assert_eq!(debounced, 1);
  assert_eq!(logs_for(&store, cred.credential_id).await.len(), 1);
  assert_eq!(recorder.calls().len(), 1);

  // Guard re-armed: the next scan goes through and alternates.
  let next = completed(engine.scan(request(&cred.code)).await);
  assert_eq!(next.decision, Some(Decision::AdmitOut));
}

#[tokio::test]
async fn guard_released_after_error() {
  let (store, _, engine) = engine().await;
  store.faults.fail_reads.store(true, Ordering::SeqCst);
  completed(engine.scan(request("EC-12345678")).await);
  assert!(!engine.is_busy("north-wedge"));
}

#[tokio::test]
async fn separate_devices_alternate_through_the_log() {
  let (store, _, engine) = engine().await;
  let cred = employee(&store).await;

  let mut south = request(&cred.code);
  south.gate = "south".into();
  south.device = "south-camera".into();

  completed(engine.scan(request(&cred.code)).await);
  let report = completed(engine.scan(south).await);
  assert_eq!(report.decision, Some(Decision::AdmitOut));
  assert_eq!(report.entry.unwrap().gate, "south");
}
