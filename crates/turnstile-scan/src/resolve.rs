//! Subject and direction resolution.
//!
//! Both resolvers read straight from the store on every call. Nothing here
//! caches, because the toggle decision is only as fresh as these reads.

use std::{future::Future, time::Duration};

use turnstile_core::{
  access::{AccessLogQuery, Direction, SubjectType},
  code::ClassifiedCode,
  store::AccessStore,
  subject::Subject,
};
use uuid::Uuid;

use crate::error::{CallError, Error, Result};

/// Await a store call with a deadline.
pub(crate) async fn bounded<T, E>(
  limit: Duration,
  call: impl Future<Output = std::result::Result<T, E>>,
) -> std::result::Result<T, CallError>
where
  E: std::error::Error + Send + Sync + 'static,
{
  match tokio::time::timeout(limit, call).await {
    Ok(Ok(value)) => Ok(value),
    Ok(Err(e)) => Err(CallError::Store(Box::new(e))),
    Err(_) => Err(CallError::Timeout(limit)),
  }
}

/// Fetch the subject a classified code refers to.
///
/// `Ok(None)` means the code is well-formed but matches nothing; a backend
/// failure or timeout is [`Error::ResolutionFailed`].
pub async fn subject<S: AccessStore>(
  store: &S,
  code: &ClassifiedCode,
  limit: Duration,
) -> Result<Option<Subject>> {
  match code {
    ClassifiedCode::VisitorCode(c) => bounded(limit, store.find_visitor_pass(c.clone()))
      .await
      .map(|found| found.map(Subject::Visitor))
      .map_err(Error::ResolutionFailed),
    ClassifiedCode::EmployeeCode(c) => bounded(limit, store.find_credential(c.clone()))
      .await
      .map(|found| found.map(Subject::Employee))
      .map_err(Error::ResolutionFailed),
    ClassifiedCode::Invalid => Err(Error::InvalidCode(String::new())),
  }
}

/// The direction of the subject's most recent access-log entry, or `None`
/// if it has never passed a gate.
pub async fn last_direction<S: AccessStore>(
  store: &S,
  subject_type: SubjectType,
  subject_id: Uuid,
  limit: Duration,
) -> Result<Option<Direction>> {
  let latest = bounded(
    limit,
    store.list_access_logs(AccessLogQuery::latest_for(subject_type, subject_id)),
  )
  .await
  .map_err(Error::ResolutionFailed)?;

  Ok(latest.first().map(|entry| entry.direction))
}
