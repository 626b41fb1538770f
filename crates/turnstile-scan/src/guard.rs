//! Per-device debounce.
//!
//! A guard scanning the same badge twice in quick succession is the realistic
//! race, so scans are serialised per input device rather than locked per
//! subject. While a device has a scan in flight, further scans from it are
//! rejected outright; the slot is freed when the in-flight cycle finishes,
//! whatever its outcome.

use std::{
  collections::HashSet,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// The set of devices with a scan currently in flight.
#[derive(Debug, Default)]
pub struct DeviceGuards {
  busy: Mutex<HashSet<String>>,
}

impl DeviceGuards {
  pub fn new() -> Self { Self::default() }

  /// Claim `device` for one scan cycle. Returns `None` if it is already
  /// busy.
  ///
  /// The returned slot owns a handle to the set, so it can travel into a
  /// spawned task and outlive the caller.
  pub fn try_acquire(self: &Arc<Self>, device: &str) -> Option<InFlight> {
    if !self.lock().insert(device.to_owned()) {
      return None;
    }
    Some(InFlight { guards: Arc::clone(self), device: device.to_owned() })
  }

  pub fn is_busy(&self, device: &str) -> bool { self.lock().contains(device) }

  fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
    // The set holds no invariants a panicking holder could break.
    self.busy.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Proof that a device's scan slot is held. Dropping it re-arms the device.
#[derive(Debug)]
pub struct InFlight {
  guards: Arc<DeviceGuards>,
  device: String,
}

impl Drop for InFlight {
  fn drop(&mut self) { self.guards.lock().remove(&self.device); }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn second_acquire_is_rejected_until_release() {
    let guards = Arc::new(DeviceGuards::new());
    let first = guards.try_acquire("gate-1").expect("free device");
    assert!(guards.try_acquire("gate-1").is_none());
    assert!(guards.is_busy("gate-1"));

    drop(first);
    assert!(!guards.is_busy("gate-1"));
    assert!(guards.try_acquire("gate-1").is_some());
  }

  #[test]
  fn devices_are_independent() {
    let guards = Arc::new(DeviceGuards::new());
    let _a = guards.try_acquire("north").unwrap();
    assert!(guards.try_acquire("south").is_some());
  }

  #[test]
  fn slot_released_from_another_thread() {
    let guards = Arc::new(DeviceGuards::new());
    let slot = guards.try_acquire("east").unwrap();
    std::thread::spawn(move || drop(slot)).join().unwrap();
    assert!(!guards.is_busy("east"));
  }
}
