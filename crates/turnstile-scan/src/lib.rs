//! The access toggle engine.
//!
//! One scan cycle runs: classify → resolve subject → resolve last direction →
//! decide → apply effects → notify the presenter. Every store call is
//! bounded by a timeout, and scans are serialised per input device: a scan
//! arriving while the same device has one in flight is dropped without
//! feedback.
//!
//! The decision itself lives in [`turnstile_core::decision`]; this crate owns
//! the I/O around it.

pub mod effects;
pub mod engine;
pub mod error;
pub mod guard;
pub mod resolve;

pub use engine::{EngineConfig, ScanEngine, ScanOutcome, ScanReport, ScanRequest};
pub use error::{ApplyStage, Error, Result};

#[cfg(test)]
mod tests;
