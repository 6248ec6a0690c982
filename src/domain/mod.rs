//! Domain models for the compliance verifier.
//!
//! Attestation records, verifying requirements, the submission wire codec,
//! and the event log types that report state changes.

mod attestation;
mod event;
mod types;

pub use attestation::*;
pub use event::*;
pub use types::*;
