//! Cryptographic utilities for the compliance verifier.
//!
//! Provides:
//! - Domain-separated keccak-256 digests and deterministic derivations
//! - Evaluator signing keys (secp256k1, recoverable signatures)
//! - Signature validation for key-holding and contract-based signers

mod digest;
mod signer;
mod validator;

pub use digest::*;
pub use signer::*;
pub use validator::*;
