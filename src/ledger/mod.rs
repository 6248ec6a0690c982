//! Ledgers and custody plumbing.
//!
//! Three cooperating pieces sit under the verifier facade:
//! - the bypass ledger of time-locked access windows,
//! - the custody account directory with deterministic addressing, and
//! - the delayed custody ledger that intercepts deposits under active locks.

mod bypass;
mod custody;
mod delayed;
mod error;
mod vault;

pub use bypass::*;
pub use custody::*;
pub use delayed::*;
pub use error::*;
pub use vault::*;
