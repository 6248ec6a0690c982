//! Core identifier types shared across the verifier.
//!
//! Operation keys name the protected operations of an application. They are
//! opaque 32-byte values; applications typically derive them from a
//! human-readable label with [`OperationKey::from_label`].

use alloy_primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum score an evaluator can attest to.
pub const MAX_SCORE: u16 = 1000;

/// Identifies one protected operation of an application.
///
/// The pair `(application address, operation key)` selects a verifying
/// requirement and scopes bypass windows. Keys compare and hash by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationKey(pub B256);

impl OperationKey {
    /// Wraps a raw 32-byte key.
    pub const fn new(key: B256) -> Self {
        Self(key)
    }

    /// Derives a key from a human-readable label: `keccak256(label)`.
    pub fn from_label(label: &str) -> Self {
        Self(keccak256(label.as_bytes()))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<B256> for OperationKey {
    fn from(key: B256) -> Self {
        Self(key)
    }
}

/// Serde module for variable-length byte strings with 0x prefix
pub mod bytes_hex_0x {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let hex_str = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(hex_str).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_label_is_deterministic() {
        let a = OperationKey::from_label("transfer");
        let b = OperationKey::from_label("transfer");
        assert_eq!(a, b);
        assert_ne!(a, OperationKey::from_label("withdraw"));
    }

    #[test]
    fn display_renders_0x_hex() {
        let key = OperationKey::new(B256::repeat_byte(0xab));
        let rendered = key.to_string();
        assert!(rendered.starts_with("0x"));
        assert_eq!(rendered.len(), 66);
    }

    #[test]
    fn serde_is_transparent() {
        let key = OperationKey::from_label("mint");
        let json = serde_json::to_string(&key).unwrap();
        assert!(json.starts_with("\"0x"));
        let back: OperationKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
    }

    #[test]
    fn bytes_hex_roundtrip() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Wrapper {
            #[serde(with = "bytes_hex_0x")]
            data: Vec<u8>,
        }

        let w = Wrapper {
            data: vec![0xde, 0xad, 0xbe, 0xef],
        };
        let json = serde_json::to_string(&w).unwrap();
        assert!(json.contains("0xdeadbeef"));
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(w, back);
    }
}
