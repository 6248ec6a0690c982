//! Attestation records and the compliance submission wire format.
//!
//! Evaluators score a caller off-system and sign the result. Callers relay
//! the signed attestation to the verifier as a [`ComplianceSubmission`], a
//! compact binary payload with a fixed header and a variable-length
//! signature tail. Decoding is strict: unknown versions, short buffers,
//! out-of-range scores, oversized signatures, and trailing bytes are all
//! rejected before any semantic check runs.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use super::{bytes_hex_0x, OperationKey, MAX_SCORE};

// ============================================================================
// Wire format constants
// ============================================================================

/// Codec version accepted by [`ComplianceSubmission::decode`].
pub const CODEC_VERSION: u8 = 1;

/// Upper bound on the signature tail. ECDSA signatures are 65 bytes;
/// contract signers may carry larger blobs, but never this large.
pub const MAX_SIGNATURE_LEN: usize = 1024;

/// Fixed portion of an encoded submission:
/// version (1) + caller (20) + operation key (32) + score (2) +
/// issued_at (8) + network_id (8) + signature length (2).
pub const SUBMISSION_HEADER_LEN: usize = 73;

// ============================================================================
// Attested data
// ============================================================================

/// The claim an evaluator signs about one caller.
///
/// Timestamps are Unix seconds. `network_id` names the network the
/// evaluation was performed for; requirements may pin it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestedData {
    /// Compliance score in `0..=1000`.
    pub score: u16,
    /// When the evaluator produced the score.
    pub issued_at: u64,
    /// Network the evaluation targets.
    pub network_id: u64,
}

impl AttestedData {
    /// Fixed 18-byte field encoding: `score (2) || issued_at (8) || network_id (8)`,
    /// all big-endian. Shared by the wire codec and the legacy digest.
    pub fn encode_fields(&self) -> [u8; 18] {
        let mut out = [0u8; 18];
        out[0..2].copy_from_slice(&self.score.to_be_bytes());
        out[2..10].copy_from_slice(&self.issued_at.to_be_bytes());
        out[10..18].copy_from_slice(&self.network_id.to_be_bytes());
        out
    }
}

// ============================================================================
// Verifying requirements
// ============================================================================

/// Per-(application, operation key) gating policy.
///
/// A zero field means "no constraint on this axis": `min_score == 0` accepts
/// any score, `expires_at == 0` never expires, `required_network_id == 0`
/// accepts any network. The all-zero requirement therefore passes everything,
/// which is also the behavior for keys that were never registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyingRequirement {
    /// Minimum acceptable score.
    pub min_score: u16,
    /// Requirement expiry as Unix seconds; past this instant every check fails.
    pub expires_at: u64,
    /// Network the attestation must have been issued for.
    pub required_network_id: u64,
}

impl VerifyingRequirement {
    pub fn new(min_score: u16, expires_at: u64, required_network_id: u64) -> Self {
        Self {
            min_score,
            expires_at,
            required_network_id,
        }
    }

    /// True when every field is zero, i.e. the requirement gates nothing.
    pub fn is_unrestricted(&self) -> bool {
        self.min_score == 0 && self.expires_at == 0 && self.required_network_id == 0
    }

    /// Evaluates the three gating conditions against an attestation.
    ///
    /// All conditions are checked independently; the result is their
    /// conjunction. Expiry is inclusive: a check at exactly `expires_at`
    /// still passes.
    pub fn is_met_by(&self, attested: &AttestedData, now: u64, network_id: u64) -> bool {
        let network_ok = self.required_network_id == 0 || self.required_network_id == network_id;
        let not_expired = self.expires_at == 0 || now <= self.expires_at;
        let score_ok = attested.score >= self.min_score;
        network_ok && not_expired && score_ok
    }

    /// How far the attested score falls short of `min_score`. Zero when the
    /// score meets or exceeds the bar.
    pub fn score_gap(&self, attested: &AttestedData) -> u16 {
        self.min_score.saturating_sub(attested.score)
    }
}

// ============================================================================
// Compliance submissions
// ============================================================================

/// A caller-relayed, evaluator-signed attestation bound to one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceSubmission {
    /// The access subject the attestation covers.
    pub caller: Address,
    /// Operation this submission targets; must match the invoked key.
    pub operation_key: OperationKey,
    /// The signed claim.
    pub attested: AttestedData,
    /// Evaluator signature, `r || s || v` for ECDSA signers or an opaque
    /// blob for contract signers. Length is bounded by [`MAX_SIGNATURE_LEN`];
    /// `encode` assumes the caller respects the bound and `decode` enforces it.
    #[serde(with = "bytes_hex_0x")]
    pub signature: Vec<u8>,
}

/// Structural decode failures, distinct from semantic verification failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported submission version {0}")]
    UnsupportedVersion(u8),
    #[error("submission truncated: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("attested score {0} exceeds maximum")]
    ScoreOutOfRange(u16),
    #[error("signature length {0} exceeds maximum")]
    SignatureTooLong(usize),
    #[error("{0} trailing bytes after signature")]
    TrailingBytes(usize),
}

impl ComplianceSubmission {
    /// Serializes to the versioned wire layout:
    ///
    /// ```text
    /// version      : u8        (= 1)
    /// caller       : [u8; 20]
    /// operation_key: [u8; 32]
    /// score        : u16  BE
    /// issued_at    : u64  BE
    /// network_id   : u64  BE
    /// sig_len      : u16  BE
    /// signature    : [u8; sig_len]
    /// ```
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SUBMISSION_HEADER_LEN + self.signature.len());
        out.push(CODEC_VERSION);
        out.extend_from_slice(self.caller.as_slice());
        out.extend_from_slice(self.operation_key.as_bytes());
        out.extend_from_slice(&self.attested.encode_fields());
        out.extend_from_slice(&(self.signature.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.signature);
        out
    }

    /// Parses and validates the wire layout produced by [`encode`](Self::encode).
    ///
    /// Checks run in order: version, header length, score range, signature
    /// length bound, tail length, trailing bytes. The payload is consumed
    /// exactly; extra bytes are an error rather than silently ignored.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.is_empty() {
            return Err(DecodeError::Truncated {
                expected: SUBMISSION_HEADER_LEN,
                actual: 0,
            });
        }
        let version = payload[0];
        if version != CODEC_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        if payload.len() < SUBMISSION_HEADER_LEN {
            return Err(DecodeError::Truncated {
                expected: SUBMISSION_HEADER_LEN,
                actual: payload.len(),
            });
        }

        let caller = Address::from_slice(&payload[1..21]);
        let operation_key = OperationKey::new(B256::from_slice(&payload[21..53]));
        let score = read_u16(payload, 53);
        if score > MAX_SCORE {
            return Err(DecodeError::ScoreOutOfRange(score));
        }
        let issued_at = read_u64(payload, 55);
        let network_id = read_u64(payload, 63);

        let sig_len = read_u16(payload, 71) as usize;
        if sig_len > MAX_SIGNATURE_LEN {
            return Err(DecodeError::SignatureTooLong(sig_len));
        }
        let end = SUBMISSION_HEADER_LEN + sig_len;
        if payload.len() < end {
            return Err(DecodeError::Truncated {
                expected: end,
                actual: payload.len(),
            });
        }
        if payload.len() > end {
            return Err(DecodeError::TrailingBytes(payload.len() - end));
        }

        Ok(Self {
            caller,
            operation_key,
            attested: AttestedData {
                score,
                issued_at,
                network_id,
            },
            signature: payload[SUBMISSION_HEADER_LEN..end].to_vec(),
        })
    }
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_be_bytes(buf)
}
