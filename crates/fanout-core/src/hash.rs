//! Content digests that name function calls.

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte blake3 digest naming a call by its canonical encoding.
///
/// Collisions are treated as impossible; two calls are equal iff their
/// identifiers match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CallId(pub [u8; 32]);

impl CallId {
    pub fn to_hex(&self) -> String {
        // 32 bytes is 64 hex chars
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }

    /// Parse an identifier back out of a 64-char hex string (file stems carry
    /// identifiers, so listings need the reverse mapping).
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 64 || !s.is_ascii() {
            return None;
        }
        let bytes = s.as_bytes();
        let mut out = [0u8; 32];
        for (i, slot) in out.iter_mut().enumerate() {
            let hi = (bytes[2 * i] as char).to_digit(16)?;
            let lo = (bytes[2 * i + 1] as char).to_digit(16)?;
            *slot = ((hi << 4) | lo) as u8;
        }
        Some(Self(out))
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Digest raw canonical bytes.
pub fn digest_bytes(bytes: &[u8]) -> CallId {
    let mut h = Hasher::new();
    h.update(bytes);
    CallId(h.finalize().into())
}
