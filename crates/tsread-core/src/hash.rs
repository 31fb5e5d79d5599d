//! Stable hashing helpers for group keys.

use blake3::Hasher;

use crate::group_key::GroupKey;
use crate::types::hash_scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        // blake3 hex(32b) is 64 hex chars
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    let out = h.finalize();
    Hash256(out.into())
}

/// Hash labels and values of a group key in column order.
pub fn hash_group_key(key: &GroupKey) -> Hash256 {
    let mut h = Hasher::new();
    for (col, value) in key.cols().iter().zip(key.values()) {
        h.update(&(col.label.len() as u64).to_le_bytes());
        h.update(col.label.as_bytes());
        hash_scalar(value, &mut h);
    }
    Hash256(h.finalize().into())
}
