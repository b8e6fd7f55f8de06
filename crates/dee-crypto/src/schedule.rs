//! Key schedule: expansion of the master secret into the four session
//! sub-keys, and the forward-ratchet that replaces them at rekey
//! boundaries.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::primitives::{expand, LABEL_AEAD_KEY, LABEL_AUDIT_TAG_KEY, LABEL_MASTER, LABEL_NONCE_BASE, LABEL_REKEY, LABEL_REKEY_RATCHET};
use crate::wire::REKEY_EVERY_DEFAULT;

/// Four 32-byte sub-keys derived from a master secret.
pub struct SubKeys {
    pub k_aead: [u8; 32],
    pub k_nonce: [u8; 32],
    pub k_audit: [u8; 32],
    pub k_rekey: [u8; 32],
}

fn to32(v: Vec<u8>) -> [u8; 32] {
    v.try_into().expect("HKDF-Expand was asked for exactly 32 bytes")
}

impl SubKeys {
    pub fn derive(k_ms: &[u8; 32]) -> Self {
        Self {
            k_aead: to32(expand(k_ms, LABEL_AEAD_KEY, 32)),
            k_nonce: to32(expand(k_ms, LABEL_NONCE_BASE, 32)),
            k_audit: to32(expand(k_ms, LABEL_AUDIT_TAG_KEY, 32)),
            k_rekey: to32(expand(k_ms, LABEL_REKEY, 32)),
        }
    }
}

/// Derive the 32-byte master secret from the raw HKDF-Extract output.
pub fn derive_master_secret(k_raw: &[u8; 32]) -> [u8; 32] {
    to32(expand(k_raw, LABEL_MASTER, 32))
}

/// `Expand(k_rekey, "dee-v1-rekey-ratchet" || counter_be64, 32)`.
pub fn ratchet_master_secret(k_rekey: &[u8; 32], counter: u64) -> [u8; 32] {
    let mut info = Vec::with_capacity(LABEL_REKEY_RATCHET.len() + 8);
    info.extend_from_slice(LABEL_REKEY_RATCHET);
    info.extend_from_slice(&counter.to_be_bytes());
    to32(expand(k_rekey, &info, 32))
}

/// Process-wide override of `REKEY_EVERY` for tests. `0` means "use the
/// default". Never exposed as production configuration — changing it
/// changes wire compatibility with every other implementation.
static REKEY_EVERY_OVERRIDE: AtomicU64 = AtomicU64::new(0);

pub fn rekey_every() -> u64 {
    let v = REKEY_EVERY_OVERRIDE.load(Ordering::Relaxed);
    if v == 0 {
        REKEY_EVERY_DEFAULT
    } else {
        v
    }
}

/// Test-only hook: override `REKEY_EVERY` for the remainder of the
/// process. Not part of the public production API — production code must
/// never call this, since changing it breaks wire compatibility.
#[doc(hidden)]
pub fn set_rekey_every_for_test(value: u64) {
    REKEY_EVERY_OVERRIDE.store(value, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratchet_is_deterministic() {
        let k_rekey = [9u8; 32];
        let a = ratchet_master_secret(&k_rekey, 1000);
        let b = ratchet_master_secret(&k_rekey, 1000);
        assert_eq!(a, b);
    }

    #[test]
    fn ratchet_diverges_by_counter() {
        let k_rekey = [9u8; 32];
        let a = ratchet_master_secret(&k_rekey, 1000);
        let b = ratchet_master_secret(&k_rekey, 2000);
        assert_ne!(a, b);
    }
}
