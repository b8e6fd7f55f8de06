//! Primitive layer: SHA-256, HMAC-SHA-256, HKDF-Extract/Expand with domain
//! labels, and constant-time equality.
//!
//! Domain labels are bit-exact UTF-8 strings, fixed across implementations
//! so independently generated vectors agree.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const LABEL_MASTER: &[u8] = b"dee-v1-master";
pub const LABEL_AEAD_KEY: &[u8] = b"dee-v1-aead-key";
pub const LABEL_NONCE_BASE: &[u8] = b"dee-v1-nonce-base";
pub const LABEL_AUDIT_TAG_KEY: &[u8] = b"dee-v1-audit-tag-key";
pub const LABEL_REKEY: &[u8] = b"dee-v1-rekey";
pub const LABEL_REKEY_RATCHET: &[u8] = b"dee-v1-rekey-ratchet";

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 over the ordered concatenation of `parts`.
pub fn transcript_hash(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// HKDF-Extract with SHA-256.
pub fn extract(secret: &[u8], salt: &[u8]) -> [u8; 32] {
    let (prk, _) = Hkdf::<Sha256>::extract(Some(salt), secret);
    prk.into()
}

/// HKDF-Expand with SHA-256, deterministic for a given `(prk, info)` pair.
pub fn expand(prk: &[u8], info: &[u8], n: usize) -> Vec<u8> {
    let hk = Hkdf::<Sha256>::from_prk(prk).expect("PRK length is valid for SHA-256");
    let mut out = vec![0u8; n];
    hk.expand(info, &mut out)
        .expect("requested output length is within HKDF-SHA256 bounds");
    out
}

/// First `n` bytes of HMAC-SHA-256(key, data).
pub fn hmac256_truncate(key: &[u8], data: &[u8], n: usize) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    let full = mac.finalize().into_bytes();
    full[..n.min(full.len())].to_vec()
}

/// Constant-time equality — equal length and contents in time independent
/// of contents. Used for the audit tag and any other user-influenced
/// equality check.
pub fn equal_constant_time(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_is_deterministic() {
        let prk = extract(b"secret", b"salt");
        let a = expand(&prk, LABEL_MASTER, 32);
        let b = expand(&prk, LABEL_MASTER, 32);
        assert_eq!(a, b);
    }

    #[test]
    fn different_labels_diverge() {
        let prk = extract(b"secret", b"salt");
        let a = expand(&prk, LABEL_AEAD_KEY, 32);
        let b = expand(&prk, LABEL_NONCE_BASE, 32);
        assert_ne!(a, b);
    }

    #[test]
    fn constant_time_equal_checks_length_and_content() {
        assert!(equal_constant_time(b"abc", b"abc"));
        assert!(!equal_constant_time(b"abc", b"abd"));
        assert!(!equal_constant_time(b"abc", b"abcd"));
    }

    #[test]
    fn empty_ad_has_a_well_defined_hash() {
        let h = sha256(b"");
        assert_eq!(h.len(), 32);
    }
}
