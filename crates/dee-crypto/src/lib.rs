//! dee-crypto — DEE (Deterministic Encrypted Exchange) session engine
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize all secret material on drop.
//! - SAFE decrypt failures collapse to a single opaque error — callers
//!   cannot distinguish counter mismatch from audit mismatch from AEAD
//!   failure. This is an anti-side-channel requirement, not an oversight.
//!
//! # Module layout
//! - `primitives`   — SHA-256 / HMAC-SHA-256 / HKDF / constant-time compare
//! - `mode`          — SAFE vs NAIVE
//! - `rand_source`   — abstract byte source (OS CSPRNG or deterministic DRBG)
//! - `handshake`     — hybrid X25519 + Kyber-768 key establishment
//! - `wire`          — fixed-size wire framing (header, InitMsg, RespMsg)
//! - `schedule`       — key-schedule derivation and the rekey ratchet
//! - `session`       — the `Session` type and its record layer
//! - `error`         — unified error type

pub mod error;
pub mod handshake;
pub mod mode;
pub mod primitives;
pub mod rand_source;
pub mod schedule;
pub mod session;
pub mod wire;

pub use error::DeeError;
pub use mode::Mode;
pub use session::Session;
