use thiserror::Error;

/// Unified error type for the DEE session engine.
///
/// Per the uniform-failure policy, `DecryptFailure` carries no inner cause:
/// a counter mismatch, an audit-tag mismatch, and an AEAD authentication
/// failure are all indistinguishable to the caller.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeeError {
    #[error("handshake failed")]
    HandshakeFailure,

    #[error("decryption failed")]
    DecryptFailure,

    #[error("invalid mode")]
    InvalidMode,
}
