//! Session state and the dual-mode record layer.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use zeroize::Zeroize;

use crate::error::DeeError;
use crate::mode::Mode;
use crate::primitives::{equal_constant_time, hmac256_truncate, sha256, transcript_hash};
use crate::schedule::{self, SubKeys};
use crate::wire::{self, HEADER_SIZE, NONCE_SIZE};

/// A DEE session. Sub-keys and the master secret are zeroized on drop. The
/// pre-handshake private keys never enter `Session` at all — they live in
/// `handshake::HandshakeState` and are dropped (and scrubbed) the instant
/// the handshake completes.
pub struct Session {
    pub(crate) mode: Mode,
    pub(crate) is_initiator: bool,
    pub(crate) established: bool,

    pub(crate) session_id: [u8; 32],
    pub(crate) transcript_hash: [u8; 32],

    pub(crate) k_ms: [u8; 32],
    pub(crate) k_aead: [u8; 32],
    pub(crate) k_nonce: [u8; 32],
    pub(crate) k_audit: [u8; 32],
    pub(crate) k_rekey: [u8; 32],

    pub(crate) counter_tx: u64,
    pub(crate) counter_rx: u64,

    pub(crate) init_msg: Vec<u8>,
    pub(crate) resp_msg: Vec<u8>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("is_initiator", &self.is_initiator)
            .field("established", &self.established)
            .field("session_id", &self.session_id)
            .field("counter_tx", &self.counter_tx)
            .field("counter_rx", &self.counter_rx)
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.k_ms.zeroize();
        self.k_aead.zeroize();
        self.k_nonce.zeroize();
        self.k_audit.zeroize();
        self.k_rekey.zeroize();
    }
}

impl Session {
    pub(crate) fn new_established(
        mode: Mode,
        is_initiator: bool,
        session_id: [u8; 32],
        transcript_hash: [u8; 32],
        k_ms: [u8; 32],
        init_msg: Vec<u8>,
        resp_msg: Vec<u8>,
    ) -> Self {
        let sub = SubKeys::derive(&k_ms);
        Self {
            mode,
            is_initiator,
            established: true,
            session_id,
            transcript_hash,
            k_ms,
            k_aead: sub.k_aead,
            k_nonce: sub.k_nonce,
            k_audit: sub.k_audit,
            k_rekey: sub.k_rekey,
            counter_tx: 0,
            counter_rx: 0,
            init_msg,
            resp_msg,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_established(&self) -> bool {
        self.established
    }

    pub fn is_initiator(&self) -> bool {
        self.is_initiator
    }

    pub fn session_id(&self) -> [u8; 32] {
        self.session_id
    }

    pub fn counter_tx(&self) -> u64 {
        self.counter_tx
    }

    pub fn counter_rx(&self) -> u64 {
        self.counter_rx
    }

    /// The wire header that would be used for `counter`, useful for
    /// building the associated data a peer must supply to `decrypt`.
    pub fn wire_header(&self, counter: u64) -> [u8; HEADER_SIZE] {
        wire::build_header(self.mode, &self.session_id, counter, 0)
    }

    fn aead(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new_from_slice(&self.k_aead).expect("k_aead is always 32 bytes")
    }

    fn derive_nonce(&self, counter: u64, ad: &[u8]) -> [u8; NONCE_SIZE] {
        let ad_hash = sha256(ad);
        let counter_be = counter.to_be_bytes();
        let input = transcript_hash(&[&self.session_id, &self.transcript_hash, &counter_be, &ad_hash]);
        let nonce = hmac256_truncate(&self.k_nonce, &input, NONCE_SIZE);
        nonce.try_into().expect("requested exactly NONCE_SIZE bytes")
    }

    fn naive_nonce(counter: u64) -> [u8; NONCE_SIZE] {
        let mut nonce = [0u8; NONCE_SIZE];
        nonce[4..].copy_from_slice(&counter.to_be_bytes());
        nonce
    }

    fn maybe_rekey_after(&mut self, counter: u64) {
        let n = schedule::rekey_every();
        if n == 0 {
            return;
        }
        if counter > 0 && counter % n == 0 {
            self.ratchet_forward(counter);
        }
    }

    fn ratchet_forward(&mut self, counter: u64) {
        self.k_ms = schedule::ratchet_master_secret(&self.k_rekey, counter);
        let sub = SubKeys::derive(&self.k_ms);
        self.k_aead = sub.k_aead;
        self.k_nonce = sub.k_nonce;
        self.k_audit = sub.k_audit;
        self.k_rekey = sub.k_rekey;
    }

    /// Encrypt `plaintext` with optional associated data `ad`. The mode's
    /// rules for nonce derivation and auditing are applied automatically.
    pub fn encrypt(&mut self, plaintext: &[u8], ad: &[u8]) -> Result<Vec<u8>, DeeError> {
        if !self.established {
            return Err(DeeError::DecryptFailure);
        }

        // Ratchet before this record if the counter about to be used crosses
        // a boundary, in both modes — mirrors the send side's "pre-check" so
        // that the first record past the boundary is sealed under the new
        // keys, regardless of whether this record's auditing is enforced.
        self.maybe_rekey_after(self.counter_tx);

        let nonce = if self.mode.is_safe() {
            self.derive_nonce(self.counter_tx, ad)
        } else {
            Self::naive_nonce(self.counter_tx)
        };

        let header = self.wire_header(self.counter_tx);
        let mut additional_data = Vec::with_capacity(header.len() + ad.len());
        additional_data.extend_from_slice(&header);
        additional_data.extend_from_slice(ad);

        let inner_ct = self
            .aead()
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &additional_data,
                },
            )
            .map_err(|_| DeeError::DecryptFailure)?;

        let ciphertext = if self.mode.is_safe() {
            let audit_input = transcript_hash(&[&self.transcript_hash, &header, &self.counter_tx.to_be_bytes()]);
            let audit_tag = hmac256_truncate(&self.k_audit, &audit_input, 16);
            let mut out = Vec::with_capacity(16 + inner_ct.len());
            out.extend_from_slice(&audit_tag);
            out.extend_from_slice(&inner_ct);
            out
        } else {
            inner_ct
        };

        self.counter_tx += 1;
        Ok(ciphertext)
    }

    /// NAIVE-only: encrypt with a caller-supplied 12-byte nonce. SAFE
    /// rejects this call with the uniform decrypt-failure error — this is
    /// the attack surface for the nonce-reuse demo, not a general API.
    pub fn encrypt_naive_with_nonce(
        &mut self,
        plaintext: &[u8],
        ad: &[u8],
        caller_nonce: &[u8],
    ) -> Result<Vec<u8>, DeeError> {
        if !self.established || self.mode.is_safe() {
            return Err(DeeError::DecryptFailure);
        }
        if caller_nonce.len() != NONCE_SIZE {
            return Err(DeeError::DecryptFailure);
        }

        let header = self.wire_header(self.counter_tx);
        let mut additional_data = Vec::with_capacity(header.len() + ad.len());
        additional_data.extend_from_slice(&header);
        additional_data.extend_from_slice(ad);

        let ciphertext = self
            .aead()
            .encrypt(
                Nonce::from_slice(caller_nonce),
                Payload {
                    msg: plaintext,
                    aad: &additional_data,
                },
            )
            .map_err(|_| DeeError::DecryptFailure)?;

        self.counter_tx += 1;
        Ok(ciphertext)
    }

    /// Decrypt `ciphertext`. `ad_bytes` MUST begin with the 44-byte wire
    /// header, followed by any user associated data.
    pub fn decrypt(&mut self, ciphertext: &[u8], ad_bytes: &[u8]) -> Result<Vec<u8>, DeeError> {
        if !self.established {
            return Err(DeeError::DecryptFailure);
        }
        if ad_bytes.len() < HEADER_SIZE {
            return Err(DeeError::DecryptFailure);
        }
        let header = &ad_bytes[..HEADER_SIZE];
        let parsed = wire::parse_header(header)?;
        let user_ad = &ad_bytes[HEADER_SIZE..];
        let counter = parsed.counter;

        let plaintext = if self.mode.is_safe() {
            if counter != self.counter_rx {
                return Err(DeeError::DecryptFailure);
            }
            if ciphertext.len() < 16 + 16 {
                return Err(DeeError::DecryptFailure);
            }
            let audit_input = transcript_hash(&[&self.transcript_hash, header, &counter.to_be_bytes()]);
            let expected_audit = hmac256_truncate(&self.k_audit, &audit_input, 16);
            if !equal_constant_time(&ciphertext[..16], &expected_audit) {
                return Err(DeeError::DecryptFailure);
            }

            let nonce = self.derive_nonce(counter, user_ad);
            let mut additional_data = Vec::with_capacity(header.len() + user_ad.len());
            additional_data.extend_from_slice(header);
            additional_data.extend_from_slice(user_ad);

            self.aead()
                .decrypt(
                    Nonce::from_slice(&nonce),
                    Payload {
                        msg: &ciphertext[16..],
                        aad: &additional_data,
                    },
                )
                .map_err(|_| DeeError::DecryptFailure)?
        } else {
            let nonce = Self::naive_nonce(counter);
            let mut additional_data = Vec::with_capacity(header.len() + user_ad.len());
            additional_data.extend_from_slice(header);
            additional_data.extend_from_slice(user_ad);

            self.aead()
                .decrypt(
                    Nonce::from_slice(&nonce),
                    Payload {
                        msg: ciphertext,
                        aad: &additional_data,
                    },
                )
                .map_err(|_| DeeError::DecryptFailure)?
        };

        self.counter_rx += 1;
        self.maybe_rekey_after(self.counter_rx);
        Ok(plaintext)
    }

    /// Encrypt and wrap the result in a full frame: header(44) ||
    /// payload_len(4) || ciphertext. The header uses `counter_tx - 1`
    /// because `encrypt` already advanced the counter — this keeps the
    /// frame header and the record header that `encrypt` used in sync.
    pub fn encrypt_to_frame(&mut self, plaintext: &[u8], ad: &[u8]) -> Result<Vec<u8>, DeeError> {
        let ct = self.encrypt(plaintext, ad)?;
        let header = self.wire_header(self.counter_tx - 1);
        let mut frame = Vec::with_capacity(wire::FRAME_OVERHEAD + ct.len());
        frame.extend_from_slice(&header);
        frame.extend_from_slice(&(ct.len() as u32).to_be_bytes());
        frame.extend_from_slice(&ct);
        Ok(frame)
    }

    /// Parse a framed message and decrypt it.
    pub fn decrypt_from_frame(&mut self, frame: &[u8]) -> Result<Vec<u8>, DeeError> {
        if frame.len() < wire::FRAME_OVERHEAD {
            return Err(DeeError::DecryptFailure);
        }
        let header = &frame[..HEADER_SIZE];
        let payload_len = u32::from_be_bytes(frame[44..48].try_into().unwrap()) as usize;
        if frame.len() < wire::FRAME_OVERHEAD + payload_len {
            return Err(DeeError::DecryptFailure);
        }
        let payload = &frame[48..48 + payload_len];
        self.decrypt(payload, header)
    }
}

#[doc(hidden)]
impl Session {
    /// Construct a session directly from an already-derived master secret.
    /// Exposed for tests that want to probe the record layer without
    /// running a full handshake.
    pub fn from_master_secret_for_test(mode: Mode, session_id: [u8; 32], k_ms: [u8; 32]) -> Self {
        Self::new_established(mode, true, session_id, session_id, k_ms, Vec::new(), Vec::new())
    }
}
