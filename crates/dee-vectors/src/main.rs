//! Deterministic message-vector generator.
//!
//! Registers a seeded byte stream as the process's randomness source so
//! that Kyber-768 keygen/encapsulation — which the `pqcrypto-kyber` API
//! does not expose a seeded entry point for — becomes reproducible too.
//! Same seed, same machine or not, same output.

use std::sync::Mutex;

use clap::Parser;
use dee_crypto::handshake::{handshake_init_deterministic, handshake_resp_deterministic};
use dee_crypto::rand_source::{ByteSource, Drbg};
use dee_crypto::Mode;
use serde::Serialize;

/// Fixed for reproducibility — changing it changes every vector on disk.
const VECTOR_SEED: u64 = 42;

static KYBER_RNG: Mutex<Option<Drbg>> = Mutex::new(None);

fn install_kyber_rng(seed: u64) {
    *KYBER_RNG.lock().unwrap() = Some(Drbg::from_seed_u64(seed));
}

fn custom_getrandom(buf: &mut [u8]) -> Result<(), getrandom::Error> {
    let mut guard = KYBER_RNG.lock().unwrap();
    let rng = guard.as_mut().expect("install_kyber_rng must run before any keygen");
    rng.fill(buf);
    Ok(())
}

getrandom::register_custom_getrandom!(custom_getrandom);

#[derive(Debug, PartialEq, Serialize)]
struct MessageEntry {
    counter: u64,
    msg_hex: String,
    ad_hex: String,
    cipher_hex: String,
}

#[derive(Debug, PartialEq, Serialize)]
struct MessageVector {
    session_id_trunc_hex: String,
    transcript_hex: String,
    messages: Vec<MessageEntry>,
    label: String,
}

#[derive(Parser)]
struct Args {
    /// Output directory for message_vector.json
    #[arg(long, default_value = "tests/vectors/testdata")]
    out: String,
}

fn generate_message_vector(seed: u64) -> anyhow::Result<MessageVector> {
    install_kyber_rng(seed);
    let mut rng = Drbg::from_seed_u64(seed);

    let (state, init_msg) = handshake_init_deterministic(Mode::Safe, &mut rng);
    let (_resp_session, resp_msg) = handshake_resp_deterministic(Mode::Safe, &init_msg, &mut rng)
        .map_err(|e| anyhow::anyhow!("handshake_resp_deterministic: {e}"))?;
    let mut init_session = dee_crypto::handshake::handshake_complete(state, &resp_msg)
        .map_err(|e| anyhow::anyhow!("handshake_complete: {e}"))?;

    let msg0 = b"vector message 0";
    let ad0 = b"associated data 0";
    let msg1 = b"vector message 1";
    let ad1 = b"associated data 1";

    let ct0 = init_session.encrypt(msg0, ad0)?;
    let ct1 = init_session.encrypt(msg1, ad1)?;

    let session_id = init_session.session_id();
    let trunc = &session_id[..8.min(session_id.len())];

    Ok(MessageVector {
        session_id_trunc_hex: hex::encode(trunc),
        transcript_hex: hex::encode(session_id),
        messages: vec![
            MessageEntry {
                counter: 0,
                msg_hex: hex::encode(msg0),
                ad_hex: hex::encode(ad0),
                cipher_hex: hex::encode(&ct0),
            },
            MessageEntry {
                counter: 1,
                msg_hex: hex::encode(msg1),
                ad_hex: hex::encode(ad1),
                cipher_hex: hex::encode(&ct1),
            },
        ],
        label: "two_message_safe_deterministic".to_string(),
    })
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    std::fs::create_dir_all(&args.out)?;

    let vector = generate_message_vector(VECTOR_SEED)?;
    let path = std::path::Path::new(&args.out).join("message_vector.json");
    let body = serde_json::to_string_pretty(&vector)?;
    std::fs::write(&path, body)?;
    println!("Wrote {}", path.display());
    Ok(())
}
