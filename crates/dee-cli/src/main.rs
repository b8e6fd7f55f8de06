use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use dee_crypto::handshake::{handshake_complete, handshake_init, handshake_resp};
use dee_crypto::Mode;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "dee-cli")]
#[command(about = "Demos and attack walkthroughs for the DEE protocol", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full handshake and round-trip a message
    Demo {
        /// DEE mode: SAFE or NAIVE
        #[arg(long, default_value = "SAFE")]
        mode: String,
        /// Message to send
        #[arg(long, default_value = "hello")]
        msg: String,
    },
    /// NAIVE-mode replay attack: decrypt the same ciphertext twice
    Replay,
    /// NAIVE-mode nonce-reuse attack: recover a plaintext via keystream reuse
    NonceReuse,
    /// SAFE-mode bit-flip rejection: corrupt a ciphertext byte and watch decryption fail
    Bitflip,
}

fn parse_mode(s: &str) -> Result<Mode> {
    match s {
        "SAFE" => Ok(Mode::Safe),
        "NAIVE" => Ok(Mode::Naive),
        other => Err(anyhow!("invalid mode: {other}")),
    }
}

fn run_demo(mode: &str, msg: &str) -> Result<()> {
    let mode = parse_mode(mode)?;
    let (state, init_msg) = handshake_init(mode);
    let (mut resp_session, resp_msg) = handshake_resp(mode, &init_msg).map_err(|e| anyhow!("handshake_resp: {e}"))?;
    let mut init_session = handshake_complete(state, &resp_msg).map_err(|e| anyhow!("handshake_complete: {e}"))?;
    debug!(%mode, "handshake established");

    let plaintext = msg.as_bytes();
    let counter_before = init_session.counter_tx();
    let ct = init_session.encrypt(plaintext, &[])?;
    if counter_before > 0 && counter_before % dee_crypto::schedule::rekey_every() == 0 {
        debug!(%mode, counter = counter_before, "ratchet boundary crossed");
    }
    let header = resp_session.wire_header(0);
    let pt = match resp_session.decrypt(&ct, &header) {
        Ok(v) => v,
        Err(e) => {
            warn!(%mode, "decrypt rejected");
            return Err(anyhow!("decrypt: {e}"));
        }
    };

    println!("Mode: {mode}");
    println!("SessionID: {}", hex::encode(init_session.session_id()));
    println!("Plaintext: {msg}");
    println!("Decrypted: {}", String::from_utf8_lossy(&pt));
    println!("Roundtrip OK: {}", pt == plaintext);
    Ok(())
}

fn run_replay() -> Result<()> {
    println!("=== NAIVE replay attack demo ===");
    let (state, init_msg) = handshake_init(Mode::Naive);
    let (mut resp_session, resp_msg) = handshake_resp(Mode::Naive, &init_msg).map_err(|e| anyhow!("handshake_resp: {e}"))?;
    let mut init_session = handshake_complete(state, &resp_msg).map_err(|e| anyhow!("handshake_complete: {e}"))?;
    debug!(mode = %Mode::Naive, "handshake established");

    let plaintext = b"replay me";
    let ct = init_session.encrypt(plaintext, &[])?;
    let header = resp_session.wire_header(0);

    let pt1 = resp_session.decrypt(&ct, &header)?;
    let pt2 = resp_session.decrypt(&ct, &header)?;

    println!("Steps: send same ciphertext twice, both decrypts succeed (no replay protection)");
    println!("Replay accepted: {}", pt1 == pt2 && pt1 == plaintext);
    Ok(())
}

fn run_nonce_reuse() -> Result<()> {
    println!("=== NAIVE nonce-reuse attack demo ===");
    let (state, init_msg) = handshake_init(Mode::Naive);
    let (_resp_session, resp_msg) = handshake_resp(Mode::Naive, &init_msg).map_err(|e| anyhow!("handshake_resp: {e}"))?;
    let mut init_session = handshake_complete(state, &resp_msg).map_err(|e| anyhow!("handshake_complete: {e}"))?;
    debug!(mode = %Mode::Naive, "handshake established");

    let nonce = [0x41u8; 12];
    let p1 = b"AAAAAAAAAAAAAAAA";
    let p2 = b"BBBBBBBBBBBBBBBB";
    let ct1 = init_session.encrypt_naive_with_nonce(p1, &[], &nonce)?;
    let ct2 = init_session.encrypt_naive_with_nonce(p2, &[], &nonce)?;

    // Same nonce, same keystream: ct1 XOR ct2 = p1 XOR p2.
    let recovered: Vec<u8> = ct1.iter().zip(ct2.iter()).zip(p1.iter()).map(|((a, b), p)| a ^ b ^ p).collect();

    println!("Steps: same nonce -> same keystream -> ct1 XOR ct2 = p1 XOR p2");
    println!("With known p1, recover p2 = ct1 XOR ct2 XOR p1");
    println!("Recovered plaintext == expected: {}", recovered == p2);
    Ok(())
}

fn run_bitflip() -> Result<()> {
    println!("=== SAFE bit-flip rejection demo ===");
    let (state, init_msg) = handshake_init(Mode::Safe);
    let (mut resp_session, resp_msg) = handshake_resp(Mode::Safe, &init_msg).map_err(|e| anyhow!("handshake_resp: {e}"))?;
    let mut init_session = handshake_complete(state, &resp_msg).map_err(|e| anyhow!("handshake_complete: {e}"))?;
    debug!(mode = %Mode::Safe, "handshake established");

    let plaintext = b"do not tamper with this";
    let mut ct = init_session.encrypt(plaintext, &[])?;
    let header = resp_session.wire_header(0);

    let flipped = ct.len() - 1;
    ct[flipped] ^= 0x01;

    println!("Steps: flip the final ciphertext byte, then attempt decryption");
    match resp_session.decrypt(&ct, &header) {
        Ok(_) => println!("Tampered ciphertext accepted (unexpected)"),
        Err(e) => {
            warn!(mode = %Mode::Safe, "decrypt rejected");
            println!("Tampered ciphertext rejected as expected: {e}");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Demo { mode, msg } => run_demo(&mode, &msg),
        Commands::Replay => run_replay(),
        Commands::NonceReuse => run_nonce_reuse(),
        Commands::Bitflip => run_bitflip(),
    }
}
