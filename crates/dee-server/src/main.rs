//! Lab server: a minimal, hand-rolled HTTP/1.1 facade (no framework — this
//! corpus never pulls one in) exposing `/scenario/safe`, `/scenario/naive`,
//! and `/health`. Every scenario runs an end-to-end handshake + encrypt +
//! decrypt and reports timing plus a uniform `reason_code`.

use std::time::Instant;

use clap::Parser;
use dee_crypto::handshake::{handshake_complete, handshake_init, handshake_resp};
use dee_crypto::Mode;
use dee_proto::ScenarioResult;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

#[derive(Parser)]
struct Args {
    /// Listen port. Overridden by the DEE_PORT environment variable if set.
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

fn resolve_port(cli_port: u16) -> u16 {
    std::env::var("DEE_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(cli_port)
}

fn run_scenario(mode: Mode) -> ScenarioResult {
    let mut result = ScenarioResult::errored(&mode.to_string(), "none");

    let t0 = Instant::now();
    let (state, init_msg) = handshake_init(mode);
    let (mut resp_session, resp_msg) = match handshake_resp(mode, &init_msg) {
        Ok(v) => v,
        Err(_) => return result,
    };
    let mut init_session = match handshake_complete(state, &resp_msg) {
        Ok(v) => v,
        Err(_) => return result,
    };
    result.handshake_ms = Some(t0.elapsed().as_millis() as u64);
    tracing::debug!(mode = %mode, "handshake established");

    let plaintext = b"test message";
    let counter_before = init_session.counter_tx();
    let t1 = Instant::now();
    let ct = match init_session.encrypt(plaintext, &[]) {
        Ok(v) => v,
        Err(_) => return result,
    };
    result.encrypt_ms = Some(t1.elapsed().as_millis() as u64);
    result.ciphertext_len = Some(ct.len());
    if counter_before > 0 && counter_before % dee_crypto::schedule::rekey_every() == 0 {
        tracing::debug!(mode = %mode, counter = counter_before, "ratchet boundary crossed");
    }

    let header = resp_session.wire_header(0);
    let t2 = Instant::now();
    let pt = match resp_session.decrypt(&ct, &header) {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(mode = %mode, "decrypt rejected");
            return result;
        }
    };
    result.decrypt_ms = Some(t2.elapsed().as_millis() as u64);

    result.ok = pt == plaintext;
    if result.ok {
        result.reason_code = "ok".to_string();
        let session_id = init_session.session_id();
        result.session_id_trunc = Some(hex::encode(&session_id[..8.min(session_id.len())]));
        result.replay_rejected = Some(mode.is_safe());
    }
    result
}

async fn read_request_line_and_headers(stream: &mut BufReader<TcpStream>) -> anyhow::Result<(String, String)> {
    let mut request_line = String::new();
    stream.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("").to_string();

    loop {
        let mut header_line = String::new();
        let n = stream.read_line(&mut header_line).await?;
        if n == 0 || header_line == "\r\n" || header_line == "\n" {
            break;
        }
    }
    Ok((method, path))
}

async fn write_json(stream: &mut TcpStream, status: &str, body: &[u8]) -> anyhow::Result<()> {
    let header = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(header.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.flush().await?;
    Ok(())
}

async fn handle_connection(stream: TcpStream) -> anyhow::Result<()> {
    let mut reader = BufReader::new(stream);
    let (method, path) = read_request_line_and_headers(&mut reader).await?;
    let mut stream = reader.into_inner();

    match (method.as_str(), path.as_str()) {
        ("GET", "/health") => {
            let body = serde_json::to_vec(&serde_json::json!({"status": "ok"}))?;
            write_json(&mut stream, "200 OK", &body).await?;
        }
        ("POST", "/scenario/safe") => {
            let result = run_scenario(Mode::Safe);
            write_json(&mut stream, "200 OK", &serde_json::to_vec(&result)?).await?;
        }
        ("POST", "/scenario/naive") => {
            let result = run_scenario(Mode::Naive);
            write_json(&mut stream, "200 OK", &serde_json::to_vec(&result)?).await?;
        }
        (m, "/scenario/safe") | (m, "/scenario/naive") if m != "POST" => {
            write_json(&mut stream, "405 Method Not Allowed", b"{\"error\":\"method not allowed\"}").await?;
        }
        _ => {
            write_json(&mut stream, "404 Not Found", b"{\"error\":\"not found\"}").await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let port = resolve_port(args.port);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "lab-server listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!(%peer, "accepted connection");
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream).await {
                tracing::warn!(%err, "connection handling failed");
            }
        });
    }
}
