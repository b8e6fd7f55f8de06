//! Wire framing: fixed 44-byte record header, InitMsg/RespMsg framing, and
//! the optional 4-byte length prefix used for stream framing.

use crate::error::DeeError;
use crate::mode::Mode;

pub const VERSION: u8 = 0x01;
pub const SESSION_ID_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;
pub const REKEY_EVERY_DEFAULT: u64 = 1000;

pub const HANDSHAKE_TYPE_INIT: u8 = 0x01;
pub const HANDSHAKE_TYPE_RESP: u8 = 0x02;

pub const X25519_PUB_SIZE: usize = 32;
pub const KYBER_PUB_SIZE: usize = 1184;
pub const KYBER_CT_SIZE: usize = 1088;

/// version(1) + mode(1) + session_id(32) + counter(8) + flags(2)
pub const HEADER_SIZE: usize = 44;
/// header(44) + payload_len(4)
pub const FRAME_OVERHEAD: usize = 48;

pub const INIT_MSG_SIZE: usize = 1 + 1 + 1 + X25519_PUB_SIZE + KYBER_PUB_SIZE;
pub const RESP_MSG_SIZE: usize = 1 + 1 + 1 + X25519_PUB_SIZE + KYBER_CT_SIZE;

/// Build the 44-byte record header for `counter` in a session identified by
/// `session_id`, bound to `mode`.
pub fn build_header(mode: Mode, session_id: &[u8; 32], counter: u64, flags: u16) -> [u8; HEADER_SIZE] {
    let mut b = [0u8; HEADER_SIZE];
    b[0] = VERSION;
    b[1] = mode.as_byte();
    b[2..34].copy_from_slice(session_id);
    b[34..42].copy_from_slice(&counter.to_be_bytes());
    b[42..44].copy_from_slice(&flags.to_be_bytes());
    b
}

pub struct ParsedHeader {
    pub version: u8,
    pub mode: u8,
    pub session_id: [u8; 32],
    pub counter: u64,
    pub flags: u16,
}

pub fn parse_header(b: &[u8]) -> Result<ParsedHeader, DeeError> {
    if b.len() < HEADER_SIZE {
        return Err(DeeError::DecryptFailure);
    }
    let mut session_id = [0u8; 32];
    session_id.copy_from_slice(&b[2..34]);
    Ok(ParsedHeader {
        version: b[0],
        mode: b[1],
        session_id,
        counter: u64::from_be_bytes(b[34..42].try_into().unwrap()),
        flags: u16::from_be_bytes(b[42..44].try_into().unwrap()),
    })
}

/// `[version(1) | mode(1) | type=0x01(1) | x25519_pub(32) | kyber_pub(1184)]`
pub fn build_init_msg(mode: Mode, x25519_pub: &[u8; 32], kyber_pub: &[u8]) -> Vec<u8> {
    let mut b = Vec::with_capacity(INIT_MSG_SIZE);
    b.push(VERSION);
    b.push(mode.as_byte());
    b.push(HANDSHAKE_TYPE_INIT);
    b.extend_from_slice(x25519_pub);
    b.extend_from_slice(kyber_pub);
    b
}

pub struct ParsedInitMsg {
    pub version: u8,
    pub mode: u8,
    pub x25519_pub: [u8; 32],
    pub kyber_pub: Vec<u8>,
}

pub fn parse_init_msg(b: &[u8]) -> Result<ParsedInitMsg, DeeError> {
    if b.len() != INIT_MSG_SIZE || b[2] != HANDSHAKE_TYPE_INIT {
        return Err(DeeError::HandshakeFailure);
    }
    let mut x25519_pub = [0u8; 32];
    x25519_pub.copy_from_slice(&b[3..3 + X25519_PUB_SIZE]);
    let kyber_pub = b[3 + X25519_PUB_SIZE..].to_vec();
    Ok(ParsedInitMsg {
        version: b[0],
        mode: b[1],
        x25519_pub,
        kyber_pub,
    })
}

/// `[version(1) | mode(1) | type=0x02(1) | x25519_pub(32) | kyber_ct(1088)]`
pub fn build_resp_msg(mode: Mode, x25519_pub: &[u8; 32], kyber_ct: &[u8]) -> Vec<u8> {
    let mut b = Vec::with_capacity(RESP_MSG_SIZE);
    b.push(VERSION);
    b.push(mode.as_byte());
    b.push(HANDSHAKE_TYPE_RESP);
    b.extend_from_slice(x25519_pub);
    b.extend_from_slice(kyber_ct);
    b
}

pub struct ParsedRespMsg {
    pub version: u8,
    pub mode: u8,
    pub x25519_pub: [u8; 32],
    pub kyber_ct: Vec<u8>,
}

pub fn parse_resp_msg(b: &[u8]) -> Result<ParsedRespMsg, DeeError> {
    if b.len() != RESP_MSG_SIZE || b[2] != HANDSHAKE_TYPE_RESP {
        return Err(DeeError::HandshakeFailure);
    }
    let mut x25519_pub = [0u8; 32];
    x25519_pub.copy_from_slice(&b[3..3 + X25519_PUB_SIZE]);
    let kyber_ct = b[3 + X25519_PUB_SIZE..].to_vec();
    Ok(ParsedRespMsg {
        version: b[0],
        mode: b[1],
        x25519_pub,
        kyber_ct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let sid = [7u8; 32];
        let h = build_header(Mode::Safe, &sid, 9000, 0);
        assert_eq!(h.len(), HEADER_SIZE);
        let parsed = parse_header(&h).unwrap();
        assert_eq!(parsed.version, VERSION);
        assert_eq!(parsed.mode, Mode::Safe.as_byte());
        assert_eq!(parsed.session_id, sid);
        assert_eq!(parsed.counter, 9000);
        assert_eq!(parsed.flags, 0);
    }

    #[test]
    fn init_msg_size_matches_the_wire_layout() {
        let pub_x = [1u8; 32];
        let kyber_pub = vec![2u8; KYBER_PUB_SIZE];
        let msg = build_init_msg(Mode::Safe, &pub_x, &kyber_pub);
        assert_eq!(msg.len(), 1219);
        assert_eq!(msg.len(), INIT_MSG_SIZE);
    }

    #[test]
    fn resp_msg_size_matches_the_wire_layout() {
        let pub_x = [1u8; 32];
        let kyber_ct = vec![2u8; KYBER_CT_SIZE];
        let msg = build_resp_msg(Mode::Safe, &pub_x, &kyber_ct);
        assert_eq!(msg.len(), 1123);
        assert_eq!(msg.len(), RESP_MSG_SIZE);
    }

    #[test]
    fn rejects_wrong_handshake_type() {
        let mut msg = build_init_msg(Mode::Safe, &[0u8; 32], &vec![0u8; KYBER_PUB_SIZE]);
        msg[2] = HANDSHAKE_TYPE_RESP;
        assert!(parse_init_msg(&msg).is_err());
    }
}
