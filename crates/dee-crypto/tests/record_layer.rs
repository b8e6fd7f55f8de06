//! End-to-end properties of the handshake and the dual-mode record layer.

use dee_crypto::handshake::{handshake_complete, handshake_init, handshake_resp};
use dee_crypto::schedule::set_rekey_every_for_test;
use dee_crypto::{DeeError, Mode};

fn established_pair(mode: Mode) -> (dee_crypto::Session, dee_crypto::Session) {
    let (state, init_msg) = handshake_init(mode);
    let (resp_session, resp_msg) = handshake_resp(mode, &init_msg).unwrap();
    let init_session = handshake_complete(state, &resp_msg).unwrap();
    (init_session, resp_session)
}

#[test]
fn safe_round_trip_with_associated_data() {
    let (mut tx, mut rx) = established_pair(Mode::Safe);
    let ad = b"associated data";
    let ct = tx.encrypt(b"hello there", ad).unwrap();

    let header = rx.wire_header(0);
    let mut ad_bytes = header.to_vec();
    ad_bytes.extend_from_slice(ad);
    let pt = rx.decrypt(&ct, &ad_bytes).unwrap();
    assert_eq!(pt, b"hello there");
}

#[test]
fn safe_nonces_and_ciphertexts_diverge_across_counters() {
    let (mut tx, _rx) = established_pair(Mode::Safe);
    let ct0 = tx.encrypt(b"same plaintext!!", &[]).unwrap();
    let ct1 = tx.encrypt(b"same plaintext!!", &[]).unwrap();
    assert_ne!(ct0, ct1);
}

#[test]
fn safe_different_ad_yields_different_ciphertext() {
    // Same keys and session id, same counter (0) on both sessions, so AD
    // is the only thing that can account for a ciphertext difference.
    let session_id = [3u8; 32];
    let k_ms = [9u8; 32];
    let mut tx_a = dee_crypto::Session::from_master_secret_for_test(Mode::Safe, session_id, k_ms);
    let mut tx_b = dee_crypto::Session::from_master_secret_for_test(Mode::Safe, session_id, k_ms);

    let ct_a = tx_a.encrypt(b"fixed plaintext!", b"ad-one").unwrap();
    let ct_b = tx_b.encrypt(b"fixed plaintext!", b"ad-two").unwrap();
    assert_ne!(ct_a, ct_b);
}

#[test]
fn safe_bit_flip_is_rejected() {
    let (mut tx, mut rx) = established_pair(Mode::Safe);
    let mut ct = tx.encrypt(b"do not tamper", &[]).unwrap();
    let header = rx.wire_header(0);

    let last = ct.len() - 1;
    ct[last] ^= 0x01;
    let err = rx.decrypt(&ct, &header).unwrap_err();
    assert_eq!(err, DeeError::DecryptFailure);
}

#[test]
fn safe_rejects_a_second_decrypt_of_the_same_record() {
    let (mut tx, mut rx) = established_pair(Mode::Safe);
    let ct = tx.encrypt(b"only once", &[]).unwrap();
    let header = rx.wire_header(0);

    assert!(rx.decrypt(&ct, &header).is_ok());
    let err = rx.decrypt(&ct, &header).unwrap_err();
    assert_eq!(err, DeeError::DecryptFailure);
}

#[test]
fn independent_handshakes_produce_different_session_ids() {
    let (tx_a, _rx_a) = established_pair(Mode::Safe);
    let (tx_b, _rx_b) = established_pair(Mode::Safe);
    assert_ne!(tx_a.session_id(), tx_b.session_id());
}

#[test]
fn safe_and_naive_handshakes_produce_different_session_ids() {
    let (tx_safe, _) = established_pair(Mode::Safe);
    let (tx_naive, _) = established_pair(Mode::Naive);
    assert_ne!(tx_safe.session_id(), tx_naive.session_id());
}

#[test]
fn naive_replay_is_accepted_and_yields_the_same_plaintext() {
    let (mut tx, mut rx) = established_pair(Mode::Naive);
    let ct = tx.encrypt(b"replay me", &[]).unwrap();
    let header = rx.wire_header(0);

    let pt1 = rx.decrypt(&ct, &header).unwrap();
    let pt2 = rx.decrypt(&ct, &header).unwrap();
    assert_eq!(pt1, pt2);
    assert_eq!(pt1, b"replay me");
}

#[test]
fn naive_accepts_a_twelve_byte_caller_nonce_but_safe_does_not() {
    let (mut tx_naive, _) = established_pair(Mode::Naive);
    let nonce = [0x41u8; 12];
    assert!(tx_naive.encrypt_naive_with_nonce(b"ok", &[], &nonce).is_ok());

    let (mut tx_safe, _) = established_pair(Mode::Safe);
    let err = tx_safe.encrypt_naive_with_nonce(b"nope", &[], &nonce).unwrap_err();
    assert_eq!(err, DeeError::DecryptFailure);

    let bad_nonce = [0x41u8; 8];
    let (mut tx_naive2, _) = established_pair(Mode::Naive);
    let err = tx_naive2.encrypt_naive_with_nonce(b"nope", &[], &bad_nonce).unwrap_err();
    assert_eq!(err, DeeError::DecryptFailure);
}

fn ratchet_round_trips_at_boundary(mode: Mode, rekey_every: u64) {
    set_rekey_every_for_test(rekey_every);
    let (mut tx, mut rx) = established_pair(mode);

    for i in 0..(rekey_every * 2 + 2) {
        let plaintext = format!("message {i}");
        let ct = tx.encrypt(plaintext.as_bytes(), &[]).unwrap();
        let header = rx.wire_header(i);
        let pt = rx.decrypt(&ct, &header).unwrap();
        assert_eq!(pt, plaintext.as_bytes());
    }
    set_rekey_every_for_test(0); // restore the default for subsequent tests
}

#[test]
fn ratchets_across_small_boundaries_without_dropping_messages() {
    ratchet_round_trips_at_boundary(Mode::Safe, 5);
}

#[test]
fn ratchets_across_a_mid_sized_boundary() {
    ratchet_round_trips_at_boundary(Mode::Safe, 32);
}

#[test]
fn ratchets_at_the_default_boundary() {
    ratchet_round_trips_at_boundary(Mode::Safe, 1000);
}

#[test]
fn naive_mode_also_advances_counter_rx_and_ratchets() {
    // Regression test: NAIVE decrypt must still increment counter_rx and
    // ratchet on schedule even though it never checks the counter against
    // the header — only the auditing, not the bookkeeping, is SAFE-only.
    ratchet_round_trips_at_boundary(Mode::Naive, 5);
}

#[test]
fn naive_counter_rx_advances_on_every_decrypt() {
    set_rekey_every_for_test(1000);
    let (mut tx, mut rx) = established_pair(Mode::Naive);
    assert_eq!(rx.counter_rx(), 0);

    for i in 0..3u64 {
        let ct = tx.encrypt(b"message", &[]).unwrap();
        let header = rx.wire_header(i);
        rx.decrypt(&ct, &header).unwrap();
        assert_eq!(rx.counter_rx(), i + 1);
    }
    set_rekey_every_for_test(0);
}

#[test]
fn frame_round_trip_accounts_for_the_already_incremented_counter() {
    let (mut tx, mut rx) = established_pair(Mode::Safe);
    let frame = tx.encrypt_to_frame(b"framed message", &[]).unwrap();
    let pt = rx.decrypt_from_frame(&frame).unwrap();
    assert_eq!(pt, b"framed message");
}
