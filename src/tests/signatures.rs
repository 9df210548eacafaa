// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

use crate::tests::*;

use crate::hash;

use serial_test::parallel;

/* RFC 6979 A.2.5, P-256 with SHA-256 over "sample" */
const SAMPLE: &[u8] = b"sample";
const SAMPLE_SIG: &str =
    "efd48b2aacb6a8fd1140dd9cd45e81d69d2c877b56aaf991c34d0ea84eaf3716\
     f7cb1c942d657c41d436c7a1b6e29f65f3e900dbb9aff4064dc4ab2f843acda8";

fn sample_sig() -> Vec<u8> {
    hex::decode(SAMPLE_SIG).expect("failed to decode signature")
}

#[test]
#[parallel]
fn test_ecdsa_known_answer() {
    let testtokn = TestToken::with_keys();
    let mut session = testtokn.session();

    /* hash-then-verify */
    session
        .verify_init(&Mechanism::new(CKM_ECDSA_SHA256), P256_PUB)
        .unwrap();
    session.verify(SAMPLE, &sample_sig()).unwrap();
    assert!(!session.verify_active());

    /* raw verify of the digest */
    let digest = hash::digest(CKM_SHA256, SAMPLE).unwrap();
    session
        .verify_init(&Mechanism::new(CKM_ECDSA), P256_PUB)
        .unwrap();
    session.verify(&digest, &sample_sig()).unwrap();

    /* nonces are deterministic, so signing reproduces the vector */
    session
        .sign_init(&Mechanism::new(CKM_ECDSA), P256_PRIV)
        .unwrap();
    let mut signature = [0u8; 64];
    let len = session.sign(false, &digest, &mut signature).unwrap();
    assert_eq!(len, 64);
    assert_eq!(signature.to_vec(), sample_sig());
    assert!(!session.sign_active());

    assert_eq!(testtokn.backend.verified(), 2);
    assert_eq!(testtokn.backend.signed(), 1);
    /* the composite verify released both its nested and outer binding */
    assert_eq!(testtokn.backend.released(), 4);
}

#[test]
#[parallel]
fn test_ecdsa_sign_verify_curves() {
    let testtokn = TestToken::new();
    let mut session = testtokn.session();

    for (curve, siglen) in
        [(P256_PARAMS, 64), (P384_PARAMS, 96), (K256_PARAMS, 64)]
    {
        let keys = testtokn.keygen(&mut session, &params(curve));
        let data = b"plaintext to be signed";

        session
            .sign_init(&Mechanism::new(CKM_ECDSA_SHA384), keys.private)
            .unwrap();
        let len = session.sign(true, data, &mut []).unwrap();
        assert_eq!(len, siglen);
        let mut signature = vec![0u8; len];
        assert_eq!(session.sign(false, data, &mut signature).unwrap(), len);

        session
            .verify_init(&Mechanism::new(CKM_ECDSA_SHA384), keys.public)
            .unwrap();
        session.verify(data, &signature).unwrap();

        /* a single flipped bit must not verify */
        signature[len - 1] ^= 1;
        session
            .verify_init(&Mechanism::new(CKM_ECDSA_SHA384), keys.public)
            .unwrap();
        assert_rv(session.verify(data, &signature), CKR_SIGNATURE_INVALID);
        assert!(!session.verify_active());
    }
}

#[test]
#[parallel]
fn test_sign_length_negotiation() {
    let testtokn = TestToken::with_keys();
    let mut session = testtokn.session();
    let digest = hash::digest(CKM_SHA256, SAMPLE).unwrap();

    session
        .sign_init(&Mechanism::new(CKM_ECDSA), P256_PRIV)
        .unwrap();

    /* repeated length queries do not touch the backend */
    for _ in 0..3 {
        assert_eq!(session.sign(true, &digest, &mut []).unwrap(), 64);
        assert!(session.sign_active());
    }

    /* a short buffer is reported and the operation can be retried */
    let mut short = [0u8; 63];
    assert_rv(
        session.sign(false, &digest, &mut short),
        CKR_BUFFER_TOO_SMALL,
    );
    assert!(session.sign_active());
    assert_eq!(short, [0u8; 63]);
    assert_eq!(testtokn.backend.signed(), 0);
    assert_eq!(testtokn.backend.released(), 0);

    /* a larger buffer is fine, only the signature length is used */
    let mut signature = [0xffu8; 80];
    assert_eq!(session.sign(false, &digest, &mut signature).unwrap(), 64);
    assert_eq!(signature[..64].to_vec(), sample_sig());
    assert_eq!(signature[64..], [0xffu8; 16]);
    assert!(!session.sign_active());
    assert_eq!(testtokn.backend.signed(), 1);
    assert_eq!(testtokn.backend.released(), 1);

    /* the operation is over */
    assert_rv(
        session.sign(false, &digest, &mut signature),
        CKR_OPERATION_NOT_INITIALIZED,
    );
}

#[test]
#[parallel]
fn test_verify_signature_length() {
    let testtokn = TestToken::with_keys();
    let mut session = testtokn.session();
    let digest = hash::digest(CKM_SHA256, SAMPLE).unwrap();

    /* longer than the key can produce: rejected up front */
    let mut oversized = sample_sig();
    oversized.push(0);
    session
        .verify_init(&Mechanism::new(CKM_ECDSA), P256_PUB)
        .unwrap();
    assert_rv(
        session.verify(&digest, &oversized),
        CKR_SIGNATURE_LEN_RANGE,
    );
    assert!(!session.verify_active());
    assert_eq!(testtokn.backend.verified(), 0);
    assert_eq!(testtokn.backend.released(), 1);

    /* shorter is for the backend to judge */
    session
        .verify_init(&Mechanism::new(CKM_ECDSA), P256_PUB)
        .unwrap();
    assert_rv(
        session.verify(&digest, &sample_sig()[..63]),
        CKR_SIGNATURE_LEN_RANGE,
    );
    assert_eq!(testtokn.backend.verified(), 1);
    assert!(!session.verify_active());
}

#[test]
#[parallel]
fn test_backend_failure_ends_operation() {
    let testtokn = TestToken::with_keys();
    let mut session = testtokn.session();
    let digest = hash::digest(CKM_SHA256, SAMPLE).unwrap();

    testtokn.backend.fail_sign(true);
    session
        .sign_init(&Mechanism::new(CKM_ECDSA), P256_PRIV)
        .unwrap();
    let mut signature = [0u8; 64];
    assert_kind(
        session.sign(false, &digest, &mut signature),
        ErrorKind::BackendFailure,
    );
    assert!(!session.sign_active());
    assert_eq!(testtokn.backend.released(), 1);

    testtokn.backend.fail_sign(false);
    session
        .sign_init(&Mechanism::new(CKM_ECDSA), P256_PRIV)
        .unwrap();
    session.sign(false, &digest, &mut signature).unwrap();
    assert_eq!(testtokn.backend.signed(), 2);
    assert_eq!(testtokn.backend.released(), 2);
}

/* group orders of the curves whose signatures get flipped below */
const P256_ORDER: &str =
    "ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551";
const K256_ORDER: &str =
    "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";

/// Replaces s with n - s, the other valid signature for the same r
fn negate_s(signature: &mut [u8], order: &[u8]) {
    let s = &mut signature[order.len()..];
    let mut borrow = 0i16;
    for i in (0..order.len()).rev() {
        let mut d = order[i] as i16 - s[i] as i16 - borrow;
        borrow = 0;
        if d < 0 {
            d += 256;
            borrow = 1;
        }
        s[i] = d as u8;
    }
    assert_eq!(borrow, 0);
}

#[test]
#[parallel]
fn test_ecdsa_high_s_signatures() {
    let testtokn = TestToken::new();
    let mut session = testtokn.session();
    let digest = hash::digest(CKM_SHA256, b"either s will do").unwrap();

    for (curve, order) in [(P256_PARAMS, P256_ORDER), (K256_PARAMS, K256_ORDER)]
    {
        let order = hex::decode(order).unwrap();
        let keys = testtokn.keygen(&mut session, &params(curve));

        session
            .sign_init(&Mechanism::new(CKM_ECDSA), keys.private)
            .unwrap();
        let mut signature = [0u8; 64];
        session.sign(false, &digest, &mut signature).unwrap();

        let mut flipped = signature;
        negate_s(&mut flipped, &order);
        assert_ne!(flipped, signature);

        session
            .verify_init(&Mechanism::new(CKM_ECDSA), keys.public)
            .unwrap();
        session.verify(&digest, &flipped).unwrap();

        /* and through the composite path */
        session
            .verify_init(&Mechanism::new(CKM_ECDSA_SHA256), keys.public)
            .unwrap();
        session.verify(b"either s will do", &flipped).unwrap();

        /* a flipped r is still rejected */
        flipped[0] ^= 0x01;
        session
            .verify_init(&Mechanism::new(CKM_ECDSA), keys.public)
            .unwrap();
        assert_rv(session.verify(&digest, &flipped), CKR_SIGNATURE_INVALID);
    }
}
