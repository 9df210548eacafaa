// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

use crate::tests::*;

use std::sync::Arc;

use crate::config::EcConfig;
use crate::object::ObjectStore;
use crate::tests::util::{CountingBackend, FullStore};
use crate::token::Token;

use serial_test::parallel;

#[test]
#[parallel]
fn test_key_roles() {
    let testtokn = TestToken::with_keys();
    let mut session = testtokn.session();
    let ecdsa = Mechanism::new(CKM_ECDSA_SHA256);

    /* public keys can not sign, private keys can not verify */
    assert_rv(
        session.sign_init(&ecdsa, P256_PUB),
        CKR_KEY_FUNCTION_NOT_PERMITTED,
    );
    assert_rv(
        session.verify_init(&ecdsa, P256_PRIV),
        CKR_KEY_FUNCTION_NOT_PERMITTED,
    );

    /* usage flag turned off */
    assert_rv(
        session.sign_init(&ecdsa, NO_SIGN_PRIV),
        CKR_KEY_FUNCTION_NOT_PERMITTED,
    );

    /* right class, wrong key type */
    assert_rv(
        session.sign_init(&ecdsa, NOT_EC_PRIV),
        CKR_KEY_TYPE_INCONSISTENT,
    );

    /* unknown handle */
    assert_rv(session.sign_init(&ecdsa, 99), CKR_KEY_HANDLE_INVALID);
    assert_kind(
        session.verify_init(&ecdsa, CK_INVALID_HANDLE),
        ErrorKind::KeyHandleInvalid,
    );

    assert!(!session.sign_active());
    assert!(!session.verify_active());
    assert_eq!(testtokn.backend.signed(), 0);
    assert_eq!(testtokn.backend.verified(), 0);
    assert_eq!(testtokn.backend.released(), 0);

    /* a failed init does not block a good one */
    session.sign_init(&ecdsa, P256_PRIV).unwrap();
    assert!(session.sign_active());
    assert_rv(session.sign_init(&ecdsa, P256_PRIV), CKR_OPERATION_ACTIVE);
}

#[test]
#[parallel]
fn test_key_pair_generation() {
    let testtokn = TestToken::new();
    let mut session = testtokn.session();

    for (curve, point_len) in
        [(P256_PARAMS, 65), (P384_PARAMS, 97), (K256_PARAMS, 65)]
    {
        let keys = testtokn.keygen(&mut session, &params(curve));
        assert_ne!(keys.public, keys.private);

        let public = testtokn.store.resolve_handle(keys.public).unwrap();
        assert_eq!(public.get_class().unwrap(), CKO_PUBLIC_KEY);
        assert_eq!(public.get_attr_as_ulong(CKA_KEY_TYPE).unwrap(), CKK_EC);
        assert!(public.get_attr_as_bool(CKA_VERIFY).unwrap());
        assert!(public.get_attr_as_bool(CKA_LOCAL).unwrap());
        let point = crate::ec::get_ec_point_from_obj(&public).unwrap();
        assert_eq!(point.len(), point_len);
        assert_eq!(point[0], 0x04);

        let private = testtokn.store.resolve_handle(keys.private).unwrap();
        assert_eq!(private.get_class().unwrap(), CKO_PRIVATE_KEY);
        assert_eq!(
            private.get_attr_as_bytes(CKA_EC_PARAMS).unwrap(),
            &params(curve)
        );
        assert_eq!(private.get_attr_as_string(CKA_LABEL).unwrap(), "test");
        assert!(private.get_attr_as_bool(CKA_SIGN).unwrap());
        assert!(private.get_attr_as_bool(CKA_SENSITIVE).unwrap());
        assert!(!private.get_attr_as_bool(CKA_EXTRACTABLE).unwrap());
        assert_eq!(
            private.get_attr_as_ulong(CKA_KEY_GEN_MECHANISM).unwrap(),
            CKM_EC_KEY_PAIR_GEN
        );
    }
    assert_eq!(testtokn.backend.generated(), 3);
    assert_eq!(testtokn.store.len(), 6);
}

#[test]
#[parallel]
fn test_key_pair_templates() {
    let testtokn = TestToken::new();
    let mut session = testtokn.session();
    let mech = Mechanism::new(CKM_EC_KEY_PAIR_GEN);
    let ec_params = Attribute::from_bytes(CKA_EC_PARAMS, params(P256_PARAMS));

    /* no curve */
    assert_rv(
        session.generate_key_pair(&mech, &[], &[]),
        CKR_TEMPLATE_INCOMPLETE,
    );

    /* conflicting class */
    assert_rv(
        session.generate_key_pair(
            &mech,
            &[ec_params.clone()],
            &[Attribute::from_ulong(CKA_CLASS, CKO_SECRET_KEY)],
        ),
        CKR_TEMPLATE_INCONSISTENT,
    );

    /* key material can not be imported through generation */
    assert_rv(
        session.generate_key_pair(
            &mech,
            &[ec_params.clone()],
            &[Attribute::from_bytes(CKA_VALUE, vec![1; 32])],
        ),
        CKR_ATTRIBUTE_VALUE_INVALID,
    );

    /* secp521r1 */
    assert_rv(
        session.generate_key_pair(
            &mech,
            &[Attribute::from_bytes(CKA_EC_PARAMS, params("06052b81040023"))],
            &[],
        ),
        CKR_CURVE_NOT_SUPPORTED,
    );

    /* wrong mechanism */
    assert_rv(
        session.generate_key_pair(
            &Mechanism::new(CKM_ECDSA),
            &[ec_params.clone()],
            &[],
        ),
        CKR_MECHANISM_INVALID,
    );

    assert_eq!(testtokn.backend.generated(), 0);
    assert!(testtokn.store.is_empty());

    /* explicit usage flags are honored */
    let (_, private) = session
        .generate_key_pair(
            &mech,
            &[ec_params],
            &[
                Attribute::from_bool(CKA_SIGN, false),
                Attribute::from_bool(CKA_EXTRACTABLE, true),
            ],
        )
        .unwrap();
    let obj = testtokn.store.resolve_handle(private).unwrap();
    assert!(!obj.get_attr_as_bool(CKA_SIGN).unwrap());
    assert!(obj.get_attr_as_bool(CKA_EXTRACTABLE).unwrap());
    assert_rv(
        session.sign_init(&Mechanism::new(CKM_ECDSA), private),
        CKR_KEY_FUNCTION_NOT_PERMITTED,
    );
}

#[test]
#[parallel]
fn test_curve_restriction() {
    let mut config = Config::default();
    config.ec = EcConfig {
        legacy_sha1_digest: false,
        curves: Some(vec!["prime256v1".to_string()]),
    };
    let testtokn = TestToken::with_config(&config);
    let mut session = testtokn.session();
    let mech = Mechanism::new(CKM_EC_KEY_PAIR_GEN);

    assert_rv(
        session.generate_key_pair(
            &mech,
            &[Attribute::from_bytes(CKA_EC_PARAMS, params(P384_PARAMS))],
            &[],
        ),
        CKR_CURVE_NOT_SUPPORTED,
    );
    assert_eq!(testtokn.backend.generated(), 0);

    testtokn.keygen(&mut session, &params(P256_PARAMS));
    assert_eq!(testtokn.backend.generated(), 1);
}

#[test]
#[parallel]
fn test_key_pair_store_failure() {
    let backend = Arc::new(CountingBackend::new());
    let store = Arc::new(FullStore::new(1));
    let token =
        Token::with_backend(backend.clone(), store.clone(), &Config::default());
    let mut session = token.open_session().unwrap();

    /* the public key fits, the private key does not */
    assert_rv(
        session.generate_key_pair(
            &Mechanism::new(CKM_EC_KEY_PAIR_GEN),
            &[Attribute::from_bytes(CKA_EC_PARAMS, params(P256_PARAMS))],
            &[],
        ),
        CKR_DEVICE_MEMORY,
    );
    assert_eq!(backend.generated(), 1);
    assert_eq!(store.len(), 0);
    assert_eq!(
        store
            .search(&[Attribute::from_ulong(CKA_CLASS, CKO_PUBLIC_KEY)])
            .unwrap(),
        Vec::<CK_OBJECT_HANDLE>::new()
    );
}
