// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

use std::sync::Arc;

use crate::attribute::Attribute;
use crate::config::Config;
use crate::error::{ErrorKind, Result};
use crate::mechanism::Mechanism;
use crate::pkcs11::*;
use crate::session::Session;
use crate::storage::MemoryStore;
use crate::token::Token;

use hex;

mod util;
use util::*;

mod keys;
mod signatures;

const TEST_KEYS: &str = "testdata/ecdsa_keys.json";

/* Handles assigned to the objects of TEST_KEYS, in file order */
const P256_PUB: CK_OBJECT_HANDLE = 1;
const P256_PRIV: CK_OBJECT_HANDLE = 2;
const NOT_EC_PRIV: CK_OBJECT_HANDLE = 3;
const NO_SIGN_PRIV: CK_OBJECT_HANDLE = 4;

struct TestToken {
    backend: Arc<CountingBackend>,
    store: Arc<MemoryStore>,
    token: Arc<Token>,
}

impl TestToken {
    fn new() -> TestToken {
        Self::with_config(&Config::default())
    }

    fn with_config(config: &Config) -> TestToken {
        crate::log::init();
        let backend = Arc::new(CountingBackend::new());
        let store = Arc::new(MemoryStore::new());
        let token =
            Token::with_backend(backend.clone(), store.clone(), config);
        TestToken {
            backend: backend,
            store: store,
            token: token,
        }
    }

    /// A token primed with the objects of the test keys file
    fn with_keys() -> TestToken {
        let testtokn = Self::new();
        let handles = testtokn.store.load_json(TEST_KEYS).unwrap();
        assert_eq!(
            handles,
            vec![P256_PUB, P256_PRIV, NOT_EC_PRIV, NO_SIGN_PRIV]
        );
        testtokn
    }

    fn session(&self) -> Session {
        self.token.open_session().unwrap()
    }

    fn keygen(&self, session: &mut Session, curve: &[u8]) -> KeyPair {
        let (public, private) = session
            .generate_key_pair(
                &Mechanism::new(CKM_EC_KEY_PAIR_GEN),
                &[Attribute::from_bytes(CKA_EC_PARAMS, curve.to_vec())],
                &[Attribute::from_string(CKA_LABEL, "test".to_string())],
            )
            .unwrap();
        KeyPair {
            public: public,
            private: private,
        }
    }
}

struct KeyPair {
    public: CK_OBJECT_HANDLE,
    private: CK_OBJECT_HANDLE,
}

/* DER ECParameters for the supported curves */
const P256_PARAMS: &str = "06082a8648ce3d030107";
const P384_PARAMS: &str = "06052b81040022";
const K256_PARAMS: &str = "06052b8104000a";

fn params(hexstr: &str) -> Vec<u8> {
    hex::decode(hexstr).expect("failed to decode params")
}

fn assert_rv<T: std::fmt::Debug>(res: Result<T>, rv: CK_RV) {
    match res {
        Ok(r) => panic!("expected 0x{:x}, got Ok({:?})", rv, r),
        Err(e) => assert_eq!(e.rv(), rv, "unexpected error: {}", e),
    }
}

fn assert_kind<T: std::fmt::Debug>(res: Result<T>, kind: ErrorKind) {
    match res {
        Ok(r) => panic!("expected {:?}, got Ok({:?})", kind, r),
        Err(e) => assert_eq!(e.kind(), kind, "unexpected error: {}", e),
    }
}
