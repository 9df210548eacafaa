// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

//! The cryptographic backend interface.
//!
//! The mechanism layer never performs curve arithmetic itself: key pair
//! generation, raw signature creation and verification are delegated to
//! a [Backend] selected at configuration time and injected into the
//! token. Implementations may be shared by every session of a token and
//! are therefore required to be `Send + Sync`.

use std::fmt::Debug;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::object::Object;
use crate::pkcs11::*;

pub mod soft;

pub use soft::SoftBackend;

pub trait Backend: Debug + Send + Sync {
    /// A short name used in diagnostics
    fn name(&self) -> &str;

    /// Generates a new key pair.
    ///
    /// Both objects arrive populated from the caller templates, the
    /// public one carries `CKA_EC_PARAMS`. On success the backend has set
    /// `CKA_EC_POINT` on the public key and `CKA_VALUE` (or whatever
    /// handle it needs to find the key again) on the private key.
    fn generate_keypair(
        &self,
        public: &mut Object,
        private: &mut Object,
    ) -> Result<()>;

    /// Produces a raw `r || s` signature of `input` with the private key
    fn sign(&self, key: &Object, input: &[u8]) -> Result<Vec<u8>>;

    /// Checks a raw `r || s` signature of `input` with the public key.
    ///
    /// A signature that does not verify fails with
    /// `CKR_SIGNATURE_INVALID`.
    fn verify(&self, key: &Object, input: &[u8], signature: &[u8])
        -> Result<()>;

    /// Releases any per-operation state held for `key`.
    ///
    /// Called exactly once for every operation context bound to the key
    /// when that context is cleared.
    fn release(&self, _key: &Object) {}
}

/// Name of the built in software backend
pub const SOFTWARE_BACKEND: &str = "software";

/// Builds the backend named by the configuration
pub fn from_config(config: &Config) -> Result<Arc<dyn Backend>> {
    match config.backend.name.as_str() {
        SOFTWARE_BACKEND => Ok(Arc::new(SoftBackend::new())),
        name => Err(Error::ck_rv_with_errmsg(
            CKR_ARGUMENTS_BAD,
            format!("unknown backend '{}'", name),
        )),
    }
}
