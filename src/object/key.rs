// Copyright 2023-2026 Simo Sorce
// See LICENSE.txt file for terms

//! Key role validation performed before any signature operation binds a
//! key object.

use crate::error::{Error, Result};
use crate::mechanism::Direction;
use crate::pkcs11::*;

use super::{Object, ObjectStore};

use log::error;

/// The role a key object must play for an operation
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum KeyRole {
    /// A private key, required to produce signatures
    Signer,
    /// A public key, required to check signatures
    Verifier,
}

impl KeyRole {
    pub fn required_class(&self) -> CK_OBJECT_CLASS {
        match self {
            KeyRole::Signer => CKO_PRIVATE_KEY,
            KeyRole::Verifier => CKO_PUBLIC_KEY,
        }
    }

    /// The usage attribute that, when present, must be true
    pub fn usage_attribute(&self) -> CK_ATTRIBUTE_TYPE {
        match self {
            KeyRole::Signer => CKA_SIGN,
            KeyRole::Verifier => CKA_VERIFY,
        }
    }
}

impl From<Direction> for KeyRole {
    fn from(dir: Direction) -> KeyRole {
        match dir {
            Direction::Sign => KeyRole::Signer,
            Direction::Verify => KeyRole::Verifier,
        }
    }
}

/// Checks that the key object can play the requested role
///
/// A missing `CKA_CLASS` fails as an attribute-not-found error, a store
/// that cannot perform the lookup fails with `CKR_FUNCTION_FAILED` and a
/// class or usage mismatch fails with `CKR_KEY_FUNCTION_NOT_PERMITTED`.
/// Only reads are performed.
pub fn validate_role(
    store: &dyn ObjectStore,
    key: &Object,
    role: KeyRole,
) -> Result<()> {
    let class = match store.find_attribute(key, CKA_CLASS) {
        Ok(Some(a)) => a.to_ulong()?,
        Ok(None) => {
            error!("key object has no class attribute");
            return Err(Error::not_found(String::from("CKA_CLASS")));
        }
        Err(e) => {
            error!("class lookup failed: {}", e);
            return Err(Error::lookup_failed(e));
        }
    };
    if class != role.required_class() {
        error!(
            "key class 0x{:x} is not usable as {:?} (requires 0x{:x})",
            class,
            role,
            role.required_class()
        );
        return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?;
    }

    if let Some(a) = store
        .find_attribute(key, CKA_KEY_TYPE)
        .map_err(Error::lookup_failed)?
    {
        if a.to_ulong()? != CKK_EC {
            return Err(CKR_KEY_TYPE_INCONSISTENT)?;
        }
    }

    if let Some(a) = store
        .find_attribute(key, role.usage_attribute())
        .map_err(Error::lookup_failed)?
    {
        if !a.to_bool()? {
            error!("key usage attribute {} is false", a.name());
            return Err(CKR_KEY_FUNCTION_NOT_PERMITTED)?;
        }
    }
    Ok(())
}
