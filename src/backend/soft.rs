// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

//! Software backend built on the RustCrypto ECDSA implementations.

use std::fmt::Display;

use crate::attribute::Attribute;
use crate::backend::Backend;
use crate::ec::{
    get_curve_from_obj, get_ec_point_from_obj, point_to_der, EcCurve,
};
use crate::error::{device_error, Error, Result};
use crate::object::Object;
use crate::pkcs11::*;

use log::{error, trace};

fn backend_error<E: Display>(e: E) -> Error {
    device_error(e.to_string())
}

/// Left pads a prehash shorter than the field size with zeros.
///
/// The value interpreted as an integer is unchanged, this only avoids
/// the minimum prehash length enforced by the signers.
fn pad_prehash(input: &[u8], size: usize) -> Vec<u8> {
    if input.len() >= size {
        return input.to_vec();
    }
    let mut padded = vec![0u8; size - input.len()];
    padded.extend_from_slice(input);
    padded
}

macro_rules! curve_ops {
    ($name:ident, $krate:ident) => {
        mod $name {
            use super::*;
            use $krate::ecdsa::signature::hazmat::{
                PrehashSigner, PrehashVerifier,
            };
            use $krate::ecdsa::{Signature, SigningKey, VerifyingKey};

            /// Returns the (private scalar, uncompressed point) pair
            pub fn generate() -> Result<(Vec<u8>, Vec<u8>)> {
                let sk = SigningKey::random(&mut rand_core::OsRng);
                let point = sk.verifying_key().to_encoded_point(false);
                Ok((sk.to_bytes().to_vec(), point.as_bytes().to_vec()))
            }

            pub fn sign(value: &[u8], prehash: &[u8]) -> Result<Vec<u8>> {
                let sk = SigningKey::from_slice(value).map_err(|e| {
                    Error::ck_rv_with_errmsg(
                        CKR_KEY_HANDLE_INVALID,
                        e.to_string(),
                    )
                })?;
                let sig: Signature =
                    sk.sign_prehash(prehash).map_err(backend_error)?;
                Ok(sig.to_bytes().to_vec())
            }

            pub fn verify(
                point: &[u8],
                prehash: &[u8],
                signature: &[u8],
            ) -> Result<()> {
                let vk = VerifyingKey::from_sec1_bytes(point)
                    .map_err(backend_error)?;
                let sig = match Signature::from_slice(signature) {
                    Ok(s) => s,
                    Err(_) => return Err(CKR_SIGNATURE_INVALID)?,
                };
                /* both s and n - s are valid, the verifiers only take
                 * the low one */
                let sig = sig.normalize_s().unwrap_or(sig);
                match vk.verify_prehash(prehash, &sig) {
                    Ok(()) => Ok(()),
                    Err(_) => Err(CKR_SIGNATURE_INVALID)?,
                }
            }
        }
    };
}

curve_ops!(p256_ops, p256);
curve_ops!(p384_ops, p384);
curve_ops!(k256_ops, k256);

/// The built in software implementation of the EC primitives
#[derive(Debug, Default)]
pub struct SoftBackend {}

impl SoftBackend {
    pub fn new() -> SoftBackend {
        SoftBackend {}
    }
}

impl Backend for SoftBackend {
    fn name(&self) -> &str {
        super::SOFTWARE_BACKEND
    }

    fn generate_keypair(
        &self,
        public: &mut Object,
        private: &mut Object,
    ) -> Result<()> {
        let curve = get_curve_from_obj(public)?;
        let (value, point) = match curve {
            EcCurve::P256 => p256_ops::generate()?,
            EcCurve::P384 => p384_ops::generate()?,
            EcCurve::Secp256k1 => k256_ops::generate()?,
        };
        trace!("generated {} key pair", curve.name());
        public.set_attr(Attribute::from_bytes(
            CKA_EC_POINT,
            point_to_der(&point)?,
        ))?;
        private.set_attr(Attribute::from_bytes(CKA_VALUE, value))?;
        Ok(())
    }

    fn sign(&self, key: &Object, input: &[u8]) -> Result<Vec<u8>> {
        let curve = get_curve_from_obj(key)?;
        let value = key.get_attr_as_bytes(CKA_VALUE).map_err(|e| {
            error!("private key value is not available: {}", e);
            Error::ck_rv_from_error(CKR_KEY_HANDLE_INVALID, e)
        })?;
        let prehash = pad_prehash(input, curve.key_size());
        match curve {
            EcCurve::P256 => p256_ops::sign(value, &prehash),
            EcCurve::P384 => p384_ops::sign(value, &prehash),
            EcCurve::Secp256k1 => k256_ops::sign(value, &prehash),
        }
    }

    fn verify(
        &self,
        key: &Object,
        input: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        let curve = get_curve_from_obj(key)?;
        if signature.len() != curve.signature_size() {
            return Err(CKR_SIGNATURE_LEN_RANGE)?;
        }
        let point = get_ec_point_from_obj(key)?;
        let prehash = pad_prehash(input, curve.key_size());
        match curve {
            EcCurve::P256 => p256_ops::verify(&point, &prehash, signature),
            EcCurve::P384 => p384_ops::verify(&point, &prehash, signature),
            EcCurve::Secp256k1 => {
                k256_ops::verify(&point, &prehash, signature)
            }
        }
    }

    fn release(&self, key: &Object) {
        trace!("released context for key {}", key.get_handle());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_prehash_is_left_padded() {
        assert_eq!(pad_prehash(&[1, 2], 4), vec![0, 0, 1, 2]);
        assert_eq!(pad_prehash(&[1, 2, 3, 4, 5], 4), vec![1, 2, 3, 4, 5]);
    }
}
