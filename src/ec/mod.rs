// Copyright 2023 - 2024 Simo Sorce, Jakub Jelen
// See LICENSE.txt file for terms

//! This module provides the Elliptic Curve helpers shared by the ECDSA
//! mechanisms: curve identification from `CKA_EC_PARAMS`, field and
//! signature sizes, and access to the encoded public point.

use crate::error::{Error, Result};
use crate::object::Object;
use crate::pkcs11::*;

use asn1;

pub mod ecdsa;

/* Bit sizes for curves */
pub const BITS_SECP256R1: usize = 256;
pub const BITS_SECP384R1: usize = 384;
pub const BITS_SECP256K1: usize = 256;

/* Curve names as used in CurveName PrintableString */
pub const PRIME256V1: &str = "prime256v1";
pub const SECP384R1: &str = "secp384r1";
pub const SECP256K1: &str = "secp256k1";

pub const EC_SECP256R1: asn1::ObjectIdentifier =
    asn1::oid!(1, 2, 840, 10045, 3, 1, 7);
pub const EC_SECP384R1: asn1::ObjectIdentifier = asn1::oid!(1, 3, 132, 0, 34);
pub const EC_SECP256K1: asn1::ObjectIdentifier = asn1::oid!(1, 3, 132, 0, 10);

/// Defined in ANSI X9.62
///
/// The CHOICE of explicit parameters is not supported
#[derive(asn1::Asn1Read, asn1::Asn1Write)]
pub enum ECParameters<'a> {
    /// Aka namedCurve, an oid that identifies the curve
    OId(asn1::ObjectIdentifier),

    /// Aka implicitCurve, never accepted
    ImplicitlyCA(asn1::Null),

    /// Identifies the curve via its standard printable name
    CurveName(asn1::PrintableString<'a>),
}

/// The curves the token knows how to operate on
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EcCurve {
    P256,
    P384,
    Secp256k1,
}

impl EcCurve {
    /// Maps a curve OID to the curve
    pub fn from_oid(oid: &asn1::ObjectIdentifier) -> Result<EcCurve> {
        match oid {
            &EC_SECP256R1 => Ok(EcCurve::P256),
            &EC_SECP384R1 => Ok(EcCurve::P384),
            &EC_SECP256K1 => Ok(EcCurve::Secp256k1),
            _ => Err(CKR_CURVE_NOT_SUPPORTED)?,
        }
    }

    /// Maps a curve name to the curve
    pub fn from_name(name: &str) -> Result<EcCurve> {
        match name {
            PRIME256V1 => Ok(EcCurve::P256),
            SECP384R1 => Ok(EcCurve::P384),
            SECP256K1 => Ok(EcCurve::Secp256k1),
            _ => Err(CKR_CURVE_NOT_SUPPORTED)?,
        }
    }

    pub fn oid(&self) -> asn1::ObjectIdentifier {
        match self {
            EcCurve::P256 => EC_SECP256R1,
            EcCurve::P384 => EC_SECP384R1,
            EcCurve::Secp256k1 => EC_SECP256K1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EcCurve::P256 => PRIME256V1,
            EcCurve::P384 => SECP384R1,
            EcCurve::Secp256k1 => SECP256K1,
        }
    }

    pub fn bits(&self) -> usize {
        match self {
            EcCurve::P256 => BITS_SECP256R1,
            EcCurve::P384 => BITS_SECP384R1,
            EcCurve::Secp256k1 => BITS_SECP256K1,
        }
    }

    /// Size in bytes of a field element and of the private scalar
    pub fn key_size(&self) -> usize {
        (self.bits() + 7) / 8
    }

    /// Size of the uncompressed SEC1 point
    pub fn point_size(&self) -> usize {
        2 * self.key_size() + 1
    }

    /// Size of a raw `r || s` signature
    pub fn signature_size(&self) -> usize {
        2 * self.key_size()
    }

    /// DER encoded ECParameters naming this curve
    pub fn ec_params(&self) -> Result<Vec<u8>> {
        let params = ECParameters::OId(self.oid());
        Ok(asn1::write_single(&params).map_err(|_| CKR_GENERAL_ERROR)?)
    }
}

/// Parses DER encoded ECParameters to the curve they identify
pub fn curve_from_ec_params(params: &[u8]) -> Result<EcCurve> {
    let ecp = asn1::parse_single::<ECParameters>(params).map_err(|e| {
        Error::ck_rv_from_error(CKR_ATTRIBUTE_VALUE_INVALID, e)
    })?;
    match ecp {
        ECParameters::OId(oid) => EcCurve::from_oid(&oid),
        ECParameters::CurveName(c) => EcCurve::from_name(c.as_str()),
        _ => Err(CKR_ATTRIBUTE_VALUE_INVALID)?,
    }
}

/// Returns the curve of the key object
pub fn get_curve_from_obj(key: &Object) -> Result<EcCurve> {
    curve_from_ec_params(key.get_attr_as_bytes(CKA_EC_PARAMS)?)
}

/// Returns the length of the raw signature a key produces
///
/// Depends only on the curve, no cryptographic work is performed
pub fn ec_signature_len(key: &Object) -> Result<usize> {
    Ok(get_curve_from_obj(key)?.signature_size())
}

/// Returns the raw public EC point for the key object
pub fn get_ec_point_from_obj(key: &Object) -> Result<Vec<u8>> {
    let point = key.get_attr_as_bytes(CKA_EC_POINT)?;
    /* [u8] is an octet string for the asn1 library */
    let octet = asn1::parse_single::<&[u8]>(point).map_err(|e| {
        Error::ck_rv_from_error(CKR_ATTRIBUTE_VALUE_INVALID, e)
    })?;
    Ok(octet.to_vec())
}

/// Wraps a raw point in the DER OCTET STRING stored in CKA_EC_POINT
pub fn point_to_der(point: &[u8]) -> Result<Vec<u8>> {
    Ok(asn1::write_single(&point).map_err(|_| CKR_GENERAL_ERROR)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ec_params_identify_curves() {
        let der = EcCurve::P256.ec_params().unwrap();
        assert_eq!(der, hex::decode("06082a8648ce3d030107").unwrap());
        assert_eq!(curve_from_ec_params(&der).unwrap(), EcCurve::P256);

        let der = EcCurve::P384.ec_params().unwrap();
        assert_eq!(der, hex::decode("06052b81040022").unwrap());
        assert_eq!(curve_from_ec_params(&der).unwrap(), EcCurve::P384);

        /* PrintableString "secp256k1" */
        let name = hex::decode("1309736563703235366b31").unwrap();
        assert_eq!(curve_from_ec_params(&name).unwrap(), EcCurve::Secp256k1);

        /* secp521r1 is not supported */
        let der = hex::decode("06052b81040023").unwrap();
        assert_eq!(
            curve_from_ec_params(&der).unwrap_err().rv(),
            CKR_CURVE_NOT_SUPPORTED
        );
        assert_eq!(
            curve_from_ec_params(&[0x04, 0x00]).unwrap_err().rv(),
            CKR_ATTRIBUTE_VALUE_INVALID
        );
    }

    #[test]
    fn sizes() {
        assert_eq!(EcCurve::P256.signature_size(), 64);
        assert_eq!(EcCurve::P384.signature_size(), 96);
        assert_eq!(EcCurve::Secp256k1.point_size(), 65);

        let der = point_to_der(&[4u8; 65]).unwrap();
        assert_eq!(&der[..2], &[0x04, 0x41]);
    }
}
