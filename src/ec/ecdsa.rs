// Copyright 2023 - 2024 Simo Sorce, Jakub Jelen
// See LICENSE.txt file for terms

//! This module implements the PKCS#11 mechanisms for ECDSA (Elliptic Curve
//! Digital Signature Algorithm): key pair generation, raw signing and
//! verification, and the hash-then-sign composites in single-part and
//! multi-part form.
//!
//! Every entry point takes the calling session and the operation
//! context as options; an absent one fails with `CKR_FUNCTION_FAILED`.

use crate::attribute::Attribute;
use crate::composite::{
    composite_sign_final, composite_update, composite_verify_final,
    hash_then_sign, hash_then_verify,
};
use crate::ec::*;
use crate::error::{Error, Result};
use crate::mechanism::{Mechanism, Mechanisms};
use crate::object::Object;
use crate::pkcs11::*;
use crate::session::Session;
use crate::sign::SignVerifyContext;

use log::error;

/// Minimum ECDSA key size
pub const MIN_EC_SIZE_BITS: usize = BITS_SECP256R1;
/// Maximum ECDSA key size
pub const MAX_EC_SIZE_BITS: usize = BITS_SECP384R1;

/// Registers all CKK_EC related mechanisms
pub fn register(mechs: &mut Mechanisms) {
    let info = |flags: CK_FLAGS| CK_MECHANISM_INFO {
        ulMinKeySize: MIN_EC_SIZE_BITS as CK_ULONG,
        ulMaxKeySize: MAX_EC_SIZE_BITS as CK_ULONG,
        flags: flags | CKF_EC_F_P | CKF_EC_OID | CKF_EC_UNCOMPRESS,
    };
    for ckm in &[
        CKM_ECDSA,
        CKM_ECDSA_SHA1,
        CKM_ECDSA_SHA224,
        CKM_ECDSA_SHA256,
        CKM_ECDSA_SHA384,
        CKM_ECDSA_SHA512,
    ] {
        mechs.add_mechanism(*ckm, info(CKF_SIGN | CKF_VERIFY));
    }
    mechs.add_mechanism(CKM_EC_KEY_PAIR_GEN, info(CKF_GENERATE_KEY_PAIR));
}

fn required<'a, T: ?Sized>(arg: Option<&'a T>, what: &str) -> Result<&'a T> {
    match arg {
        Some(a) => Ok(a),
        None => {
            error!("missing {}", what);
            Err(Error::invalid_argument(what))
        }
    }
}

fn required_ctx<'a>(
    ctx: Option<&'a mut SignVerifyContext>,
) -> Result<&'a mut SignVerifyContext> {
    match ctx {
        Some(c) => Ok(c),
        None => {
            error!("missing operation context");
            Err(Error::invalid_argument("operation context"))
        }
    }
}

/// Raw ECDSA signature of `input`, which is expected to be a digest
pub fn ec_sign(
    session: Option<&Session>,
    length_only: bool,
    ctx: Option<&mut SignVerifyContext>,
    input: &[u8],
    signature: &mut [u8],
) -> Result<usize> {
    required(session, "session")?;
    let ctx = required_ctx(ctx)?;
    ctx.sign(length_only, input, signature)
}

/// Raw ECDSA verification of `signature` over `input`
pub fn ec_verify(
    session: Option<&Session>,
    ctx: Option<&mut SignVerifyContext>,
    input: &[u8],
    signature: &[u8],
) -> Result<()> {
    required(session, "session")?;
    let ctx = required_ctx(ctx)?;
    ctx.verify(input, signature)
}

/// Hashes `input` then signs the digest
pub fn ec_hash_sign(
    session: Option<&Session>,
    length_only: bool,
    ctx: Option<&mut SignVerifyContext>,
    input: &[u8],
    signature: &mut [u8],
) -> Result<usize> {
    let session = required(session, "session")?;
    let ctx = required_ctx(ctx)?;
    hash_then_sign(
        session.token().store(),
        ctx,
        length_only,
        input,
        signature,
    )
}

/// Feeds a message part to a streaming hash-then-sign operation
pub fn ec_hash_sign_update(
    session: Option<&Session>,
    ctx: Option<&mut SignVerifyContext>,
    input: &[u8],
) -> Result<()> {
    required(session, "session")?;
    composite_update(required_ctx(ctx)?, input)
}

/// Completes a streaming hash-then-sign operation
pub fn ec_hash_sign_final(
    session: Option<&Session>,
    length_only: bool,
    ctx: Option<&mut SignVerifyContext>,
    signature: &mut [u8],
) -> Result<usize> {
    let session = required(session, "session")?;
    let ctx = required_ctx(ctx)?;
    composite_sign_final(session.token().store(), ctx, length_only, signature)
}

/// Hashes `input` then verifies the signature of the digest
pub fn ec_hash_verify(
    session: Option<&Session>,
    ctx: Option<&mut SignVerifyContext>,
    input: &[u8],
    signature: &[u8],
) -> Result<()> {
    let session = required(session, "session")?;
    let ctx = required_ctx(ctx)?;
    hash_then_verify(session.token().store(), ctx, input, signature)
}

/// Feeds a message part to a streaming hash-then-verify operation
pub fn ec_hash_verify_update(
    session: Option<&Session>,
    ctx: Option<&mut SignVerifyContext>,
    input: &[u8],
) -> Result<()> {
    required(session, "session")?;
    composite_update(required_ctx(ctx)?, input)
}

/// Completes a streaming hash-then-verify operation
pub fn ec_hash_verify_final(
    session: Option<&Session>,
    ctx: Option<&mut SignVerifyContext>,
    signature: &[u8],
) -> Result<()> {
    let session = required(session, "session")?;
    let ctx = required_ctx(ctx)?;
    composite_verify_final(session.token().store(), ctx, signature)
}

fn apply_template(
    obj: &mut Object,
    template: &[Attribute],
    class: CK_OBJECT_CLASS,
) -> Result<()> {
    for attr in template {
        match attr.get_type() {
            CKA_CLASS => {
                if attr.to_ulong()? != class {
                    return Err(CKR_TEMPLATE_INCONSISTENT)?;
                }
            }
            CKA_KEY_TYPE => {
                if attr.to_ulong()? != CKK_EC {
                    return Err(CKR_TEMPLATE_INCONSISTENT)?;
                }
            }
            CKA_VALUE | CKA_EC_POINT | CKA_LOCAL | CKA_KEY_GEN_MECHANISM
            | CKA_UNIQUE_ID => return Err(CKR_ATTRIBUTE_VALUE_INVALID)?,
            _ => obj.set_attr(attr.clone())?,
        }
    }
    obj.ensure_ulong(CKA_KEY_TYPE, CKK_EC)?;
    obj.set_attr(Attribute::from_bool(CKA_LOCAL, true))?;
    obj.set_attr(Attribute::from_ulong(
        CKA_KEY_GEN_MECHANISM,
        CKM_EC_KEY_PAIR_GEN,
    ))?;
    Ok(())
}

fn set_default_bool(
    obj: &mut Object,
    id: CK_ATTRIBUTE_TYPE,
    val: bool,
) -> Result<()> {
    if obj.get_attr(id).is_none() {
        obj.set_attr(Attribute::from_bool(id, val))?;
    }
    Ok(())
}

/// Generates an EC key pair and stores both halves.
///
/// The public template must carry `CKA_EC_PARAMS` naming a supported
/// curve, which is copied to the private key. Returns the public and
/// private key handles.
pub fn ec_key_pair_gen(
    session: Option<&Session>,
    mechanism: &Mechanism,
    public_template: &[Attribute],
    private_template: &[Attribute],
) -> Result<(CK_OBJECT_HANDLE, CK_OBJECT_HANDLE)> {
    let session = required(session, "session")?;
    if mechanism.mechanism() != CKM_EC_KEY_PAIR_GEN {
        return Err(CKR_MECHANISM_INVALID)?;
    }
    let token = session.token();

    let mut public = Object::with_class(CKO_PUBLIC_KEY);
    apply_template(&mut public, public_template, CKO_PUBLIC_KEY)?;
    let curve = get_curve_from_obj(&public).map_err(|e| {
        if e.attr_not_found() {
            Error::ck_rv_from_error(CKR_TEMPLATE_INCOMPLETE, e)
        } else {
            e
        }
    })?;
    if !token.ec_config().allows_curve(curve) {
        error!("key generation on {} is disabled", curve.name());
        return Err(CKR_CURVE_NOT_SUPPORTED)?;
    }
    set_default_bool(&mut public, CKA_VERIFY, true)?;

    let mut private = Object::with_class(CKO_PRIVATE_KEY);
    apply_template(&mut private, private_template, CKO_PRIVATE_KEY)?;
    private.ensure_slice(CKA_EC_PARAMS, &curve.ec_params()?)?;
    set_default_bool(&mut private, CKA_SIGN, true)?;
    set_default_bool(&mut private, CKA_SENSITIVE, true)?;
    set_default_bool(&mut private, CKA_EXTRACTABLE, false)?;

    token
        .backend()
        .generate_keypair(&mut public, &mut private)
        .map_err(|e| {
            error!(
                "{} backend key generation failed [0x{:x}]: {}",
                token.backend().name(),
                e.rv(),
                e
            );
            e
        })?;

    let store = token.store();
    let pub_handle = store.insert(public)?;
    let priv_handle = match store.insert(private) {
        Ok(h) => h,
        Err(e) => {
            error!("failed to store the private key: {}", e);
            if let Err(re) = store.remove(pub_handle) {
                error!("public key {} left behind: {}", pub_handle, re);
            }
            return Err(e);
        }
    };
    Ok((pub_handle, priv_handle))
}
