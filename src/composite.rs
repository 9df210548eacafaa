// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! Hash-then-sign and hash-then-verify composites.
//!
//! A composite context carries a [CompositeDigestState]. The message is
//! hashed with the digest selected for the mechanism and the digest is
//! then signed or verified through a nested raw ECDSA context bound to
//! the same key. The nested context lives only for the duration of the
//! final step and is released when it goes out of scope, whatever the
//! outcome.

use crate::error::{Error, Result};
use crate::hash::{is_valid_hash, DigestContext, DigestStatus};
use crate::object::ObjectStore;
use crate::pkcs11::*;
use crate::sign::SignVerifyContext;

use log::debug;

/// Returns the digest a composite mechanism hashes with, or `None`
/// for the raw ECDSA mechanism.
///
/// With `legacy_sha1` every composite uses SHA-1.
pub fn composite_digest(
    mech: CK_MECHANISM_TYPE,
    legacy_sha1: bool,
) -> Result<Option<CK_MECHANISM_TYPE>> {
    let digest = match mech {
        CKM_ECDSA => return Ok(None),
        CKM_ECDSA_SHA1 => CKM_SHA_1,
        CKM_ECDSA_SHA224 => CKM_SHA224,
        CKM_ECDSA_SHA256 => CKM_SHA256,
        CKM_ECDSA_SHA384 => CKM_SHA384,
        CKM_ECDSA_SHA512 => CKM_SHA512,
        _ => return Err(CKR_MECHANISM_INVALID)?,
    };
    if legacy_sha1 {
        Ok(Some(CKM_SHA_1))
    } else {
        Ok(Some(digest))
    }
}

/// The digest embedded in a streaming composite context
///
/// The digest is initialized on the first update, or at final when no
/// update happened, so signing an empty message needs no extra call.
#[derive(Debug)]
pub struct CompositeDigestState {
    digest_mech: CK_MECHANISM_TYPE,
    digest: DigestContext,
    started: bool,
}

impl CompositeDigestState {
    pub fn new(
        digest_mech: CK_MECHANISM_TYPE,
    ) -> Result<CompositeDigestState> {
        if !is_valid_hash(digest_mech) {
            return Err(CKR_MECHANISM_INVALID)?;
        }
        Ok(CompositeDigestState {
            digest_mech: digest_mech,
            digest: DigestContext::new(),
            started: false,
        })
    }

    /// Builds the state for a signature mechanism, `None` if the
    /// mechanism is not a composite
    pub fn for_mechanism(
        mech: CK_MECHANISM_TYPE,
        legacy_sha1: bool,
    ) -> Result<Option<CompositeDigestState>> {
        match composite_digest(mech, legacy_sha1)? {
            Some(d) => Ok(Some(Self::new(d)?)),
            None => Ok(None),
        }
    }

    pub fn digest_mechanism(&self) -> CK_MECHANISM_TYPE {
        self.digest_mech
    }

    /// Whether hashing has started
    pub fn started(&self) -> bool {
        self.started
    }

    fn start(&mut self) -> Result<()> {
        if !self.started {
            self.digest.init(self.digest_mech)?;
            self.started = true;
        }
        Ok(())
    }

    pub fn update(&mut self, data: &[u8]) -> Result<()> {
        self.start()?;
        self.digest.update(data)
    }

    /// Consumes the digest, a second call is a protocol violation
    pub fn finalize(&mut self) -> Result<Vec<u8>> {
        if self.digest.status() == DigestStatus::Finalized {
            return Err(Error::violation("composite digest already final"));
        }
        self.start()?;
        self.digest.finalize_vec()
    }
}

fn composite_of(
    ctx: &mut SignVerifyContext,
) -> Result<&mut CompositeDigestState> {
    match ctx.composite_mut() {
        Some(c) => Ok(c),
        None => Err(Error::violation("not a composite operation")),
    }
}

/// Ends the outer operation according to the result of a step that is
/// not retryable
fn settle<T>(ctx: &mut SignVerifyContext, res: Result<T>) -> Result<T> {
    match res {
        Ok(r) => {
            ctx.complete();
            Ok(r)
        }
        Err(e) => {
            if !e.is_retryable() {
                debug!("composite operation failed: {}", e);
                ctx.abort();
            }
            Err(e)
        }
    }
}

/// Feeds `data` into the composite digest, initializing it on first use
pub fn composite_update(
    ctx: &mut SignVerifyContext,
    data: &[u8],
) -> Result<()> {
    if !ctx.is_active() {
        return Err(CKR_OPERATION_NOT_INITIALIZED)?;
    }
    let res = composite_of(ctx).and_then(|c| c.update(data));
    if let Err(e) = res {
        debug!("composite update failed: {}", e);
        ctx.abort();
        return Err(e);
    }
    Ok(())
}

fn nested_sign(
    store: &dyn ObjectStore,
    ctx: &SignVerifyContext,
    digest: &[u8],
    signature: &mut [u8],
) -> Result<usize> {
    let mut nested = ctx.nested(store)?;
    nested.sign(false, digest, signature)
}

fn nested_verify(
    store: &dyn ObjectStore,
    ctx: &SignVerifyContext,
    digest: &[u8],
    signature: &[u8],
) -> Result<()> {
    let mut nested = ctx.nested(store)?;
    nested.verify(digest, signature)
}

/// Finishes a streaming hash-then-sign operation
///
/// The signature length is negotiated before the digest is touched, so
/// a length query or a short buffer leaves the operation resumable.
pub fn composite_sign_final(
    store: &dyn ObjectStore,
    ctx: &mut SignVerifyContext,
    length_only: bool,
    signature: &mut [u8],
) -> Result<usize> {
    let required = ctx.signature_len()?;
    if length_only {
        return Ok(required);
    }
    if signature.len() < required {
        return Err(CKR_BUFFER_TOO_SMALL)?;
    }
    let res = composite_of(ctx)
        .and_then(|c| c.finalize())
        .and_then(|d| nested_sign(store, ctx, &d, signature));
    settle(ctx, res)
}

/// Finishes a streaming hash-then-verify operation
pub fn composite_verify_final(
    store: &dyn ObjectStore,
    ctx: &mut SignVerifyContext,
    signature: &[u8],
) -> Result<()> {
    let max = ctx.signature_len()?;
    if signature.len() > max {
        ctx.abort();
        return Err(CKR_SIGNATURE_LEN_RANGE)?;
    }
    let res = composite_of(ctx)
        .and_then(|c| c.finalize())
        .and_then(|d| nested_verify(store, ctx, &d, signature));
    settle(ctx, res)
}

/// Single-part hash-then-sign
///
/// A length query or a short buffer is answered without hashing.
pub fn hash_then_sign(
    store: &dyn ObjectStore,
    ctx: &mut SignVerifyContext,
    length_only: bool,
    input: &[u8],
    signature: &mut [u8],
) -> Result<usize> {
    let required = ctx.signature_len()?;
    if length_only {
        return Ok(required);
    }
    if signature.len() < required {
        return Err(CKR_BUFFER_TOO_SMALL)?;
    }
    let res = single_part_digest(ctx, input)
        .and_then(|d| nested_sign(store, ctx, &d, signature));
    settle(ctx, res)
}

/// Single-part hash-then-verify
pub fn hash_then_verify(
    store: &dyn ObjectStore,
    ctx: &mut SignVerifyContext,
    input: &[u8],
    signature: &[u8],
) -> Result<()> {
    let max = ctx.signature_len()?;
    if signature.len() > max {
        ctx.abort();
        return Err(CKR_SIGNATURE_LEN_RANGE)?;
    }
    let res = single_part_digest(ctx, input)
        .and_then(|d| nested_verify(store, ctx, &d, signature));
    settle(ctx, res)
}

fn single_part_digest(
    ctx: &mut SignVerifyContext,
    input: &[u8],
) -> Result<Vec<u8>> {
    let state = composite_of(ctx)?;
    if state.started() {
        return Err(Error::violation("single-part call after update"));
    }
    let mut digest = DigestContext::new();
    digest.init(state.digest_mechanism())?;
    digest.update(input)?;
    digest.finalize_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_selection() {
        assert_eq!(composite_digest(CKM_ECDSA, false).unwrap(), None);
        assert_eq!(
            composite_digest(CKM_ECDSA_SHA384, false).unwrap(),
            Some(CKM_SHA384)
        );
        assert_eq!(
            composite_digest(CKM_ECDSA_SHA384, true).unwrap(),
            Some(CKM_SHA_1)
        );
        assert_eq!(composite_digest(CKM_ECDSA, true).unwrap(), None);
        assert!(composite_digest(CKM_SHA256, false).is_err());
    }

    #[test]
    fn lazy_digest_init() {
        let mut state = CompositeDigestState::new(CKM_SHA256).unwrap();
        assert!(!state.started());
        let empty = state.finalize().unwrap();
        assert_eq!(
            hex::encode(empty),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert!(state.started());
        assert!(state.finalize().is_err());

        let mut state = CompositeDigestState::new(CKM_SHA256).unwrap();
        state.update(b"ab").unwrap();
        state.update(b"c").unwrap();
        assert_eq!(
            hex::encode(state.finalize().unwrap()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
