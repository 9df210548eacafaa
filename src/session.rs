// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! Session level service entry points.
//!
//! A session owns at most one digest, one sign and one verify context.
//! Each call takes the context out of its slot, drives it, and puts it
//! back only when the operation is still in progress: after an update,
//! after a length query, or after `CKR_BUFFER_TOO_SMALL`. Every other
//! outcome drops the context, which releases the key it was bound to.

use std::sync::Arc;

use crate::attribute::Attribute;
use crate::composite::CompositeDigestState;
use crate::ec::ecdsa;
use crate::error::{Error, Result};
use crate::hash::DigestContext;
use crate::mechanism::{Direction, Mechanism};
use crate::pkcs11::*;
use crate::sign::SignVerifyContext;
use crate::token::Token;

use log::debug;

/// Whether a finished call leaves its operation in progress
fn keep_operation<T>(res: &Result<T>, length_only: bool) -> bool {
    match res {
        Ok(_) => length_only,
        Err(e) => e.is_retryable(),
    }
}

#[derive(Debug)]
pub struct Session {
    handle: CK_SESSION_HANDLE,
    token: Arc<Token>,
    digest_ctx: Option<DigestContext>,
    sign_ctx: Option<SignVerifyContext>,
    verify_ctx: Option<SignVerifyContext>,
}

impl Session {
    pub fn new(token: Arc<Token>, handle: CK_SESSION_HANDLE) -> Session {
        Session {
            handle: handle,
            token: token,
            digest_ctx: None,
            sign_ctx: None,
            verify_ctx: None,
        }
    }

    pub fn get_handle(&self) -> CK_SESSION_HANDLE {
        self.handle
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn digest_active(&self) -> bool {
        self.digest_ctx.is_some()
    }

    pub fn sign_active(&self) -> bool {
        self.sign_ctx.as_ref().is_some_and(|c| c.is_active())
    }

    pub fn verify_active(&self) -> bool {
        self.verify_ctx.as_ref().is_some_and(|c| c.is_active())
    }

    /* Digest */

    pub fn digest_init(&mut self, mechanism: &Mechanism) -> Result<()> {
        if self.digest_ctx.is_some() {
            return Err(CKR_OPERATION_ACTIVE)?;
        }
        self.token
            .mechanisms()
            .check(mechanism.mechanism(), CKF_DIGEST)?;
        let mut ctx = DigestContext::new();
        ctx.init(mechanism.mechanism())?;
        self.digest_ctx = Some(ctx);
        Ok(())
    }

    fn take_digest(&mut self) -> Result<DigestContext> {
        match self.digest_ctx.take() {
            Some(ctx) => Ok(ctx),
            None => Err(CKR_OPERATION_NOT_INITIALIZED)?,
        }
    }

    pub fn digest(
        &mut self,
        length_only: bool,
        data: &[u8],
        digest: &mut [u8],
    ) -> Result<usize> {
        let mut ctx = self.take_digest()?;
        if ctx.in_use() {
            return Err(Error::violation("single-part digest after update"));
        }
        let res = ctx.digest_len().and_then(|len| {
            if length_only {
                Ok(len)
            } else if digest.len() < len {
                Err(CKR_BUFFER_TOO_SMALL)?
            } else {
                ctx.update(data)?;
                ctx.finalize(false, digest)
            }
        });
        if keep_operation(&res, length_only) {
            self.digest_ctx = Some(ctx);
        }
        res
    }

    pub fn digest_update(&mut self, data: &[u8]) -> Result<()> {
        let mut ctx = self.take_digest()?;
        ctx.update(data)?;
        self.digest_ctx = Some(ctx);
        Ok(())
    }

    pub fn digest_final(
        &mut self,
        length_only: bool,
        digest: &mut [u8],
    ) -> Result<usize> {
        let mut ctx = self.take_digest()?;
        let res = ctx.finalize(length_only, digest);
        if keep_operation(&res, length_only) {
            self.digest_ctx = Some(ctx);
        }
        res
    }

    /* Sign / Verify */

    fn new_context(
        &self,
        mechanism: &Mechanism,
        key: CK_OBJECT_HANDLE,
        direction: Direction,
    ) -> Result<SignVerifyContext> {
        self.token
            .mechanisms()
            .check(mechanism.mechanism(), direction.flag())?;
        if mechanism.parameter().is_some() {
            return Err(CKR_MECHANISM_PARAM_INVALID)?;
        }
        let composite = CompositeDigestState::for_mechanism(
            mechanism.mechanism(),
            self.token.ec_config().legacy_sha1_digest,
        )?;
        let mut ctx = SignVerifyContext::new(self.token.backend().clone());
        ctx.init(self.token.store(), mechanism, key, direction, composite)?;
        Ok(ctx)
    }

    fn take_context(
        &mut self,
        direction: Direction,
    ) -> Result<SignVerifyContext> {
        let slot = match direction {
            Direction::Sign => &mut self.sign_ctx,
            Direction::Verify => &mut self.verify_ctx,
        };
        match slot.take() {
            Some(ctx) if ctx.is_active() => Ok(ctx),
            _ => Err(CKR_OPERATION_NOT_INITIALIZED)?,
        }
    }

    fn restore_context(&mut self, ctx: SignVerifyContext, keep: bool) {
        if !keep || !ctx.is_active() {
            debug!("session {}: operation ended", self.handle);
            return;
        }
        match ctx.direction() {
            Some(Direction::Sign) => self.sign_ctx = Some(ctx),
            Some(Direction::Verify) => self.verify_ctx = Some(ctx),
            None => (),
        }
    }

    pub fn sign_init(
        &mut self,
        mechanism: &Mechanism,
        key: CK_OBJECT_HANDLE,
    ) -> Result<()> {
        if self.sign_active() {
            return Err(CKR_OPERATION_ACTIVE)?;
        }
        let ctx = self.new_context(mechanism, key, Direction::Sign)?;
        self.sign_ctx = Some(ctx);
        Ok(())
    }

    pub fn sign(
        &mut self,
        length_only: bool,
        data: &[u8],
        signature: &mut [u8],
    ) -> Result<usize> {
        let mut ctx = self.take_context(Direction::Sign)?;
        let res = if ctx.is_composite() {
            ecdsa::ec_hash_sign(
                Some(&*self),
                length_only,
                Some(&mut ctx),
                data,
                signature,
            )
        } else {
            ecdsa::ec_sign(
                Some(&*self),
                length_only,
                Some(&mut ctx),
                data,
                signature,
            )
        };
        let keep = keep_operation(&res, length_only);
        self.restore_context(ctx, keep);
        res
    }

    pub fn sign_update(&mut self, data: &[u8]) -> Result<()> {
        let mut ctx = self.take_context(Direction::Sign)?;
        let res = if ctx.is_composite() {
            ecdsa::ec_hash_sign_update(Some(&*self), Some(&mut ctx), data)
        } else {
            Err(CKR_FUNCTION_NOT_SUPPORTED)?
        };
        let keep = res.is_ok();
        self.restore_context(ctx, keep);
        res
    }

    pub fn sign_final(
        &mut self,
        length_only: bool,
        signature: &mut [u8],
    ) -> Result<usize> {
        let mut ctx = self.take_context(Direction::Sign)?;
        let res = if ctx.is_composite() {
            ecdsa::ec_hash_sign_final(
                Some(&*self),
                length_only,
                Some(&mut ctx),
                signature,
            )
        } else {
            Err(CKR_FUNCTION_NOT_SUPPORTED)?
        };
        let keep = keep_operation(&res, length_only);
        self.restore_context(ctx, keep);
        res
    }

    pub fn verify_init(
        &mut self,
        mechanism: &Mechanism,
        key: CK_OBJECT_HANDLE,
    ) -> Result<()> {
        if self.verify_active() {
            return Err(CKR_OPERATION_ACTIVE)?;
        }
        let ctx = self.new_context(mechanism, key, Direction::Verify)?;
        self.verify_ctx = Some(ctx);
        Ok(())
    }

    pub fn verify(&mut self, data: &[u8], signature: &[u8]) -> Result<()> {
        let mut ctx = self.take_context(Direction::Verify)?;
        let res = if ctx.is_composite() {
            ecdsa::ec_hash_verify(Some(&*self), Some(&mut ctx), data, signature)
        } else {
            ecdsa::ec_verify(Some(&*self), Some(&mut ctx), data, signature)
        };
        self.restore_context(ctx, false);
        res
    }

    pub fn verify_update(&mut self, data: &[u8]) -> Result<()> {
        let mut ctx = self.take_context(Direction::Verify)?;
        let res = if ctx.is_composite() {
            ecdsa::ec_hash_verify_update(Some(&*self), Some(&mut ctx), data)
        } else {
            Err(CKR_FUNCTION_NOT_SUPPORTED)?
        };
        let keep = res.is_ok();
        self.restore_context(ctx, keep);
        res
    }

    pub fn verify_final(&mut self, signature: &[u8]) -> Result<()> {
        let mut ctx = self.take_context(Direction::Verify)?;
        let res = if ctx.is_composite() {
            ecdsa::ec_hash_verify_final(Some(&*self), Some(&mut ctx), signature)
        } else {
            Err(CKR_FUNCTION_NOT_SUPPORTED)?
        };
        self.restore_context(ctx, false);
        res
    }

    /* Keys */

    pub fn generate_key_pair(
        &mut self,
        mechanism: &Mechanism,
        public_template: &[Attribute],
        private_template: &[Attribute],
    ) -> Result<(CK_OBJECT_HANDLE, CK_OBJECT_HANDLE)> {
        self.token
            .mechanisms()
            .check(mechanism.mechanism(), CKF_GENERATE_KEY_PAIR)?;
        ecdsa::ec_key_pair_gen(
            Some(&*self),
            mechanism,
            public_template,
            private_template,
        )
    }
}
