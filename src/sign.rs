// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! The sign/verify operation context.
//!
//! A [SignVerifyContext] binds one key and one mechanism for a single
//! signature operation. It moves from `Uninitialized` to `Initialized`
//! on a successful `init` and from there to `Complete` or `Failed` when
//! the operation ends; in both terminal states the key binding has been
//! released. The only failure that leaves the context `Initialized` is
//! `CKR_BUFFER_TOO_SMALL`, so the caller can retry with a larger buffer.
//!
//! Contexts are not internally synchronized: a session owns its
//! contexts and must serialize the calls driving them.

use std::sync::Arc;

use crate::backend::Backend;
use crate::composite::CompositeDigestState;
use crate::ec::ec_signature_len;
use crate::error::{some_or_err, Error, Result};
use crate::mechanism::{Direction, Mechanism};
use crate::object::{validate_role, Object, ObjectStore};
use crate::pkcs11::*;

use log::{debug, error};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ContextState {
    Uninitialized,
    Initialized,
    Complete,
    Failed,
}

/// Everything an initialized context is bound to
#[derive(Debug)]
struct Binding {
    mechanism: Mechanism,
    direction: Direction,
    handle: CK_OBJECT_HANDLE,
    key: Object,
    signature_len: usize,
}

#[derive(Debug)]
pub struct SignVerifyContext {
    backend: Arc<dyn Backend>,
    state: ContextState,
    binding: Option<Binding>,
    composite: Option<CompositeDigestState>,
}

impl SignVerifyContext {
    pub fn new(backend: Arc<dyn Backend>) -> SignVerifyContext {
        SignVerifyContext {
            backend: backend,
            state: ContextState::Uninitialized,
            binding: None,
            composite: None,
        }
    }

    /// Resolves and validates the key then binds it to the context.
    ///
    /// Nothing is stored on the context unless every check passes. An
    /// unknown handle is reported as `CKR_KEY_HANDLE_INVALID`, any other
    /// store failure is returned as is.
    pub fn init(
        &mut self,
        store: &dyn ObjectStore,
        mechanism: &Mechanism,
        key: CK_OBJECT_HANDLE,
        direction: Direction,
        composite: Option<CompositeDigestState>,
    ) -> Result<()> {
        if self.state == ContextState::Initialized {
            return Err(CKR_OPERATION_ACTIVE)?;
        }
        let obj = store.resolve_handle(key).map_err(|e| {
            if e.rv() == CKR_OBJECT_HANDLE_INVALID {
                error!("key handle {} can not be resolved", key);
                Error::ck_rv_from_error(CKR_KEY_HANDLE_INVALID, e)
            } else {
                error!("key lookup failed: {}", e);
                e
            }
        })?;
        validate_role(store, &obj, direction.into())?;
        let signature_len = ec_signature_len(&obj).map_err(|e| {
            error!("key {} has unusable EC parameters: {}", key, e);
            if e.attr_not_found() {
                Error::ck_rv_from_error(CKR_KEY_TYPE_INCONSISTENT, e)
            } else {
                e
            }
        })?;

        self.binding = Some(Binding {
            mechanism: mechanism.clone(),
            direction: direction,
            handle: key,
            key: obj,
            signature_len: signature_len,
        });
        self.composite = composite;
        self.state = ContextState::Initialized;
        debug!(
            "{:?} context initialized: mechanism 0x{:x}, key {}",
            direction,
            mechanism.mechanism(),
            key
        );
        Ok(())
    }

    /// Builds the nested raw ECDSA context used by hash-then-sign
    /// composites, bound to the same key and direction
    pub fn nested(&self, store: &dyn ObjectStore) -> Result<SignVerifyContext> {
        let binding = some_or_err!(self.binding);
        let mut ctx = SignVerifyContext::new(self.backend.clone());
        ctx.init(
            store,
            &Mechanism::new(CKM_ECDSA),
            binding.handle,
            binding.direction,
            None,
        )?;
        Ok(ctx)
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ContextState::Initialized
    }

    pub fn mechanism(&self) -> Option<&Mechanism> {
        self.binding.as_ref().map(|b| &b.mechanism)
    }

    pub fn direction(&self) -> Option<Direction> {
        self.binding.as_ref().map(|b| b.direction)
    }

    pub fn key_handle(&self) -> Option<CK_OBJECT_HANDLE> {
        self.binding.as_ref().map(|b| b.handle)
    }

    pub fn is_composite(&self) -> bool {
        self.composite.is_some()
    }

    pub fn composite(&self) -> Option<&CompositeDigestState> {
        self.composite.as_ref()
    }

    pub fn composite_mut(&mut self) -> Option<&mut CompositeDigestState> {
        self.composite.as_mut()
    }

    /// Length of the signature the bound key produces
    pub fn signature_len(&self) -> Result<usize> {
        match &self.binding {
            Some(b) if self.state == ContextState::Initialized => {
                Ok(b.signature_len)
            }
            _ => Err(CKR_OPERATION_NOT_INITIALIZED)?,
        }
    }

    /// Checks the context can run a raw operation in `direction`.
    ///
    /// A mismatch ends the operation: the direction must be the one the
    /// key was bound for, and composites are only driven through the
    /// hash-then-sign entry points.
    fn check_operation(&mut self, direction: Direction) -> Result<()> {
        if self.state != ContextState::Initialized {
            return Err(CKR_OPERATION_NOT_INITIALIZED)?;
        }
        let violation = match &self.binding {
            Some(b) if b.direction != direction => {
                Some("operation direction mismatch")
            }
            Some(_) if self.composite.is_some() => {
                Some("composite operation used as raw ECDSA")
            }
            Some(_) => None,
            None => Some("operation has no key bound"),
        };
        if let Some(msg) = violation {
            error!("{}", msg);
            self.abort();
            return Err(Error::violation(msg));
        }
        Ok(())
    }

    /// Creates a signature over `input`.
    ///
    /// The required length only depends on the key. With `length_only`
    /// it is returned without any backend call or state change; a
    /// buffer shorter than required fails with `CKR_BUFFER_TOO_SMALL`
    /// and leaves the context usable.
    pub fn sign(
        &mut self,
        length_only: bool,
        input: &[u8],
        signature: &mut [u8],
    ) -> Result<usize> {
        self.check_operation(Direction::Sign)?;
        let binding = some_or_err!(self.binding);
        let required = binding.signature_len;
        if length_only {
            return Ok(required);
        }
        if signature.len() < required {
            return Err(CKR_BUFFER_TOO_SMALL)?;
        }
        match self.backend.sign(&binding.key, input) {
            Ok(sig) if sig.len() == required => {
                signature[..required].copy_from_slice(&sig);
                self.complete();
                Ok(required)
            }
            Ok(sig) => {
                error!(
                    "{} backend returned a {} bytes signature, expected {}",
                    self.backend.name(),
                    sig.len(),
                    required
                );
                self.abort();
                Err(CKR_GENERAL_ERROR)?
            }
            Err(e) => {
                error!(
                    "{} backend sign failed [0x{:x}]: {}",
                    self.backend.name(),
                    e.rv(),
                    e
                );
                self.abort();
                Err(e)
            }
        }
    }

    /// Checks `signature` over `input`.
    ///
    /// A signature longer than the key can produce is rejected with
    /// `CKR_SIGNATURE_LEN_RANGE` before the backend is invoked.
    pub fn verify(&mut self, input: &[u8], signature: &[u8]) -> Result<()> {
        self.check_operation(Direction::Verify)?;
        let binding = some_or_err!(self.binding);
        if signature.len() > binding.signature_len {
            error!(
                "signature length {} exceeds maximum {}",
                signature.len(),
                binding.signature_len
            );
            self.abort();
            return Err(CKR_SIGNATURE_LEN_RANGE)?;
        }
        match self.backend.verify(&binding.key, input, signature) {
            Ok(()) => {
                self.complete();
                Ok(())
            }
            Err(e) => {
                if e.rv() == CKR_SIGNATURE_INVALID {
                    debug!("signature did not verify");
                } else {
                    error!(
                        "{} backend verify failed [0x{:x}]: {}",
                        self.backend.name(),
                        e.rv(),
                        e
                    );
                }
                self.abort();
                Err(e)
            }
        }
    }

    /// Ends the operation successfully and releases the key
    pub fn complete(&mut self) {
        self.clear();
        self.state = ContextState::Complete;
    }

    /// Ends the operation as failed and releases the key
    pub fn abort(&mut self) {
        self.clear();
        self.state = ContextState::Failed;
    }

    fn clear(&mut self) {
        self.composite = None;
        if let Some(binding) = self.binding.take() {
            self.backend.release(&binding.key);
        }
    }
}

impl Drop for SignVerifyContext {
    fn drop(&mut self) {
        self.clear();
    }
}
