// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! This is ecmech
//!
//! The PKCS#11 mechanism layer for Elliptic Curve keys: raw ECDSA and
//! hash-then-sign signatures, single-part and multi-part, on top of a
//! pluggable cryptographic backend.
//!
//! A [Token] owns the backend, the object store and the mechanism
//! registry. Operations are driven through a [Session], or directly
//! through the `ec_*` entry points in [ec::ecdsa] by callers that manage
//! their own [SignVerifyContext].

pub mod attribute;
pub mod backend;
pub mod composite;
pub mod config;
pub mod ec;
pub mod error;
pub mod hash;
pub mod log;
pub mod mechanism;
pub mod object;
pub mod pkcs11;
pub mod session;
pub mod sign;
pub mod storage;
pub mod token;

pub use attribute::Attribute;
pub use backend::{Backend, SoftBackend};
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use hash::{DigestContext, DigestStatus};
pub use mechanism::{Direction, Mechanism};
pub use object::{KeyRole, Object, ObjectStore};
pub use session::Session;
pub use sign::{ContextState, SignVerifyContext};
pub use storage::MemoryStore;
pub use token::Token;

#[cfg(test)]
mod tests;
