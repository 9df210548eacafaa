// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! This module implements the digest mechanisms (SHA-1 and the SHA-2
//! family) and the streaming [DigestContext] used both for standalone
//! digest operations and embedded in hash-then-sign composites.

use std::fmt;

use crate::error::{Error, Result};
use crate::mechanism::Mechanisms;
use crate::pkcs11::*;

use log::trace;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

pub const INVALID_HASH_SIZE: usize = CK_UNAVAILABLE_INFORMATION as usize;

#[derive(Debug)]
pub struct HashBasedOp {
    pub hash: CK_MECHANISM_TYPE,
    pub hash_size: usize,
}

pub static HASH_MECH_SET: [HashBasedOp; 5] = [
    HashBasedOp {
        hash: CKM_SHA_1,
        hash_size: 20,
    },
    HashBasedOp {
        hash: CKM_SHA224,
        hash_size: 28,
    },
    HashBasedOp {
        hash: CKM_SHA256,
        hash_size: 32,
    },
    HashBasedOp {
        hash: CKM_SHA384,
        hash_size: 48,
    },
    HashBasedOp {
        hash: CKM_SHA512,
        hash_size: 64,
    },
];

pub fn is_valid_hash(hash: CK_MECHANISM_TYPE) -> bool {
    HASH_MECH_SET.iter().any(|hs| hs.hash == hash)
}

pub fn hash_size(hash: CK_MECHANISM_TYPE) -> usize {
    for hs in &HASH_MECH_SET {
        if hs.hash == hash {
            return hs.hash_size;
        }
    }
    INVALID_HASH_SIZE
}

/// Registers all the digest mechanisms
pub fn register(mechs: &mut Mechanisms) {
    for hs in &HASH_MECH_SET {
        mechs.add_mechanism(
            hs.hash,
            CK_MECHANISM_INFO {
                ulMinKeySize: 0,
                ulMaxKeySize: 0,
                flags: CKF_DIGEST,
            },
        );
    }
}

/// Running hash state of one of the supported algorithms
enum HashState {
    Sha1(Sha1),
    Sha224(Sha224),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl fmt::Debug for HashState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            HashState::Sha1(_) => "SHA-1",
            HashState::Sha224(_) => "SHA-224",
            HashState::Sha256(_) => "SHA-256",
            HashState::Sha384(_) => "SHA-384",
            HashState::Sha512(_) => "SHA-512",
        };
        f.debug_tuple("HashState").field(&name).finish()
    }
}

impl HashState {
    fn new(mech: CK_MECHANISM_TYPE) -> Result<HashState> {
        Ok(match mech {
            CKM_SHA_1 => HashState::Sha1(Sha1::new()),
            CKM_SHA224 => HashState::Sha224(Sha224::new()),
            CKM_SHA256 => HashState::Sha256(Sha256::new()),
            CKM_SHA384 => HashState::Sha384(Sha384::new()),
            CKM_SHA512 => HashState::Sha512(Sha512::new()),
            _ => return Err(CKR_MECHANISM_INVALID)?,
        })
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            HashState::Sha1(h) => h.update(data),
            HashState::Sha224(h) => h.update(data),
            HashState::Sha256(h) => h.update(data),
            HashState::Sha384(h) => h.update(data),
            HashState::Sha512(h) => h.update(data),
        }
    }

    fn finalize_into(self, digest: &mut [u8]) {
        match self {
            HashState::Sha1(h) => digest.copy_from_slice(&h.finalize()),
            HashState::Sha224(h) => digest.copy_from_slice(&h.finalize()),
            HashState::Sha256(h) => digest.copy_from_slice(&h.finalize()),
            HashState::Sha384(h) => digest.copy_from_slice(&h.finalize()),
            HashState::Sha512(h) => digest.copy_from_slice(&h.finalize()),
        }
    }
}

/// Lifecycle of a [DigestContext]
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DigestStatus {
    Uninitialized,
    Initialized,
    Finalized,
}

/// Streaming digest operation
///
/// `update` is only valid after a successful `init`, and a real
/// `finalize` consumes the state: any later call is reported as a
/// protocol violation rather than silently restarting the hash.
#[derive(Debug)]
pub struct DigestContext {
    mech: CK_MECHANISM_TYPE,
    state: Option<HashState>,
    status: DigestStatus,
    in_use: bool,
}

impl Default for DigestContext {
    fn default() -> Self {
        DigestContext::new()
    }
}

impl DigestContext {
    pub fn new() -> DigestContext {
        DigestContext {
            mech: CK_UNAVAILABLE_INFORMATION,
            state: None,
            status: DigestStatus::Uninitialized,
            in_use: false,
        }
    }

    pub fn status(&self) -> DigestStatus {
        self.status
    }

    pub fn mechanism(&self) -> CK_MECHANISM_TYPE {
        self.mech
    }

    /// Whether data was fed through `update`
    pub fn in_use(&self) -> bool {
        self.in_use
    }

    pub fn digest_len(&self) -> Result<usize> {
        match hash_size(self.mech) {
            INVALID_HASH_SIZE => Err(CKR_MECHANISM_INVALID)?,
            len => Ok(len),
        }
    }

    pub fn init(&mut self, mech: CK_MECHANISM_TYPE) -> Result<()> {
        if self.status != DigestStatus::Uninitialized {
            return Err(Error::violation("digest already initialized"));
        }
        self.state = Some(HashState::new(mech)?);
        self.mech = mech;
        self.status = DigestStatus::Initialized;
        trace!("digest init: mechanism 0x{:x}", mech);
        Ok(())
    }

    pub fn update(&mut self, data: &[u8]) -> Result<()> {
        if self.status != DigestStatus::Initialized {
            return Err(Error::violation("digest update out of sequence"));
        }
        match self.state.as_mut() {
            Some(s) => s.update(data),
            None => return Err(Error::violation("digest state missing")),
        }
        self.in_use = true;
        Ok(())
    }

    /// Finalizes the digest into `digest` and returns its length
    ///
    /// With `length_only` the length is reported and the state stays
    /// Initialized. A short output buffer fails with
    /// `CKR_BUFFER_TOO_SMALL` and also leaves the state untouched.
    pub fn finalize(
        &mut self,
        length_only: bool,
        digest: &mut [u8],
    ) -> Result<usize> {
        if self.status != DigestStatus::Initialized {
            return Err(Error::violation("digest final out of sequence"));
        }
        let len = self.digest_len()?;
        if length_only {
            return Ok(len);
        }
        if digest.len() < len {
            return Err(CKR_BUFFER_TOO_SMALL)?;
        }
        let state = match self.state.take() {
            Some(s) => s,
            None => return Err(Error::violation("digest state missing")),
        };
        state.finalize_into(&mut digest[..len]);
        self.status = DigestStatus::Finalized;
        Ok(len)
    }

    /// Finalizes into a newly allocated vector
    pub fn finalize_vec(&mut self) -> Result<Vec<u8>> {
        if self.status != DigestStatus::Initialized {
            return Err(Error::violation("digest final out of sequence"));
        }
        let mut digest = vec![0u8; self.digest_len()?];
        self.finalize(false, &mut digest)?;
        Ok(digest)
    }
}

/// One shot digest helper
pub fn digest(mech: CK_MECHANISM_TYPE, data: &[u8]) -> Result<Vec<u8>> {
    let mut ctx = DigestContext::new();
    ctx.init(mech)?;
    ctx.update(data)?;
    ctx.finalize_vec()
}
