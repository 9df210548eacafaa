// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

use std::collections::BTreeMap;

use crate::error::Result;
use crate::pkcs11::*;

/// A mechanism as requested by the caller, never mutated once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mechanism {
    mechanism: CK_MECHANISM_TYPE,
    parameter: Option<Vec<u8>>,
}

impl Mechanism {
    pub fn new(mechanism: CK_MECHANISM_TYPE) -> Mechanism {
        Mechanism {
            mechanism: mechanism,
            parameter: None,
        }
    }

    pub fn with_parameter(
        mechanism: CK_MECHANISM_TYPE,
        parameter: Vec<u8>,
    ) -> Mechanism {
        Mechanism {
            mechanism: mechanism,
            parameter: Some(parameter),
        }
    }

    pub fn mechanism(&self) -> CK_MECHANISM_TYPE {
        self.mechanism
    }

    pub fn parameter(&self) -> Option<&[u8]> {
        self.parameter.as_deref()
    }
}

/// The direction of a signature operation
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Direction {
    Sign,
    Verify,
}

impl Direction {
    /// The mechanism info flag that must be set for the direction
    pub fn flag(&self) -> CK_FLAGS {
        match self {
            Direction::Sign => CKF_SIGN,
            Direction::Verify => CKF_VERIFY,
        }
    }
}

/// Registry of the mechanisms a token exposes
#[derive(Debug, Default)]
pub struct Mechanisms {
    tree: BTreeMap<CK_MECHANISM_TYPE, CK_MECHANISM_INFO>,
}

impl Mechanisms {
    pub fn new() -> Mechanisms {
        Mechanisms {
            tree: BTreeMap::new(),
        }
    }

    pub fn add_mechanism(
        &mut self,
        typ: CK_MECHANISM_TYPE,
        info: CK_MECHANISM_INFO,
    ) {
        self.tree.insert(typ, info);
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn list(&self) -> Vec<CK_MECHANISM_TYPE> {
        self.tree.keys().cloned().collect()
    }

    pub fn info(&self, typ: CK_MECHANISM_TYPE) -> Option<&CK_MECHANISM_INFO> {
        self.tree.get(&typ)
    }

    /// Checks the mechanism is registered and supports the operation
    /// identified by `flag`
    pub fn check(&self, typ: CK_MECHANISM_TYPE, flag: CK_FLAGS) -> Result<()> {
        match self.tree.get(&typ) {
            Some(info) if info.flags & flag == flag => Ok(()),
            _ => Err(CKR_MECHANISM_INVALID)?,
        }
    }
}
