// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

use std::sync::{Arc, Mutex};

use crate::backend::{self, Backend};
use crate::config::{Config, EcConfig};
use crate::ec::ecdsa;
use crate::error::{general_error, Result};
use crate::hash;
use crate::mechanism::Mechanisms;
use crate::object::ObjectStore;
use crate::pkcs11::*;
use crate::session::Session;
use crate::storage::MemoryStore;

use log::debug;

/// A token: the injected backend, the object store and the mechanism
/// registry shared by all of its sessions
#[derive(Debug)]
pub struct Token {
    backend: Arc<dyn Backend>,
    store: Arc<dyn ObjectStore>,
    mechanisms: Mechanisms,
    ec: EcConfig,
    next_session: Mutex<CK_SESSION_HANDLE>,
}

impl Token {
    /// Builds a token with the configured backend and an empty
    /// in-memory object store
    pub fn new(config: &Config) -> Result<Arc<Token>> {
        let backend = backend::from_config(config)?;
        Ok(Self::with_backend(
            backend,
            Arc::new(MemoryStore::new()),
            config,
        ))
    }

    /// Builds a token around an explicit backend and store
    pub fn with_backend(
        backend: Arc<dyn Backend>,
        store: Arc<dyn ObjectStore>,
        config: &Config,
    ) -> Arc<Token> {
        let mut mechanisms = Mechanisms::new();
        hash::register(&mut mechanisms);
        ecdsa::register(&mut mechanisms);
        debug!(
            "token ready: backend {}, {} mechanisms",
            backend.name(),
            mechanisms.len()
        );
        Arc::new(Token {
            backend: backend,
            store: store,
            mechanisms: mechanisms,
            ec: config.ec.clone(),
            next_session: Mutex::new(1),
        })
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn mechanisms(&self) -> &Mechanisms {
        &self.mechanisms
    }

    pub fn get_mechanism_info(
        &self,
        typ: CK_MECHANISM_TYPE,
    ) -> Result<CK_MECHANISM_INFO> {
        match self.mechanisms.info(typ) {
            Some(info) => Ok(*info),
            None => Err(CKR_MECHANISM_INVALID)?,
        }
    }

    pub fn ec_config(&self) -> &EcConfig {
        &self.ec
    }

    /// Opens a new session with a unique handle
    pub fn open_session(self: &Arc<Self>) -> Result<Session> {
        let mut next = self
            .next_session
            .lock()
            .map_err(|e| general_error(e.to_string()))?;
        let handle = *next;
        *next += 1;
        Ok(Session::new(self.clone(), handle))
    }
}
