// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::attribute::Attribute;
use crate::backend::{Backend, SoftBackend};
use crate::error::{Error, Result};
use crate::object::{Object, ObjectStore};
use crate::pkcs11::*;
use crate::storage::MemoryStore;

/// Software backend that counts the calls it receives and can be told
/// to fail
#[derive(Debug, Default)]
pub struct CountingBackend {
    inner: SoftBackend,
    generated: AtomicUsize,
    signed: AtomicUsize,
    verified: AtomicUsize,
    released: AtomicUsize,
    fail_sign: AtomicBool,
    fail_verify: AtomicBool,
}

impl CountingBackend {
    pub fn new() -> CountingBackend {
        CountingBackend::default()
    }

    pub fn generated(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }

    pub fn signed(&self) -> usize {
        self.signed.load(Ordering::SeqCst)
    }

    pub fn verified(&self) -> usize {
        self.verified.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn fail_sign(&self, fail: bool) {
        self.fail_sign.store(fail, Ordering::SeqCst);
    }

    pub fn fail_verify(&self, fail: bool) {
        self.fail_verify.store(fail, Ordering::SeqCst);
    }
}

impl Backend for CountingBackend {
    fn name(&self) -> &str {
        "counting"
    }

    fn generate_keypair(
        &self,
        public: &mut Object,
        private: &mut Object,
    ) -> Result<()> {
        self.generated.fetch_add(1, Ordering::SeqCst);
        self.inner.generate_keypair(public, private)
    }

    fn sign(&self, key: &Object, input: &[u8]) -> Result<Vec<u8>> {
        self.signed.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign.load(Ordering::SeqCst) {
            return Err(Error::backend("injected sign failure"));
        }
        self.inner.sign(key, input)
    }

    fn verify(
        &self,
        key: &Object,
        input: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        self.verified.fetch_add(1, Ordering::SeqCst);
        if self.fail_verify.load(Ordering::SeqCst) {
            return Err(Error::backend("injected verify failure"));
        }
        self.inner.verify(key, input, signature)
    }

    fn release(&self, key: &Object) {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.inner.release(key)
    }
}

/// In-memory store that refuses inserts past a fixed number of objects
#[derive(Debug)]
pub struct FullStore {
    inner: MemoryStore,
    capacity: usize,
}

impl FullStore {
    pub fn new(capacity: usize) -> FullStore {
        FullStore {
            inner: MemoryStore::new(),
            capacity: capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl ObjectStore for FullStore {
    fn resolve_handle(&self, handle: CK_OBJECT_HANDLE) -> Result<Object> {
        self.inner.resolve_handle(handle)
    }

    fn insert(&self, obj: Object) -> Result<CK_OBJECT_HANDLE> {
        if self.inner.len() >= self.capacity {
            return Err(CKR_DEVICE_MEMORY)?;
        }
        self.inner.insert(obj)
    }

    fn remove(&self, handle: CK_OBJECT_HANDLE) -> Result<()> {
        self.inner.remove(handle)
    }

    fn search(&self, template: &[Attribute]) -> Result<Vec<CK_OBJECT_HANDLE>> {
        self.inner.search(template)
    }
}
