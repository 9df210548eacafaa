// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

//! In-memory object store used by the token to hold the EC keys the
//! mechanism layer operates on.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::attribute::Attribute;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectStore};
use crate::pkcs11::*;

pub mod json_objects;

#[derive(Debug)]
struct Objects {
    next_handle: CK_OBJECT_HANDLE,
    map: BTreeMap<CK_OBJECT_HANDLE, Object>,
}

/// A `RwLock` protected map of handles to objects
#[derive(Debug)]
pub struct MemoryStore {
    objects: RwLock<Objects>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            objects: RwLock::new(Objects {
                next_handle: 1,
                map: BTreeMap::new(),
            }),
        }
    }

    /// Imports all objects found in a JSON objects file and returns
    /// the handles assigned to them, in file order
    pub fn load_json(&self, filename: &str) -> Result<Vec<CK_OBJECT_HANDLE>> {
        let jobjs = json_objects::JsonObjects::load(filename)?;
        jobjs.prime_store(self)
    }

    pub fn len(&self) -> usize {
        match self.objects.read() {
            Ok(o) => o.map.len(),
            Err(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for MemoryStore {
    fn resolve_handle(&self, handle: CK_OBJECT_HANDLE) -> Result<Object> {
        let objects = self.objects.read().map_err(Error::lookup_failed_lock)?;
        match objects.map.get(&handle) {
            Some(o) => Ok(o.clone()),
            None => Err(CKR_OBJECT_HANDLE_INVALID)?,
        }
    }

    fn insert(&self, mut obj: Object) -> Result<CK_OBJECT_HANDLE> {
        let mut objects =
            self.objects.write().map_err(Error::lookup_failed_lock)?;
        let handle = objects.next_handle;
        objects.next_handle += 1;
        obj.generate_unique();
        obj.set_handle(handle);
        objects.map.insert(handle, obj);
        Ok(handle)
    }

    fn remove(&self, handle: CK_OBJECT_HANDLE) -> Result<()> {
        let mut objects =
            self.objects.write().map_err(Error::lookup_failed_lock)?;
        match objects.map.remove(&handle) {
            Some(_) => Ok(()),
            None => Err(CKR_OBJECT_HANDLE_INVALID)?,
        }
    }

    fn search(&self, template: &[Attribute]) -> Result<Vec<CK_OBJECT_HANDLE>> {
        let objects = self.objects.read().map_err(Error::lookup_failed_lock)?;
        Ok(objects
            .map
            .iter()
            .filter(|(_, o)| o.match_template(template))
            .map(|(h, _)| *h)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_sequential_and_resolvable() {
        let store = MemoryStore::new();
        let h1 = store.insert(Object::with_class(CKO_PUBLIC_KEY)).unwrap();
        let h2 = store.insert(Object::with_class(CKO_PRIVATE_KEY)).unwrap();
        assert_eq!(h2, h1 + 1);

        let obj = store.resolve_handle(h2).unwrap();
        assert_eq!(obj.get_handle(), h2);
        assert_eq!(obj.get_class().unwrap(), CKO_PRIVATE_KEY);
        assert!(obj.get_attr(CKA_UNIQUE_ID).is_some());

        let found = store
            .search(&[Attribute::from_ulong(CKA_CLASS, CKO_PUBLIC_KEY)])
            .unwrap();
        assert_eq!(found, vec![h1]);

        store.remove(h1).unwrap();
        assert_eq!(
            store.resolve_handle(h1).unwrap_err().rv(),
            CKR_OBJECT_HANDLE_INVALID
        );
        assert_eq!(store.len(), 1);
    }
}
