// Copyright 2023-2026 Simo Sorce
// See LICENSE.txt file for terms

//! This module defines the representation of PKCS#11 objects (`Object`)
//! as seen by the mechanism layer and the [ObjectStore] interface the
//! layer consults to resolve key handles and look up attributes. The
//! store itself (templates, persistence, access control) lives outside
//! the mechanism engine; an in-memory implementation is provided by
//! [crate::storage].

use std::fmt::Debug;

use crate::attribute::{AttrType, Attribute};
use crate::error::{Error, Result};
use crate::pkcs11::*;

use uuid::Uuid;

pub mod key;

pub use key::{validate_role, KeyRole};

/// Helper macro that generates methods to retrieve attributes
/// values of a specific type from objects
macro_rules! attr_as_type {
    (make $name:ident; with $r:ty; $atype:ident; via $conv:ident) => {
        #[doc = concat!("Returns the value of the attribute as a `", stringify!($r), "`")]
        pub fn $name(&self, t: CK_ULONG) -> Result<$r> {
            for attr in &self.attributes {
                if attr.get_type() == t {
                    if attr.get_attrtype() != AttrType::$atype {
                        return Err(CKR_ATTRIBUTE_TYPE_INVALID)?;
                    }
                    return attr.$conv();
                }
            }
            Err(Error::not_found(t.to_string()))
        }
    };
}

/// This is a generic container for all PKCS#11 Objects
/// For Key objects it is possible to set the zeroize feature which
/// will cause zeroization of every attribute when the object is dropped.
#[derive(Debug, Clone)]
pub struct Object {
    /// The object handle value
    ///
    /// Is CK_INVALID_HANDLE until the object is stored
    handle: CK_OBJECT_HANDLE,
    /// The object attributes as vector of [Attribute] values
    attributes: Vec<Attribute>,
    /// Zeroize every attribute on drop
    zeroize: bool,
}

impl Drop for Object {
    fn drop(&mut self) {
        if self.zeroize {
            for a in self.attributes.iter_mut() {
                a.zeroize()
            }
        }
    }
}

impl Default for Object {
    fn default() -> Self {
        Object::new()
    }
}

impl Object {
    /// Creates a new empty Object
    pub fn new() -> Object {
        Object {
            handle: CK_INVALID_HANDLE,
            attributes: Vec::new(),
            zeroize: false,
        }
    }

    /// Creates a new Object of the given class
    pub fn with_class(class: CK_OBJECT_CLASS) -> Object {
        let mut obj = Object::new();
        obj.attributes.push(Attribute::from_ulong(CKA_CLASS, class));
        if class == CKO_PRIVATE_KEY || class == CKO_SECRET_KEY {
            obj.set_zeroize();
        }
        obj
    }

    /// Set zeroization for the whole object
    pub fn set_zeroize(&mut self) {
        self.zeroize = true;
    }

    /// Generates the internal per object unique id
    pub fn generate_unique(&mut self) {
        if !self
            .attributes
            .iter()
            .any(|r| r.get_type() == CKA_UNIQUE_ID)
        {
            let uuid = Uuid::new_v4().to_string();
            self.attributes
                .push(Attribute::from_string(CKA_UNIQUE_ID, uuid));
        }
    }

    /// Set the handle the object is known by
    pub fn set_handle(&mut self, h: CK_OBJECT_HANDLE) {
        self.handle = h
    }

    /// Gets the object's handle
    pub fn get_handle(&self) -> CK_OBJECT_HANDLE {
        self.handle
    }

    /// Gets the object's class
    pub fn get_class(&self) -> Result<CK_OBJECT_CLASS> {
        self.get_attr_as_ulong(CKA_CLASS)
    }

    /// Get an attribute from the object by attribute id
    pub fn get_attr(&self, ck_type: CK_ULONG) -> Option<&Attribute> {
        self.attributes.iter().find(|r| r.get_type() == ck_type)
    }

    /// Sets or Replaces an attribute on the object
    pub fn set_attr(&mut self, a: Attribute) -> Result<()> {
        let atype = a.get_type();
        if atype == CKA_CLASS {
            match a.to_ulong()? {
                CKO_PRIVATE_KEY | CKO_SECRET_KEY => self.zeroize = true,
                _ => (),
            }
        }
        match self.attributes.iter().position(|r| r.get_type() == atype) {
            Some(idx) => self.attributes[idx] = a,
            None => self.attributes.push(a),
        }
        Ok(())
    }

    /// Gets a reference to the internal vector of object attributes
    pub fn get_attributes(&self) -> &Vec<Attribute> {
        &self.attributes
    }

    attr_as_type! {make get_attr_as_bool; with bool; BoolType; via to_bool}
    attr_as_type! {make get_attr_as_ulong; with CK_ULONG; NumType; via to_ulong}
    attr_as_type! {make get_attr_as_string; with String; StringType; via to_string}
    attr_as_type! {make get_attr_as_bytes; with &Vec<u8>; BytesType; via to_bytes}

    /// Checks that every attribute in the template is present on the
    /// object with the same value
    pub fn match_template(&self, template: &[Attribute]) -> bool {
        template.iter().all(|t| self.attributes.iter().any(|a| a == t))
    }

    /// Ensures that a ulong attribute is present with the given value.
    ///
    /// If the attribute already exists with a different value
    /// `CKR_ATTRIBUTE_VALUE_INVALID` is returned, otherwise it is added.
    pub fn ensure_ulong(
        &mut self,
        name: CK_ATTRIBUTE_TYPE,
        value: CK_ULONG,
    ) -> Result<()> {
        match self.attributes.iter().find(|r| r.get_type() == name) {
            Some(a) => {
                if a.to_ulong()? != value {
                    return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
                }
                Ok(())
            }
            None => self.set_attr(Attribute::from_ulong(name, value)),
        }
    }

    /// Ensures that a bytes attribute is present with the given value
    pub fn ensure_slice(
        &mut self,
        name: CK_ATTRIBUTE_TYPE,
        value: &[u8],
    ) -> Result<()> {
        match self.attributes.iter().find(|r| r.get_type() == name) {
            Some(a) => {
                if a.to_bytes()?.as_slice() != value {
                    return Err(CKR_ATTRIBUTE_VALUE_INVALID)?;
                }
                Ok(())
            }
            None => self.set_attr(Attribute::from_bytes(name, value.to_vec())),
        }
    }
}

/// The object store consulted by the mechanism layer
///
/// Implementations must be safe to share across sessions; the mechanism
/// layer never holds a lock on the store across calls.
pub trait ObjectStore: Debug + Send + Sync {
    /// Resolves a handle to a snapshot of the object.
    ///
    /// Unknown handles must fail with `CKR_OBJECT_HANDLE_INVALID`, any
    /// other error is reported as is.
    fn resolve_handle(&self, handle: CK_OBJECT_HANDLE) -> Result<Object>;

    /// Looks up an attribute on the object, `Ok(None)` when absent
    fn find_attribute(
        &self,
        obj: &Object,
        id: CK_ATTRIBUTE_TYPE,
    ) -> Result<Option<Attribute>> {
        Ok(obj.get_attr(id).cloned())
    }

    /// Stores a new object and returns its handle
    fn insert(&self, obj: Object) -> Result<CK_OBJECT_HANDLE>;

    /// Removes an object, unknown handles are reported as invalid
    fn remove(&self, handle: CK_OBJECT_HANDLE) -> Result<()>;

    /// Returns the handles of all objects matching the template
    fn search(&self, template: &[Attribute]) -> Result<Vec<CK_OBJECT_HANDLE>>;
}
