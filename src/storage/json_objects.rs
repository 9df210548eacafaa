// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

use crate::attribute::{AttrType, Attribute};
use crate::error::{Error, Result};
use crate::object::{Object, ObjectStore};
use crate::pkcs11::*;

use data_encoding::BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_string_pretty, Map, Number, Value};

fn not_found(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::ck_rv_from_error(CKR_TOKEN_NOT_RECOGNIZED, e)
    } else {
        Error::other_error(e)
    }
}

fn to_json_value(a: &Attribute) -> Value {
    match a.get_attrtype() {
        AttrType::BoolType => match a.to_bool() {
            Ok(b) => Value::Bool(b),
            Err(_) => Value::Null,
        },
        AttrType::NumType => match a.to_ulong() {
            Ok(l) => Value::Number(Number::from(l)),
            Err(_) => Value::Null,
        },
        AttrType::StringType => match a.to_string() {
            Ok(s) => Value::String(s),
            Err(_) => Value::String(BASE64.encode(a.get_value())),
        },
        AttrType::BytesType => Value::String(BASE64.encode(a.get_value())),
    }
}

fn from_json_value(
    id: CK_ULONG,
    atype: AttrType,
    val: &Value,
) -> Result<Attribute> {
    Ok(match atype {
        AttrType::BoolType => match val.as_bool() {
            Some(b) => Attribute::from_bool(id, b),
            None => return Err(CKR_ATTRIBUTE_VALUE_INVALID)?,
        },
        AttrType::NumType => match val.as_u64() {
            Some(n) => Attribute::from_u64(id, n)?,
            None => return Err(CKR_ATTRIBUTE_VALUE_INVALID)?,
        },
        AttrType::StringType => match val.as_str() {
            Some(s) => Attribute::from_string(id, s.to_string()),
            None => return Err(CKR_ATTRIBUTE_VALUE_INVALID)?,
        },
        AttrType::BytesType => match val.as_str() {
            Some(s) => match BASE64.decode(s.as_bytes()) {
                Ok(v) => Attribute::from_bytes(id, v),
                Err(e) => {
                    return Err(Error::ck_rv_from_error(
                        CKR_ATTRIBUTE_VALUE_INVALID,
                        e,
                    ))
                }
            },
            None => return Err(CKR_ATTRIBUTE_VALUE_INVALID)?,
        },
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonObject {
    attributes: Map<String, Value>,
}

impl JsonObject {
    pub fn from_object(o: &Object) -> JsonObject {
        let mut jo = JsonObject {
            attributes: Map::new(),
        };
        for a in o.get_attributes() {
            jo.attributes.insert(a.name(), to_json_value(a));
        }
        jo
    }

    pub fn to_object(&self) -> Result<Object> {
        let mut obj = Object::new();
        for (key, val) in &self.attributes {
            let (id, atype) = AttrType::attr_name_to_id_type(key)?;
            obj.set_attr(from_json_value(id, atype, val)?)?;
        }
        match obj.get_class() {
            Ok(CKO_PRIVATE_KEY) | Ok(CKO_SECRET_KEY) => obj.set_zeroize(),
            _ => (),
        }
        Ok(obj)
    }
}

/// The on-disk list of objects: `{"objects":[{"attributes":{...}}]}`
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonObjects {
    objects: Vec<JsonObject>,
}

impl JsonObjects {
    pub fn load(filename: &str) -> Result<JsonObjects> {
        match std::fs::File::open(filename) {
            Ok(f) => Ok(from_reader::<std::fs::File, JsonObjects>(f)?),
            Err(e) => Err(not_found(e)),
        }
    }

    pub fn parse(data: &str) -> Result<JsonObjects> {
        Ok(serde_json::from_str::<JsonObjects>(data)?)
    }

    pub fn prime_store(
        &self,
        store: &dyn ObjectStore,
    ) -> Result<Vec<CK_OBJECT_HANDLE>> {
        let mut handles = Vec::with_capacity(self.objects.len());
        for jo in &self.objects {
            handles.push(store.insert(jo.to_object()?)?);
        }
        Ok(handles)
    }

    pub fn from_store(store: &dyn ObjectStore) -> Result<JsonObjects> {
        let handles = store.search(&[])?;
        let mut jt = JsonObjects {
            objects: Vec::with_capacity(handles.len()),
        };
        for h in handles {
            jt.objects
                .push(JsonObject::from_object(&store.resolve_handle(h)?));
        }
        Ok(jt)
    }

    pub fn save(&self, filename: &str) -> Result<()> {
        let jstr = to_string_pretty(&self)?;
        std::fs::write(filename, jstr)?;
        Ok(())
    }
}
