// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! Error type shared by every layer of the mechanism engine.
//!
//! Each [Error] carries the `CK_RV` that is eventually handed back to
//! the PKCS#11 caller together with an [ErrorKind] classification so
//! that internal code can reason about failures (for example to tell a
//! retryable `CKR_BUFFER_TOO_SMALL` apart from a fatal backend error)
//! without matching on raw return values.

use std::error;
use std::fmt;

use crate::pkcs11::vendor::ECR_CONFIG_ERROR;
use crate::pkcs11::*;

pub type Result<T> = std::result::Result<T, Error>;

/// Classification of failures surfaced by the engine
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[non_exhaustive]
pub enum ErrorKind {
    /* A required input (session, context, buffer) was absent */
    InvalidArgument,
    /* The key handle could not be resolved to an object */
    KeyHandleInvalid,
    /* A required attribute is missing or the lookup failed */
    AttributeLookupFailed,
    /* The key object class does not allow the operation */
    KeyRoleMismatch,
    /* Output buffer too small, the call can be retried */
    BufferTooSmall,
    /* The signature is longer than the key can ever produce */
    SignatureLengthOutOfRange,
    /* The cryptographic backend failed */
    BackendFailure,
    /* The backend rejected the signature */
    SignatureInvalid,
    /* Calls issued out of sequence */
    ProtocolViolation,
    /* Unknown or unusable mechanism */
    MechanismInvalid,
    /* Anything else, see the CK_RV */
    General,
}

impl ErrorKind {
    /// Classifies a raw Cryptoki return value
    pub fn from_rv(ckrv: CK_RV) -> ErrorKind {
        match ckrv {
            CKR_ARGUMENTS_BAD => ErrorKind::InvalidArgument,
            CKR_KEY_HANDLE_INVALID | CKR_OBJECT_HANDLE_INVALID => {
                ErrorKind::KeyHandleInvalid
            }
            CKR_ATTRIBUTE_TYPE_INVALID
            | CKR_ATTRIBUTE_VALUE_INVALID
            | CKR_TEMPLATE_INCOMPLETE => ErrorKind::AttributeLookupFailed,
            CKR_KEY_FUNCTION_NOT_PERMITTED | CKR_KEY_TYPE_INCONSISTENT => {
                ErrorKind::KeyRoleMismatch
            }
            CKR_BUFFER_TOO_SMALL => ErrorKind::BufferTooSmall,
            CKR_SIGNATURE_LEN_RANGE => ErrorKind::SignatureLengthOutOfRange,
            CKR_DEVICE_ERROR | CKR_DEVICE_MEMORY | CKR_DATA_LEN_RANGE => {
                ErrorKind::BackendFailure
            }
            CKR_SIGNATURE_INVALID => ErrorKind::SignatureInvalid,
            CKR_OPERATION_ACTIVE | CKR_OPERATION_NOT_INITIALIZED => {
                ErrorKind::ProtocolViolation
            }
            CKR_MECHANISM_INVALID | CKR_MECHANISM_PARAM_INVALID => {
                ErrorKind::MechanismInvalid
            }
            _ => ErrorKind::General,
        }
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    origin: Option<Box<dyn error::Error + Send + Sync>>,
    errmsg: Option<String>,
    ckrv: CK_RV,
}

impl Error {
    pub fn ck_rv(ckrv: CK_RV) -> Error {
        Error {
            kind: ErrorKind::from_rv(ckrv),
            origin: None,
            errmsg: None,
            ckrv: ckrv,
        }
    }

    pub fn ck_rv_from_error<E>(ckrv: CK_RV, error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Error {
            kind: ErrorKind::from_rv(ckrv),
            origin: Some(error.into()),
            errmsg: None,
            ckrv: ckrv,
        }
    }

    pub fn ck_rv_with_errmsg(ckrv: CK_RV, errmsg: String) -> Error {
        Error {
            kind: ErrorKind::from_rv(ckrv),
            origin: None,
            errmsg: Some(errmsg),
            ckrv: ckrv,
        }
    }

    /// A required attribute is not present on the object
    pub fn not_found(errmsg: String) -> Error {
        Error {
            kind: ErrorKind::AttributeLookupFailed,
            origin: None,
            errmsg: Some(errmsg),
            ckrv: CKR_FUNCTION_FAILED,
        }
    }

    /// The attribute lookup mechanism itself failed
    pub fn lookup_failed<E>(error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Error {
            kind: ErrorKind::AttributeLookupFailed,
            origin: Some(error.into()),
            errmsg: None,
            ckrv: CKR_FUNCTION_FAILED,
        }
    }

    /// The store lock was poisoned while looking up an object
    pub fn lookup_failed_lock<T>(error: std::sync::PoisonError<T>) -> Error {
        Error {
            kind: ErrorKind::AttributeLookupFailed,
            origin: None,
            errmsg: Some(error.to_string()),
            ckrv: CKR_GENERAL_ERROR,
        }
    }

    /// A mandatory input was absent
    pub fn invalid_argument(errmsg: &str) -> Error {
        Error {
            kind: ErrorKind::InvalidArgument,
            origin: None,
            errmsg: Some(errmsg.to_string()),
            ckrv: CKR_FUNCTION_FAILED,
        }
    }

    /// A context was driven out of sequence (update before init, double
    /// final, ...)
    pub fn violation(errmsg: &str) -> Error {
        Error {
            kind: ErrorKind::ProtocolViolation,
            origin: None,
            errmsg: Some(errmsg.to_string()),
            ckrv: CKR_FUNCTION_FAILED,
        }
    }

    /// Wraps a failure reported by a cryptographic backend
    pub fn backend<E>(error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Error {
            kind: ErrorKind::BackendFailure,
            origin: Some(error.into()),
            errmsg: None,
            ckrv: CKR_DEVICE_ERROR,
        }
    }

    pub fn other_error<E>(error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Error {
            kind: ErrorKind::General,
            origin: Some(error.into()),
            errmsg: None,
            ckrv: CKR_GENERAL_ERROR,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn attr_not_found(&self) -> bool {
        self.kind == ErrorKind::AttributeLookupFailed
            && self.origin.is_none()
            && self.ckrv == CKR_FUNCTION_FAILED
    }

    /// Only a short buffer leaves operation state untouched
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::BufferTooSmall
    }

    pub fn rv(&self) -> CK_RV {
        self.ckrv
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref e) = self.errmsg {
            return write!(f, "{} [{:?}: 0x{:08x}]", e, self.kind, self.ckrv);
        }
        if let Some(ref e) = self.origin {
            return write!(f, "{} [{:?}: 0x{:08x}]", e, self.kind, self.ckrv);
        }
        write!(f, "{:?}: 0x{:08x}", self.kind, self.ckrv)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.origin {
            Some(e) => {
                Some(e.as_ref() as &(dyn error::Error + 'static))
            }
            None => None,
        }
    }
}

impl From<CK_RV> for Error {
    fn from(ckrv: CK_RV) -> Error {
        Error::ck_rv(ckrv)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::other_error(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::other_error(error)
    }
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Error {
        Error::ck_rv_from_error(ECR_CONFIG_ERROR, error)
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(error: std::num::TryFromIntError) -> Error {
        Error::other_error(error)
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(error: std::convert::Infallible) -> Error {
        match error {}
    }
}

/// Helper for `map_err()` when any failure is a general error
pub fn general_error<E>(error: E) -> Error
where
    E: Into<Box<dyn error::Error + Send + Sync>>,
{
    Error::ck_rv_from_error(CKR_GENERAL_ERROR, error)
}

/// Helper for `map_err()` when any failure is a device error
pub fn device_error<E>(error: E) -> Error
where
    E: Into<Box<dyn error::Error + Send + Sync>>,
{
    Error::backend(error)
}

macro_rules! some_or_err {
    ($action:expr) => {
        if let Some(ref x) = $action {
            x
        } else {
            return Err($crate::error::Error::ck_rv(
                $crate::pkcs11::CKR_GENERAL_ERROR,
            ));
        }
    };
    (mut $action:expr) => {
        if let Some(ref mut x) = $action {
            x
        } else {
            return Err($crate::error::Error::ck_rv(
                $crate::pkcs11::CKR_GENERAL_ERROR,
            ));
        }
    };
}
pub(crate) use some_or_err;
