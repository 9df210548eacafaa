// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! PKCS#11 API Vendor extensions

use crate::pkcs11::*;

pub const ECM_VENDOR_OFFSET: CK_ULONG = CKA_VENDOR_DEFINED + 485259;

/* Errors */
pub const ECR_CONFIG_ERROR: CK_RV = ECM_VENDOR_OFFSET + 3;
