/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Error type and error codes shared by the provisioning engine and its
    collaborators.

--*/
#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Provisioning Error Type
/// Derives debug, copy, clone, eq, and partial eq
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ProvError(pub NonZeroU32);

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: ProvError = ProvError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl ProvError {
    /// Create a provisioning error; intended to only be used from const contexts, as we don't
    /// want runtime panics if val is zero. The preferred way to get a ProvError from a u32 is
    /// to use `ProvError::try_from()` from the `TryFrom` trait impl.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("ProvError cannot be 0"),
        }
    }

    define_error_constants![
        (NULL_POINTER, 0x0001_0001, "A required argument is missing"),
        (
            INVALID_ARGS,
            0x0001_0002,
            "Malformed or out-of-range input, including chain parse overruns and identity mismatches"
        ),
        (
            INVALID_STATE,
            0x0001_0003,
            "Operation invoked before its prerequisite steps completed"
        ),
        (NOSUPPORT, 0x0001_0004, "Unknown or unsupported algorithm"),
        (OUT_OF_MEMORY, 0x0001_0005, "Arena or scratch allocation failure"),
        (GENERIC, 0x0001_0006, "Signature verification failure"),
        (
            STORAGE_ERASE_FAIL,
            0x0001_0007,
            "Manufacturing store could not be erased"
        ),
        (
            STORAGE_WRITE_FAIL,
            0x0001_0008,
            "Manufacturing store field write or read-back failed"
        ),
        (
            MFG_STORE_UNKNOWN_FIELD,
            0x0002_0001,
            "Manufacturing store: unknown field identifier"
        ),
        (
            MFG_STORE_OUT_OF_SPACE,
            0x0002_0002,
            "Manufacturing store: record does not fit the region"
        ),
        (
            MFG_STORE_FIELD_NOT_FOUND,
            0x0002_0003,
            "Manufacturing store: field not present"
        ),
        (
            MFG_STORE_LENGTH_MISMATCH,
            0x0002_0004,
            "Manufacturing store: field length differs from request"
        ),
        (
            MFG_STORE_ERASE_FAILURE,
            0x0002_0005,
            "Manufacturing store: erase primitive failed"
        ),
        (
            MFG_STORE_WRITE_FAILURE,
            0x0002_0006,
            "Manufacturing store: field already written since last erase"
        ),
    ];

    /// Codes a caller of the provisioning API can observe. Collaborator codes are
    /// mapped onto these before they leave the engine.
    pub const PUBLIC: [ProvError; 8] = [
        Self::NULL_POINTER,
        Self::INVALID_ARGS,
        Self::INVALID_STATE,
        Self::NOSUPPORT,
        Self::OUT_OF_MEMORY,
        Self::GENERIC,
        Self::STORAGE_ERASE_FAIL,
        Self::STORAGE_WRITE_FAIL,
    ];

    /// Returns true for the codes a caller of the provisioning API can observe.
    pub fn is_public(self) -> bool {
        Self::PUBLIC.contains(&self)
    }
}

impl From<core::num::NonZeroU32> for crate::ProvError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::ProvError(val)
    }
}

impl From<ProvError> for core::num::NonZeroU32 {
    fn from(val: ProvError) -> Self {
        val.0
    }
}

impl From<ProvError> for u32 {
    fn from(val: ProvError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for ProvError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(ProvError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type ProvResult<T> = Result<T, ProvError>;
