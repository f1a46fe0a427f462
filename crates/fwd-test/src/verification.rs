//! Verification helpers for query results
//!
//! Query order is not stable, so results are compared as sets.

use std::collections::BTreeMap;

use fwd_bpfmap::Kv;
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Expected key {key:02x?} not found in query result")]
    KeyNotFound { key: Vec<u8> },

    #[error("Unexpected key {key:02x?} in query result")]
    UnexpectedKey { key: Vec<u8> },

    #[error("Value mismatch for {key:02x?}: expected {expected:02x?}, got {actual:02x?}")]
    ValueMismatch {
        key: Vec<u8>,
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    #[error("Key {key:02x?} reported {count} times")]
    DuplicateKey { key: Vec<u8>, count: usize },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Checks that `actual` holds exactly the entries of `expected`, in any order.
pub fn assert_same_entries(actual: &[Kv], expected: &[Kv]) -> VerifyResult<()> {
    let mut got: BTreeMap<&[u8], &[u8]> = BTreeMap::new();
    for kv in actual {
        if got.insert(&kv.key, &kv.value).is_some() {
            return Err(VerificationError::DuplicateKey {
                key: kv.key.clone(),
                count: actual.iter().filter(|o| o.key == kv.key).count(),
            });
        }
    }

    for kv in expected {
        match got.remove(kv.key.as_slice()) {
            None => return Err(VerificationError::KeyNotFound { key: kv.key.clone() }),
            Some(value) if value != kv.value.as_slice() => {
                return Err(VerificationError::ValueMismatch {
                    key: kv.key.clone(),
                    expected: kv.value.clone(),
                    actual: value.to_vec(),
                })
            }
            Some(_) => {}
        }
    }

    match got.into_keys().next() {
        Some(key) => Err(VerificationError::UnexpectedKey { key: key.to_vec() }),
        None => Ok(()),
    }
}
