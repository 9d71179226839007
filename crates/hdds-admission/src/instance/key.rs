// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Instance keys and the type-descriptor seam.
//!
//! The admission engine never looks inside a payload. It only asks a
//! [`TypeSupport`] for the key bytes of a sample and turns them into a
//! 16-byte [`KeyHash`]:
//!
//! - key bytes of at most 16 bytes are copied and zero-padded
//! - longer keys are hashed with MD5
//!
//! Keyless types map every sample to the all-zero hash, i.e. one instance.

use crate::error::{Error, Result};
use md5::{Digest, Md5};
use std::fmt;
use std::ops::Range;

/// 16-byte instance key hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct KeyHash(pub [u8; 16]);

impl KeyHash {
    /// Hash shared by every sample of a keyless type.
    pub const NIL: KeyHash = KeyHash([0u8; 16]);

    /// Compute the key hash of serialized key bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use hdds_admission::instance::KeyHash;
    ///
    /// let short = KeyHash::from_key_bytes(&[1, 2, 3]);
    /// assert_eq!(&short.as_bytes()[..4], &[1, 2, 3, 0]);
    /// ```
    pub fn from_key_bytes(key: &[u8]) -> Self {
        let mut out = [0u8; 16];
        if key.len() <= 16 {
            out[..key.len()].copy_from_slice(key);
        } else {
            let mut hasher = Md5::new();
            hasher.update(key);
            out.copy_from_slice(&hasher.finalize());
        }
        KeyHash(out)
    }

    /// Raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Debug for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyHash(")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

/// Type descriptor consumed by readers and writers.
///
/// Implementations extract the key fields of a serialized sample. They are
/// shared between threads, so extraction must not keep mutable state.
pub trait TypeSupport: Send + Sync {
    /// Registered type name (topics of the same name must agree on it).
    fn type_name(&self) -> &str;

    /// Whether samples carry key fields.
    fn is_keyed(&self) -> bool;

    /// Serialized key fields of `payload`.
    fn key_bytes(&self, payload: &[u8]) -> Result<Vec<u8>>;

    /// Instance key hash of `payload`.
    fn key_hash(&self, payload: &[u8]) -> Result<KeyHash> {
        if !self.is_keyed() {
            return Ok(KeyHash::NIL);
        }
        Ok(KeyHash::from_key_bytes(&self.key_bytes(payload)?))
    }
}

/// Type without key fields: all samples update a single instance.
#[derive(Debug, Clone)]
pub struct KeylessType {
    name: String,
}

impl KeylessType {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TypeSupport for KeylessType {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn is_keyed(&self) -> bool {
        false
    }

    fn key_bytes(&self, _payload: &[u8]) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// Type whose key fields sit at fixed byte ranges of the payload.
///
/// # Examples
///
/// ```
/// use hdds_admission::instance::{FieldKey, TypeSupport};
///
/// // 4-byte sensor id followed by the reading
/// let ty = FieldKey::new("SensorReading", vec![0..4]);
/// let a = ty.key_hash(&[0, 0, 0, 7, 42]).unwrap();
/// let b = ty.key_hash(&[0, 0, 0, 7, 99]).unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone)]
pub struct FieldKey {
    name: String,
    fields: Vec<Range<usize>>,
}

impl FieldKey {
    pub fn new(name: impl Into<String>, fields: Vec<Range<usize>>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

impl TypeSupport for FieldKey {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn is_keyed(&self) -> bool {
        !self.fields.is_empty()
    }

    fn key_bytes(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let mut key = Vec::with_capacity(self.fields.iter().map(|r| r.len()).sum());
        for range in &self.fields {
            let field = payload.get(range.clone()).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "{}: key field {:?} out of bounds (payload is {} bytes)",
                    self.name,
                    range,
                    payload.len()
                ))
            })?;
            key.extend_from_slice(field);
        }
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_key_is_padded() {
        let hash = KeyHash::from_key_bytes(&[0xde, 0xad]);
        let mut expected = [0u8; 16];
        expected[0] = 0xde;
        expected[1] = 0xad;
        assert_eq!(hash.0, expected);
    }

    #[test]
    fn test_long_key_is_md5() {
        let key = [7u8; 32];
        let hash = KeyHash::from_key_bytes(&key);
        let mut hasher = Md5::new();
        hasher.update(key);
        assert_eq!(hash.0.as_slice(), hasher.finalize().as_slice());
    }

    #[test]
    fn test_keyless_single_instance() {
        let ty = KeylessType::new("Heartbeat");
        assert_eq!(ty.key_hash(b"abc").expect("hash"), KeyHash::NIL);
        assert_eq!(ty.key_hash(b"xyz").expect("hash"), KeyHash::NIL);
    }

    #[test]
    fn test_field_key_multiple_ranges() {
        let ty = FieldKey::new("Pair", vec![0..1, 3..4]);
        let a = ty.key_hash(&[1, 9, 9, 2]).expect("hash");
        let b = ty.key_hash(&[1, 0, 0, 2]).expect("hash");
        let c = ty.key_hash(&[1, 0, 0, 3]).expect("hash");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_field_key_short_payload() {
        let ty = FieldKey::new("Sensor", vec![0..4]);
        assert!(matches!(
            ty.key_hash(&[1, 2]),
            Err(Error::InvalidArgument(_))
        ));
    }
}
