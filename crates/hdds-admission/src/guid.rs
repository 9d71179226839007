// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer GUID (Globally Unique Identifier).
//!
//! Besides identifying a writer, the GUID is the tie-break key of
//! BY_SOURCE_TIMESTAMP destination ordering: when two samples carry the same
//! source timestamp, the one from the numerically *lower* GUID wins. The
//! derived `Ord` compares prefix bytes first, then entity id bytes, which is
//! the big-endian numeric order of the 16-byte value.

use std::fmt;

/// GUID of a writer or reader endpoint.
///
/// # Structure
/// - Prefix: 12 bytes (participant unique)
/// - Entity ID: 4 bytes (entity within participant)
///
/// # Display Format
/// Hex with dots: "01.0f.ac.10.00.00.00.00.00.00.00.01.00.00.01.c1"
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct GUID {
    pub prefix: [u8; 12],
    pub entity_id: [u8; 4],
}

impl GUID {
    /// Create GUID from raw bytes (16 bytes total)
    ///
    /// # Examples
    /// ```
    /// use hdds_admission::GUID;
    ///
    /// let bytes = [1, 15, 172, 16, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 2];
    /// let guid = GUID::from_bytes(bytes);
    /// assert_eq!(guid.as_bytes(), bytes);
    /// ```
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let mut prefix = [0u8; 12];
        let mut entity_id = [0u8; 4];
        prefix.copy_from_slice(&bytes[0..12]);
        entity_id.copy_from_slice(&bytes[12..16]);
        Self { prefix, entity_id }
    }

    /// Create GUID from separate prefix and entity ID
    pub fn new(prefix: [u8; 12], entity_id: [u8; 4]) -> Self {
        Self { prefix, entity_id }
    }

    /// Create GUID for the `key`-th entity under `prefix`.
    ///
    /// Entity keys are encoded big-endian so that entities created later
    /// compare greater than entities created earlier.
    pub fn from_entity_key(prefix: [u8; 12], key: u32) -> Self {
        Self {
            prefix,
            entity_id: key.to_be_bytes(),
        }
    }

    /// Convert GUID to 16-byte array
    pub fn as_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0..12].copy_from_slice(&self.prefix);
        bytes[12..16].copy_from_slice(&self.entity_id);
        bytes
    }

    /// Create GUID with all zeros (invalid/placeholder)
    pub fn zero() -> Self {
        Self {
            prefix: [0; 12],
            entity_id: [0; 4],
        }
    }

    /// Check if GUID is zero (invalid)
    pub fn is_zero(&self) -> bool {
        self.prefix.iter().all(|&b| b == 0) && self.entity_id.iter().all(|&b| b == 0)
    }
}

impl fmt::Display for GUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.prefix.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        for byte in &self.entity_id {
            write!(f, ".{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for GUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GUID({})", self)
    }
}
