//! Durable key-value store contract and an in-memory implementation.

use std::collections::BTreeMap;

use thiserror::Error;

/// Application-scoped store key.
pub type StoreKey = u32;

/// Largest byte block a single key may hold.
pub const MAX_BLOCK_LEN: usize = 256;

/// Failures reported by a [`DurableStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Nothing is stored under the key.
    #[error("no value stored under key {0}")]
    Missing(StoreKey),
    /// The key holds a value of the other kind.
    #[error("key {key} does not hold {expected}")]
    KindMismatch {
        /// Key that was read.
        key: StoreKey,
        /// Kind the caller asked for.
        expected: ValueKind,
    },
    /// The block is larger than the store accepts per key.
    #[error("block of {len} bytes for key {key} exceeds the {max}-byte limit", max = MAX_BLOCK_LEN)]
    BlockTooLarge {
        /// Key being written.
        key: StoreKey,
        /// Rejected block length.
        len: usize,
    },
    /// The platform backend failed.
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Kinds of value a store entry may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ValueKind {
    /// A 32-bit integer.
    Int,
    /// A byte block.
    Block,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int => f.write_str("an integer"),
            Self::Block => f.write_str("a byte block"),
        }
    }
}

/// Persistent storage addressed by small integer keys.
pub trait DurableStore {
    /// Returns `true` when any value is stored under `key`.
    fn exists(&self, key: StoreKey) -> bool;

    /// Reads an integer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Missing`] or [`StoreError::KindMismatch`] when
    /// `key` holds no integer, or a backend error.
    fn read_int(&self, key: StoreKey) -> Result<u32, StoreError>;

    /// Stores an integer, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the value cannot be persisted.
    fn write_int(&mut self, key: StoreKey, value: u32) -> Result<(), StoreError>;

    /// Reads a block into `out` and returns the number of bytes copied, which
    /// is the smaller of the stored length and `out.len()`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Missing`] or [`StoreError::KindMismatch`] when
    /// `key` holds no block, or a backend error.
    fn read_block(&self, key: StoreKey, out: &mut [u8]) -> Result<usize, StoreError>;

    /// Stores a block, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BlockTooLarge`] for blocks over
    /// [`MAX_BLOCK_LEN`], or a backend error.
    fn write_block(&mut self, key: StoreKey, bytes: &[u8]) -> Result<(), StoreError>;

    /// Removes any value under `key`.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the removal cannot be persisted.
    fn delete(&mut self, key: StoreKey) -> Result<(), StoreError>;
}

/// One stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StoredValue {
    /// Integer entry.
    Int(u32),
    /// Byte-block entry.
    Block(Vec<u8>),
}

/// In-process store, also usable as a staging area for host persistence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemoryStore {
    entries: BTreeMap<StoreKey, StoredValue>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys holding a value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no key holds a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw access to an entry.
    #[must_use]
    pub fn get(&self, key: StoreKey) -> Option<&StoredValue> {
        self.entries.get(&key)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (StoreKey, &StoredValue)> + '_ {
        self.entries.iter().map(|(key, value)| (*key, value))
    }
}

impl DurableStore for MemoryStore {
    fn exists(&self, key: StoreKey) -> bool {
        self.entries.contains_key(&key)
    }

    fn read_int(&self, key: StoreKey) -> Result<u32, StoreError> {
        match self.entries.get(&key) {
            Some(StoredValue::Int(value)) => Ok(*value),
            Some(StoredValue::Block(_)) => Err(StoreError::KindMismatch {
                key,
                expected: ValueKind::Int,
            }),
            None => Err(StoreError::Missing(key)),
        }
    }

    fn write_int(&mut self, key: StoreKey, value: u32) -> Result<(), StoreError> {
        self.entries.insert(key, StoredValue::Int(value));
        Ok(())
    }

    fn read_block(&self, key: StoreKey, out: &mut [u8]) -> Result<usize, StoreError> {
        match self.entries.get(&key) {
            Some(StoredValue::Block(bytes)) => {
                let len = bytes.len().min(out.len());
                out[..len].copy_from_slice(&bytes[..len]);
                Ok(len)
            }
            Some(StoredValue::Int(_)) => Err(StoreError::KindMismatch {
                key,
                expected: ValueKind::Block,
            }),
            None => Err(StoreError::Missing(key)),
        }
    }

    fn write_block(&mut self, key: StoreKey, bytes: &[u8]) -> Result<(), StoreError> {
        if bytes.len() > MAX_BLOCK_LEN {
            return Err(StoreError::BlockTooLarge {
                key,
                len: bytes.len(),
            });
        }
        self.entries.insert(key, StoredValue::Block(bytes.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: StoreKey) -> Result<(), StoreError> {
        self.entries.remove(&key);
        Ok(())
    }
}

impl<S: DurableStore + ?Sized> DurableStore for &mut S {
    fn exists(&self, key: StoreKey) -> bool {
        (**self).exists(key)
    }

    fn read_int(&self, key: StoreKey) -> Result<u32, StoreError> {
        (**self).read_int(key)
    }

    fn write_int(&mut self, key: StoreKey, value: u32) -> Result<(), StoreError> {
        (**self).write_int(key, value)
    }

    fn read_block(&self, key: StoreKey, out: &mut [u8]) -> Result<usize, StoreError> {
        (**self).read_block(key, out)
    }

    fn write_block(&mut self, key: StoreKey, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).write_block(key, bytes)
    }

    fn delete(&mut self, key: StoreKey) -> Result<(), StoreError> {
        (**self).delete(key)
    }
}

#[cfg(test)]
mod tests {
    use super::{DurableStore, MemoryStore, StoreError, StoredValue, ValueKind, MAX_BLOCK_LEN};

    #[test]
    fn values_round_trip_by_kind() {
        let mut store = MemoryStore::new();
        store.write_int(0, 7).expect("int write");
        store.write_block(1, &[1, 2, 3]).expect("block write");

        assert!(store.exists(0));
        assert!(store.exists(1));
        assert!(!store.exists(2));
        assert_eq!(store.read_int(0), Ok(7));

        let mut out = [0_u8; 3];
        assert_eq!(store.read_block(1, &mut out), Ok(3));
        assert_eq!(out, [1, 2, 3]);
    }

    #[test]
    fn kind_mismatch_and_missing_are_reported() {
        let mut store = MemoryStore::new();
        store.write_int(0, 1).expect("int write");

        let mut out = [0_u8; 4];
        assert_eq!(
            store.read_block(0, &mut out),
            Err(StoreError::KindMismatch {
                key: 0,
                expected: ValueKind::Block
            })
        );
        assert_eq!(store.read_int(9), Err(StoreError::Missing(9)));
    }

    #[test]
    fn short_blocks_copy_only_what_is_stored() {
        let mut store = MemoryStore::new();
        store.write_block(4, &[9, 9]).expect("block write");

        let mut out = [0_u8; 4];
        assert_eq!(store.read_block(4, &mut out), Ok(2));
        assert_eq!(out, [9, 9, 0, 0]);
    }

    #[test]
    fn oversized_blocks_are_rejected() {
        let mut store = MemoryStore::new();
        let block = vec![0_u8; MAX_BLOCK_LEN + 1];
        assert_eq!(
            store.write_block(3, &block),
            Err(StoreError::BlockTooLarge {
                key: 3,
                len: MAX_BLOCK_LEN + 1
            })
        );
        assert!(store.is_empty());
    }

    #[test]
    fn rewrites_replace_and_delete_removes() {
        let mut store = MemoryStore::new();
        store.write_int(5, 1).expect("int write");
        store.write_block(5, &[4]).expect("block write");
        assert_eq!(store.get(5), Some(&StoredValue::Block(vec![4])));

        store.delete(5).expect("delete");
        assert!(!store.exists(5));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn error_messages_name_the_key() {
        assert_eq!(
            StoreError::KindMismatch {
                key: 2,
                expected: ValueKind::Int
            }
            .to_string(),
            "key 2 does not hold an integer"
        );
        assert_eq!(
            StoreError::BlockTooLarge { key: 1, len: 300 }.to_string(),
            "block of 300 bytes for key 1 exceeds the 256-byte limit"
        );
    }
}
