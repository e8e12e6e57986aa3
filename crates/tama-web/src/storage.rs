use tama_harness::{DurableStore, StoreError, StoreKey, StoredValue, ValueKind, MAX_BLOCK_LEN};
use wasm_bindgen::JsValue;

/// Item-name prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "tama:";

/// [`DurableStore`] over `window.localStorage`.
///
/// Each key becomes one string item named `<prefix><key>`. Integers are
/// stored as `i:<decimal>`, blocks as `b:<lowercase hex>`.
#[derive(Debug, Clone)]
pub struct LocalStorageStore {
    storage: web_sys::Storage,
    prefix: String,
}

impl LocalStorageStore {
    /// Opens the page's local storage under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when there is no window or local
    /// storage is disabled.
    pub fn open(prefix: impl Into<String>) -> Result<Self, StoreError> {
        let window =
            web_sys::window().ok_or_else(|| StoreError::Backend("no window object".to_owned()))?;
        let storage = window
            .local_storage()
            .map_err(|error| backend_error(&error))?
            .ok_or_else(|| StoreError::Backend("localStorage is unavailable".to_owned()))?;
        Ok(Self {
            storage,
            prefix: prefix.into(),
        })
    }

    fn item_name(&self, key: StoreKey) -> String {
        format!("{}{key}", self.prefix)
    }

    fn entry(&self, key: StoreKey) -> Result<StoredValue, StoreError> {
        let raw = self
            .storage
            .get_item(&self.item_name(key))
            .map_err(|error| backend_error(&error))?
            .ok_or(StoreError::Missing(key))?;
        decode_value(&raw)
            .ok_or_else(|| StoreError::Backend(format!("corrupt entry under key {key}")))
    }

    fn put(&self, key: StoreKey, encoded: &str) -> Result<(), StoreError> {
        self.storage
            .set_item(&self.item_name(key), encoded)
            .map_err(|error| backend_error(&error))
    }
}

impl DurableStore for LocalStorageStore {
    fn exists(&self, key: StoreKey) -> bool {
        matches!(self.storage.get_item(&self.item_name(key)), Ok(Some(_)))
    }

    fn read_int(&self, key: StoreKey) -> Result<u32, StoreError> {
        match self.entry(key)? {
            StoredValue::Int(value) => Ok(value),
            StoredValue::Block(_) => Err(StoreError::KindMismatch {
                key,
                expected: ValueKind::Int,
            }),
        }
    }

    fn write_int(&mut self, key: StoreKey, value: u32) -> Result<(), StoreError> {
        self.put(key, &encode_int(value))
    }

    fn read_block(&self, key: StoreKey, out: &mut [u8]) -> Result<usize, StoreError> {
        match self.entry(key)? {
            StoredValue::Block(bytes) => {
                let len = bytes.len().min(out.len());
                out[..len].copy_from_slice(&bytes[..len]);
                Ok(len)
            }
            StoredValue::Int(_) => Err(StoreError::KindMismatch {
                key,
                expected: ValueKind::Block,
            }),
        }
    }

    fn write_block(&mut self, key: StoreKey, bytes: &[u8]) -> Result<(), StoreError> {
        if bytes.len() > MAX_BLOCK_LEN {
            return Err(StoreError::BlockTooLarge {
                key,
                len: bytes.len(),
            });
        }
        self.put(key, &encode_block(bytes))
    }

    fn delete(&mut self, key: StoreKey) -> Result<(), StoreError> {
        self.storage
            .remove_item(&self.item_name(key))
            .map_err(|error| backend_error(&error))
    }
}

fn backend_error(value: &JsValue) -> StoreError {
    StoreError::Backend(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

/// Encodes an integer entry.
#[must_use]
pub fn encode_int(value: u32) -> String {
    format!("i:{value}")
}

/// Encodes a block entry as lowercase hex.
#[must_use]
pub fn encode_block(bytes: &[u8]) -> String {
    const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

    let mut encoded = String::with_capacity(2 + bytes.len() * 2);
    encoded.push_str("b:");
    for byte in bytes {
        encoded.push(char::from(HEX_DIGITS[usize::from(byte >> 4)]));
        encoded.push(char::from(HEX_DIGITS[usize::from(byte & 0xF)]));
    }
    encoded
}

/// Decodes an entry written by [`encode_int`] or [`encode_block`].
#[must_use]
pub fn decode_value(raw: &str) -> Option<StoredValue> {
    if let Some(digits) = raw.strip_prefix("i:") {
        return digits.parse().ok().map(StoredValue::Int);
    }
    let hex = raw.strip_prefix("b:")?;
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|at| u8::from_str_radix(hex.get(at..at + 2)?, 16).ok())
        .collect::<Option<Vec<_>>>()
        .map(StoredValue::Block)
}
