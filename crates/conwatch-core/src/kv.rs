//! Key-value persistence primitive shared by every context.
//!
//! Values are JSON documents stored as text. The only mutating primitive is
//! [`KeyValueStore::read_modify_write`], which holds the backend lock for the
//! whole read, compute and write sequence so concurrent writers cannot lose
//! each other's updates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ConwatchError;

/// Result of the closure passed to [`KeyValueStore::read_modify_write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    /// Replace the stored value.
    Put(String),
    /// Leave the stored value untouched.
    Keep,
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ConwatchError>;

    /// Atomically read `key`, compute its replacement, and write it back.
    ///
    /// If `f` fails, nothing is written and the error is returned.
    fn read_modify_write(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&str>) -> Result<Write, ConwatchError>,
    ) -> Result<(), ConwatchError>;
}

/// Decode the JSON value at `key`, or `T::default()` when absent.
pub fn get_json<T, S>(store: &S, key: &str) -> Result<T, ConwatchError>
where
    T: DeserializeOwned + Default,
    S: KeyValueStore + ?Sized,
{
    match store.get(key)? {
        Some(raw) => decode(key, &raw),
        None => Ok(T::default()),
    }
}

/// Typed read-modify-write. `f` returns `Some(new)` to write, `None` to keep.
pub fn update_json<T, S, R>(
    store: &S,
    key: &str,
    mut f: impl FnMut(T) -> Option<(T, R)>,
) -> Result<Option<R>, ConwatchError>
where
    T: DeserializeOwned + Serialize + Default,
    S: KeyValueStore + ?Sized,
{
    let mut out = None;
    store.read_modify_write(key, &mut |current| {
        let value = match current {
            Some(raw) => decode(key, raw)?,
            None => T::default(),
        };
        match f(value) {
            Some((next, result)) => {
                let encoded = serde_json::to_string(&next).map_err(|source| {
                    ConwatchError::Encode {
                        key: key.to_string(),
                        source,
                    }
                })?;
                out = Some(result);
                Ok(Write::Put(encoded))
            }
            None => {
                out = None;
                Ok(Write::Keep)
            }
        }
    })?;
    Ok(out)
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, ConwatchError> {
    serde_json::from_str(raw).map_err(|source| ConwatchError::Corrupt {
        key: key.to_string(),
        source,
    })
}

/// Process-local store. Can be taken offline to exercise failure paths.
#[derive(Debug)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the backing storage going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), ConwatchError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ConwatchError::StorageUnavailable(
                "memory store is offline".into(),
            ))
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConwatchError> {
        self.ensure_available()?;
        let values = self
            .values
            .lock()
            .map_err(|_| ConwatchError::StorageUnavailable("memory store lock poisoned".into()))?;
        Ok(values.get(key).cloned())
    }

    fn read_modify_write(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&str>) -> Result<Write, ConwatchError>,
    ) -> Result<(), ConwatchError> {
        self.ensure_available()?;
        let mut values = self
            .values
            .lock()
            .map_err(|_| ConwatchError::StorageUnavailable("memory store lock poisoned".into()))?;
        if let Write::Put(next) = f(values.get(key).map(String::as_str))? {
            values.insert(key.to_string(), next);
        }
        Ok(())
    }
}
