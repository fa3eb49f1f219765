//! Client-local key/value persistence used for the last viewed viewport.

use crate::prelude::HashMap;
use crate::Result;

/// Durable string storage keyed by name, e.g. browser `localStorage`.
pub trait KeyValueStore {
    /// Reads a value. Unreadable storage behaves like a missing key.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes a value, replacing any previous one
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// In-process storage, used headless and in tests
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with a single pre-existing entry
    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut store = Self::default();
        store.entries.insert(key.to_string(), value.to_string());
        store
    }

    /// Number of successful `set` calls, to observe write volume
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }
}

#[cfg(feature = "wasm")]
pub use self::web::LocalStorageStore;

#[cfg(feature = "wasm")]
mod web {
    use super::KeyValueStore;
    use crate::{MapError, Result};

    /// `window.localStorage`. A missing or blocked storage object reads as
    /// empty and rejects writes.
    pub struct LocalStorageStore {
        storage: Option<web_sys::Storage>,
    }

    impl LocalStorageStore {
        pub fn new() -> Self {
            let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
            if storage.is_none() {
                log::warn!("localStorage is unavailable, viewport will not persist");
            }
            Self { storage }
        }
    }

    impl Default for LocalStorageStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl KeyValueStore for LocalStorageStore {
        fn get(&self, key: &str) -> Option<String> {
            self.storage.as_ref()?.get_item(key).ok().flatten()
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            let storage = self
                .storage
                .as_ref()
                .ok_or_else(|| MapError::Storage("localStorage is unavailable".to_string()))?;
            storage
                .set_item(key, value)
                .map_err(|e| MapError::Storage(format!("{:?}", e)))
        }
    }
}
