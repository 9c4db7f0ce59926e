//! Test stores — mock `KeyValueStore` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use hushcalc_core::error::DomainError;
use hushcalc_core::repository::{KeySpace, KeyValueStore};

/// A store that keeps the key space in memory and counts writes.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<KeySpace>,
    writes: Mutex<usize>,
}

impl InMemoryKeyValueStore {
    /// Create a store pre-populated with `entries`.
    #[must_use]
    pub fn with_entries(entries: KeySpace) -> Self {
        Self {
            entries: Mutex::new(entries),
            writes: Mutex::new(0),
        }
    }

    /// Returns a copy of the current key space.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn snapshot(&self) -> KeySpace {
        self.entries.lock().unwrap().clone()
    }

    /// Returns how many `put_all` batches were written.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn load_all(&self) -> Result<KeySpace, DomainError> {
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn put_all(&self, entries: &KeySpace) -> Result<(), DomainError> {
        let mut current = self.entries.lock().unwrap();
        for (key, value) in entries {
            current.insert(key.clone(), value.clone());
        }
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}

/// A store that always returns an infrastructure error. Useful for testing
/// error-handling paths.
#[derive(Debug)]
pub struct FailingKeyValueStore;

#[async_trait]
impl KeyValueStore for FailingKeyValueStore {
    async fn load_all(&self) -> Result<KeySpace, DomainError> {
        Err(DomainError::Infrastructure("disk unavailable".into()))
    }

    async fn put_all(&self, _entries: &KeySpace) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("disk unavailable".into()))
    }

    async fn clear(&self) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("disk unavailable".into()))
    }
}
