//! Persisted key-space abstraction.
//!
//! Progress is stored as a flat map of primitive values, in the manner of a
//! platform preferences file. A missing key always means "use the documented
//! default", so stores never need migrations for new keys.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A primitive value stored under one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    /// A boolean flag.
    Bool(bool),
    /// An integer counter, step id or epoch-millisecond timestamp.
    Int(i64),
    /// Free text, or a delimited list.
    Text(String),
}

impl StoredValue {
    /// Returns the boolean, if this value is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer, if this value is one.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the text, if this value is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A snapshot of the whole key space.
pub type KeySpace = BTreeMap<String, StoredValue>;

/// Repository trait for the persisted key space.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Load every stored key.
    async fn load_all(&self) -> Result<KeySpace, DomainError>;

    /// Write a batch of keys atomically. Keys not in the batch are untouched.
    async fn put_all(&self, entries: &KeySpace) -> Result<(), DomainError>;

    /// Remove every key.
    async fn clear(&self) -> Result<(), DomainError>;
}
