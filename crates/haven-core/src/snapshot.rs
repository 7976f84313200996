//! Consumer-side snapshot persistence.
//!
//! Each user keeps one record of last-synced state so the client can
//! serve stale reads across restarts and while the authority is
//! unreachable. The format is opaque to the engine: the [`SnapshotStore`]
//! seam only requires get/set/clear by key, and the [`LocalSnapshot`]
//! encodes itself as JSON.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::property::{Property, PropertyId, UserId};

/// Key-value persistence seam for consumer-side state.
///
/// Implementations may be shared preferences, a file, or a test map;
/// the engine only needs these three operations.
pub trait SnapshotStore: Send + Sync {
    /// Fetch the bytes stored under `key`, if any.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Vec<u8>);

    /// Remove any value stored under `key`.
    fn clear(&self, key: &str);
}

/// In-memory snapshot store for tests and embedders without durable
/// storage.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySnapshotStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    fn set(&self, key: &str, value: Vec<u8>) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).insert(key.to_string(), value);
    }

    fn clear(&self, key: &str) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).remove(key);
    }
}

/// One user's last-synced view of the world.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSnapshot {
    /// Last-synced property records keyed by id.
    pub properties: BTreeMap<PropertyId, Property>,
    /// Property ids the user liked as of the last sync.
    pub liked: BTreeSet<PropertyId>,
    /// When the snapshot was written, unix milliseconds.
    pub saved_at: u64,
}

impl LocalSnapshot {
    /// Storage key for `user`'s snapshot.
    #[must_use]
    pub fn key_for(user: &UserId) -> String {
        format!("haven.snapshot.{user}")
    }

    /// Encode as JSON bytes.
    ///
    /// # Errors
    /// Returns the serializer error; domain types always encode, so in
    /// practice this only fails on allocation pressure.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode from JSON bytes.
    ///
    /// # Errors
    /// Returns the deserializer error if the bytes are not a snapshot.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
