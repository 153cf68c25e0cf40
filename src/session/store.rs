//! Process-local keyed storage for the current authentication state.

use crate::session::record::TokenRecord;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Session-state key used when the caller does not choose one.
pub const DEFAULT_SESSION_KEY: &str = "account";

/// Keyed store mapping a session key to the current [`TokenRecord`].
///
/// The store owns all records; readers get shared handles. A `set` replaces
/// the whole entry, never merging fields, so no reader can observe a
/// partially written record. The lock is held only for the pointer swap,
/// never across provider I/O, and no operation blocks.
#[derive(Debug, Default)]
pub struct SessionStore {
    entries: RwLock<HashMap<String, Arc<TokenRecord>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the current record for `key`. No side effects.
    pub fn get(&self, key: &str) -> Option<Arc<TokenRecord>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Replace the entry for `key` atomically. Always succeeds.
    pub fn set(&self, key: &str, record: TokenRecord) {
        self.set_shared(key, Arc::new(record));
    }

    /// Replace the entry for `key` with an already-shared record.
    pub fn set_shared(&self, key: &str, record: Arc<TokenRecord>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), record);
    }

    /// Remove the entry for `key`. Equivalent to logout.
    pub fn clear(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Remove the entry for `key` only if it still holds `expected` (the
    /// same shared record, not just an equal one). Returns whether the entry
    /// was removed.
    ///
    /// Lets an observer that captured a record before slow out-of-band work
    /// drop it afterwards without overwriting a replacement stored in the
    /// meantime.
    pub fn clear_if_current(&self, key: &str, expected: &Arc<TokenRecord>) -> bool {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        match entries.get(key) {
            Some(current) if Arc::ptr_eq(current, expected) => {
                entries.remove(key);
                true
            }
            _ => false,
        }
    }
}
