//! The key-value store bound to a scope.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Key under which the request identifier is stored.
pub const REQUEST_ID_KEY: &str = "requestId";
/// Key under which the session identifier is stored.
pub const SESSION_ID_KEY: &str = "sessionId";

/// String-to-string map shared by a scope and its continuations.
///
/// Cloning is cheap: clones share the same allocation until one of them is
/// written to, at which point the writer gets its own copy. A store handed
/// to another scope is therefore never changed behind that scope's back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Store {
    entries: Arc<BTreeMap<String, String>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or overwrite `key` in this handle only.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        Arc::make_mut(&mut self.entries).insert(key.into(), value.into());
    }

    /// Returns a new store equal to this one plus `{key: value}`.
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut merged = self.clone();
        merged.insert(key, value);
        merged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn request_id(&self) -> Option<&str> {
        self.get(REQUEST_ID_KEY)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.get(SESSION_ID_KEY)
    }

    /// Whether two handles share the same underlying map.
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}

impl From<BTreeMap<String, String>> for Store {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }
}

impl From<HashMap<String, String>> for Store {
    fn from(entries: HashMap<String, String>) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Store {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<BTreeMap<_, _>>();
        Self::from(entries)
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Store {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let entries = Arc::make_mut(&mut self.entries);
        for (k, v) in iter {
            entries.insert(k.into(), v.into());
        }
    }
}
