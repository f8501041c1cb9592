//! Registry of entities created during a run and still pending deletion
//!
//! Each key names a group: an ordered, append-only list. A key is absent
//! until its first append and is removed again once the group has been torn
//! down, so there is no "empty group" state.

use std::collections::HashMap;

use earth_common::AnyEntity;

#[derive(Debug, Clone)]
pub struct LifecycleTracker<T = AnyEntity> {
    groups: HashMap<String, Vec<T>>,
}

impl<T> Default for LifecycleTracker<T> {
    fn default() -> Self {
        Self {
            groups: HashMap::new(),
        }
    }
}

impl<T> LifecycleTracker<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entity` to `key`, creating the group on first use
    pub fn append(&mut self, key: &str, entity: T) {
        self.groups.entry(key.to_string()).or_default().push(entity);
    }

    pub fn get(&self, key: &str) -> Option<&[T]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Drop the group, handing back its members
    pub fn delete(&mut self, key: &str) -> Option<Vec<T>> {
        self.groups.remove(key)
    }

    /// Replace the group with `members`; an empty list removes the key
    pub fn retain(&mut self, key: &str, members: Vec<T>) {
        if members.is_empty() {
            self.groups.remove(key);
        } else {
            self.groups.insert(key.to_string(), members);
        }
    }

    /// Group keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.groups.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of members across all groups
    pub fn pending(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}
