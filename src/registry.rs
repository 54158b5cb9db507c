use std::collections::HashMap;

use asset_common::ids::GlobalId;

/// Flat map from a global ID to the resource uploaded under it.
#[derive(Debug)]
pub struct Registry<Id, T> {
    entries: HashMap<Id, T>,
}

impl<Id: GlobalId, T> Registry<Id, T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the previous entry if the ID was already taken.
    pub fn insert(&mut self, id: Id, value: T) -> Option<T> {
        self.entries.insert(id, value)
    }

    pub fn get(&self, id: Id) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: Id) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn remove(&mut self, id: Id) -> Option<T> {
        self.entries.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id, &T)> {
        self.entries.iter().map(|(id, value)| (*id, value))
    }
}

impl<Id: GlobalId, T> Default for Registry<Id, T> {
    fn default() -> Self {
        Self::new()
    }
}
