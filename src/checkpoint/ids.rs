//! Ordered id set collected by the listing phase.

use std::collections::HashSet;

use crate::record::StartupRef;

/// Discovery-ordered list of [`StartupRef`]s with set semantics on `id`.
#[derive(Debug, Clone, Default)]
pub struct IdSet {
    refs: Vec<StartupRef>,
    seen: HashSet<String>,
}

impl IdSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `item` unless its id is already present. Returns true if added.
    pub fn insert(&mut self, item: StartupRef) -> bool {
        if self.seen.contains(&item.id) {
            return false;
        }
        self.seen.insert(item.id.clone());
        self.refs.push(item);
        true
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&StartupRef> {
        self.refs.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StartupRef> {
        self.refs.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[StartupRef] {
        &self.refs
    }
}

impl FromIterator<StartupRef> for IdSet {
    fn from_iter<I: IntoIterator<Item = StartupRef>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}
