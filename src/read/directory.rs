//! Name-keyed entry storage shared by both readers.

use std::collections::HashMap;

/// An entry that is looked up by name.
pub(crate) trait Named {
    fn name(&self) -> &str;
}

impl Named for super::CEntry {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for super::PyzEntry {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered directory with name lookup.
///
/// Inserting a name that is already present replaces the stored entry but
/// keeps its original position.
#[derive(Debug, Clone)]
pub(crate) struct Directory<E> {
    entries: Vec<E>,
    index: HashMap<String, usize>,
}

impl<E: Named> Directory<E> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Inserts an entry. Returns true if an earlier entry was replaced.
    pub(crate) fn insert(&mut self, entry: E) -> bool {
        match self.index.get(entry.name()) {
            Some(&position) => {
                self.entries[position] = entry;
                true
            }
            None => {
                self.index.insert(entry.name().to_owned(), self.entries.len());
                self.entries.push(entry);
                false
            }
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&E> {
        self.index.get(name).map(|&position| &self.entries[position])
    }

    pub(crate) fn entries(&self) -> &[E] {
        &self.entries
    }
}
