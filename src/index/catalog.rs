use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::SourceId;

/// What is known about one reference recording.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: Option<String>,
    pub hash_count: usize,
}

/// Registered recordings keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: BTreeMap<SourceId, CatalogEntry>,
}

impl Catalog {
    /// Count `hash_count` more records for `source_id`; a given name replaces the old one.
    pub(crate) fn record(&mut self, source_id: SourceId, name: Option<String>, hash_count: usize) {
        let entry = self.entries.entry(source_id).or_default();
        entry.hash_count += hash_count;
        if name.is_some() {
            entry.name = name;
        }
    }

    pub(crate) fn insert(&mut self, source_id: SourceId, entry: CatalogEntry) {
        self.entries.insert(source_id, entry);
    }

    pub fn get(&self, source_id: SourceId) -> Option<&CatalogEntry> {
        self.entries.get(&source_id)
    }

    /// Display name, falling back to the numeric id.
    pub fn name_of(&self, source_id: SourceId) -> String {
        self.get(source_id)
            .and_then(|entry| entry.name.clone())
            .unwrap_or_else(|| format!("#{source_id}"))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &CatalogEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    /// Id one past the largest registered id, or `None` once `u32::MAX` is taken.
    pub fn next_id(&self) -> Option<SourceId> {
        match self.entries.keys().next_back() {
            Some(last) => last.get().checked_add(1).map(SourceId::new),
            None => Some(SourceId::new(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unnamed_recordings_fall_back_to_id() {
        let mut catalog = Catalog::default();
        catalog.record(SourceId::new(3), None, 10);
        assert_eq!(catalog.name_of(SourceId::new(3)), "#3");
        assert_eq!(catalog.name_of(SourceId::new(8)), "#8");
        catalog.record(SourceId::new(3), Some("bells".into()), 5);
        assert_eq!(catalog.name_of(SourceId::new(3)), "bells");
        assert_eq!(catalog.get(SourceId::new(3)).unwrap().hash_count, 15);
    }

    #[test]
    fn next_id_follows_highest_registered() {
        let mut catalog = Catalog::default();
        assert_eq!(catalog.next_id(), Some(SourceId::new(0)));
        catalog.record(SourceId::new(5), None, 1);
        catalog.record(SourceId::new(2), None, 1);
        assert_eq!(catalog.next_id(), Some(SourceId::new(6)));
    }

    #[test]
    fn next_id_is_exhausted_at_max_id() {
        let mut catalog = Catalog::default();
        catalog.record(SourceId::new(u32::MAX), None, 1);
        assert_eq!(catalog.next_id(), None);
    }
}
