use std::collections::HashMap;

use crate::core::ProvId;

/// Bidirectional `(prefix, name)` <-> object id index.
/// Names are not unique; ids sharing a key are kept in creation order.
#[derive(Debug, Default)]
pub struct NameIndex {
    name_to_ids: HashMap<(String, String), Vec<ProvId>>,
    id_to_name: HashMap<ProvId, (String, String)>,
}

impl NameIndex {
    pub fn new() -> Self {
        NameIndex::default()
    }

    pub fn insert(&mut self, prefix: &str, name: &str, id: ProvId) {
        let key = (prefix.to_string(), name.to_string());
        self.name_to_ids.entry(key.clone()).or_default().push(id);
        self.id_to_name.insert(id, key);
    }

    /// Ids registered under `(prefix, name)`, oldest first
    pub fn lookup(&self, prefix: &str, name: &str) -> &[ProvId] {
        self.name_to_ids
            .get(&(prefix.to_string(), name.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn name_of(&self, id: ProvId) -> Option<(&str, &str)> {
        self.id_to_name.get(&id).map(|(p, n)| (p.as_str(), n.as_str()))
    }

    pub fn remove(&mut self, id: ProvId) {
        if let Some(key) = self.id_to_name.remove(&id) {
            if let Some(ids) = self.name_to_ids.get_mut(&key) {
                ids.retain(|other| *other != id);
                if ids.is_empty() {
                    self.name_to_ids.remove(&key);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.id_to_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_index_keeps_duplicates_in_order() {
        let mut index = NameIndex::new();
        let a = ProvId::from_u128(1);
        let b = ProvId::from_u128(2);

        index.insert("ex", "doc.txt", a);
        index.insert("ex", "doc.txt", b);
        index.insert("other", "doc.txt", ProvId::from_u128(3));

        assert_eq!(index.lookup("ex", "doc.txt"), &[a, b]);
        assert_eq!(index.name_of(b), Some(("ex", "doc.txt")));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_name_index_remove() {
        let mut index = NameIndex::new();
        let a = ProvId::from_u128(1);
        index.insert("ex", "a", a);
        index.remove(a);

        assert!(index.lookup("ex", "a").is_empty());
        assert!(index.name_of(a).is_none());
        assert!(index.is_empty());
    }
}
