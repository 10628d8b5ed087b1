//! Bidirectional secure-hash ↔ prompt-id map

use std::collections::{BTreeMap, HashMap};

use prompt_gateway_core::ExposureEntry;

/// The set of currently reachable prompts.
///
/// Forward and reverse maps are kept together so both directions are O(1)
/// (reverse is ordered by prompt id). Built wholesale from a list of
/// [`ExposureEntry`]; never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExposureMap {
    by_hash: HashMap<String, i64>,
    by_prompt: BTreeMap<i64, String>,
}

impl ExposureMap {
    /// Build from entries, keeping only `exposed` ones.
    ///
    /// A later entry that reuses a hash or a prompt id replaces the earlier
    /// pairing, so each hash and each prompt id appear at most once.
    #[must_use]
    pub fn from_entries(entries: &[ExposureEntry]) -> Self {
        let mut map = Self::default();
        for entry in entries.iter().filter(|e| e.exposed) {
            map.insert(entry.prompt_id, &entry.secure_hash);
        }
        map
    }

    fn insert(&mut self, prompt_id: i64, hash: &str) {
        if let Some(old_prompt) = self.by_hash.remove(hash) {
            self.by_prompt.remove(&old_prompt);
        }
        if let Some(old_hash) = self.by_prompt.remove(&prompt_id) {
            self.by_hash.remove(&old_hash);
        }
        self.by_hash.insert(hash.to_string(), prompt_id);
        self.by_prompt.insert(prompt_id, hash.to_string());
    }

    /// Prompt id behind `hash`
    #[must_use]
    pub fn prompt_id(&self, hash: &str) -> Option<i64> {
        self.by_hash.get(hash).copied()
    }

    /// Hash currently assigned to `prompt_id`
    #[must_use]
    pub fn hash_for(&self, prompt_id: i64) -> Option<&str> {
        self.by_prompt.get(&prompt_id).map(String::as_str)
    }

    /// Exposed prompt ids, ascending
    #[must_use]
    pub fn prompt_ids(&self) -> Vec<i64> {
        self.by_prompt.keys().copied().collect()
    }

    /// Number of exposed prompts
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// Whether nothing is exposed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, hash: &str, exposed: bool) -> ExposureEntry {
        ExposureEntry::new(id, hash, exposed)
    }

    #[test]
    fn keeps_only_exposed_entries() {
        let map = ExposureMap::from_entries(&[
            entry(1, "aaa", true),
            entry(2, "bbb", false),
            entry(3, "ccc", true),
        ]);

        assert_eq!(map.len(), 2);
        assert_eq!(map.prompt_id("aaa"), Some(1));
        assert_eq!(map.prompt_id("bbb"), None);
        assert_eq!(map.hash_for(3), Some("ccc"));
        assert_eq!(map.prompt_ids(), vec![1, 3]);
    }

    #[test]
    fn same_input_yields_same_mapping() {
        let entries = [entry(5, "abc123", true), entry(7, "def456", true)];
        assert_eq!(
            ExposureMap::from_entries(&entries),
            ExposureMap::from_entries(&entries)
        );
    }

    #[test]
    fn later_duplicates_replace_earlier_pairings() {
        let map = ExposureMap::from_entries(&[
            entry(1, "aaa", true),
            entry(1, "bbb", true),
            entry(2, "ccc", true),
            entry(3, "ccc", true),
        ]);

        assert_eq!(map.len(), 2);
        assert_eq!(map.prompt_id("aaa"), None);
        assert_eq!(map.hash_for(1), Some("bbb"));
        assert_eq!(map.hash_for(2), None);
        assert_eq!(map.prompt_id("ccc"), Some(3));
    }
}
