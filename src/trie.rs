//! Public façade: composes the store, dictionary, search, mutation, and
//! snapshot modules into the set-trie index described by the component
//! design. This is the crate's only public entry point besides the error
//! and parser modules.

use std::collections::BTreeMap;

use crate::dict::ElementDict;
use crate::error::CoreError;
use crate::hash::element_hash;
use crate::node::{NodeIndex, ROOT};
use crate::parser::parse_python_set_literal;
use crate::snapshot::{self, SnapshotLoader};
use crate::store::TrieStore;
use crate::{mutation, search};

/// An in-memory set-trie index: stores sets of opaque byte-string
/// elements tagged with a string identifier, and supports exact lookup,
/// superset/subset enumeration, deletion, and binary snapshotting.
#[derive(Debug, Clone)]
pub struct SetTrie {
    store: TrieStore,
    dict: ElementDict,
    ids: BTreeMap<NodeIndex, String>,
}

impl Default for SetTrie {
    fn default() -> Self {
        Self::new()
    }
}

/// Hashes, sorts, and deduplicates a caller-supplied list of raw element
/// byte-strings into the ordered `(hash, name)` pairs every tree
/// operation expects.
fn to_binary_set(elements: &[Vec<u8>]) -> Vec<(u64, &[u8])> {
    let mut binary: Vec<(u64, &[u8])> = elements
        .iter()
        .map(|name| (element_hash(name), name.as_slice()))
        .collect();
    binary.sort_unstable_by_key(|&(hash, _)| hash);
    binary.dedup_by_key(|&mut (hash, _)| hash);
    binary
}

impl SetTrie {
    pub fn new() -> Self {
        Self {
            store: TrieStore::new(),
            dict: ElementDict::new(),
            ids: BTreeMap::new(),
        }
    }

    /// Inserts a set given as a list of raw element byte-strings,
    /// tagged with `id` (spec §4.2). Re-inserting an already-stored set
    /// overwrites its identifier.
    pub fn insert(&mut self, elements: &[Vec<u8>], id: impl Into<String>) -> NodeIndex {
        let binary = to_binary_set(elements);
        let idx = mutation::insert(&mut self.store, &mut self.dict, &binary);
        self.ids.insert(idx, id.into());
        idx
    }

    /// Inserts a set given as Python `set`/`frozenset` literal source
    /// text (spec §6 boundary parser).
    pub fn insert_text(&mut self, set_text: &[u8], id: impl Into<String>) -> NodeIndex {
        let elements = parse_python_set_literal(set_text);
        self.insert(&elements, id)
    }

    /// Exact lookup (spec §4.3): returns the identifier of the stored set
    /// equal to `elements`, if any.
    pub fn find(&self, elements: &[Vec<u8>]) -> Option<&str> {
        let binary = to_binary_set(elements);
        let hashes: Vec<u64> = binary.iter().map(|&(hash, _)| hash).collect();
        let idx = search::find(&self.store, &hashes)?;
        self.id_if_flagged(idx)
    }

    pub fn find_text(&self, set_text: &[u8]) -> Option<&str> {
        let elements = parse_python_set_literal(set_text);
        self.find(&elements)
    }

    fn id_if_flagged(&self, idx: NodeIndex) -> Option<&str> {
        if !self.store.get(idx)?.has_set_id() {
            return None;
        }
        self.ids.get(&idx).map(String::as_str)
    }

    /// Superset enumeration (spec §4.4): every stored set `S` with
    /// `elements ⊆ S`. If `elements` names a hash that was never
    /// observed by any stored set, no stored set can be a superset, so
    /// the result is empty without walking the tree. The empty query
    /// matches every stored set.
    pub fn supersets(&self, elements: &[Vec<u8>]) -> Vec<&str> {
        let binary = to_binary_set(elements);

        if binary.is_empty() {
            let mut result = Vec::new();
            search::collect_all_flagged(&self.store, ROOT, &mut result);
            return self.resolve_ids(&result);
        }

        let mut hashes = Vec::with_capacity(binary.len());
        for &(hash, _) in &binary {
            if !self.dict.contains(hash) {
                return Vec::new();
            }
            hashes.push(hash);
        }

        let matches = search::supersets(&self.store, self.store.root().child, &hashes);
        self.resolve_ids(&matches)
    }

    /// Subset enumeration (spec §4.5): every stored set `S` with
    /// `S ⊆ elements`. The empty set, if stored, is always a subset of
    /// anything and is included unconditionally; query elements that
    /// were never observed by any stored set are dropped before the
    /// walk since they cannot affect which nodes match.
    pub fn subsets(&self, elements: &[Vec<u8>]) -> Vec<&str> {
        let mut result = Vec::new();
        if self.ids.contains_key(&ROOT) {
            result.push(ROOT);
        }

        let binary = to_binary_set(elements);
        let hashes: Vec<u64> = binary
            .into_iter()
            .filter(|&(hash, _)| self.dict.contains(hash))
            .map(|(hash, _)| hash)
            .collect();

        if hashes.is_empty() {
            return self.resolve_ids(&result);
        }

        let matches = search::subsets(&self.store, self.store.root().child, &hashes);
        result.extend(matches);
        self.resolve_ids(&result)
    }

    fn resolve_ids(&self, indices: &[NodeIndex]) -> Vec<&str> {
        indices
            .iter()
            .filter_map(|idx| self.ids.get(idx).map(String::as_str))
            .collect()
    }

    /// Element enumeration (spec §4.6): the stored set a terminal node
    /// represents, in insertion order.
    pub fn elements(&self, idx: NodeIndex) -> Vec<Vec<u8>> {
        search::elements(&self.store, &self.dict, idx)
    }

    /// Removes the stored set whose terminal is `idx` (spec §4.7). The
    /// range/state check (`BadIndex`) runs first, matching the reference's
    /// check order; `MissingId` is only reachable as the internal
    /// consistency fallback once `idx` is already known to be a valid,
    /// flagged terminal.
    pub fn remove(&mut self, idx: NodeIndex) -> Result<(), CoreError> {
        mutation::remove(&mut self.store, &mut self.dict, idx)?;
        if self.ids.remove(&idx).is_none() {
            return Err(CoreError::MissingId(idx));
        }
        Ok(())
    }

    /// Compacts the store, reclaiming garbage slots (spec §4.8).
    pub fn purge(&mut self) -> Result<usize, CoreError> {
        mutation::purge(&mut self.store, &mut self.ids)
    }

    /// Number of `Garbage` slots a `purge` call would reclaim right now,
    /// without mutating anything.
    pub fn purge_dry_run(&self) -> usize {
        self.store.dirty_count()
    }

    pub fn num_sets(&self) -> usize {
        self.ids.len()
    }

    pub fn set_name(&self, idx: NodeIndex) -> Option<&str> {
        self.ids.get(&idx).map(String::as_str)
    }

    pub fn iter_set_ids(&self) -> impl Iterator<Item = (NodeIndex, &str)> {
        self.ids.iter().map(|(idx, name)| (*idx, name.as_str()))
    }

    /// Serializes the index into a sequence of fixed-length base64
    /// blocks (spec §4.9 / §6). An empty string must be pushed after the
    /// last block to signal a loader to finalize.
    pub fn save_snapshot(&self) -> Vec<String> {
        snapshot::save(&self.store, &self.dict, &self.ids)
    }

    /// Restores an index from a sequence of base64 blocks previously
    /// produced by `save_snapshot`, followed by a final empty block.
    pub fn load_snapshot(blocks: &[String]) -> Result<Self, CoreError> {
        let mut loader = SnapshotLoader::new();
        for block in blocks {
            loader.push_block(block)?;
        }
        loader.push_block("")?;
        let loaded = loader.finish()?;

        Ok(Self {
            store: loaded.store,
            dict: loaded.dict,
            ids: loaded.ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_find_round_trips() {
        let mut trie = SetTrie::new();
        trie.insert(&[b"a".to_vec(), b"b".to_vec()], "sup01");
        assert_eq!(trie.find(&[b"b".to_vec(), b"a".to_vec()]), Some("sup01"));
    }

    #[test]
    fn empty_set_insert_and_textual_find() {
        let mut trie = SetTrie::new();
        trie.insert(&[], "void");
        assert_eq!(trie.find_text(b"set()"), Some("void"));
        assert!(trie.subsets(&[b"anything".to_vec()]).contains(&"void"));
        assert!(trie.supersets(&[]).contains(&"void"));
    }

    #[test]
    fn supersets_of_unknown_element_is_empty() {
        let mut trie = SetTrie::new();
        trie.insert(&[b"a".to_vec()], "s1");
        assert!(trie.supersets(&[b"never-inserted".to_vec()]).is_empty());
    }

    #[test]
    fn supersets_boundary_scenario() {
        let mut trie = SetTrie::new();
        trie.insert(&[b"a".to_vec(), b"b".to_vec()], "sup01");
        trie.insert(&[b"a".to_vec(), b"c".to_vec(), b"e".to_vec()], "sup03");
        trie.insert(&[b"c".to_vec(), b"e".to_vec()], "sup07");
        trie.insert(
            &[
                b"c".to_vec(),
                b"d".to_vec(),
                b"e".to_vec(),
                b"f".to_vec(),
                b"y".to_vec(),
                b"z".to_vec(),
            ],
            "sup12",
        );

        let mut got = trie.supersets(&[b"c".to_vec(), b"e".to_vec()]);
        got.sort_unstable();
        let mut expected = vec!["sup03", "sup07", "sup12"];
        expected.sort_unstable();
        assert_eq!(got, expected);
    }

    #[test]
    fn remove_then_purge_restores_empty_tree() {
        let mut trie = SetTrie::new();
        let idx = trie.insert(&[b"a".to_vec()], "s1");
        trie.remove(idx).unwrap();
        assert_eq!(trie.purge_dry_run(), 1);
        trie.purge().unwrap();
        assert_eq!(trie.purge_dry_run(), 0);
        assert_eq!(trie.num_sets(), 0);
    }

    #[test]
    fn remove_out_of_range_index_is_bad_index() {
        let mut trie = SetTrie::new();
        assert_eq!(trie.remove(42), Err(CoreError::BadIndex(42)));
    }

    #[test]
    fn snapshot_round_trip_preserves_lookups() {
        let mut trie = SetTrie::new();
        trie.insert(&[b"a".to_vec(), b"b".to_vec()], "sup01");
        trie.insert(&[], "void");

        let blocks = trie.save_snapshot();
        let restored = SetTrie::load_snapshot(&blocks).unwrap();

        assert_eq!(restored.find(&[b"a".to_vec(), b"b".to_vec()]), Some("sup01"));
        assert_eq!(restored.find(&[]), Some("void"));
        assert_eq!(restored.num_sets(), trie.num_sets());
    }
}
