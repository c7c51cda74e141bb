//! Insert, remove, and purge (spec §4.2, §4.7, §4.8) — the only code that
//! mutates a [`TrieStore`] or [`ElementDict`]. Search (`search.rs`) only
//! ever reads.
//!
//! Dictionary refcounting is tied to node lifetime, not to "how many
//! stored sets pass through this position": `intern` is called exactly
//! once per newly created node (not for every element of every insert,
//! as the shared-prefix path is walked), and `release` exactly once per
//! node actually reclaimed as garbage (not for every ancestor of a
//! `remove`d terminal). This is the reading that makes spec §8 invariant
//! 1 — `count(h)` equals the number of live nodes with `value == h` —
//! hold exactly; see DESIGN.md for why this departs from the reference
//! C++, which decrements once per path element on every `remove` and
//! over-counts when sets share a prefix.

use std::collections::{BTreeMap, HashMap};

use crate::dict::ElementDict;
use crate::error::CoreError;
use crate::node::{NodeIndex, NodeState, SetNode, ROOT};
use crate::store::TrieStore;

/// Inserts a binary set (already hashed, sorted ascending, deduplicated)
/// and marks its terminal node as the holder of a stored set. The caller
/// is responsible for recording the identifier in its identifier map —
/// this function only manages the tree and the element dictionary.
pub fn insert(store: &mut TrieStore, dict: &mut ElementDict, elements: &[(u64, &[u8])]) -> NodeIndex {
    if elements.is_empty() {
        dict.intern(0, b"");
        store.get_mut(ROOT).expect("root always exists").state = NodeState::HasSetId;
        return ROOT;
    }

    let mut parent = ROOT;
    for &(hash, name) in elements {
        parent = insert_step(store, dict, parent, hash, name);
    }

    store.get_mut(parent).expect("valid terminal").state = NodeState::HasSetId;
    parent
}

/// Descends one level: reuse the sibling with a matching value if one
/// exists, otherwise splice a freshly interned node into the sibling
/// chain at its ordered position (spec §9 — the reference's tail-append
/// does not preserve the strict-ascending invariant in general; this
/// does, by construction).
fn insert_step(
    store: &mut TrieStore,
    dict: &mut ElementDict,
    parent: NodeIndex,
    hash: u64,
    name: &[u8],
) -> NodeIndex {
    let first_child = store.get(parent).expect("valid parent").child;

    let mut prev: Option<NodeIndex> = None;
    let mut cursor = first_child;

    loop {
        match cursor {
            None => {
                let new_idx = store.push(SetNode::new(hash, parent));
                match prev {
                    Some(p) => store.get_mut(p).expect("valid sibling").next = Some(new_idx),
                    None => store.get_mut(parent).expect("valid parent").child = Some(new_idx),
                }
                dict.intern(hash, name);
                return new_idx;
            }
            Some(current) => {
                let current_value = store.get(current).expect("valid sibling").value;

                if current_value == hash {
                    return current;
                }

                if current_value > hash {
                    let new_idx = store.push(SetNode::new(hash, parent));
                    store.get_mut(new_idx).expect("just pushed").next = Some(current);
                    match prev {
                        Some(p) => store.get_mut(p).expect("valid sibling").next = Some(new_idx),
                        None => store.get_mut(parent).expect("valid parent").child = Some(new_idx),
                    }
                    dict.intern(hash, name);
                    return new_idx;
                }

                prev = Some(current);
                cursor = store.get(current).expect("valid sibling").next;
            }
        }
    }
}

/// Removes the stored set whose terminal is `idx` (spec §4.7). The caller
/// must already have validated and removed the identifier-map entry
/// (`MissingId` is the caller's responsibility to detect); this function
/// only reports `BadIndex`.
pub fn remove(store: &mut TrieStore, dict: &mut ElementDict, idx: NodeIndex) -> Result<(), CoreError> {
    if !store.is_valid_index(idx) || !store.get(idx).expect("validated index").has_set_id() {
        return Err(CoreError::BadIndex(idx));
    }

    if idx == ROOT {
        store.get_mut(ROOT).expect("root exists").state = NodeState::InUse;
        dict.release(0);
        return Ok(());
    }

    if store.get(idx).expect("validated index").child.is_some() {
        store.get_mut(idx).expect("validated index").state = NodeState::InUse;
        return Ok(());
    }

    let mut current = idx;
    loop {
        let parent = store
            .get(current)
            .expect("valid node")
            .parent
            .expect("non-root node has a parent");
        let current_next = store.get(current).expect("valid node").next;
        let current_value = store.get(current).expect("valid node").value;
        let parent_child = store.get(parent).expect("valid parent").child;

        let stop = if parent_child == Some(current) {
            store.get_mut(parent).expect("valid parent").child = current_next;
            let parent_node = store.get(parent).expect("valid parent");
            current_next.is_some() || parent_node.has_set_id() || parent == ROOT
        } else {
            let mut prev = parent_child.expect("current must be in parent's sibling chain");
            loop {
                let prev_next = store.get(prev).expect("valid sibling").next;
                if prev_next == Some(current) {
                    break;
                }
                prev = prev_next.expect("current is reachable via the sibling chain");
            }
            store.get_mut(prev).expect("valid sibling").next = current_next;
            true
        };

        dict.release(current_value);
        store.mark_garbage(current);

        if stop {
            break;
        }
        current = parent;
    }

    Ok(())
}

/// Compacts the store, reclaiming every `Garbage` slot and renumbering
/// live node indices while preserving their relative order (spec §4.8).
/// Rewrites `ids` in place so identifiers keep pointing at the right
/// node. Returns the number of slots reclaimed.
pub fn purge(store: &mut TrieStore, ids: &mut BTreeMap<NodeIndex, String>) -> Result<usize, CoreError> {
    let dirty = store.dirty_count();
    if dirty == 0 {
        return Err(CoreError::NothingToPurge);
    }

    let mut old_to_new: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut live_nodes: Vec<SetNode> = Vec::with_capacity(store.len() - dirty);

    for (old_idx, node) in store.iter() {
        if !node.is_garbage() {
            let new_idx = live_nodes.len() as NodeIndex;
            old_to_new.insert(old_idx, new_idx);
            live_nodes.push(*node);
        }
    }

    for node in &mut live_nodes {
        node.next = node.next.map(|n| remap(&old_to_new, n));
        node.child = node.child.map(|c| remap(&old_to_new, c));
        node.parent = node.parent.map(|p| remap(&old_to_new, p));
    }

    let remapped_ids: BTreeMap<NodeIndex, String> = ids
        .iter()
        .map(|(old_idx, name)| (remap(&old_to_new, *old_idx), name.clone()))
        .collect();
    *ids = remapped_ids;

    store.replace_all(live_nodes);
    store.reset_dirty_count(0);

    Ok(dirty)
}

fn remap(old_to_new: &HashMap<NodeIndex, NodeIndex>, idx: NodeIndex) -> NodeIndex {
    *old_to_new
        .get(&idx)
        .expect("purge only remaps indices reachable from live nodes")
}
