//! Pure traversal functions over the trie store (spec §4.3–§4.6). Every
//! function here relies on the sibling-ascending invariant maintained by
//! [`crate::mutation`] and never mutates the store.

use crate::dict::ElementDict;
use crate::node::{NodeIndex, ROOT};
use crate::store::TrieStore;

/// Exact lookup (spec §4.3). `binary_set` must already be hashed, sorted,
/// and deduplicated. Returns the node landed on after consuming every
/// element, regardless of whether it is flagged — the caller checks
/// `HAS_SET_ID`.
pub fn find(store: &TrieStore, binary_set: &[u64]) -> Option<NodeIndex> {
    let mut idx = ROOT;

    for &hash in binary_set {
        let node = store.get(idx).expect("search stays within live nodes");
        let mut sibling = node.child;
        let mut matched = None;

        while let Some(candidate) = sibling {
            let candidate_node = store.get(candidate).expect("valid sibling");
            if candidate_node.value == hash {
                matched = Some(candidate);
                break;
            }
            sibling = candidate_node.next;
        }

        idx = matched?;
    }

    Some(idx)
}

/// Collects every flagged descendant of `start` (inclusive), used both for
/// `supersets(∅)` and for the "rest of the subtree is a superset" case
/// once a superset query is fully consumed (spec §4.4).
pub fn collect_all_flagged(store: &TrieStore, start: NodeIndex, result: &mut Vec<NodeIndex>) {
    let mut t_idx = Some(start);

    while let Some(t) = t_idx {
        let node = store.get(t).expect("valid node");

        if node.has_set_id() {
            result.push(t);
        }

        if let Some(child) = node.child {
            collect_all_flagged(store, child, result);
        }

        t_idx = node.next;
    }
}

/// Superset enumeration for a non-empty, already-hashed/sorted/deduped
/// query (spec §4.4). The empty-query case (every stored set) is handled
/// by the caller via [`collect_all_flagged`].
pub fn supersets(store: &TrieStore, root_child: Option<NodeIndex>, query: &[u64]) -> Vec<NodeIndex> {
    let mut result = Vec::new();
    if !query.is_empty() {
        supersets_rec(store, root_child, query, 0, &mut result);
    }
    result
}

fn supersets_rec(
    store: &TrieStore,
    start: Option<NodeIndex>,
    query: &[u64],
    s_idx: usize,
    result: &mut Vec<NodeIndex>,
) {
    let mut t_idx = start;

    while let Some(t) = t_idx {
        let node = store.get(t).expect("valid node");
        let tv = node.value;
        let mut q_value = query[s_idx];
        let mut next_s_idx = s_idx;

        if tv == q_value {
            if s_idx == query.len() - 1 {
                if node.has_set_id() {
                    result.push(t);
                }
                if let Some(child) = node.child {
                    collect_all_flagged(store, child, result);
                }
                // q_value stays == tv, so the descent check below is skipped:
                // everything reachable from here was already collected.
            } else {
                next_s_idx = s_idx + 1;
                q_value = query[next_s_idx];
            }
        }

        if tv < q_value {
            if let Some(child) = node.child {
                supersets_rec(store, Some(child), query, next_s_idx, result);
            }
        }

        t_idx = node.next;
    }
}

/// Subset enumeration for a query already filtered to known hashes and
/// sorted/deduped (spec §4.5). The empty-filtered-query / empty-set-stored
/// handling is done by the caller.
pub fn subsets(store: &TrieStore, root_child: Option<NodeIndex>, query: &[u64]) -> Vec<NodeIndex> {
    let mut result = Vec::new();
    if !query.is_empty() {
        subsets_rec(store, root_child, query, 0, &mut result);
    }
    result
}

fn subsets_rec(
    store: &TrieStore,
    start: Option<NodeIndex>,
    query: &[u64],
    s_idx: usize,
    result: &mut Vec<NodeIndex>,
) {
    let last = query.len() - 1;
    let mut t_idx = start;

    while let Some(t) = t_idx {
        let node = store.get(t).expect("valid node");
        let tv = node.value;

        if tv >= query[s_idx] {
            let mut ns_idx = s_idx;
            while ns_idx < last && query[ns_idx] < tv {
                ns_idx += 1;
            }

            if query[ns_idx] == tv {
                if node.has_set_id() {
                    result.push(t);
                }

                if let Some(child) = node.child {
                    let next_ns = ns_idx + 1;
                    if next_ns <= last {
                        subsets_rec(store, Some(child), query, next_ns, result);
                    }
                }
            }
        }

        t_idx = node.next;
    }
}

/// Element enumeration (spec §4.6): the stored set a terminal node
/// represents, in insertion order (root-to-leaf).
pub fn elements(store: &TrieStore, dict: &ElementDict, idx: NodeIndex) -> Vec<Vec<u8>> {
    if idx == ROOT {
        return Vec::new();
    }

    let Some(node) = store.get(idx) else {
        return Vec::new();
    };
    if !node.has_set_id() {
        return Vec::new();
    }

    let mut path = Vec::new();
    let mut cursor = Some(idx);

    while let Some(current) = cursor {
        if current == ROOT {
            break;
        }
        let current_node = store.get(current).expect("valid node");
        if let Some(name) = dict.lookup(current_node.value) {
            path.push(name.to_vec());
        }
        cursor = current_node.parent;
    }

    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation;

    fn setup() -> (TrieStore, ElementDict) {
        (TrieStore::new(), ElementDict::new())
    }

    #[test]
    fn find_returns_none_for_unknown_path() {
        let (store, _dict) = setup();
        assert_eq!(find(&store, &[1, 2, 3]), None);
    }

    #[test]
    fn find_returns_root_for_empty_query() {
        let (store, _dict) = setup();
        assert_eq!(find(&store, &[]), Some(ROOT));
    }

    #[test]
    fn collect_all_flagged_walks_siblings_and_children() {
        let (mut store, mut dict) = setup();
        let a = mutation::insert(&mut store, &mut dict, &[(1, b"a")]);
        let b = mutation::insert(&mut store, &mut dict, &[(2, b"b")]);
        let mut result = Vec::new();
        let root_child = store.root().child.unwrap();
        collect_all_flagged(&store, root_child, &mut result);
        result.sort_unstable();
        let mut expected = vec![a, b];
        expected.sort_unstable();
        assert_eq!(result, expected);
    }

    #[test]
    fn elements_of_root_is_empty() {
        let (mut store, mut dict) = setup();
        mutation::insert(&mut store, &mut dict, &[]);
        assert!(elements(&store, &dict, ROOT).is_empty());
    }
}
