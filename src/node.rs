//! Trie node shape (spec §3 "Trie node"). A [`SetNode`] sits in the flat
//! node arena owned by [`crate::store::TrieStore`]; it never owns a
//! pointer, only arena indices.

/// Index into the trie store's node arena. Index `0` is always the
/// sentinel root.
pub type NodeIndex = u32;

pub const ROOT: NodeIndex = 0;

/// The sentinel bytes a garbage-collected node's `value` is rewritten to
/// before compaction (spec §4.7), kept only so a debug dump can recognize
/// a stale slot; no code reads a `Garbage` node's `value`.
pub const GARBAGE_SENTINEL: u64 = 0xBAADF00D_BAADF00D;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NodeState {
    /// Reachable, not itself the terminal of any stored set.
    InUse,
    /// Reachable and flagged as the terminal of a stored set.
    HasSetId,
    /// Unreachable from the root; a tombstone waiting for `purge`.
    Garbage,
}

#[derive(Debug, Clone, Copy)]
pub struct SetNode {
    pub value: u64,
    pub next: Option<NodeIndex>,
    pub child: Option<NodeIndex>,
    pub parent: Option<NodeIndex>,
    pub state: NodeState,
}

impl SetNode {
    pub fn root() -> Self {
        Self {
            value: 0,
            next: None,
            child: None,
            parent: None,
            state: NodeState::InUse,
        }
    }

    pub fn new(value: u64, parent: NodeIndex) -> Self {
        Self {
            value,
            next: None,
            child: None,
            parent: Some(parent),
            state: NodeState::InUse,
        }
    }

    pub fn garbage() -> Self {
        Self {
            value: GARBAGE_SENTINEL,
            next: None,
            child: None,
            parent: None,
            state: NodeState::Garbage,
        }
    }

    pub fn is_garbage(&self) -> bool {
        matches!(self.state, NodeState::Garbage)
    }

    pub fn has_set_id(&self) -> bool {
        matches!(self.state, NodeState::HasSetId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_no_parent() {
        let root = SetNode::root();
        assert_eq!(root.parent, None);
        assert!(!root.has_set_id());
    }

    #[test]
    fn garbage_node_has_sentinel_value_and_no_links() {
        let node = SetNode::garbage();
        assert_eq!(node.value, GARBAGE_SENTINEL);
        assert_eq!(node.next, None);
        assert_eq!(node.child, None);
        assert_eq!(node.parent, None);
        assert!(node.is_garbage());
    }
}
