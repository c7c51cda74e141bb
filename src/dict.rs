//! Element dictionary (spec §4.1): hash → `{name, count}`. Interns every
//! element string observed during insertion and tracks how many live trie
//! nodes currently reference it, so `remove` can free names and `purge`
//! can reset a drained index to empty.

use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Entry {
    name: Vec<u8>,
    count: u32,
}

#[derive(Debug, Default, Clone)]
pub struct ElementDict {
    entries: HashMap<u64, Entry>,
}

impl ElementDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `name` under `hash`: creates the entry with `count = 1` if
    /// absent, otherwise increments `count`. The empty-element marker
    /// (hash `0`, empty name, used for the root's synthetic entry) is
    /// handled by the caller, which does not maintain its refcount.
    pub fn intern(&mut self, hash: u64, name: &[u8]) {
        self.entries
            .entry(hash)
            .and_modify(|entry| entry.count = entry.count.saturating_add(1))
            .or_insert_with(|| Entry {
                name: name.to_vec(),
                count: 1,
            });
    }

    /// Decrements the refcount for `hash`; erases the entry once it
    /// reaches zero. A no-op if `hash` is absent.
    pub fn release(&mut self, hash: u64) {
        let Some(entry) = self.entries.get_mut(&hash) else {
            return;
        };

        if entry.count <= 1 {
            self.entries.remove(&hash);
        } else {
            entry.count -= 1;
        }
    }

    pub fn lookup(&self, hash: u64) -> Option<&[u8]> {
        self.entries.get(&hash).map(|entry| entry.name.as_slice())
    }

    pub fn contains(&self, hash: u64) -> bool {
        self.entries.contains_key(&hash)
    }

    pub fn count(&self, hash: u64) -> u32 {
        self.entries.get(&hash).map_or(0, |entry| entry.count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &[u8], u32)> {
        self.entries
            .iter()
            .map(|(hash, entry)| (*hash, entry.name.as_slice(), entry.count))
    }

    /// Used only by the snapshot loader, which must populate a freshly
    /// constructed, empty dictionary from exact `(hash, name, count)`
    /// triples rather than through `intern`'s refcount bookkeeping.
    pub fn insert_raw(&mut self, hash: u64, name: Vec<u8>, count: u32) {
        self.entries.insert(hash, Entry { name, count });
    }
}

#[cfg(test)]
mod tests {
    use super::ElementDict;

    #[test]
    fn intern_then_release_erases_entry() {
        let mut dict = ElementDict::new();
        dict.intern(1, b"a");
        assert_eq!(dict.count(1), 1);
        dict.intern(1, b"a");
        assert_eq!(dict.count(1), 2);

        dict.release(1);
        assert_eq!(dict.count(1), 1);
        dict.release(1);
        assert!(!dict.contains(1));
    }

    #[test]
    fn release_on_absent_hash_is_a_no_op() {
        let mut dict = ElementDict::new();
        dict.release(42);
        assert!(!dict.contains(42));
    }

    #[test]
    fn lookup_returns_interned_name() {
        let mut dict = ElementDict::new();
        dict.intern(7, b"seven");
        assert_eq!(dict.lookup(7), Some(b"seven".as_slice()));
        assert_eq!(dict.lookup(8), None);
    }
}
