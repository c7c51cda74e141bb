//! The element hash function (spec §6): a fixed 64-bit non-cryptographic
//! mixing hash, bit-for-bit identical across platforms so snapshots are
//! portable. Byte ingestion is always little-endian, independent of host
//! endianness.

const MULTIPLIER: u64 = 0xC6A4A793_5BD1E995;
const SHIFT: u32 = 47;
const SEED: u64 = 76493;

/// Hashes raw element bytes into the 64-bit value the trie indexes on.
pub fn element_hash(bytes: &[u8]) -> u64 {
    let len = bytes.len();
    let mut h = SEED ^ (len as u64).wrapping_mul(MULTIPLIER);

    let mut chunks = bytes.chunks_exact(8);
    for chunk in &mut chunks {
        let mut k = u64::from_le_bytes(chunk.try_into().expect("chunk is 8 bytes"));
        k = k.wrapping_mul(MULTIPLIER);
        k ^= k >> SHIFT;
        k = k.wrapping_mul(MULTIPLIER);

        h ^= k;
        h = h.wrapping_mul(MULTIPLIER);
    }

    // Matches the reference's switch-fallthrough: all trailing bytes are
    // XORed in at their byte-position shift, and the final multiply only
    // happens when there is at least one trailing byte.
    let trailing = chunks.remainder();
    if !trailing.is_empty() {
        for (idx, byte) in trailing.iter().enumerate() {
            h ^= (*byte as u64) << (8 * idx);
        }
        h = h.wrapping_mul(MULTIPLIER);
    }

    h ^= h >> SHIFT;
    h = h.wrapping_mul(MULTIPLIER);
    h ^= h >> SHIFT;

    h
}

/// Hash of a snapshot section tag (e.g. `"tree"`), used as a framing
/// checksum readers must verify before consuming the section.
pub fn section_tag_hash(tag: &str) -> u64 {
    element_hash(tag.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::{element_hash, section_tag_hash};

    #[test]
    fn empty_input_is_stable() {
        let first = element_hash(b"");
        let second = element_hash(b"");
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_inputs_usually_differ() {
        assert_ne!(element_hash(b"alpha"), element_hash(b"beta"));
    }

    #[test]
    fn hash_is_deterministic_across_lengths() {
        // exercises the 8-byte chunk loop plus every trailing-byte count 1..=7
        for len in 0..=16usize {
            let input: Vec<u8> = (0..len as u8).collect();
            assert_eq!(element_hash(&input), element_hash(&input));
        }
    }

    #[test]
    fn section_tags_are_distinct() {
        let tags = ["tree", "name", "id", "end"];
        let mut hashes: Vec<u64> = tags.iter().map(|t| section_tag_hash(t)).collect();
        hashes.sort_unstable();
        hashes.dedup();
        assert_eq!(hashes.len(), tags.len());
    }

    #[test]
    fn single_byte_input_is_nonzero() {
        let hash = element_hash(b"a");
        assert_eq!(hash, element_hash(b"a"));
        assert_ne!(hash, 0);
    }
}
