//! Error taxonomy (spec §7). Every failure is local: no retries, nothing
//! is logged, each call returns its own status.

use thiserror::Error;

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum CoreError {
    /// `remove`/`elements`/`set_name` given a node index that is out of
    /// range or not the terminal of a stored set.
    #[error("node index {0} is out of range or is not a stored set's terminal")]
    BadIndex(u32),

    /// Internal consistency failure: a `HAS_SET_ID` node has no entry in
    /// the identifier map. Should not occur unless invariants are
    /// violated.
    #[error("node index {0} is flagged as a stored set but has no identifier")]
    MissingId(u32),

    /// `purge` called on an index with no garbage to reclaim.
    #[error("nothing to purge")]
    NothingToPurge,

    /// Snapshot section tag mismatch, length overflow, base64 alphabet
    /// violation, block-number gap, or load into a non-empty index.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(&'static str),
}
