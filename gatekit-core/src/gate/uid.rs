//! Gate Identity
//!
//! Every gate receives a UID when it is created. UIDs are vertex keys in a
//! definition's graph and keys of its state map, and are never reused.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GateUid(u64);

impl GateUid {
    /// Largest UID an allocator will hand out or accept.
    pub const MAX: GateUid = GateUid(u64::MAX >> 1);

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for GateUid {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for GateUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic UID source.
///
/// A project owns one allocator and passes it to every place that creates a
/// gate, so two projects never interfere and ids are reproducible in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UidAllocator {
    next: u64,
}

impl UidAllocator {
    /// Create an allocator whose first UID is 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next UID.
    pub fn allocate(&mut self) -> GateUid {
        let uid = GateUid(self.next);
        self.next += 1;
        uid
    }

    /// Make sure `uid` will never be handed out, e.g. after reviving a
    /// persisted circuit that already uses it. Returns `false`, reserving
    /// nothing, if `uid` is above [`GateUid::MAX`].
    pub fn reserve(&mut self, uid: GateUid) -> bool {
        if uid > GateUid::MAX {
            return false;
        }
        self.next = self.next.max(uid.0 + 1);
        true
    }

    /// Whether `uid` has been handed out or reserved already.
    pub fn is_issued(&self, uid: GateUid) -> bool {
        uid.0 < self.next
    }

    /// The UID the next call to [`allocate`](Self::allocate) returns.
    pub fn peek(&self) -> GateUid {
        GateUid(self.next)
    }
}
