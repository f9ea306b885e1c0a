//! Connection Index
//!
//! Maps an ordered gate pair `(from, to)` to the set of wires between them,
//! where a wire is an `(output slot, input slot)` pair. Several independent
//! wires may join the same two gates.
//!
//! The index never owns graph topology: when the last wire between a pair
//! goes away the pair disappears here, and the caller removes the matching
//! graph edge.

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use crate::gate::GateUid;

/// `(output slot on the source gate, input slot on the destination gate)`.
pub type Wire = (usize, usize);

/// Snapshot of the wires between one gate pair.
pub type Wires = SmallVec<[Wire; 4]>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionMap {
    map: IndexMap<GateUid, IndexMap<GateUid, IndexSet<Wire>>>,
}

impl ConnectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether at least one wire runs from `from` to `to`.
    pub fn contains(&self, from: GateUid, to: GateUid) -> bool {
        self.map.get(&from).is_some_and(|targets| targets.contains_key(&to))
    }

    pub fn contains_wire(&self, from: GateUid, to: GateUid, wire: Wire) -> bool {
        self.map
            .get(&from)
            .and_then(|targets| targets.get(&to))
            .is_some_and(|wires| wires.contains(&wire))
    }

    /// Insert a wire. Returns `true` if this is the first wire between the
    /// pair.
    pub fn add(&mut self, from: GateUid, to: GateUid, wire: Wire) -> bool {
        let wires = self.map.entry(from).or_default().entry(to).or_default();
        let first = wires.is_empty();
        wires.insert(wire);
        first
    }

    /// The wires between the pair, or `None` if they are not connected.
    pub fn get(&self, from: GateUid, to: GateUid) -> Option<Wires> {
        self.map
            .get(&from)
            .and_then(|targets| targets.get(&to))
            .map(|wires| wires.iter().copied().collect())
    }

    /// Remove every wire between the pair. Returns `true` if any existed.
    pub fn remove(&mut self, from: GateUid, to: GateUid) -> bool {
        let Some(targets) = self.map.get_mut(&from) else {
            return false;
        };
        let removed = targets.shift_remove(&to).is_some();
        if targets.is_empty() {
            self.map.shift_remove(&from);
        }
        removed
    }

    /// Remove one wire. Returns `true` if the pair is now disconnected.
    pub fn remove_wire(&mut self, from: GateUid, to: GateUid, wire: Wire) -> bool {
        let Some(targets) = self.map.get_mut(&from) else {
            return false;
        };
        let Some(wires) = targets.get_mut(&to) else {
            return false;
        };
        if !wires.shift_remove(&wire) {
            return false;
        }
        if !wires.is_empty() {
            return false;
        }
        targets.shift_remove(&to);
        if targets.is_empty() {
            self.map.shift_remove(&from);
        }
        true
    }

    /// Every connected pair with its wires.
    pub fn iter(&self) -> impl Iterator<Item = ((GateUid, GateUid), Wires)> + '_ {
        self.map.iter().flat_map(|(&from, targets)| {
            targets
                .iter()
                .map(move |(&to, wires)| ((from, to), wires.iter().copied().collect()))
        })
    }

    /// Every connected pair.
    pub fn pairs(&self) -> impl Iterator<Item = (GateUid, GateUid)> + '_ {
        self.map
            .iter()
            .flat_map(|(&from, targets)| targets.keys().map(move |&to| (from, to)))
    }

    /// Number of connected pairs.
    pub fn len(&self) -> usize {
        self.map.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(n: u64) -> GateUid {
        GateUid::from(n)
    }

    #[test]
    fn add_reports_first_wire() {
        let mut connections = ConnectionMap::new();
        assert!(connections.add(uid(0), uid(1), (0, 0)));
        assert!(!connections.add(uid(0), uid(1), (0, 1)));
        assert!(!connections.add(uid(0), uid(1), (0, 1)));

        assert!(connections.contains(uid(0), uid(1)));
        assert!(!connections.contains(uid(1), uid(0)));
        assert_eq!(connections.get(uid(0), uid(1)).unwrap().as_slice(), &[(0, 0), (0, 1)]);
        assert_eq!(connections.len(), 1);
    }

    #[test]
    fn removing_last_wire_drops_pair() {
        let mut connections = ConnectionMap::new();
        connections.add(uid(0), uid(1), (0, 0));
        connections.add(uid(0), uid(1), (1, 0));

        assert!(!connections.remove_wire(uid(0), uid(1), (0, 0)));
        assert!(!connections.remove_wire(uid(0), uid(1), (0, 0)));
        assert!(connections.remove_wire(uid(0), uid(1), (1, 0)));
        assert!(!connections.contains(uid(0), uid(1)));
        assert!(connections.get(uid(0), uid(1)).is_none());
        assert!(connections.is_empty());
    }

    #[test]
    fn bulk_remove_and_iteration() {
        let mut connections = ConnectionMap::new();
        connections.add(uid(0), uid(1), (0, 0));
        connections.add(uid(0), uid(2), (0, 1));
        connections.add(uid(2), uid(1), (0, 1));

        assert!(connections.remove(uid(0), uid(1)));
        assert!(!connections.remove(uid(0), uid(1)));

        let pairs: Vec<_> = connections.pairs().collect();
        assert_eq!(pairs, vec![(uid(0), uid(2)), (uid(2), uid(1))]);

        let all: Vec<_> = connections.iter().collect();
        assert_eq!(all[1].0, (uid(2), uid(1)));
        assert_eq!(all[1].1.as_slice(), &[(0, 1)]);
    }

    #[test]
    fn snapshots_are_restartable() {
        let mut connections = ConnectionMap::new();
        connections.add(uid(3), uid(4), (2, 5));

        let wires = connections.get(uid(3), uid(4)).unwrap();
        assert_eq!(wires.iter().count(), 1);
        assert_eq!(wires.iter().count(), 1);
        assert!(connections.contains_wire(uid(3), uid(4), (2, 5)));
    }
}
