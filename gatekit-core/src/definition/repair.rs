//! Repairing nested state after a nested definition changes.
//!
//! When definition `X` is edited, every definition that contains `X`, even
//! several levels down, may hold saved state shaped by the old `X`. Those
//! entries are reached by following a chain of definition types: for a chain
//! `[X, D]` the walk enters the state of every `D` instance, and inside it
//! rewrites the entries of every `X` instance.

use indexmap::IndexSet;

use super::Definition;
use crate::gate::{GateState, GateUid, StateEntry, StateMap};

/// Walk `states` along `chain` and run `proc` on every entry that belongs
/// to an instance of `chain[0]`.
///
/// `chain[i]` holds the instance UIDs of the i-th definition; the last one is
/// matched against `states` directly. Entries left with nothing worth saving
/// are pruned on the way back out.
pub(crate) fn run_on_type_states(
    states: &mut StateMap,
    chain: &[IndexSet<GateUid>],
    proc: &mut dyn FnMut(&mut StateEntry),
) {
    let Some((instances, rest)) = chain.split_last() else {
        return;
    };
    for (uid, entry) in states.iter_mut() {
        if !instances.contains(uid) {
            continue;
        }
        if rest.is_empty() {
            proc(entry);
        } else if let Some(GateState::Map(inner)) = &mut entry.state {
            run_on_type_states(inner, rest, proc);
        }
    }
    states.retain(|uid, entry| !instances.contains(uid) || entry.normalize());
}

impl Definition {
    /// [`run_on_type_states`] over this definition's own saved state.
    pub(crate) fn run_on_type_states(
        &mut self,
        chain: &[IndexSet<GateUid>],
        proc: &mut dyn FnMut(&mut StateEntry),
    ) {
        run_on_type_states(&mut self.state.gates, chain, proc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::GateData;

    fn uid(n: u64) -> GateUid {
        GateUid::from(n)
    }

    fn bit(value: i64) -> GateData {
        vec![Some(vec![Some(value)])]
    }

    #[test]
    fn rewrites_direct_instances() {
        let mut states = StateMap::new();
        states.insert(uid(1), StateEntry::new(None, Some(bit(0))));
        states.insert(uid(2), StateEntry::new(None, Some(bit(0))));
        let chain = vec![IndexSet::from([uid(1)])];

        run_on_type_states(&mut states, &chain, &mut |entry| entry.outputs = Some(bit(1)));

        assert_eq!(states[&uid(1)].outputs, Some(bit(1)));
        assert_eq!(states[&uid(2)].outputs, Some(bit(0)));
    }

    #[test]
    fn descends_through_nested_instances() {
        // uid 5 is an instance of D, which holds uid 7, an instance of X.
        let mut inner = StateMap::new();
        inner.insert(uid(7), StateEntry::new(None, Some(bit(0))));
        let mut states = StateMap::new();
        states.insert(uid(5), StateEntry::new(Some(GateState::Map(inner)), Some(bit(0))));
        let chain = vec![IndexSet::from([uid(7)]), IndexSet::from([uid(5)])];

        run_on_type_states(&mut states, &chain, &mut |entry| entry.outputs = Some(bit(1)));

        let Some(GateState::Map(inner)) = &states[&uid(5)].state else {
            panic!("nested state should survive");
        };
        assert_eq!(inner[&uid(7)].outputs, Some(bit(1)));
        assert_eq!(states[&uid(5)].outputs, Some(bit(0)));
    }

    #[test]
    fn prunes_emptied_entries() {
        let mut inner = StateMap::new();
        inner.insert(uid(7), StateEntry::new(None, Some(bit(0))));
        let mut states = StateMap::new();
        states.insert(uid(5), StateEntry::new(Some(GateState::Map(inner)), None));
        let chain = vec![IndexSet::from([uid(7)]), IndexSet::from([uid(5)])];

        run_on_type_states(&mut states, &chain, &mut |entry| entry.outputs = None);

        assert!(states.is_empty());
    }
}
