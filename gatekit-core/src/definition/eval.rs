//! Evaluation Engine
//!
//! # How a Step Works
//!
//! 1. The cached [`EvalOrder`] is rebuilt if the graph changed since it was
//!    last computed: the feedback-aware order from the Source, the gates
//!    whose outgoing edges were cut, and the gates that feed the Sink.
//!
//! 2. Gates are visited in that order. Each gate's inputs come from
//!    outputs computed earlier in the same step, or, across a cut edge, from
//!    the outputs saved on the previous step. Anything else is unknown.
//!
//! 3. The Sink's inputs become the definition's outputs.
//!
//! A definition nested inside another is stepped in pull mode, visiting only
//! the gates that feed its Sink. A top-level tick visits every gate so that
//! state which nothing observes still advances.

use std::cell::Ref;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

use super::Definition;
use crate::gate::{self, GateData, GateUid, StateEntry, StateMap};
use crate::project::Project;

/// Cached evaluation metadata, valid while `dirty` is false.
#[derive(Debug, Clone)]
pub(crate) struct EvalOrder {
    pub(crate) dirty: bool,
    pub(crate) order: Vec<GateUid>,
    /// Source endpoints of cut edges; their outputs are read a step late.
    pub(crate) cut: IndexSet<GateUid>,
    /// The Sink and every gate that can reach it.
    pub(crate) rooted: IndexSet<GateUid>,
    /// Gates that keep state of their own.
    pub(crate) stateful: IndexSet<GateUid>,
}

impl Default for EvalOrder {
    fn default() -> Self {
        Self {
            dirty: true,
            order: Vec::new(),
            cut: IndexSet::new(),
            rooted: IndexSet::new(),
            stateful: IndexSet::new(),
        }
    }
}

impl Definition {
    /// The evaluation metadata, recomputed first if the graph changed.
    pub(crate) fn eval_order(&self) -> Ref<'_, EvalOrder> {
        if self.cache.borrow().dirty {
            let fresh = self.compute_order();
            *self.cache.borrow_mut() = fresh;
        }
        self.cache.borrow()
    }

    fn compute_order(&self) -> EvalOrder {
        let (order, cut_edges) = self.graph.order(&self.source);
        let cut: IndexSet<GateUid> = cut_edges.iter().map(|&(from, _)| from).collect();
        let mut rooted = self.graph.all_predecessors(&self.sink);
        rooted.insert(self.sink);
        let stateful = self
            .gates
            .values()
            .filter(|gate| gate.is_stateful())
            .map(|gate| gate.uid())
            .collect();

        debug!(
            definition = %self.name,
            gates = order.len(),
            cut_edges = cut_edges.len(),
            "recomputed evaluation order"
        );

        EvalOrder { dirty: false, order, cut, rooted, stateful }
    }

    /// Gates in the order a step visits them.
    pub fn evaluation_order(&self) -> Vec<GateUid> {
        self.eval_order().order.clone()
    }

    /// Gates whose outputs are consumed one step late.
    pub fn cut_gates(&self) -> IndexSet<GateUid> {
        self.eval_order().cut.clone()
    }

    /// The Sink and every gate that feeds it.
    pub fn rooted_gates(&self) -> IndexSet<GateUid> {
        self.eval_order().rooted.clone()
    }

    /// The initial state of a nested instance of this definition.
    ///
    /// Only gates feeding the Sink get an entry: their own state when they
    /// keep one, and their initial outputs when a cut edge reads them late.
    /// Returns `None` when no gate needs anything saved.
    pub fn init_state(&self, project: &Project) -> Option<StateMap> {
        let cache = self.eval_order();
        let mut states = StateMap::new();
        for &uid in &cache.order {
            if self.is_port(uid) || !cache.rooted.contains(&uid) {
                continue;
            }
            let Some(gate) = self.gates.get(&uid) else {
                continue;
            };
            let mut state = if cache.stateful.contains(&uid) {
                gate.init_state(project)
            } else {
                None
            };
            let outputs = cache
                .cut
                .contains(&uid)
                .then(|| gate.call(project, &gate.init_inputs(), state.as_mut()));

            let mut entry = StateEntry::new(state, outputs);
            if entry.normalize() {
                states.insert(uid, entry);
            }
        }
        (!states.is_empty()).then_some(states)
    }

    /// Run one step over `state`, returning the definition's outputs.
    ///
    /// With `all` unset only the gates feeding the Sink are visited.
    pub fn process_state(
        &self,
        project: &Project,
        inputs: &GateData,
        state: &mut StateMap,
        all: bool,
    ) -> GateData {
        let cache = self.eval_order();
        let mut fresh: IndexMap<GateUid, GateData> = IndexMap::with_capacity(cache.order.len());
        let mut outputs = gate::unknowns(&self.output_dims);

        for &uid in &cache.order {
            if uid == self.source || !(all || cache.rooted.contains(&uid)) {
                continue;
            }
            let Some(gate) = self.gates.get(&uid) else {
                continue;
            };

            let gate_inputs = self.assemble_inputs(uid, gate.input_dims().len(), inputs, &fresh, state);
            if uid == self.sink {
                outputs = gate_inputs;
                continue;
            }

            let entry = state.get_mut(&uid);
            let (gate_state, saved) = match entry {
                Some(entry) => (entry.state.as_mut(), entry.outputs.as_mut()),
                None => (None, None),
            };
            let result = gate.call(project, &gate_inputs, gate_state);
            if let Some(saved) = saved {
                saved.clone_from(&result);
            }
            fresh.insert(uid, result);
        }

        outputs
    }

    /// Input buses of `uid` during a step.
    fn assemble_inputs(
        &self,
        uid: GateUid,
        count: usize,
        inputs: &GateData,
        fresh: &IndexMap<GateUid, GateData>,
        state: &StateMap,
    ) -> GateData {
        let mut gathered = vec![None; count];
        for &from in self.graph.predecessors(&uid) {
            let outputs = if from == self.source {
                Some(inputs)
            } else {
                fresh
                    .get(&from)
                    .or_else(|| state.get(&from).and_then(|entry| entry.outputs.as_ref()))
            };
            for (output, input) in self.connections.get(from, uid).unwrap_or_default() {
                if let Some(slot) = gathered.get_mut(input) {
                    *slot = outputs.and_then(|data| data.get(output).cloned()).flatten();
                }
            }
        }
        gathered
    }

    /// Step the definition's own state once, visiting every gate.
    pub(crate) fn tick_with(&self, project: &Project, state: &mut StateMap) -> GateData {
        trace!(definition = %self.name, "tick");
        self.process_state(project, &self.state.inputs, state, true)
    }
}
