//! Definitions
//!
//! A definition is a named, editable network of gates with its own input and
//! output ports. Two pseudo-gates stand for those ports: the Source, whose
//! outputs are the definition's inputs, and the Sink, whose inputs are the
//! definition's outputs.
//!
//! # Overview
//!
//! A definition owns:
//!
//! - a registry of contained gates, keyed by UID
//! - a type-usage index (gate type name -> UIDs of that type)
//! - a [`DirectedGraph`] over UIDs with an edge wherever at least one wire runs
//! - a [`ConnectionMap`] holding the individual wires
//! - its live state: input values, output values, and one [`StateEntry`](crate::gate::StateEntry) per
//!   contained gate
//! - the UIDs of its own compound instances, wherever they are nested
//!
//! Structural edits go through [`Editor`](crate::project::Editor), which
//! keeps the project's type graph and every nesting definition consistent.
//! The methods here are the per-definition bookkeeping those edits share.
//!
//! # Design Decisions
//!
//! 1. The evaluation order is cached and recomputed lazily. Every change to
//!    the graph marks the cache dirty; the next read rebuilds it.
//!
//! 2. Gates are referenced by UID everywhere, never by reference, so nested
//!    definitions never alias each other.

mod connections;
mod edit;
mod eval;
mod ports;
mod repair;

use std::cell::RefCell;

use indexmap::{IndexMap, IndexSet};

pub use connections::{ConnectionMap, Wire, Wires};
pub(crate) use eval::EvalOrder;
pub(crate) use ports::{PortEdit, Side};

use crate::error::{GateError, GateResult};
use crate::gate::{self, Gate, GateData, GateDim, GateState, GateUid, Sink, Source, StateMap};
use crate::graph::DirectedGraph;

/// `(gate, output slot)`.
pub type FromPair = (GateUid, usize);

/// `(input slot, gate)`.
pub type ToPair = (usize, GateUid);

/// The live values of a definition evaluated at the top level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefinitionState {
    /// Values presented on the definition's inputs.
    pub inputs: GateData,
    /// Values the last step produced on the definition's outputs.
    pub outputs: GateData,
    /// Saved state and outputs of every contained gate.
    pub gates: StateMap,
}

#[derive(Debug, Clone)]
pub struct Definition {
    name: String,
    input_dims: Vec<GateDim>,
    output_dims: Vec<GateDim>,
    input_labels: Vec<String>,
    output_labels: Vec<String>,

    source: GateUid,
    sink: GateUid,
    gates: IndexMap<GateUid, Gate>,
    gate_types: IndexMap<String, IndexSet<GateUid>>,
    graph: DirectedGraph<GateUid>,
    connections: ConnectionMap,

    state: DefinitionState,
    instances: IndexSet<GateUid>,
    cache: RefCell<EvalOrder>,
}

impl Definition {
    /// An empty definition holding only its Source and Sink.
    pub(crate) fn new(
        name: String,
        source: GateUid,
        sink: GateUid,
        input_dims: Vec<GateDim>,
        output_dims: Vec<GateDim>,
        input_labels: Vec<String>,
        output_labels: Vec<String>,
    ) -> Self {
        let mut definition = Self {
            name,
            state: DefinitionState {
                inputs: gate::zeros(&input_dims),
                outputs: gate::zeros(&output_dims),
                gates: StateMap::new(),
            },
            source,
            sink,
            gates: IndexMap::new(),
            gate_types: IndexMap::new(),
            graph: DirectedGraph::new(),
            connections: ConnectionMap::new(),
            instances: IndexSet::new(),
            cache: RefCell::new(EvalOrder::default()),
            input_labels,
            output_labels,
            input_dims,
            output_dims,
        };
        let ports = [
            Gate::new(sink, Sink::new(definition.output_dims.clone())),
            Gate::new(source, Source::new(definition.input_dims.clone())),
        ];
        for gate in ports {
            definition.register(gate);
        }
        definition
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn input_dims(&self) -> &[GateDim] {
        &self.input_dims
    }

    pub fn output_dims(&self) -> &[GateDim] {
        &self.output_dims
    }

    pub fn input_labels(&self) -> &[String] {
        &self.input_labels
    }

    pub fn output_labels(&self) -> &[String] {
        &self.output_labels
    }

    /// UID of the pseudo-gate carrying the definition's inputs.
    pub fn source(&self) -> GateUid {
        self.source
    }

    /// UID of the pseudo-gate collecting the definition's outputs.
    pub fn sink(&self) -> GateUid {
        self.sink
    }

    pub fn gate(&self, uid: GateUid) -> Option<&Gate> {
        self.gates.get(&uid)
    }

    pub fn gates(&self) -> impl Iterator<Item = &Gate> {
        self.gates.values()
    }

    pub fn contains(&self, uid: GateUid) -> bool {
        self.gates.contains_key(&uid)
    }

    /// Gate type name -> UIDs of the contained gates of that type.
    pub fn gate_types(&self) -> &IndexMap<String, IndexSet<GateUid>> {
        &self.gate_types
    }

    pub fn graph(&self) -> &DirectedGraph<GateUid> {
        &self.graph
    }

    pub fn connections(&self) -> &ConnectionMap {
        &self.connections
    }

    /// UIDs of every compound gate created from this definition.
    pub fn instances(&self) -> &IndexSet<GateUid> {
        &self.instances
    }

    pub fn is_instance(&self, uid: GateUid) -> bool {
        self.instances.contains(&uid)
    }

    pub(crate) fn add_instance(&mut self, uid: GateUid) {
        self.instances.insert(uid);
    }

    pub(crate) fn remove_instance(&mut self, uid: GateUid) {
        self.instances.shift_remove(&uid);
    }

    pub fn state(&self) -> &DefinitionState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut DefinitionState {
        &mut self.state
    }

    pub fn inputs(&self) -> &GateData {
        &self.state.inputs
    }

    pub fn outputs(&self) -> &GateData {
        &self.state.outputs
    }

    /// Whether `uid` is the Source or the Sink.
    pub fn is_port(&self, uid: GateUid) -> bool {
        uid == self.source || uid == self.sink
    }

    pub(crate) fn require(&self, uid: GateUid) -> GateResult<&Gate> {
        self.gates
            .get(&uid)
            .ok_or_else(|| GateError::UnknownGate(uid, self.name.clone()))
    }

    pub fn gate_predecessors(&self, uid: GateUid) -> GateResult<&IndexSet<GateUid>> {
        self.require(uid)?;
        Ok(self.graph.predecessors(&uid))
    }

    pub fn gate_successors(&self, uid: GateUid) -> GateResult<&IndexSet<GateUid>> {
        self.require(uid)?;
        Ok(self.graph.successors(&uid))
    }

    /// The last outputs saved for a gate. For the Source this is the
    /// definition's current input values.
    pub fn gate_outputs(&self, uid: GateUid) -> Option<&GateData> {
        if uid == self.source {
            return Some(&self.state.inputs);
        }
        self.state.gates.get(&uid).and_then(|entry| entry.outputs.as_ref())
    }

    pub fn gate_state(&self, uid: GateUid) -> Option<&GateState> {
        self.state.gates.get(&uid).and_then(|entry| entry.state.as_ref())
    }

    /// The input buses a gate would see right now, assembled from the saved
    /// outputs of its predecessors.
    pub fn gate_inputs(&self, uid: GateUid) -> GateResult<GateData> {
        let gate = self.require(uid)?;
        let mut inputs = gate::unknowns(gate.input_dims());
        for &from in self.graph.predecessors(&uid) {
            let outputs = self.gate_outputs(from);
            for (output, input) in self.connections.get(from, uid).unwrap_or_default() {
                inputs[input] = outputs.and_then(|data| data.get(output).cloned()).flatten();
            }
        }
        Ok(inputs)
    }

    /// Every input wired from a gate's output slot.
    pub fn to_pairs(&self, (from, output): FromPair) -> GateResult<Vec<ToPair>> {
        self.validate_from((from, output))?;
        let mut pairs = Vec::new();
        for &to in self.graph.successors(&from) {
            for (out, input) in self.connections.get(from, to).unwrap_or_default() {
                if out == output {
                    pairs.push((input, to));
                }
            }
        }
        Ok(pairs)
    }

    /// Every output wired into a gate's input slot.
    pub fn from_pairs(&self, (input, to): ToPair) -> GateResult<Vec<FromPair>> {
        self.validate_to((input, to))?;
        let mut pairs = Vec::new();
        for &from in self.graph.predecessors(&to) {
            for (output, inp) in self.connections.get(from, to).unwrap_or_default() {
                if inp == input {
                    pairs.push((from, output));
                }
            }
        }
        Ok(pairs)
    }

    /// Presentation ranks for every gate, with the Source at rank 0.
    pub fn layers(&self) -> IndexMap<GateUid, usize> {
        self.graph.layers(&self.source)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.cache.get_mut().dirty = true;
    }

    /// Add a gate to the registry, the type index, and the graph.
    fn register(&mut self, gate: Gate) {
        let uid = gate.uid();
        self.gate_types
            .entry(gate.type_name().to_owned())
            .or_default()
            .insert(uid);
        self.graph.add_vertex(uid);
        self.gates.insert(uid, gate);
        self.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition() -> Definition {
        Definition::new(
            "Test".into(),
            GateUid::from(0),
            GateUid::from(1),
            vec![1, 2],
            vec![1],
            vec!["a".into(), "b".into()],
            vec!["out".into()],
        )
    }

    #[test]
    fn starts_with_source_and_sink() {
        let definition = definition();

        assert_eq!(definition.gates().count(), 2);
        assert!(definition.is_port(definition.source()));
        assert!(definition.is_port(definition.sink()));
        assert_eq!(definition.gate(definition.source()).unwrap().output_dims(), &[1, 2]);
        assert_eq!(definition.gate(definition.sink()).unwrap().input_dims(), &[1]);
        assert_eq!(definition.gate_types().len(), 2);
        assert_eq!(definition.inputs(), &gate::zeros(&[1, 2]));
        assert_eq!(definition.outputs(), &gate::zeros(&[1]));
    }

    #[test]
    fn unknown_gates_are_rejected() {
        let definition = definition();
        assert_eq!(
            definition.gate_predecessors(GateUid::from(9)),
            Err(GateError::UnknownGate(GateUid::from(9), "Test".into()))
        );
    }
}
