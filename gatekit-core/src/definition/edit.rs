//! Structural bookkeeping shared by every edit.
//!
//! These methods touch one definition only. Anything that must also reach
//! the project's type graph takes it as an argument; fan-out to nesting
//! definitions is the editor's job.

use super::{Definition, FromPair, ToPair};
use crate::error::{GateError, GateResult};
use crate::gate::{Gate, GateDim, GateKind, GateUid, StateEntry};
use crate::graph::DirectedGraph;

impl Definition {
    /// Check that `(uid, output)` names an output slot of a contained gate
    /// and return that slot's width.
    pub(crate) fn validate_from(&self, (uid, output): FromPair) -> GateResult<GateDim> {
        let dims = self.require(uid)?.output_dims();
        dims.get(output).copied().ok_or(GateError::InvalidOutputIndex {
            gate: uid,
            index: output,
            count: dims.len(),
        })
    }

    /// Check that `(input, uid)` names an input slot of a contained gate and
    /// return that slot's width.
    pub(crate) fn validate_to(&self, (input, uid): ToPair) -> GateResult<GateDim> {
        let dims = self.require(uid)?.input_dims();
        dims.get(input).copied().ok_or(GateError::InvalidInputIndex {
            gate: uid,
            index: input,
            count: dims.len(),
        })
    }

    /// Check both endpoints of a wire and that their widths agree.
    pub(crate) fn validate_wire(&self, from: FromPair, to: ToPair) -> GateResult<()> {
        let from_dim = self.validate_from(from)?;
        let to_dim = self.validate_to(to)?;
        if from_dim != to_dim {
            return Err(GateError::DimensionMismatch {
                definition: self.name.clone(),
                from: from.0,
                output: from.1,
                from_dim,
                input: to.0,
                to: to.1,
                to_dim,
            });
        }
        Ok(())
    }

    /// Whether `gate` may be added: its UID is new here and its type exists
    /// and does not depend on this definition.
    pub(crate) fn admit(&self, gate: &Gate, types: &DirectedGraph<String>) -> GateResult<()> {
        if self.gates.contains_key(&gate.uid()) {
            return Err(GateError::DuplicateGate(gate.uid(), self.name.clone()));
        }
        if matches!(gate.kind(), GateKind::Source(_) | GateKind::Sink(_)) {
            return Err(GateError::PortGate(gate.uid(), self.name.clone()));
        }
        let gate_type = gate.type_name();
        if self.gate_types.contains_key(gate_type) {
            return Ok(());
        }
        if !types.contains_vertex(&gate_type.to_owned()) {
            return Err(GateError::UnknownDefinition(gate_type.to_owned()));
        }
        if types.check_edge(&self.name, &gate_type.to_owned()) {
            return Err(GateError::RecursiveDefinition {
                definition: self.name.clone(),
                gate_type: gate_type.to_owned(),
            });
        }
        Ok(())
    }

    /// Add a gate with the given saved state. Registers the type dependency
    /// the first time a type appears.
    pub(crate) fn insert_gate(
        &mut self,
        gate: Gate,
        entry: StateEntry,
        types: &mut DirectedGraph<String>,
    ) -> GateResult<()> {
        self.admit(&gate, types)?;
        if !self.gate_types.contains_key(gate.type_name()) {
            types.add_edge(self.name.clone(), gate.type_name().to_owned());
        }
        let uid = gate.uid();
        self.register(gate);
        self.state.gates.insert(uid, entry);
        Ok(())
    }

    /// Remove a gate and every wire touching it. Drops the type dependency
    /// when the last gate of its type goes.
    pub(crate) fn take_gate(
        &mut self,
        uid: GateUid,
        types: &mut DirectedGraph<String>,
    ) -> GateResult<Gate> {
        if self.is_port(uid) {
            return Err(GateError::ProtectedGate(uid, self.name.clone()));
        }
        let gate_type = self.require(uid)?.type_name().to_owned();

        if let Some(uids) = self.gate_types.get_mut(&gate_type) {
            uids.shift_remove(&uid);
            if uids.is_empty() {
                self.gate_types.shift_remove(&gate_type);
                types.remove_edge(&self.name, &gate_type);
            }
        }

        let predecessors: Vec<GateUid> = self.graph.predecessors(&uid).iter().copied().collect();
        for from in predecessors {
            self.connections.remove(from, uid);
        }
        let successors: Vec<GateUid> = self.graph.successors(&uid).iter().copied().collect();
        for to in successors {
            self.connections.remove(uid, to);
        }

        self.graph.remove_vertex(&uid);
        self.state.gates.shift_remove(&uid);
        self.mark_dirty();
        self.gates
            .shift_remove(&uid)
            .ok_or_else(|| GateError::UnknownGate(uid, self.name.clone()))
    }

    /// Re-key a type in the usage index and rename the compound gates of
    /// that type.
    pub(crate) fn rename_gate_type(&mut self, name: &str, new_name: &str) {
        let Some(uids) = self.gate_types.shift_remove(name) else {
            return;
        };
        for uid in &uids {
            if let Some(GateKind::Compound(gate)) = self.gates.get_mut(uid).map(Gate::kind_mut) {
                gate.set_name(new_name.to_owned());
            }
        }
        self.gate_types.insert(new_name.to_owned(), uids);
    }

    /// Add a wire. Returns `true` if the gates were not connected before.
    pub(crate) fn connect(&mut self, from: FromPair, to: ToPair) -> GateResult<bool> {
        self.validate_wire(from, to)?;
        let added = self.connections.add(from.0, to.1, (from.1, to.0));
        if added {
            self.graph.add_edge(from.0, to.1);
            self.mark_dirty();
        }
        Ok(added)
    }

    /// Remove a wire. Returns `true` if the gates are no longer connected.
    pub(crate) fn disconnect(&mut self, from: FromPair, to: ToPair) -> GateResult<bool> {
        self.validate_from(from)?;
        self.validate_to(to)?;
        let emptied = self.connections.remove_wire(from.0, to.1, (from.1, to.0));
        if emptied {
            self.graph.remove_edge(&from.0, &to.1);
            self.mark_dirty();
        }
        Ok(emptied)
    }

    /// Remove every wire into one input slot. Returns `true` if any pair of
    /// gates lost its last wire.
    pub(crate) fn clear_gate_input(&mut self, (input, uid): ToPair) -> GateResult<bool> {
        self.validate_to((input, uid))?;
        let predecessors: Vec<GateUid> = self.graph.predecessors(&uid).iter().copied().collect();
        let mut changed = false;
        for from in predecessors {
            for wire in self.connections.get(from, uid).unwrap_or_default() {
                if wire.1 == input && self.connections.remove_wire(from, uid, wire) {
                    self.graph.remove_edge(&from, &uid);
                    changed = true;
                }
            }
        }
        if changed {
            self.mark_dirty();
        }
        Ok(changed)
    }

    /// Remove every wire out of one output slot. Returns `true` if any pair
    /// of gates lost its last wire.
    pub(crate) fn clear_gate_output(&mut self, (uid, output): FromPair) -> GateResult<bool> {
        self.validate_from((uid, output))?;
        let successors: Vec<GateUid> = self.graph.successors(&uid).iter().copied().collect();
        let mut changed = false;
        for to in successors {
            for wire in self.connections.get(uid, to).unwrap_or_default() {
                if wire.0 == output && self.connections.remove_wire(uid, to, wire) {
                    self.graph.remove_edge(&uid, &to);
                    changed = true;
                }
            }
        }
        if changed {
            self.mark_dirty();
        }
        Ok(changed)
    }
}
