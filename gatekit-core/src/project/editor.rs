//! The editing handle for one definition.
//!
//! Every structural edit needs more than the definition itself: adding a
//! gate consults the project's type graph, and edits that change a
//! definition's shape must reach every definition nesting it. An [`Editor`]
//! borrows the whole project for that reason.

use tracing::debug;

use super::Project;
use crate::definition::{Definition, FromPair, PortEdit, Side, ToPair};
use crate::error::{GateError, GateResult};
use crate::gate::{self, Bus, Datum, Gate, GateData, GateDim, GateState, GateUid, StateEntry, StateMap};
use crate::graph::DirectedGraph;

/// Mutable access to one definition of a project.
pub struct Editor<'p> {
    project: &'p mut Project,
    name: String,
}

impl<'p> Editor<'p> {
    pub(crate) fn new(project: &'p mut Project, name: String) -> Self {
        Self { project, name }
    }

    /// Name of the definition being edited.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> GateResult<&Definition> {
        self.project.require(&self.name)
    }

    pub fn project(&self) -> &Project {
        self.project
    }

    fn parts(&mut self) -> GateResult<(&mut Definition, &mut DirectedGraph<String>)> {
        let Project { definitions, dependencies, .. } = &mut *self.project;
        let definition = definitions
            .get_mut(&self.name)
            .ok_or_else(|| GateError::UnknownDefinition(self.name.clone()))?;
        Ok((definition, dependencies))
    }

    fn definition_mut(&mut self) -> GateResult<&mut Definition> {
        self.parts().map(|(definition, _)| definition)
    }

    /// Add a gate built by this project's factories. Fails if the UID was not
    /// issued by the project or is already used here, if the gate is a port
    /// gate, or if its type depends on this definition; the definition is
    /// left untouched in every case.
    pub fn add_gate(&mut self, gate: Gate) -> GateResult<GateUid> {
        let project = &*self.project;
        if !project.uids.is_issued(gate.uid()) {
            return Err(GateError::ForeignUid(gate.uid()));
        }
        project.require(&self.name)?.admit(&gate, &project.dependencies)?;

        let mut state = gate.init_state(project);
        let outputs = gate.call(project, &gate.init_inputs(), state.as_mut());
        let uid = gate.uid();

        self.project.register_instance(&gate);
        let (definition, types) = self.parts()?;
        definition.insert_gate(gate, StateEntry::new(state, Some(outputs)), types)?;
        Ok(uid)
    }

    pub fn add_nand(&mut self) -> GateResult<GateUid> {
        let gate = self.project.nand();
        self.add_gate(gate)
    }

    pub fn add_constant(&mut self, value: Vec<Datum>) -> GateResult<GateUid> {
        let gate = self.project.constant(value)?;
        self.add_gate(gate)
    }

    pub fn add_datetime(&mut self) -> GateResult<GateUid> {
        let gate = self.project.datetime();
        self.add_gate(gate)
    }

    pub fn add_reshaper(&mut self, inputs: Vec<GateDim>, outputs: Vec<GateDim>) -> GateResult<GateUid> {
        let gate = self.project.reshaper(inputs, outputs)?;
        self.add_gate(gate)
    }

    /// Add a new compound gate evaluating the named definition.
    pub fn add_instance(&mut self, name: &str) -> GateResult<GateUid> {
        let gate = self.project.instantiate(name)?;
        self.add_gate(gate)
    }

    /// Remove a gate and every wire touching it.
    pub fn remove_gate(&mut self, uid: GateUid) -> GateResult<Gate> {
        let (definition, types) = self.parts()?;
        let gate = definition.take_gate(uid, types)?;
        if let Some(name) = gate.definition_name() {
            if let Ok(nested) = self.project.require_mut(name) {
                nested.remove_instance(uid);
            }
        }
        self.project.remove_uid(&self.name, uid);
        Ok(gate)
    }

    /// Remove every gate of the given type.
    pub fn remove_gate_type(&mut self, gate_type: &str) -> GateResult<()> {
        let uids: Vec<GateUid> = self
            .definition()?
            .gate_types()
            .get(gate_type)
            .map(|uids| uids.iter().copied().collect())
            .unwrap_or_default();
        for uid in uids {
            self.remove_gate(uid)?;
        }
        Ok(())
    }

    /// Copy a gate under a fresh UID, together with its saved state and
    /// outputs. The copy starts unwired.
    pub fn duplicate_gate(&mut self, uid: GateUid) -> GateResult<GateUid> {
        let definition = self.definition()?;
        if definition.is_port(uid) {
            return Err(GateError::ProtectedGate(uid, self.name.clone()));
        }
        let original = definition.require(uid)?.clone();
        let entry = definition.state().gates.get(&uid).cloned().unwrap_or_default();

        let copy = self.project.duplicate(&original);
        let copy_uid = copy.uid();
        self.project.register_instance(&copy);
        let (definition, types) = self.parts()?;
        definition.insert_gate(copy, entry, types)?;
        Ok(copy_uid)
    }

    /// Wire `from` to `to`. The two slots must have the same width.
    pub fn add_connection(&mut self, from: FromPair, to: ToPair) -> GateResult<()> {
        if self.definition_mut()?.connect(from, to)? {
            self.project.repair_instances(&self.name);
        }
        Ok(())
    }

    pub fn remove_connection(&mut self, from: FromPair, to: ToPair) -> GateResult<()> {
        if self.definition_mut()?.disconnect(from, to)? {
            self.project.repair_instances(&self.name);
        }
        Ok(())
    }

    /// Remove every wire into a gate's input slot.
    pub fn clear_gate_input(&mut self, to: ToPair) -> GateResult<()> {
        if self.definition_mut()?.clear_gate_input(to)? {
            self.project.repair_instances(&self.name);
        }
        Ok(())
    }

    /// Remove every wire out of a gate's output slot.
    pub fn clear_gate_output(&mut self, from: FromPair) -> GateResult<()> {
        if self.definition_mut()?.clear_gate_output(from)? {
            self.project.repair_instances(&self.name);
        }
        Ok(())
    }

    fn source(&self) -> GateResult<GateUid> {
        Ok(self.definition()?.source())
    }

    fn sink(&self) -> GateResult<GateUid> {
        Ok(self.definition()?.sink())
    }

    /// Wire one of the definition's inputs to a gate's input.
    pub fn tie_input_to(&mut self, input: usize, to: ToPair) -> GateResult<()> {
        let source = self.source()?;
        self.add_connection((source, input), to)
    }

    pub fn remove_input_to(&mut self, input: usize, to: ToPair) -> GateResult<()> {
        let source = self.source()?;
        self.remove_connection((source, input), to)
    }

    /// Wire a gate's output to one of the definition's outputs.
    pub fn tie_output_to(&mut self, from: FromPair, output: usize) -> GateResult<()> {
        let sink = self.sink()?;
        self.add_connection(from, (output, sink))
    }

    pub fn remove_output_to(&mut self, from: FromPair, output: usize) -> GateResult<()> {
        let sink = self.sink()?;
        self.remove_connection(from, (output, sink))
    }

    /// Wire one of the definition's inputs straight to one of its outputs.
    pub fn tie_input_to_output(&mut self, input: usize, output: usize) -> GateResult<()> {
        let (source, sink) = (self.source()?, self.sink()?);
        self.add_connection((source, input), (output, sink))
    }

    pub fn remove_input_to_output(&mut self, input: usize, output: usize) -> GateResult<()> {
        let (source, sink) = (self.source()?, self.sink()?);
        self.remove_connection((source, input), (output, sink))
    }

    /// Remove every wire leaving one of the definition's inputs.
    pub fn clear_input(&mut self, input: usize) -> GateResult<()> {
        let source = self.source()?;
        self.clear_gate_output((source, input))
    }

    /// Remove every wire reaching one of the definition's outputs.
    pub fn clear_output(&mut self, output: usize) -> GateResult<()> {
        let sink = self.sink()?;
        self.clear_gate_input((output, sink))
    }

    fn edit_ports(&mut self, side: Side, edit: PortEdit) -> GateResult<()> {
        let rewired = self.definition_mut()?.edit_ports(side, &edit)?;
        self.project.propagate_port_edit(&self.name, side, &edit);
        if rewired {
            self.project.repair_instances(&self.name);
        }
        debug!(definition = %self.name, ?side, ?edit, "edited ports");
        Ok(())
    }

    fn port_count(&self, side: Side) -> GateResult<usize> {
        let definition = self.definition()?;
        Ok(match side {
            Side::Inputs => definition.input_dims().len(),
            Side::Outputs => definition.output_dims().len(),
        })
    }

    fn pop(&mut self, side: Side) -> GateResult<()> {
        let count = self.port_count(side)?;
        if count == 0 {
            return Err(GateError::InvalidPortIndex { definition: self.name.clone(), index: 0, count });
        }
        self.edit_ports(side, PortEdit::Remove { index: count - 1 })
    }

    /// Change a port's width. The port is disconnected everywhere first,
    /// both here and on every instance; its label is kept.
    fn reshape(&mut self, side: Side, index: usize, dim: GateDim) -> GateResult<()> {
        let definition = self.definition()?;
        let (dims, labels) = match side {
            Side::Inputs => (definition.input_dims(), definition.input_labels()),
            Side::Outputs => (definition.output_dims(), definition.output_labels()),
        };
        PortEdit::Remove { index }.validate(&self.name, dims.len())?;
        if dim == 0 {
            return Err(GateError::InvalidDimension);
        }
        if dims[index] == dim {
            return Ok(());
        }
        let label = labels.get(index).cloned().unwrap_or_default();

        self.edit_ports(side, PortEdit::Remove { index })?;
        self.edit_ports(side, PortEdit::Insert { index, dim, label })
    }

    pub fn insert_input(&mut self, index: usize, dim: GateDim, label: impl Into<String>) -> GateResult<()> {
        self.edit_ports(Side::Inputs, PortEdit::Insert { index, dim, label: label.into() })
    }

    pub fn insert_output(&mut self, index: usize, dim: GateDim, label: impl Into<String>) -> GateResult<()> {
        self.edit_ports(Side::Outputs, PortEdit::Insert { index, dim, label: label.into() })
    }

    pub fn append_input(&mut self, dim: GateDim, label: impl Into<String>) -> GateResult<()> {
        let index = self.port_count(Side::Inputs)?;
        self.insert_input(index, dim, label)
    }

    pub fn append_output(&mut self, dim: GateDim, label: impl Into<String>) -> GateResult<()> {
        let index = self.port_count(Side::Outputs)?;
        self.insert_output(index, dim, label)
    }

    pub fn remove_input(&mut self, index: usize) -> GateResult<()> {
        self.edit_ports(Side::Inputs, PortEdit::Remove { index })
    }

    pub fn remove_output(&mut self, index: usize) -> GateResult<()> {
        self.edit_ports(Side::Outputs, PortEdit::Remove { index })
    }

    pub fn pop_input(&mut self) -> GateResult<()> {
        self.pop(Side::Inputs)
    }

    pub fn pop_output(&mut self) -> GateResult<()> {
        self.pop(Side::Outputs)
    }

    pub fn swap_inputs(&mut self, a: usize, b: usize) -> GateResult<()> {
        self.edit_ports(Side::Inputs, PortEdit::Swap { a, b })
    }

    pub fn swap_outputs(&mut self, a: usize, b: usize) -> GateResult<()> {
        self.edit_ports(Side::Outputs, PortEdit::Swap { a, b })
    }

    pub fn reshape_input(&mut self, index: usize, dim: GateDim) -> GateResult<()> {
        self.reshape(Side::Inputs, index, dim)
    }

    pub fn reshape_output(&mut self, index: usize, dim: GateDim) -> GateResult<()> {
        self.reshape(Side::Outputs, index, dim)
    }

    pub fn rename_input(&mut self, index: usize, label: impl Into<String>) -> GateResult<()> {
        self.edit_ports(Side::Inputs, PortEdit::Rename { index, label: label.into() })
    }

    pub fn rename_output(&mut self, index: usize, label: impl Into<String>) -> GateResult<()> {
        self.edit_ports(Side::Outputs, PortEdit::Rename { index, label: label.into() })
    }

    /// Replace every input value.
    pub fn set_inputs(&mut self, inputs: GateData) -> GateResult<()> {
        let definition = self.definition_mut()?;
        gate::validate(&inputs, definition.input_dims())?;
        definition.state_mut().inputs = inputs;
        Ok(())
    }

    /// Replace one input value.
    pub fn set_input(&mut self, index: usize, bus: Bus) -> GateResult<()> {
        let name = self.name.clone();
        let definition = self.definition_mut()?;
        let count = definition.input_dims().len();
        let dim = *definition
            .input_dims()
            .get(index)
            .ok_or(GateError::InvalidPortIndex { definition: name, index, count })?;
        gate::validate(&vec![bus.clone()], &[dim])?;
        definition.state_mut().inputs[index] = bus;
        Ok(())
    }

    /// Overwrite the saved state of one contained gate.
    pub fn set_gate_state(&mut self, uid: GateUid, state: Option<GateState>) -> GateResult<()> {
        let name = self.name.clone();
        let definition = self.definition_mut()?;
        if definition.is_port(uid) {
            return Err(GateError::ProtectedGate(uid, name));
        }
        definition.require(uid)?;
        definition.state_mut().gates.entry(uid).or_default().state = state;
        Ok(())
    }

    /// Put every contained gate back in its initial state and every port
    /// back at default values.
    pub fn reset_state(&mut self) -> GateResult<()> {
        let project = &*self.project;
        let definition = project.require(&self.name)?;
        let mut states = StateMap::new();
        for gate in definition.gates() {
            if definition.is_port(gate.uid()) {
                continue;
            }
            let mut state = gate.init_state(project);
            let outputs = gate.call(project, &gate.init_inputs(), state.as_mut());
            states.insert(gate.uid(), StateEntry::new(state, Some(outputs)));
        }
        let inputs = gate::zeros(definition.input_dims());
        let outputs = gate::zeros(definition.output_dims());

        let state = self.definition_mut()?.state_mut();
        state.gates = states;
        state.inputs = inputs;
        state.outputs = outputs;
        Ok(())
    }

    /// Step the definition once; see [`Project::tick`].
    pub fn tick(&mut self) -> GateResult<GateData> {
        self.project.tick(&self.name)
    }
}
