//! Projects
//!
//! A project is a namespace of definitions plus a type-dependency graph over
//! gate type names. An edge `A -> B` means definition `A` contains at least
//! one gate of type `B`; builtin types are vertices with no edges of their
//! own.
//!
//! # Overview
//!
//! The type graph has two jobs:
//!
//! 1. Reject recursive definitions. Adding a gate of type `T` to `D` is
//!    refused whenever `T` already reaches `D`, so the graph stays acyclic
//!    and nesting is always finite.
//!
//! 2. Find every definition that nests an edited one, directly or several
//!    levels up, so that their wiring and saved state can be repaired.
//!
//! # Design Decisions
//!
//! 1. Definitions live in one map owned by the project and refer to each
//!    other by name only. Edits that must reach several definitions first
//!    compute against `&Project`, then write through split field borrows.
//!
//! 2. UIDs come from an allocator owned by the project, never from global
//!    state.

mod editor;
mod fanout;
mod persist;

use std::mem;

use indexmap::IndexMap;
use tracing::{debug, warn};

pub use editor::Editor;

use crate::definition::Definition;
use crate::error::{GateError, GateResult};
use crate::gate::{
    self, CompoundGate, Constant, Datetime, Datum, Gate, GateData, GateDim, GateKind, Nand,
    Reshaper, UidAllocator, BUILTIN_TYPES,
};
use crate::graph::DirectedGraph;

#[derive(Debug, Clone)]
pub struct Project {
    name: String,
    definitions: IndexMap<String, Definition>,
    dependencies: DirectedGraph<String>,
    uids: UidAllocator,
}

impl Project {
    /// An empty project knowing only the builtin gate types.
    pub fn new(name: impl Into<String>) -> Self {
        let mut dependencies = DirectedGraph::new();
        for builtin in BUILTIN_TYPES {
            dependencies.add_vertex(builtin.to_owned());
        }
        Self {
            name: name.into(),
            definitions: IndexMap::new(),
            dependencies,
            uids: UidAllocator::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the user definitions, in creation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.values()
    }

    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    /// Whether `name` is a builtin type or a user definition.
    pub fn contains(&self, name: &str) -> bool {
        gate::is_builtin(name) || self.definitions.contains_key(name)
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        gate::is_builtin(name)
    }

    /// The type-dependency graph.
    pub fn dependencies(&self) -> &DirectedGraph<String> {
        &self.dependencies
    }

    /// Whether `from -> to` would close a cycle in the type graph.
    pub fn check_dependency(&self, from: &str, to: &str) -> bool {
        let (from, to) = (from.to_owned(), to.to_owned());
        self.dependencies.contains_vertex(&from)
            && self.dependencies.contains_vertex(&to)
            && self.dependencies.check_edge(&from, &to)
    }

    pub(crate) fn require(&self, name: &str) -> GateResult<&Definition> {
        self.definitions
            .get(name)
            .ok_or_else(|| GateError::UnknownDefinition(name.to_owned()))
    }

    pub(crate) fn require_mut(&mut self, name: &str) -> GateResult<&mut Definition> {
        self.definitions
            .get_mut(name)
            .ok_or_else(|| GateError::UnknownDefinition(name.to_owned()))
    }

    /// Create an empty definition and return an editor for it.
    ///
    /// Labels default to empty strings; when given there must be one per
    /// port.
    pub fn define(
        &mut self,
        name: &str,
        input_dims: Vec<GateDim>,
        output_dims: Vec<GateDim>,
        input_labels: Option<Vec<String>>,
        output_labels: Option<Vec<String>>,
    ) -> GateResult<Editor<'_>> {
        if self.contains(name) {
            return Err(GateError::DefinitionExists(name.to_owned()));
        }
        if input_dims.iter().chain(&output_dims).any(|&dim| dim == 0) {
            return Err(GateError::InvalidDimension);
        }
        let input_labels = port_labels(input_labels, &input_dims)?;
        let output_labels = port_labels(output_labels, &output_dims)?;

        let source = self.uids.allocate();
        let sink = self.uids.allocate();
        let definition = Definition::new(
            name.to_owned(),
            source,
            sink,
            input_dims,
            output_dims,
            input_labels,
            output_labels,
        );

        self.dependencies.add_vertex(name.to_owned());
        for port_type in ["Source", "Sink"] {
            self.dependencies.add_edge(name.to_owned(), port_type.to_owned());
        }
        self.definitions.insert(name.to_owned(), definition);
        debug!(project = %self.name, definition = name, "defined");

        Ok(Editor::new(self, name.to_owned()))
    }

    /// An editor for an existing definition.
    pub fn edit(&mut self, name: &str) -> GateResult<Editor<'_>> {
        if self.is_builtin(name) {
            return Err(GateError::BuiltinType(name.to_owned()));
        }
        self.require(name)?;
        Ok(Editor::new(self, name.to_owned()))
    }

    /// Delete a definition.
    ///
    /// If other definitions contain instances of it the call fails with
    /// [`GateError::DefinitionInUse`], unless `force` is set, in which case
    /// every instance is removed from every dependent first.
    pub fn delete_definition(&mut self, name: &str, force: bool) -> GateResult<()> {
        if self.is_builtin(name) {
            return Err(GateError::BuiltinType(name.to_owned()));
        }
        self.require(name)?;

        let key = name.to_owned();
        let dependents: Vec<String> = self.dependencies.predecessors(&key).iter().cloned().collect();
        if !dependents.is_empty() {
            if !force {
                return Err(GateError::DefinitionInUse { name: key, dependents });
            }
            warn!(definition = name, ?dependents, "deleting a definition other definitions depend on");
            for dependent in &dependents {
                self.edit(dependent)?.remove_gate_type(name)?;
            }
        }

        self.definitions.shift_remove(name);
        self.dependencies.remove_vertex(&key);
        debug!(project = %self.name, definition = name, "deleted");
        Ok(())
    }

    /// Rename a definition, rewriting the type graph and every dependent's
    /// type index and compound gates.
    pub fn rename_definition(&mut self, name: &str, new_name: &str) -> GateResult<()> {
        if self.is_builtin(name) {
            return Err(GateError::BuiltinType(name.to_owned()));
        }
        self.require(name)?;
        if self.contains(new_name) {
            return Err(GateError::DefinitionExists(new_name.to_owned()));
        }

        let (old_key, new_key) = (name.to_owned(), new_name.to_owned());
        let dependents: Vec<String> = self.dependencies.predecessors(&old_key).iter().cloned().collect();
        let successors: Vec<String> = self.dependencies.successors(&old_key).iter().cloned().collect();

        for dependent in &dependents {
            self.require_mut(dependent)?.rename_gate_type(name, new_name);
        }

        if let Some(mut definition) = self.definitions.shift_remove(name) {
            definition.set_name(new_key.clone());
            self.definitions.insert(new_key.clone(), definition);
        }

        self.dependencies.add_vertex(new_key.clone());
        for dependent in dependents {
            self.dependencies.add_edge(dependent, new_key.clone());
        }
        for successor in successors {
            self.dependencies.add_edge(new_key.clone(), successor);
        }
        self.dependencies.remove_vertex(&old_key);

        debug!(project = %self.name, from = name, to = new_name, "renamed definition");
        Ok(())
    }

    /// Step a definition once over its whole network and return its outputs.
    pub fn tick(&mut self, name: &str) -> GateResult<GateData> {
        let mut states = mem::take(&mut self.require_mut(name)?.state_mut().gates);
        let outputs = self.require(name)?.tick_with(self, &mut states);

        let state = self.require_mut(name)?.state_mut();
        state.gates = states;
        state.outputs.clone_from(&outputs);
        Ok(outputs)
    }

    /// A new NAND gate.
    pub fn nand(&mut self) -> Gate {
        Gate::new(self.uids.allocate(), Nand)
    }

    /// A new constant emitting `value`.
    pub fn constant(&mut self, value: Vec<Datum>) -> GateResult<Gate> {
        let constant = Constant::new(value)?;
        Ok(Gate::new(self.uids.allocate(), constant))
    }

    /// A new wall-clock reader.
    pub fn datetime(&mut self) -> Gate {
        Gate::new(self.uids.allocate(), Datetime)
    }

    /// A new reshaper.
    pub fn reshaper(&mut self, inputs: Vec<GateDim>, outputs: Vec<GateDim>) -> GateResult<Gate> {
        let reshaper = Reshaper::new(inputs, outputs)?;
        Ok(Gate::new(self.uids.allocate(), reshaper))
    }

    /// A new compound gate evaluating the named definition. The gate joins
    /// the definition's instance set once it is added somewhere.
    pub fn instantiate(&mut self, name: &str) -> GateResult<Gate> {
        let Project { definitions, uids, .. } = self;
        let definition = definitions
            .get(name)
            .ok_or_else(|| GateError::UnknownDefinition(name.to_owned()))?;
        let uid = uids.allocate();
        let compound = CompoundGate::new(
            name.to_owned(),
            definition.input_dims().to_vec(),
            definition.output_dims().to_vec(),
            definition.input_labels().to_vec(),
            definition.output_labels().to_vec(),
        );
        Ok(Gate::new(uid, compound))
    }

    /// A copy of `gate` under a fresh UID.
    pub fn duplicate(&mut self, gate: &Gate) -> Gate {
        gate.duplicate(self.uids.allocate())
    }

    /// Record a compound gate in its definition's instance set.
    pub(crate) fn register_instance(&mut self, gate: &Gate) {
        if let GateKind::Compound(compound) = gate.kind() {
            if let Some(definition) = self.definitions.get_mut(compound.name()) {
                definition.add_instance(gate.uid());
            }
        }
    }
}

/// Labels for a port list, defaulting to empty strings.
fn port_labels(labels: Option<Vec<String>>, dims: &[GateDim]) -> GateResult<Vec<String>> {
    match labels {
        None => Ok(vec![String::new(); dims.len()]),
        Some(labels) if labels.len() == dims.len() => Ok(labels),
        Some(labels) => Err(GateError::LabelCount { expected: dims.len(), found: labels.len() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{GateUid, Source};

    #[test]
    fn builtins_are_reserved() {
        let mut project = Project::new("test");
        for builtin in BUILTIN_TYPES {
            assert!(project.contains(builtin));
            assert_eq!(
                project.define(builtin, vec![], vec![], None, None).err(),
                Some(GateError::DefinitionExists(builtin.to_owned()))
            );
        }
        assert_eq!(
            project.delete_definition("NAND", false),
            Err(GateError::BuiltinType("NAND".into()))
        );
    }

    #[test]
    fn only_added_instances_are_tracked() {
        let mut project = Project::new("test");
        project.define("A", vec![1], vec![1], None, None).unwrap();
        project.define("B", vec![1], vec![1], None, None).unwrap();

        let loose = project.instantiate("A").unwrap();
        let _ = project.duplicate(&loose);
        assert!(project.definition("A").unwrap().instances().is_empty());

        let mut b = project.edit("B").unwrap();
        let placed = b.add_instance("A").unwrap();
        let copy = b.duplicate_gate(placed).unwrap();
        let instances = project.definition("A").unwrap().instances();
        assert_eq!(instances.len(), 2);
        assert!(instances.contains(&placed) && instances.contains(&copy));
    }

    #[test]
    fn added_gates_must_come_from_the_project() {
        let mut project = Project::new("test");
        project.define("A", vec![1], vec![1], None, None).unwrap();
        let spare = project.uids.allocate();
        let nand = project.nand();
        let nand_uid = nand.uid();
        let mut a = project.edit("A").unwrap();

        let invented = GateUid::from(1000);
        assert_eq!(a.add_gate(Gate::new(invented, Nand)), Err(GateError::ForeignUid(invented)));
        assert_eq!(
            a.add_gate(Gate::new(spare, Source::new(vec![1]))),
            Err(GateError::PortGate(spare, "A".into()))
        );
        assert_eq!(a.add_gate(nand), Ok(nand_uid));
        assert_eq!(project.definition("A").unwrap().gates().count(), 3);
    }

    #[test]
    fn define_registers_port_dependencies() {
        let mut project = Project::new("test");
        project.define("A", vec![1], vec![2], None, None).unwrap();

        let a = "A".to_owned();
        assert!(project.dependencies().contains_edge(&a, &"Source".to_owned()));
        assert!(project.dependencies().contains_edge(&a, &"Sink".to_owned()));
        assert_eq!(project.names().collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(project.definition("A").unwrap().input_labels(), &[String::new()]);
    }

    #[test]
    fn define_validates_ports() {
        let mut project = Project::new("test");
        assert_eq!(
            project.define("A", vec![0], vec![], None, None).err(),
            Some(GateError::InvalidDimension)
        );
        assert_eq!(
            project.define("A", vec![1], vec![], Some(vec![]), None).err(),
            Some(GateError::LabelCount { expected: 1, found: 0 })
        );
        assert!(!project.contains("A"));
    }

    #[test]
    fn uids_are_project_scoped() {
        let mut first = Project::new("one");
        let mut second = Project::new("two");
        assert_eq!(first.nand().uid(), second.nand().uid());
    }

    #[test]
    fn duplicate_definition_names_fail() {
        let mut project = Project::new("test");
        project.define("A", vec![], vec![], None, None).unwrap();
        assert_eq!(
            project.define("A", vec![], vec![], None, None).err(),
            Some(GateError::DefinitionExists("A".into()))
        );
    }
}
