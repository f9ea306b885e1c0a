//! Nested definitions.

use crate::gate::data::{self, GateData, GateDim, GateState, StateMap};
use crate::gate::Behavior;
use crate::project::Project;

/// A gate that evaluates a definition.
///
/// The gate stores the definition's name plus a copy of its port layout;
/// the project rewrites both whenever the definition is renamed or its ports
/// are edited. Its state is the definition's per-gate [`StateMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundGate {
    name: String,
    input_dims: Vec<GateDim>,
    output_dims: Vec<GateDim>,
    input_labels: Vec<String>,
    output_labels: Vec<String>,
}

impl CompoundGate {
    pub(crate) fn new(
        name: String,
        input_dims: Vec<GateDim>,
        output_dims: Vec<GateDim>,
        input_labels: Vec<String>,
        output_labels: Vec<String>,
    ) -> Self {
        Self { name, input_dims, output_dims, input_labels, output_labels }
    }

    /// Name of the instantiated definition.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn inputs_mut(&mut self) -> (&mut Vec<GateDim>, &mut Vec<String>) {
        (&mut self.input_dims, &mut self.input_labels)
    }

    pub(crate) fn outputs_mut(&mut self) -> (&mut Vec<GateDim>, &mut Vec<String>) {
        (&mut self.output_dims, &mut self.output_labels)
    }
}

impl Behavior for CompoundGate {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn input_dims(&self) -> &[GateDim] {
        &self.input_dims
    }

    fn output_dims(&self) -> &[GateDim] {
        &self.output_dims
    }

    fn input_labels(&self) -> &[String] {
        &self.input_labels
    }

    fn output_labels(&self) -> &[String] {
        &self.output_labels
    }

    fn is_stateful(&self) -> bool {
        true
    }

    fn init_state(&self, project: &Project) -> Option<GateState> {
        project
            .definition(&self.name)
            .and_then(|definition| definition.init_state(project))
            .map(GateState::Map)
    }

    fn call(&self, project: &Project, inputs: &GateData, state: Option<&mut GateState>) -> GateData {
        let Some(definition) = project.definition(&self.name) else {
            return data::unknowns(&self.output_dims);
        };
        match state {
            Some(GateState::Map(map)) => definition.process_state(project, inputs, map, false),
            _ => definition.process_state(project, inputs, &mut StateMap::new(), false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_its_definition() {
        let mut project = Project::new("test");
        let mut not = project.define("NOT", vec![1], vec![1], None, None).unwrap();
        let nand = not.add_nand().unwrap();
        not.tie_input_to(0, (0, nand)).unwrap();
        not.tie_input_to(0, (1, nand)).unwrap();
        not.tie_output_to((nand, 0), 0).unwrap();

        let gate = project.instantiate("NOT").unwrap();
        let mut state = gate.init_state(&project);
        assert_eq!(
            gate.call(&project, &vec![Some(vec![Some(1)])], state.as_mut()),
            vec![Some(vec![Some(0)])]
        );
        assert_eq!(
            gate.call(&project, &vec![Some(vec![Some(0)])], state.as_mut()),
            vec![Some(vec![Some(1)])]
        );
    }

    #[test]
    fn missing_definition_yields_unknowns() {
        let project = Project::new("test");
        let gate = CompoundGate::new("Gone".into(), vec![1], vec![2, 1], vec![], vec![]);
        assert_eq!(gate.call(&project, &vec![None], None), vec![None, None]);
    }
}
