//! Definition boundary gates.
//!
//! A definition's inputs are the outputs of its [`Source`]; its outputs are
//! the inputs of its [`Sink`].

use serde::{Deserialize, Serialize};

use crate::gate::data::{self, GateData, GateDim, GateState};
use crate::gate::Behavior;
use crate::project::Project;

/// Exposes a definition's inputs as outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Source {
    dims: Vec<GateDim>,
}

impl Source {
    pub fn new(dims: Vec<GateDim>) -> Self {
        Self { dims }
    }

    pub(crate) fn dims_mut(&mut self) -> &mut Vec<GateDim> {
        &mut self.dims
    }
}

impl Behavior for Source {
    fn type_name(&self) -> &str {
        "Source"
    }

    fn input_dims(&self) -> &[GateDim] {
        &[]
    }

    fn output_dims(&self) -> &[GateDim] {
        &self.dims
    }

    fn is_stateful(&self) -> bool {
        true
    }

    fn init_state(&self, _project: &Project) -> Option<GateState> {
        Some(GateState::Data(data::zeros(&self.dims)))
    }

    fn call(&self, _project: &Project, _inputs: &GateData, state: Option<&mut GateState>) -> GateData {
        match state {
            Some(GateState::Data(values)) => values.clone(),
            _ => data::unknowns(&self.dims),
        }
    }
}

/// Collects a definition's outputs from its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sink {
    dims: Vec<GateDim>,
}

impl Sink {
    pub fn new(dims: Vec<GateDim>) -> Self {
        Self { dims }
    }

    pub(crate) fn dims_mut(&mut self) -> &mut Vec<GateDim> {
        &mut self.dims
    }
}

impl Behavior for Sink {
    fn type_name(&self) -> &str {
        "Sink"
    }

    fn input_dims(&self) -> &[GateDim] {
        &self.dims
    }

    fn output_dims(&self) -> &[GateDim] {
        &[]
    }

    fn is_stateful(&self) -> bool {
        true
    }

    fn init_state(&self, _project: &Project) -> Option<GateState> {
        Some(GateState::Data(data::zeros(&self.dims)))
    }

    fn call(&self, _project: &Project, inputs: &GateData, state: Option<&mut GateState>) -> GateData {
        if let Some(GateState::Data(values)) = state {
            values.clone_from(inputs);
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_replays_its_state() {
        let project = Project::new("test");
        let source = Source::new(vec![2]);
        let mut state = source.init_state(&project).unwrap();

        assert_eq!(source.call(&project, &vec![], Some(&mut state)), data::zeros(&[2]));
        assert_eq!(source.call(&project, &vec![], None), vec![None]);
    }

    #[test]
    fn sink_records_its_inputs() {
        let project = Project::new("test");
        let sink = Sink::new(vec![1]);
        let mut state = sink.init_state(&project).unwrap();

        let outputs = sink.call(&project, &vec![Some(vec![Some(1)])], Some(&mut state));
        assert!(outputs.is_empty());
        assert_eq!(state, GateState::Data(vec![Some(vec![Some(1)])]));
    }
}
