//! Bus reshaping.

use serde::{Deserialize, Serialize};

use crate::error::{GateError, GateResult};
use crate::gate::data::{self, GateData, GateDim, GateState};
use crate::gate::Behavior;
use crate::project::Project;

/// Regroups lanes: flattens every input bus in order, then splits the lanes
/// into the output widths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "(Vec<GateDim>, Vec<GateDim>)",
    into = "(Vec<GateDim>, Vec<GateDim>)"
)]
pub struct Reshaper {
    inputs: Vec<GateDim>,
    outputs: Vec<GateDim>,
}

impl Reshaper {
    /// Fails unless both sides cover the same total number of lanes.
    pub fn new(inputs: Vec<GateDim>, outputs: Vec<GateDim>) -> GateResult<Self> {
        if inputs.iter().chain(&outputs).any(|&dim| dim == 0) {
            return Err(GateError::InvalidDimension);
        }
        let (total_in, total_out) = (total_width(&inputs)?, total_width(&outputs)?);
        if total_in != total_out {
            return Err(GateError::ReshapeMismatch { inputs: total_in, outputs: total_out });
        }
        Ok(Self { inputs, outputs })
    }
}

/// Lane count of a port list; a total that does not fit `usize` is invalid.
fn total_width(dims: &[GateDim]) -> GateResult<usize> {
    dims.iter()
        .try_fold(0usize, |total, &dim| total.checked_add(dim))
        .ok_or(GateError::InvalidDimension)
}

impl TryFrom<(Vec<GateDim>, Vec<GateDim>)> for Reshaper {
    type Error = GateError;

    fn try_from((inputs, outputs): (Vec<GateDim>, Vec<GateDim>)) -> GateResult<Self> {
        Self::new(inputs, outputs)
    }
}

impl From<Reshaper> for (Vec<GateDim>, Vec<GateDim>) {
    fn from(reshaper: Reshaper) -> Self {
        (reshaper.inputs, reshaper.outputs)
    }
}

impl Behavior for Reshaper {
    fn type_name(&self) -> &str {
        "Reshaper"
    }

    fn input_dims(&self) -> &[GateDim] {
        &self.inputs
    }

    fn output_dims(&self) -> &[GateDim] {
        &self.outputs
    }

    fn call(&self, _project: &Project, inputs: &GateData, _state: Option<&mut GateState>) -> GateData {
        let flat: Vec<_> = self
            .inputs
            .iter()
            .enumerate()
            .flat_map(|(slot, &dim)| data::lanes(inputs.get(slot), dim))
            .collect();

        let mut rest = flat.as_slice();
        let mut outputs = Vec::with_capacity(self.outputs.len());
        for &dim in &self.outputs {
            let (head, tail) = rest.split_at(dim);
            outputs.push(Some(head.to_vec()));
            rest = tail;
        }
        outputs
    }
}
