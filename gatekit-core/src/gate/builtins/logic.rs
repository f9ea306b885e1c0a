//! Stateless primitives.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{GateError, GateResult};
use crate::gate::data::{Datum, GateData, GateDim, GateState};
use crate::gate::Behavior;
use crate::project::Project;

const NAND_INPUTS: [GateDim; 2] = [1, 1];
const NAND_OUTPUTS: [GateDim; 1] = [1];
const DATETIME_OUTPUTS: [GateDim; 1] = [64];

/// 1-bit NAND.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nand;

impl Behavior for Nand {
    fn type_name(&self) -> &str {
        "NAND"
    }

    fn input_dims(&self) -> &[GateDim] {
        &NAND_INPUTS
    }

    fn output_dims(&self) -> &[GateDim] {
        &NAND_OUTPUTS
    }

    fn call(&self, _project: &Project, inputs: &GateData, _state: Option<&mut GateState>) -> GateData {
        let bit = |slot: usize| -> Datum {
            inputs
                .get(slot)
                .and_then(Option::as_ref)
                .and_then(|lanes| lanes.first().copied().flatten())
        };
        let out = match (bit(0), bit(1)) {
            (Some(a), Some(b)) => Some(!(a & b) & 1),
            _ => None,
        };
        vec![Some(vec![out])]
    }
}

/// Emits a fixed bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Datum>", into = "Vec<Datum>")]
pub struct Constant {
    value: Vec<Datum>,
    dims: [GateDim; 1],
}

impl Constant {
    /// A constant emitting `value` on a bus of the same width.
    pub fn new(value: Vec<Datum>) -> GateResult<Self> {
        if value.is_empty() {
            return Err(GateError::InvalidDimension);
        }
        let dims = [value.len()];
        Ok(Self { value, dims })
    }

    /// A constant of the given width with every lane at the default value.
    pub fn zeroed(dim: GateDim) -> GateResult<Self> {
        Self::new(vec![Some(crate::gate::DEFAULT_VALUE); dim])
    }

    pub fn value(&self) -> &[Datum] {
        &self.value
    }
}

impl TryFrom<Vec<Datum>> for Constant {
    type Error = GateError;

    fn try_from(value: Vec<Datum>) -> GateResult<Self> {
        Self::new(value)
    }
}

impl From<Constant> for Vec<Datum> {
    fn from(constant: Constant) -> Self {
        constant.value
    }
}

impl Behavior for Constant {
    fn type_name(&self) -> &str {
        "Constant"
    }

    fn input_dims(&self) -> &[GateDim] {
        &[]
    }

    fn output_dims(&self) -> &[GateDim] {
        &self.dims
    }

    fn call(&self, _project: &Project, _inputs: &GateData, _state: Option<&mut GateState>) -> GateData {
        vec![Some(self.value.clone())]
    }
}

/// Reads the wall clock: Unix time in seconds on 64 lanes, most significant
/// bit first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datetime;

impl Datetime {
    pub(crate) fn encode(seconds: u64) -> Vec<Datum> {
        (0..64).rev().map(|bit| Some(((seconds >> bit) & 1) as i64)).collect()
    }
}

impl Behavior for Datetime {
    fn type_name(&self) -> &str {
        "Datetime"
    }

    fn input_dims(&self) -> &[GateDim] {
        &[]
    }

    fn output_dims(&self) -> &[GateDim] {
        &DATETIME_OUTPUTS
    }

    fn call(&self, _project: &Project, _inputs: &GateData, _state: Option<&mut GateState>) -> GateData {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);
        vec![Some(Self::encode(seconds))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nand(project: &Project, a: Datum, b: Datum) -> GateData {
        Nand.call(project, &vec![Some(vec![a]), Some(vec![b])], None)
    }

    #[test]
    fn nand_truth_table() {
        let project = Project::new("test");
        assert_eq!(nand(&project, Some(0), Some(0)), vec![Some(vec![Some(1)])]);
        assert_eq!(nand(&project, Some(0), Some(1)), vec![Some(vec![Some(1)])]);
        assert_eq!(nand(&project, Some(1), Some(0)), vec![Some(vec![Some(1)])]);
        assert_eq!(nand(&project, Some(1), Some(1)), vec![Some(vec![Some(0)])]);
    }

    #[test]
    fn nand_propagates_unknown() {
        let project = Project::new("test");
        assert_eq!(nand(&project, None, Some(1)), vec![Some(vec![None])]);
        assert_eq!(Nand.call(&project, &vec![None, None], None), vec![Some(vec![None])]);
    }

    #[test]
    fn constant_rejects_empty_bus() {
        assert_eq!(Constant::new(vec![]), Err(GateError::InvalidDimension));
        let constant = Constant::zeroed(3).unwrap();
        assert_eq!(constant.output_dims(), &[3]);
    }

    #[test]
    fn constant_serializes_as_its_value() {
        let constant = Constant::new(vec![Some(1), None]).unwrap();
        let json = serde_json::to_value(&constant).unwrap();
        assert_eq!(json, serde_json::json!([1, null]));
        assert!(serde_json::from_value::<Constant>(serde_json::json!([])).is_err());
    }

    #[test]
    fn datetime_encodes_msb_first() {
        let lanes = Datetime::encode(5);
        assert_eq!(lanes.len(), 64);
        assert_eq!(&lanes[61..], &[Some(1), Some(0), Some(1)]);
        assert!(lanes[..61].iter().all(|lane| *lane == Some(0)));
    }
}
