//! Signal and State Values
//!
//! Every value flowing through a circuit is a bus: an ordered group of
//! integer lanes. Both a lane and a whole bus may be unknown, meaning no
//! defined signal has reached it yet.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::GateUid;
use crate::error::{GateError, GateResult};

/// Number of lanes in one input or output slot.
pub type GateDim = usize;

/// A single lane; `None` is the unknown marker.
pub type Datum = Option<i64>;

/// One slot's value; `None` marks the whole bus unknown.
pub type Bus = Option<Vec<Datum>>;

/// The values on every slot of a gate, in slot order.
pub type GateData = Vec<Bus>;

/// Value every lane holds before anything has been computed.
pub const DEFAULT_VALUE: i64 = 0;

/// Opaque per-gate state.
///
/// Primitive gates keep plain bus data; a compound gate keeps the state map
/// of the definition it instantiates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateState {
    #[serde(rename = "/GateData")]
    Data(GateData),
    #[serde(rename = "/GateStateMap")]
    Map(StateMap),
}

impl GateState {
    /// Whether the state carries nothing worth keeping.
    pub fn is_empty(&self) -> bool {
        match self {
            GateState::Data(data) => data.is_empty(),
            GateState::Map(map) => map.is_empty(),
        }
    }
}

/// Contained gate UID -> that gate's saved state and outputs.
pub type StateMap = IndexMap<GateUid, StateEntry>;

/// What a definition remembers about one contained gate between steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    /// The gate's own state, if it has any.
    pub state: Option<GateState>,
    /// The gate's last outputs, kept when a later step needs them.
    pub outputs: Option<GateData>,
}

impl StateEntry {
    pub fn new(state: Option<GateState>, outputs: Option<GateData>) -> Self {
        Self { state, outputs }
    }

    /// Drop empty state; report whether anything is left.
    pub(crate) fn normalize(&mut self) -> bool {
        if self.state.as_ref().is_some_and(GateState::is_empty) {
            self.state = None;
        }
        self.state.is_some() || self.outputs.is_some()
    }
}

/// Buses of the given widths with every lane at [`DEFAULT_VALUE`].
pub fn zeros(dims: &[GateDim]) -> GateData {
    dims.iter()
        .map(|&dim| Some(vec![Some(DEFAULT_VALUE); dim]))
        .collect()
}

/// One whole-bus unknown per slot.
pub fn unknowns(dims: &[GateDim]) -> GateData {
    vec![None; dims.len()]
}

/// The lanes of `bus`, expanding a whole-bus unknown (or a bus of the wrong
/// width) into `dim` unknown lanes.
pub fn lanes(bus: Option<&Bus>, dim: GateDim) -> Vec<Datum> {
    match bus {
        Some(Some(values)) if values.len() == dim => values.clone(),
        _ => vec![None; dim],
    }
}

/// Check that `data` has one bus per dimension and every known bus has the
/// declared width.
pub fn validate(data: &GateData, dims: &[GateDim]) -> GateResult<()> {
    let fits = data.len() == dims.len()
        && data
            .iter()
            .zip(dims)
            .all(|(bus, &dim)| bus.as_ref().map_or(true, |values| values.len() == dim));
    if fits {
        Ok(())
    } else {
        Err(GateError::InvalidGateData { expected: dims.to_vec() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_and_unknowns_follow_dims() {
        assert_eq!(zeros(&[2, 1]), vec![Some(vec![Some(0), Some(0)]), Some(vec![Some(0)])]);
        assert_eq!(unknowns(&[2, 1]), vec![None, None]);
    }

    #[test]
    fn lanes_expand_unknown_buses() {
        assert_eq!(lanes(Some(&None), 3), vec![None, None, None]);
        assert_eq!(lanes(None, 1), vec![None]);
        assert_eq!(lanes(Some(&Some(vec![Some(1), None])), 2), vec![Some(1), None]);
    }

    #[test]
    fn validate_checks_shape() {
        assert!(validate(&vec![None, Some(vec![Some(1)])], &[4, 1]).is_ok());
        assert!(validate(&vec![Some(vec![Some(1)])], &[2]).is_err());
        assert!(validate(&vec![], &[1]).is_err());
    }

    #[test]
    fn normalize_drops_empty_state() {
        let mut entry = StateEntry::new(Some(GateState::Map(StateMap::new())), None);
        assert!(!entry.normalize());
        assert!(entry.state.is_none());

        let mut entry = StateEntry::new(Some(GateState::Data(vec![])), Some(vec![None]));
        assert!(entry.normalize());
    }

    #[test]
    fn state_is_type_tagged() {
        let mut map = StateMap::new();
        map.insert(GateUid::from(3), StateEntry::new(None, Some(vec![Some(vec![Some(1)])])));
        let json = serde_json::to_value(GateState::Map(map)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"/GateStateMap": {"3": {"state": null, "outputs": [[1]]}}})
        );
    }
}
