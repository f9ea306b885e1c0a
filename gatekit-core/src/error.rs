//! Error types for circuit editing and persistence.
//!
//! Evaluation never fails: unresolved inputs degrade to the unknown marker.
//! Only structural edits and payload revival report errors.

use thiserror::Error;

use crate::gate::{GateDim, GateUid};

/// Errors raised by structural edits on definitions and projects.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    /// The gate is already part of the definition.
    #[error("gate {0} is already in definition {1}")]
    DuplicateGate(GateUid, String),

    /// The gate is not part of the definition.
    #[error("gate {0} is not in definition {1}")]
    UnknownGate(GateUid, String),

    /// Source and Sink cannot be removed or duplicated.
    #[error("gate {0} is the source or sink of definition {1}")]
    ProtectedGate(GateUid, String),

    /// Only the definition's own source and sink may be port gates.
    #[error("gate {0}: definition {1} already has its source and sink")]
    PortGate(GateUid, String),

    /// The UID was never handed out by the project's allocator.
    #[error("gate {0} was not issued by this project")]
    ForeignUid(GateUid),

    /// Output slot out of range for the gate.
    #[error("invalid output index {index} for gate {gate} with {count} outputs")]
    InvalidOutputIndex { gate: GateUid, index: usize, count: usize },

    /// Input slot out of range for the gate.
    #[error("invalid input index {index} for gate {gate} with {count} inputs")]
    InvalidInputIndex { gate: GateUid, index: usize, count: usize },

    /// A definition's own port index is out of range.
    #[error("invalid port index {index} for definition {definition} with {count} ports")]
    InvalidPortIndex { definition: String, index: usize, count: usize },

    /// Buses must carry at least one lane.
    #[error("bus width must be positive")]
    InvalidDimension,

    /// Wire endpoints carry buses of different widths.
    #[error(
        "{definition}: mismatched dimensions, ({from}, {output}) has dimension {from_dim} \
         while ({input}, {to}) has dimension {to_dim}"
    )]
    DimensionMismatch {
        definition: String,
        from: GateUid,
        output: usize,
        from_dim: GateDim,
        input: usize,
        to: GateUid,
        to_dim: GateDim,
    },

    /// Adding the gate would make a definition contain itself.
    #[error("recursive definition: {gate_type} depends on {definition}")]
    RecursiveDefinition { definition: String, gate_type: String },

    /// No definition is registered under the name.
    #[error("definition {0} does not exist")]
    UnknownDefinition(String),

    /// The name is taken by a builtin or another definition.
    #[error("{0} already exists")]
    DefinitionExists(String),

    /// Builtin gate types cannot be renamed or deleted.
    #[error("{0} is a builtin gate type")]
    BuiltinType(String),

    /// Other definitions still contain instances of this one.
    #[error("definitions {dependents:?} depend on {name}")]
    DefinitionInUse { name: String, dependents: Vec<String> },

    /// A reshaper's input and output widths must cover the same lanes.
    #[error("reshaper: input width {inputs} does not match output width {outputs}")]
    ReshapeMismatch { inputs: usize, outputs: usize },

    /// Port labels must line up one-to-one with port widths.
    #[error("expected {expected} labels, found {found}")]
    LabelCount { expected: usize, found: usize },

    /// Bus values do not match the declared widths.
    #[error("gate data does not match dimensions {expected:?}")]
    InvalidGateData { expected: Vec<GateDim> },
}

/// Errors raised while persisting or reviving definitions and projects.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The payload is well-formed but semantically malformed.
    #[error("{type_name} reviver: {message}")]
    Syntax { type_name: &'static str, message: String },

    /// The payload is not valid JSON for the expected records.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// MessagePack encoding failed.
    #[error("msgpack encode: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// MessagePack decoding failed.
    #[error("msgpack decode: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// The payload describes a structurally invalid circuit.
    #[error(transparent)]
    Gate(#[from] GateError),
}

impl PersistError {
    pub(crate) fn syntax(type_name: &'static str, message: impl Into<String>) -> Self {
        Self::Syntax { type_name, message: message.into() }
    }
}

/// Result alias for structural operations.
pub type GateResult<T> = Result<T, GateError>;
