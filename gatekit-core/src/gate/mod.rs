//! Gates
//!
//! A gate is one computation node: fixed input and output bus widths, an
//! optional opaque state, and a step function from input buses to output
//! buses.
//!
//! # Overview
//!
//! Every node kind implements [`Behavior`]. The set of kinds is closed and
//! collected in [`GateKind`]: the builtin primitives plus [`CompoundGate`],
//! which evaluates a whole definition. A [`Gate`] pairs a kind with the UID
//! it was created under.
//!
//! # Design Decisions
//!
//! 1. Evaluation takes the owning [`Project`] as context instead of holding
//!    references. A compound gate knows only the *name* of its definition and
//!    looks it up per call, so no gate ever aliases a definition.
//!
//! 2. Evaluation is infallible. Anything a gate cannot resolve comes back as
//!    the unknown marker.

mod builtins;
mod compound;
mod data;
mod uid;

use std::fmt;

pub use builtins::{is_builtin, Constant, Datetime, Nand, Reshaper, Sink, Source, BUILTIN_TYPES};
pub use compound::CompoundGate;
pub use data::{
    lanes, unknowns, validate, zeros, Bus, Datum, GateData, GateDim, GateState, StateEntry,
    StateMap, DEFAULT_VALUE,
};
pub use uid::{GateUid, UidAllocator};

use crate::project::Project;

/// The capability contract every gate kind satisfies.
pub trait Behavior {
    /// Type name used in the type-dependency graph and in persisted records.
    fn type_name(&self) -> &str;

    fn input_dims(&self) -> &[GateDim];

    fn output_dims(&self) -> &[GateDim];

    fn input_labels(&self) -> &[String] {
        &[]
    }

    fn output_labels(&self) -> &[String] {
        &[]
    }

    /// Whether the gate keeps state of its own between steps.
    fn is_stateful(&self) -> bool {
        false
    }

    /// The state a fresh gate starts with, if it keeps any.
    fn init_state(&self, _project: &Project) -> Option<GateState> {
        None
    }

    /// Compute one step. `state` is updated in place.
    fn call(&self, project: &Project, inputs: &GateData, state: Option<&mut GateState>) -> GateData;
}

/// Every kind of gate the engine can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum GateKind {
    Source(Source),
    Sink(Sink),
    Nand(Nand),
    Constant(Constant),
    Datetime(Datetime),
    Reshaper(Reshaper),
    Compound(CompoundGate),
}

impl GateKind {
    pub fn behavior(&self) -> &dyn Behavior {
        match self {
            GateKind::Source(gate) => gate,
            GateKind::Sink(gate) => gate,
            GateKind::Nand(gate) => gate,
            GateKind::Constant(gate) => gate,
            GateKind::Datetime(gate) => gate,
            GateKind::Reshaper(gate) => gate,
            GateKind::Compound(gate) => gate,
        }
    }
}

macro_rules! impl_from_kind {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for GateKind {
                fn from(gate: $variant) -> Self {
                    GateKind::$variant(gate)
                }
            }
        )*
    };
}

impl_from_kind!(Source, Sink, Nand, Constant, Datetime, Reshaper);

impl From<CompoundGate> for GateKind {
    fn from(gate: CompoundGate) -> Self {
        GateKind::Compound(gate)
    }
}

/// A gate kind bound to its UID.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    uid: GateUid,
    kind: GateKind,
}

impl Gate {
    pub fn new(uid: GateUid, kind: impl Into<GateKind>) -> Self {
        Self { uid, kind: kind.into() }
    }

    pub fn uid(&self) -> GateUid {
        self.uid
    }

    pub fn kind(&self) -> &GateKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut GateKind {
        &mut self.kind
    }

    pub fn behavior(&self) -> &dyn Behavior {
        self.kind.behavior()
    }

    pub fn type_name(&self) -> &str {
        self.behavior().type_name()
    }

    pub fn input_dims(&self) -> &[GateDim] {
        self.behavior().input_dims()
    }

    pub fn output_dims(&self) -> &[GateDim] {
        self.behavior().output_dims()
    }

    pub fn input_labels(&self) -> &[String] {
        self.behavior().input_labels()
    }

    pub fn output_labels(&self) -> &[String] {
        self.behavior().output_labels()
    }

    pub fn is_stateful(&self) -> bool {
        self.behavior().is_stateful()
    }

    /// The definition a compound gate instantiates.
    pub fn definition_name(&self) -> Option<&str> {
        match &self.kind {
            GateKind::Compound(gate) => Some(gate.name()),
            _ => None,
        }
    }

    /// Default-valued buses for every input.
    pub fn init_inputs(&self) -> GateData {
        zeros(self.input_dims())
    }

    pub fn init_state(&self, project: &Project) -> Option<GateState> {
        self.behavior().init_state(project)
    }

    pub fn call(&self, project: &Project, inputs: &GateData, state: Option<&mut GateState>) -> GateData {
        self.behavior().call(project, inputs, state)
    }

    /// An independent gate of the same type and configuration.
    pub fn duplicate(&self, uid: GateUid) -> Gate {
        Gate { uid, kind: self.kind.clone() }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name(), self.uid)
    }
}
