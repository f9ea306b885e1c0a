//! Gatekit Core
//!
//! This crate provides the composition and evaluation engine for gate
//! circuits. It implements:
//!
//! - Directed-graph algorithms (reachability, strongly connected components,
//!   feedback-aware ordering)
//! - Definitions: named, editable gate networks with their own ports
//! - Nesting, by instantiating a definition as a compound gate
//! - Deterministic stepping, with feedback loops read one step late
//! - JSON and MessagePack persistence
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: generic directed graph and its ordering algorithms
//! - `gate`: the gate contract, builtin primitives, and signal values
//! - `definition`: per-definition bookkeeping and the evaluation engine
//! - `project`: the definition namespace, type-dependency graph, editing,
//!   and persistence
//!
//! # Example
//!
//! ```rust
//! use gatekit_core::Project;
//!
//! let mut project = Project::new("demo");
//! let mut not = project.define("NOT", vec![1], vec![1], None, None)?;
//! let nand = not.add_nand()?;
//! not.tie_input_to(0, (0, nand))?;
//! not.tie_input_to(0, (1, nand))?;
//! not.tie_output_to((nand, 0), 0)?;
//! not.set_input(0, Some(vec![Some(1)]))?;
//!
//! assert_eq!(not.tick()?, vec![Some(vec![Some(0)])]);
//! # Ok::<(), gatekit_core::GateError>(())
//! ```

pub mod definition;
pub mod error;
pub mod gate;
pub mod graph;
pub mod project;

pub use definition::{ConnectionMap, Definition, DefinitionState, FromPair, ToPair, Wire};
pub use error::{GateError, GateResult, PersistError};
pub use gate::{Behavior, Bus, Datum, Gate, GateData, GateDim, GateKind, GateState, GateUid, StateEntry, StateMap};
pub use graph::DirectedGraph;
pub use project::{Editor, Project};
