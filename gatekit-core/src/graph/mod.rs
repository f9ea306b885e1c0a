//! Directed Graphs
//!
//! This module implements the graph structure used twice by the engine:
//!
//! - inside a definition, vertices are gate UIDs and an edge means at least
//!   one wire runs from the first gate's outputs into the second gate's inputs
//! - inside a project, vertices are gate type names and an edge `A -> B`
//!   means "definition A contains a gate of type B"
//!
//! # Overview
//!
//! The interesting operation is [`DirectedGraph::order`], which produces an
//! evaluation order even when the graph contains feedback loops. It does so by
//! cutting a deterministic set of edges; a cut edge is read with one step of
//! latency by the evaluation engine.
//!
//! # Design Decisions
//!
//! 1. Adjacency is kept in both directions so predecessor and successor walks
//!    are equally cheap.
//!
//! 2. Vertices live in insertion-ordered maps. Evaluation order must be
//!    reproducible across runs, so no traversal may depend on hash order.
//!
//! 3. Absent vertices are programming errors and panic, the same way an
//!    out-of-bounds slice index does.

mod components;
mod directed;
mod order;

pub use directed::{DirectedGraph, Vertex};
pub use order::UNREACHABLE;
