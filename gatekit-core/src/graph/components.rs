//! Strongly Connected Components
//!
//! Tarjan's algorithm, written with an explicit work stack so that deep
//! circuits cannot overflow the call stack.

use std::collections::HashMap;

use indexmap::IndexSet;

use super::directed::{DirectedGraph, Vertex};

#[derive(Debug, Clone, Copy)]
struct Visit {
    index: usize,
    lowlink: usize,
    on_stack: bool,
}

impl<V: Vertex> DirectedGraph<V> {
    /// Partition the vertices into strongly connected components.
    ///
    /// Components are returned in topological order of the condensation: no
    /// component has an edge into a component that appears before it. Roots
    /// are taken in vertex insertion order, so the result is deterministic.
    ///
    /// Runtime: O(|V| + |E|)
    pub fn strongly_connected_components(&self) -> Vec<IndexSet<V>> {
        let mut visits: HashMap<V, Visit> = HashMap::with_capacity(self.vertex_count());
        let mut stack: Vec<V> = Vec::new();
        let mut components: Vec<IndexSet<V>> = Vec::new();
        let mut next_index = 0;

        for root in self.vertices() {
            if visits.contains_key(root) {
                continue;
            }

            // Each frame is a vertex plus the position of the next successor to explore.
            let mut work: Vec<(V, usize)> = Vec::new();
            visits.insert(
                root.clone(),
                Visit { index: next_index, lowlink: next_index, on_stack: true },
            );
            next_index += 1;
            stack.push(root.clone());
            work.push((root.clone(), 0));

            while let Some((v, cursor)) = work.last_mut() {
                let v = v.clone();
                if let Some(w) = self.successors(&v).get_index(*cursor) {
                    *cursor += 1;
                    match visits.get(w).copied() {
                        None => {
                            visits.insert(
                                w.clone(),
                                Visit { index: next_index, lowlink: next_index, on_stack: true },
                            );
                            next_index += 1;
                            stack.push(w.clone());
                            work.push((w.clone(), 0));
                        }
                        Some(visit) if visit.on_stack => {
                            if let Some(entry) = visits.get_mut(&v) {
                                entry.lowlink = entry.lowlink.min(visit.index);
                            }
                        }
                        Some(_) => {}
                    }
                    continue;
                }

                // Every successor of v has been explored.
                work.pop();
                let Some(finished) = visits.get(&v).copied() else {
                    continue;
                };
                if let Some((parent, _)) = work.last() {
                    if let Some(entry) = visits.get_mut(parent) {
                        entry.lowlink = entry.lowlink.min(finished.lowlink);
                    }
                }

                if finished.lowlink == finished.index {
                    let mut component = IndexSet::new();
                    while let Some(w) = stack.pop() {
                        if let Some(entry) = visits.get_mut(&w) {
                            entry.on_stack = false;
                        }
                        let done = w == v;
                        component.insert(w);
                        if done {
                            break;
                        }
                    }
                    components.push(component);
                }
            }
        }

        // Tarjan emits sinks first.
        components.reverse();
        components
    }
}
