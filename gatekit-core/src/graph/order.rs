//! Feedback-Aware Ordering
//!
//! Produces an evaluation order for a graph that may contain cycles, plus the
//! set of edges that had to be cut to obtain it.
//!
//! # Algorithm
//!
//! 1. Compute BFS distances from the source.
//! 2. Walk the strongly connected components in topological order:
//!    - a singleton is appended; if it has a self-loop, that loop is cut
//!    - a larger component picks its member closest to the source (ties go
//!      to the smallest vertex), cuts every internal edge *into* that member,
//!      and recursively orders the remaining sub-graph from it
//!
//! The order is a valid topological order of the graph with every cut edge
//! removed. A cut edge marks a dependency that is satisfied with the value
//! its source produced on the previous step.

use indexmap::IndexMap;

use super::directed::{DirectedGraph, Vertex};

/// Distance reported for vertices the source cannot reach.
pub const UNREACHABLE: usize = usize::MAX;

impl<V: Vertex> DirectedGraph<V> {
    /// Length of the shortest path from `source` to every vertex, with
    /// [`UNREACHABLE`] for vertices that have none.
    ///
    /// Runtime: O(|V| + |E|)
    pub fn shortest_paths(&self, source: &V) -> IndexMap<V, usize> {
        let mut lengths: IndexMap<V, usize> = IndexMap::with_capacity(self.vertex_count());
        lengths.insert(source.clone(), 0);
        let mut frontier = vec![source.clone()];
        let mut depth = 0;
        while !frontier.is_empty() {
            depth += 1;
            let mut next = Vec::new();
            for v in &frontier {
                for w in self.successors(v) {
                    if !lengths.contains_key(w) {
                        lengths.insert(w.clone(), depth);
                        next.push(w.clone());
                    }
                }
            }
            frontier = next;
        }
        for v in self.vertices() {
            lengths.entry(v.clone()).or_insert(UNREACHABLE);
        }
        lengths
    }

    /// Order every vertex so that dependencies come first, cutting cycles.
    ///
    /// Returns the order and the list of cut edges.
    ///
    /// Runtime: O(|V|^2 + |E|^2) in the worst case (a complete graph, where
    /// each recursive call peels off a single vertex).
    pub fn order(&self, source: &V) -> (Vec<V>, Vec<(V, V)>) {
        let mut order = Vec::with_capacity(self.vertex_count());
        let mut cut_edges = Vec::new();
        let distances = self.shortest_paths(source);

        for component in self.strongly_connected_components() {
            if component.len() == 1 {
                let v = &component[0];
                if self.contains_edge(v, v) {
                    cut_edges.push((v.clone(), v.clone()));
                }
                order.push(v.clone());
                continue;
            }

            let distance = |v: &V| distances.get(v).copied().unwrap_or(UNREACHABLE);
            let Some(closest) = component
                .iter()
                .min_by(|a, b| distance(a).cmp(&distance(b)).then_with(|| a.cmp(b)))
                .cloned()
            else {
                continue;
            };

            let mut sub = DirectedGraph::new();
            for v in &component {
                sub.add_vertex(v.clone());
            }
            for w in &component {
                for v in self.predecessors(w) {
                    if !component.contains(v) {
                        continue;
                    }
                    if *w == closest {
                        cut_edges.push((v.clone(), w.clone()));
                    } else {
                        sub.add_edge(v.clone(), w.clone());
                    }
                }
            }

            let (sub_order, sub_cut_edges) = sub.order(&closest);
            order.extend(sub_order);
            cut_edges.extend(sub_cut_edges);
        }

        (order, cut_edges)
    }

    /// A copy of the graph with every cut edge removed, plus the order that
    /// produced the cuts.
    pub fn remove_cycles(&self, source: &V) -> (DirectedGraph<V>, Vec<V>) {
        let (order, cut_edges) = self.order(source);
        let mut acyclic = self.clone();
        for (v, w) in &cut_edges {
            acyclic.remove_edge(v, w);
        }
        (acyclic, order)
    }

    /// Rank every vertex one above its highest predecessor in the
    /// cycle-free graph. The source is pinned to rank 0 and placed below the
    /// vertex evaluated right after it. Used for presentation only.
    pub fn layers(&self, source: &V) -> IndexMap<V, usize> {
        let (acyclic, order) = self.remove_cycles(source);
        let mut rank: IndexMap<V, usize> = acyclic.vertices().map(|v| (v.clone(), 0)).collect();

        for (i, w) in order.iter().enumerate() {
            if w == source {
                rank.insert(w.clone(), 0);
                continue;
            }
            let mut highest: Option<usize> = None;
            for v in acyclic.predecessors(w) {
                highest = highest.max(rank.get(v).copied());
            }
            if i == 1 {
                highest = highest.max(rank.get(source).copied());
            }
            rank.insert(w.clone(), highest.map_or(0, |r| r + 1));
        }

        rank
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(vertices: &[char], edges: &[(char, char)]) -> DirectedGraph<char> {
        let mut graph = DirectedGraph::new();
        for &v in vertices {
            graph.add_vertex(v);
        }
        for &(v, w) in edges {
            graph.add_edge(v, w);
        }
        graph
    }

    /// Every edge that was not cut must go forward in the order.
    fn assert_respects(graph: &DirectedGraph<char>, order: &[char], cut: &[(char, char)]) {
        assert_eq!(order.len(), graph.vertex_count());
        let position = |v: &char| order.iter().position(|x| x == v).unwrap();
        for (v, w) in graph.edges() {
            if cut.contains(&(*v, *w)) {
                continue;
            }
            assert!(position(v) < position(w), "edge {v} -> {w} goes backwards in {order:?}");
        }
    }

    #[test]
    fn shortest_paths_marks_unreachable() {
        let g = graph(&['a', 'b', 'c', 'd'], &[('a', 'b'), ('b', 'c'), ('a', 'c')]);
        let lengths = g.shortest_paths(&'a');

        assert_eq!(lengths[&'a'], 0);
        assert_eq!(lengths[&'b'], 1);
        assert_eq!(lengths[&'c'], 1);
        assert_eq!(lengths[&'d'], UNREACHABLE);
    }

    #[test]
    fn acyclic_order_has_no_cut_edges() {
        let g = graph(
            &['e', 'd', 'c', 'b', 'a'],
            &[('a', 'b'), ('a', 'c'), ('b', 'd'), ('c', 'd'), ('d', 'e')],
        );
        let (order, cut) = g.order(&'a');

        assert!(cut.is_empty());
        assert_respects(&g, &order, &cut);
    }

    #[test]
    fn self_loop_is_cut() {
        let g = graph(&['v'], &[('v', 'v')]);
        let (order, cut) = g.order(&'v');

        assert_eq!(order, vec!['v']);
        assert_eq!(cut, vec![('v', 'v')]);
    }

    #[test]
    fn cycle_is_cut_at_vertex_closest_to_source() {
        // s -> a -> b -> c -> a
        let g = graph(&['c', 'b', 'a', 's'], &[('s', 'a'), ('a', 'b'), ('b', 'c'), ('c', 'a')]);
        let (order, cut) = g.order(&'s');

        assert_eq!(order, vec!['s', 'a', 'b', 'c']);
        assert_eq!(cut, vec![('c', 'a')]);
    }

    #[test]
    fn equidistant_members_break_ties_by_smallest_vertex() {
        // Both x and y are one hop from s and form a 2-cycle.
        let g = graph(&['s', 'y', 'x'], &[('s', 'y'), ('s', 'x'), ('x', 'y'), ('y', 'x')]);
        let (order, cut) = g.order(&'s');

        assert_eq!(cut, vec![('y', 'x')]);
        assert_eq!(order, vec!['s', 'x', 'y']);
    }

    #[test]
    fn eight_vertex_scenario() {
        let g = graph(
            &['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'],
            &[
                ('A', 'E'),
                ('B', 'A'),
                ('C', 'B'),
                ('C', 'D'),
                ('D', 'C'),
                ('E', 'B'),
                ('F', 'B'),
                ('F', 'E'),
                ('F', 'G'),
                ('G', 'C'),
                ('G', 'F'),
                ('H', 'D'),
                ('H', 'G'),
                ('H', 'H'),
            ],
        );
        let (order, cut) = g.order(&'H');

        assert!(cut.contains(&('H', 'H')));
        assert_eq!(order[0], 'H');
        assert_respects(&g, &order, &cut);

        // Each of the three cycles is broken exactly once.
        assert_eq!(cut.len(), 4);
        let acyclic = g.remove_cycles(&'H').0;
        assert!(acyclic.strongly_connected_components().iter().all(|c| c.len() == 1));
        for v in acyclic.vertices() {
            assert!(!acyclic.contains_edge(v, v));
        }
    }

    #[test]
    fn layers_rank_above_predecessors() {
        let g = graph(
            &['s', 'a', 'b', 'c'],
            &[('s', 'a'), ('a', 'b'), ('b', 'a'), ('a', 'c'), ('b', 'c')],
        );
        let layers = g.layers(&'s');

        assert_eq!(layers[&'s'], 0);
        assert_eq!(layers[&'a'], 1);
        assert_eq!(layers[&'b'], 2);
        assert_eq!(layers[&'c'], 3);
    }
}
