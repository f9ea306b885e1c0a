//! Directed Graph
//!
//! Adjacency-set storage shared by every graph in the engine: gate UIDs
//! inside a definition, and gate type names inside a project.
//!
//! Both directions are indexed (`from` holds successors, `to` holds
//! predecessors) so that predecessor walks cost the same as successor walks.
//! Adjacency uses `IndexMap`/`IndexSet`, which makes every traversal, and
//! therefore every evaluation order derived from one, deterministic.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Bound satisfied by anything usable as a vertex.
///
/// `Ord` is required so that tie-breaks inside the ordering algorithm are
/// explicit rather than dependent on insertion order.
pub trait Vertex: Clone + Eq + Hash + Ord + fmt::Debug {}

impl<T: Clone + Eq + Hash + Ord + fmt::Debug> Vertex for T {}

/// A directed graph over opaque vertex identifiers.
///
/// Referencing a vertex that was never added is a programming error: the
/// methods that take an existing vertex panic in that case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectedGraph<V: Vertex> {
    /// v -> every w such that v -> w.
    from: IndexMap<V, IndexSet<V>>,
    /// w -> every v such that v -> w.
    to: IndexMap<V, IndexSet<V>>,
}

impl<V: Vertex> DirectedGraph<V> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            from: IndexMap::new(),
            to: IndexMap::new(),
        }
    }

    /// Add `v` if it is not already present.
    pub fn add_vertex(&mut self, v: V) {
        if !self.from.contains_key(&v) {
            self.from.insert(v.clone(), IndexSet::new());
            self.to.insert(v, IndexSet::new());
        }
    }

    /// Remove `v` together with every edge touching it.
    ///
    /// Runs in time proportional to the degree of `v`.
    ///
    /// # Panics
    ///
    /// Panics if `v` is not in the graph.
    pub fn remove_vertex(&mut self, v: &V) {
        let outgoing = match self.from.shift_remove(v) {
            Some(set) => set,
            None => panic!("vertex {v:?} is not in the graph"),
        };
        for w in &outgoing {
            if let Some(set) = self.to.get_mut(w) {
                set.shift_remove(v);
            }
        }
        if let Some(incoming) = self.to.shift_remove(v) {
            for u in &incoming {
                if let Some(set) = self.from.get_mut(u) {
                    set.shift_remove(v);
                }
            }
        }
    }

    /// Whether `v` is a vertex of the graph.
    pub fn contains_vertex(&self, v: &V) -> bool {
        self.from.contains_key(v)
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.from.len()
    }

    /// Vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = &V> {
        self.from.keys()
    }

    /// Every edge as a `(from, to)` pair.
    pub fn edges(&self) -> impl Iterator<Item = (&V, &V)> {
        self.from
            .iter()
            .flat_map(|(v, ws)| ws.iter().map(move |w| (v, w)))
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.from.values().map(IndexSet::len).sum()
    }

    /// Add the edge `v -> w`.
    ///
    /// # Panics
    ///
    /// Panics if either endpoint is not in the graph.
    pub fn add_edge(&mut self, v: V, w: V) {
        if !self.to.contains_key(&w) {
            panic!("vertex {w:?} is not in the graph");
        }
        self.outgoing_mut(&v).insert(w.clone());
        self.incoming_mut(&w).insert(v);
    }

    /// Remove the edge `v -> w`, returning whether it existed.
    pub fn remove_edge(&mut self, v: &V, w: &V) -> bool {
        let removed = self
            .from
            .get_mut(v)
            .map(|set| set.shift_remove(w))
            .unwrap_or(false);
        if let Some(set) = self.to.get_mut(w) {
            set.shift_remove(v);
        }
        removed
    }

    /// Whether the edge `v -> w` exists.
    pub fn contains_edge(&self, v: &V, w: &V) -> bool {
        self.from.get(v).is_some_and(|set| set.contains(w))
    }

    /// Whether `v` is reachable from `w`, i.e. whether adding `v -> w` would
    /// close a cycle (or whether an existing `v -> w` lies on one).
    ///
    /// Depth-first search from `w`, O(|V| + |E|).
    pub fn check_edge(&self, v: &V, w: &V) -> bool {
        let mut stack = vec![w];
        let mut visited: IndexSet<&V> = IndexSet::new();
        while let Some(x) = stack.pop() {
            if x == v {
                return true;
            }
            if visited.insert(x) {
                stack.extend(self.successors(x));
            }
        }
        false
    }

    /// Direct successors of `v`.
    ///
    /// # Panics
    ///
    /// Panics if `v` is not in the graph.
    pub fn successors(&self, v: &V) -> &IndexSet<V> {
        match self.from.get(v) {
            Some(set) => set,
            None => panic!("vertex {v:?} is not in the graph"),
        }
    }

    /// Direct predecessors of `v`.
    ///
    /// # Panics
    ///
    /// Panics if `v` is not in the graph.
    pub fn predecessors(&self, v: &V) -> &IndexSet<V> {
        match self.to.get(v) {
            Some(set) => set,
            None => panic!("vertex {v:?} is not in the graph"),
        }
    }

    /// Every vertex reachable from `v`, excluding `v` itself.
    pub fn all_successors(&self, v: &V) -> IndexSet<V> {
        self.reachable(v, &self.from)
    }

    /// Every vertex that can reach `v`, excluding `v` itself.
    pub fn all_predecessors(&self, v: &V) -> IndexSet<V> {
        self.reachable(v, &self.to)
    }

    fn reachable(&self, start: &V, adjacency: &IndexMap<V, IndexSet<V>>) -> IndexSet<V> {
        let mut seen: IndexSet<V> = IndexSet::new();
        seen.insert(start.clone());
        let mut stack = vec![start.clone()];
        while let Some(x) = stack.pop() {
            let next = match adjacency.get(&x) {
                Some(set) => set,
                None => panic!("vertex {x:?} is not in the graph"),
            };
            for y in next {
                if seen.insert(y.clone()) {
                    stack.push(y.clone());
                }
            }
        }
        seen.shift_remove(start);
        seen
    }

    fn outgoing_mut(&mut self, v: &V) -> &mut IndexSet<V> {
        match self.from.get_mut(v) {
            Some(set) => set,
            None => panic!("vertex {v:?} is not in the graph"),
        }
    }

    fn incoming_mut(&mut self, v: &V) -> &mut IndexSet<V> {
        match self.to.get_mut(v) {
            Some(set) => set,
            None => panic!("vertex {v:?} is not in the graph"),
        }
    }
}

impl<V: Vertex> Default for DirectedGraph<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Vertex + fmt::Display> fmt::Display for DirectedGraph<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (v, ws)) in self.from.iter().enumerate() {
            if i > 0 {
                write!(f, ",\n ")?;
            }
            write!(f, "{v}: {{")?;
            for (j, w) in ws.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{w}")?;
            }
            write!(f, "}}")?;
        }
        write!(f, "}}")
    }
}

/// Persisted form: a vertex list plus edges keyed by vertex position.
#[derive(Serialize, Deserialize)]
enum GraphRecord<V> {
    #[serde(rename = "/DirectedGraph")]
    DirectedGraph(Vec<V>, BTreeMap<usize, Vec<usize>>),
}

impl<V: Vertex + Serialize> Serialize for DirectedGraph<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let vertices: Vec<V> = self.from.keys().cloned().collect();
        let mut edges = BTreeMap::new();
        for (i, ws) in self.from.values().enumerate() {
            if ws.is_empty() {
                continue;
            }
            let targets = ws
                .iter()
                .filter_map(|w| self.from.get_index_of(w))
                .collect::<Vec<_>>();
            edges.insert(i, targets);
        }
        GraphRecord::DirectedGraph(vertices, edges).serialize(serializer)
    }
}

impl<'de, V: Vertex + Deserialize<'de>> Deserialize<'de> for DirectedGraph<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let GraphRecord::DirectedGraph(vertices, edges) = GraphRecord::<V>::deserialize(deserializer)?;
        let mut graph = DirectedGraph::new();
        for v in &vertices {
            graph.add_vertex(v.clone());
        }
        for (i, targets) in edges {
            let v = vertices.get(i).ok_or_else(|| {
                D::Error::custom(format!("DirectedGraph: edge source {i} is not a vertex index"))
            })?;
            for j in targets {
                let w = vertices.get(j).ok_or_else(|| {
                    D::Error::custom(format!("DirectedGraph: edge target {j} is not a vertex index"))
                })?;
                graph.add_edge(v.clone(), w.clone());
            }
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> DirectedGraph<u32> {
        let mut graph = DirectedGraph::new();
        for v in 0..4 {
            graph.add_vertex(v);
        }
        graph.add_edge(0, 1);
        graph.add_edge(1, 2);
        graph.add_edge(2, 3);
        graph
    }

    #[test]
    fn add_vertex_is_idempotent() {
        let mut graph = chain();
        graph.add_vertex(1);
        assert_eq!(graph.vertex_count(), 4);
        assert!(graph.contains_edge(&1, &2));
    }

    #[test]
    fn remove_vertex_drops_incident_edges() {
        let mut graph = chain();
        graph.add_edge(1, 1);
        graph.remove_vertex(&1);

        assert!(!graph.contains_vertex(&1));
        assert!(graph.successors(&0).is_empty());
        assert!(graph.predecessors(&2).is_empty());
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn check_edge_detects_would_be_cycles() {
        let graph = chain();
        // 3 -> 0 closes a cycle because 3 is reachable from 0.
        assert!(graph.check_edge(&3, &0));
        assert!(!graph.check_edge(&0, &3));
        assert!(graph.check_edge(&2, &2));
    }

    #[test]
    fn check_edge_terminates_on_cycles() {
        let mut graph = chain();
        graph.add_edge(3, 1);
        graph.add_vertex(9);
        assert!(!graph.check_edge(&9, &1));
    }

    #[test]
    fn reachability_excludes_start() {
        let mut graph = chain();
        graph.add_edge(3, 0);

        let succ = graph.all_successors(&1);
        assert_eq!(succ.len(), 3);
        assert!(!succ.contains(&1));

        let pred = graph.all_predecessors(&0);
        assert_eq!(pred.len(), 3);
        assert!(!pred.contains(&0));
    }

    #[test]
    fn clone_does_not_share_edge_sets() {
        let graph = chain();
        let mut copy = graph.clone();
        copy.remove_edge(&0, &1);

        assert!(graph.contains_edge(&0, &1));
        assert!(!copy.contains_edge(&0, &1));
    }

    #[test]
    fn display_lists_adjacency() {
        let mut graph = DirectedGraph::new();
        graph.add_vertex("a");
        graph.add_vertex("b");
        graph.add_edge("a", "b");
        assert_eq!(graph.to_string(), "{a: {b},\n b: {}}");
    }

    #[test]
    fn serde_uses_tagged_vertex_list() {
        let graph = chain();
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"/DirectedGraph": [[0, 1, 2, 3], {"0": [1], "1": [2], "2": [3]}]})
        );

        let back: DirectedGraph<u32> = serde_json::from_value(json).unwrap();
        assert_eq!(back, graph);
    }

    #[test]
    fn serde_rejects_dangling_edges() {
        let json = serde_json::json!({"/DirectedGraph": [[0, 1], {"0": [5]}]});
        let err = serde_json::from_value::<DirectedGraph<u32>>(json).unwrap_err();
        assert!(err.to_string().contains("edge target 5"));
    }
}
