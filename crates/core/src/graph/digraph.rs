//! A small generic directed graph, used as the backing store for each edge
//! kind (WR, WW, RW) in the [`super::serialization_graph::SerializationGraph`].

use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};

use alloc::vec::Vec;

/// A directed graph over `T`, stored as an adjacency map. Self-loops and
/// parallel edges collapse (this is a simple graph, not a multigraph) —
/// each edge kind already has its own `DiGraph`, so a true multigraph
/// isn't needed on top of that.
#[derive(Debug, Clone, Default)]
pub struct DiGraph<T: Eq + Hash + Clone> {
    pub adj_map: HashMap<T, HashSet<T>>,
}

impl<T: Eq + Hash + Clone + Debug> DiGraph<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            adj_map: HashMap::new(),
        }
    }

    pub fn add_vertex(&mut self, v: T) {
        self.adj_map.entry(v).or_default();
    }

    pub fn add_edge(&mut self, from: T, to: T) {
        self.adj_map.entry(to.clone()).or_default();
        self.adj_map.entry(from).or_default().insert(to);
    }

    pub fn remove_vertex(&mut self, v: &T) {
        self.adj_map.remove(v);
        for succs in self.adj_map.values_mut() {
            succs.remove(v);
        }
    }

    #[must_use]
    pub fn has_edge(&self, from: &T, to: &T) -> bool {
        self.adj_map.get(from).is_some_and(|succs| succs.contains(to))
    }

    #[must_use]
    pub fn successors(&self, v: &T) -> Option<&HashSet<T>> {
        self.adj_map.get(v)
    }

    /// Every vertex `u` with an edge `u -> v`.
    #[must_use]
    pub fn predecessors(&self, v: &T) -> Vec<T> {
        self.adj_map
            .iter()
            .filter(|(_, succs)| succs.contains(v))
            .map(|(u, _)| u.clone())
            .collect()
    }

    /// Adds every edge of `other` into `self`.
    pub fn union(&mut self, other: &Self) {
        for (from, tos) in &other.adj_map {
            let entry = self.adj_map.entry(from.clone()).or_default();
            for to in tos {
                entry.insert(to.clone());
            }
        }
    }

    /// The transitive closure: `closure.has_edge(a, b)` iff there is a
    /// path of length >= 1 from `a` to `b` in `self`. Computed by a plain
    /// fixpoint over the adjacency map; acceptable at this scale (at most
    /// a few dozen live transactions per run).
    #[must_use]
    pub fn closure(&self) -> Self {
        let mut result = self.clone();
        let vertices: Vec<T> = result.adj_map.keys().cloned().collect();
        loop {
            let mut changed = false;
            for v in &vertices {
                let via: Vec<T> = result
                    .adj_map
                    .get(v)
                    .map(|s| s.iter().cloned().collect())
                    .unwrap_or_default();
                for mid in via {
                    let extra: Vec<T> = result
                        .adj_map
                        .get(&mid)
                        .map(|s| s.iter().cloned().collect())
                        .unwrap_or_default();
                    let entry = result.adj_map.entry(v.clone()).or_default();
                    for e in extra {
                        if entry.insert(e) {
                            changed = true;
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }
        result
    }

    #[must_use]
    pub fn to_edge_list(&self) -> Vec<(T, T)> {
        self.adj_map
            .iter()
            .flat_map(|(from, tos)| tos.iter().map(move |to| (from.clone(), to.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::DiGraph;

    #[test]
    fn add_edge_creates_both_endpoints() {
        let mut g: DiGraph<i32> = DiGraph::new();
        g.add_edge(1, 2);
        assert!(g.has_edge(&1, &2));
        assert!(g.adj_map.contains_key(&2));
    }

    #[test]
    fn predecessors_finds_incoming() {
        let mut g: DiGraph<i32> = DiGraph::new();
        g.add_edge(1, 3);
        g.add_edge(2, 3);
        let mut preds = g.predecessors(&3);
        preds.sort_unstable();
        assert_eq!(preds, alloc::vec![1, 2]);
    }

    #[test]
    fn closure_finds_transitive_path() {
        let mut g: DiGraph<i32> = DiGraph::new();
        g.add_edge(1, 2);
        g.add_edge(2, 3);
        let c = g.closure();
        assert!(c.has_edge(&1, &3));
        assert!(!g.has_edge(&1, &3));
    }

    #[test]
    fn union_merges_edges() {
        let mut a: DiGraph<i32> = DiGraph::new();
        a.add_edge(1, 2);
        let mut b: DiGraph<i32> = DiGraph::new();
        b.add_edge(2, 3);
        a.union(&b);
        assert!(a.has_edge(&1, &2));
        assert!(a.has_edge(&2, &3));
    }

    #[test]
    fn remove_vertex_drops_incident_edges() {
        let mut g: DiGraph<i32> = DiGraph::new();
        g.add_edge(1, 2);
        g.add_edge(2, 3);
        g.remove_vertex(&2);
        assert!(!g.adj_map.contains_key(&2));
        assert!(!g.has_edge(&1, &2));
    }
}
