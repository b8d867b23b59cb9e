//! Directed dependency graph
//!
//! Vertex and edge sets are ordered so iteration, sorting and exports are deterministic.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::core::project::ProjectId;
use crate::error::GraphError;

/// Text used for a vertex in error messages
pub trait VertexLabel {
    fn vertex_label(&self) -> String;
}

impl VertexLabel for PathBuf {
    fn vertex_label(&self) -> String {
        self.display().to_string()
    }
}

impl VertexLabel for String {
    fn vertex_label(&self) -> String {
        self.clone()
    }
}

impl VertexLabel for ProjectId {
    fn vertex_label(&self) -> String {
        format!("project #{}", self.index())
    }
}

/// Directed graph with ordered vertices and no parallel edges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph<V: Ord + Clone> {
    outgoing: BTreeMap<V, BTreeSet<V>>,
    incoming: BTreeMap<V, BTreeSet<V>>,
}

impl<V: Ord + Clone> Default for DependencyGraph<V> {
    fn default() -> Self {
        Self {
            outgoing: BTreeMap::new(),
            incoming: BTreeMap::new(),
        }
    }
}

impl<V: Ord + Clone> DependencyGraph<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, vertex: V) {
        self.incoming.entry(vertex.clone()).or_default();
        self.outgoing.entry(vertex).or_default();
    }

    /// Add `from -> to`, adding missing vertices; duplicate edges are ignored
    pub fn add_edge(&mut self, from: V, to: V) {
        self.add_vertex(from.clone());
        self.add_vertex(to.clone());
        self.outgoing.entry(from.clone()).or_default().insert(to.clone());
        self.incoming.entry(to).or_default().insert(from);
    }

    pub fn contains(&self, vertex: &V) -> bool {
        self.outgoing.contains_key(vertex)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &V> {
        self.outgoing.keys()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&V, &V)> {
        self.outgoing
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |to| (from, to)))
    }

    pub fn out_edges<'a>(&'a self, vertex: &V) -> impl Iterator<Item = &'a V> {
        self.outgoing.get(vertex).into_iter().flatten()
    }

    pub fn in_edges<'a>(&'a self, vertex: &V) -> impl Iterator<Item = &'a V> {
        self.incoming.get(vertex).into_iter().flatten()
    }

    pub fn has_out_edges(&self, vertex: &V) -> bool {
        self.outgoing.get(vertex).is_some_and(|t| !t.is_empty())
    }

    pub fn vertex_count(&self) -> usize {
        self.outgoing.len()
    }

    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(BTreeSet::len).sum()
    }

    /// Remove a vertex and every edge touching it
    pub fn remove_vertex(&mut self, vertex: &V) -> bool {
        let Some(targets) = self.outgoing.remove(vertex) else {
            return false;
        };
        for target in &targets {
            if let Some(sources) = self.incoming.get_mut(target) {
                sources.remove(vertex);
            }
        }
        if let Some(sources) = self.incoming.remove(vertex) {
            for source in &sources {
                if let Some(targets) = self.outgoing.get_mut(source) {
                    targets.remove(vertex);
                }
            }
        }
        true
    }

    pub fn remove_vertices_where(&mut self, mut predicate: impl FnMut(&V) -> bool) {
        let doomed: Vec<V> = self.vertices().filter(|v| predicate(v)).cloned().collect();
        for vertex in &doomed {
            self.remove_vertex(vertex);
        }
    }

    /// Graph over mapped vertices; vertices mapping to the same value merge
    pub fn map_vertices<W: Ord + Clone>(&self, mut f: impl FnMut(&V) -> W) -> DependencyGraph<W> {
        let mut mapped = DependencyGraph::new();
        for vertex in self.vertices() {
            mapped.add_vertex(f(vertex));
        }
        for (from, to) in self.edges() {
            mapped.add_edge(f(from), f(to));
        }
        mapped
    }

    /// Vertices ordered so that every edge points forward
    ///
    /// Kahn's algorithm, picking the smallest ready vertex first.
    pub fn topological_sort(&self) -> Result<Vec<V>, GraphError>
    where
        V: VertexLabel,
    {
        let mut in_degree: BTreeMap<&V, usize> =
            self.incoming.iter().map(|(v, sources)| (v, sources.len())).collect();
        let mut ready: BTreeSet<&V> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&v, _)| v)
            .collect();

        let mut order = Vec::with_capacity(self.vertex_count());
        while let Some(vertex) = ready.pop_first() {
            order.push(vertex.clone());
            for target in self.out_edges(vertex) {
                if let Some(degree) = in_degree.get_mut(target) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(target);
                    }
                }
            }
        }

        if order.len() == self.vertex_count() {
            return Ok(order);
        }

        let remaining: BTreeSet<&V> = in_degree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(v, _)| v)
            .collect();
        Err(GraphError::NotAcyclic {
            cycle: self
                .cycle_within(&remaining)
                .iter()
                .map(VertexLabel::vertex_label)
                .collect(),
        })
    }

    /// One cycle among vertices left over by Kahn's algorithm
    ///
    /// Every leftover vertex has a leftover predecessor, so walking predecessors must
    /// revisit a vertex.
    fn cycle_within(&self, remaining: &BTreeSet<&V>) -> Vec<V> {
        let Some(&start) = remaining.iter().next() else {
            return Vec::new();
        };
        let mut path: Vec<&V> = vec![start];
        let mut current = start;
        loop {
            let Some(previous) = self.in_edges(current).find(|v| remaining.contains(v)) else {
                return Vec::new();
            };
            if let Some(position) = path.iter().position(|&v| v == previous) {
                let mut cycle: Vec<V> = path[position..].iter().rev().map(|&v| v.clone()).collect();
                cycle.push(cycle[0].clone());
                return cycle;
            }
            path.push(previous);
            current = previous;
        }
    }

    /// Graphviz DOT text
    pub fn to_dot(&self, name: &str, label: impl Fn(&V) -> String) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "digraph \"{}\" {{", escape_dot(name));
        output.push_str("    rankdir=TB;\n");
        output.push_str("    node [shape=box];\n");
        output.push('\n');
        for vertex in self.vertices() {
            let _ = writeln!(output, "    \"{}\";", escape_dot(&label(vertex)));
        }
        output.push('\n');
        for (from, to) in self.edges() {
            let _ = writeln!(
                output,
                "    \"{}\" -> \"{}\";",
                escape_dot(&label(from)),
                escape_dot(&label(to))
            );
        }
        output.push_str("}\n");
        output
    }

    /// One `from -> to` line per edge, then isolated vertices on their own
    pub fn to_edge_list(&self, label: impl Fn(&V) -> String) -> String {
        let mut output = String::new();
        for (from, to) in self.edges() {
            let _ = writeln!(output, "{} -> {}", label(from), label(to));
        }
        for vertex in self.vertices() {
            if !self.has_out_edges(vertex) && self.in_edges(vertex).next().is_none() {
                let _ = writeln!(output, "{}", label(vertex));
            }
        }
        output
    }
}

fn escape_dot(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn graph(edges: &[(&str, &str)]) -> DependencyGraph<String> {
        let mut g = DependencyGraph::new();
        for (from, to) in edges {
            g.add_edge((*from).to_string(), (*to).to_string());
        }
        g
    }

    #[test]
    fn test_simple_build_order() {
        let g = graph(&[("lib", "app"), ("core", "lib"), ("core", "app")]);
        assert_eq!(g.topological_sort().unwrap(), vec!["core", "lib", "app"]);
    }

    #[test]
    fn test_duplicate_edges_ignored() {
        let g = graph(&[("a", "b"), ("a", "b")]);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.vertex_count(), 2);
    }

    #[test]
    fn test_cycle_is_reported() {
        let g = graph(&[("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")]);
        let GraphError::NotAcyclic { cycle } = g.topological_sort().unwrap_err();
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);
        for pair in cycle.windows(2) {
            assert!(g.out_edges(&pair[0]).any(|v| *v == pair[1]));
        }
    }

    #[test]
    fn test_remove_vertex_drops_edges() {
        let mut g = graph(&[("a", "b"), ("b", "c")]);
        assert!(g.remove_vertex(&"b".to_string()));
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.vertex_count(), 2);
        assert!(!g.has_out_edges(&"a".to_string()));
        assert!(!g.remove_vertex(&"b".to_string()));
    }

    #[test]
    fn test_map_vertices_merges() {
        let g = graph(&[("a1", "b1"), ("a2", "b1")]);
        let mapped = g.map_vertices(|v| v[..1].to_string());
        assert_eq!(mapped.vertex_count(), 2);
        assert_eq!(mapped.edge_count(), 1);
    }

    #[test]
    fn test_exports() {
        let mut g = graph(&[("a", "b")]);
        g.add_vertex("lonely".to_string());
        let dot = g.to_dot("solutions", Clone::clone);
        assert!(dot.starts_with("digraph \"solutions\" {"));
        assert!(dot.contains("    \"a\" -> \"b\";\n"));
        assert!(dot.contains("    \"lonely\";\n"));
        assert_eq!(g.to_edge_list(Clone::clone), "a -> b\nlonely\n");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_sort_respects_edges(edges in crate::test_utils::generators::dag_edges(12)) {
            let mut g = DependencyGraph::new();
            for (from, to) in &edges {
                g.add_edge(format!("v{from:02}"), format!("v{to:02}"));
            }
            let order = g.topological_sort().unwrap();
            prop_assert_eq!(order.len(), g.vertex_count());
            for (from, to) in g.edges() {
                let a = order.iter().position(|v| v == from).unwrap();
                let b = order.iter().position(|v| v == to).unwrap();
                prop_assert!(a < b);
            }
        }

        #[test]
        fn prop_back_edge_creates_cycle(
            edges in crate::test_utils::generators::dag_edges(12),
            pick in any::<prop::sample::Index>(),
        ) {
            prop_assume!(!edges.is_empty());
            let mut g = DependencyGraph::new();
            for (from, to) in &edges {
                g.add_edge(format!("v{from:02}"), format!("v{to:02}"));
            }
            let (from, to) = edges[pick.index(edges.len())];
            g.add_edge(format!("v{to:02}"), format!("v{from:02}"));
            prop_assert!(g.topological_sort().is_err());
        }
    }
}
