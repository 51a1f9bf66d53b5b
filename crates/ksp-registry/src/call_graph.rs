//! Call graph between user functions.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: [`CallNode`], one per function plus a single root standing for
//!   every callback
//! - Edges: one per call site, so repeated calls give parallel edges
//!
//! Edge order matters for the emission order, so successors are always
//! returned in insertion order.

use petgraph::algo::{astar, has_path_connecting, tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallNode {
    /// Calls made directly from a callback.
    Root,
    Function(String),
}

impl CallNode {
    pub fn name(&self) -> Option<&str> {
        match self {
            CallNode::Root => None,
            CallNode::Function(name) => Some(name),
        }
    }

    fn sort_key(&self) -> &str {
        self.name().unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub struct CallGraph {
    graph: DiGraph<CallNode, ()>,
    root: NodeIndex,
    index: FxHashMap<String, NodeIndex>,
    /// Functions invoked at least once through `call`.
    explicit: FxHashSet<String>,
}

impl Default for CallGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl CallGraph {
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(CallNode::Root);
        Self {
            graph,
            root,
            index: FxHashMap::default(),
            explicit: FxHashSet::default(),
        }
    }

    /// Get or create the node of `name`.
    pub fn ensure(&mut self, name: &str) -> NodeIndex {
        if let Some(&node) = self.index.get(name) {
            return node;
        }
        let node = self.graph.add_node(CallNode::Function(name.to_string()));
        self.index.insert(name.to_string(), node);
        node
    }

    /// Record a call site. `caller` is `None` for calls made from a callback.
    pub fn add_call(&mut self, caller: Option<&str>, callee: &str) {
        let from = match caller {
            Some(name) => self.ensure(name),
            None => self.root,
        };
        let to = self.ensure(callee);
        self.graph.add_edge(from, to, ());
    }

    pub fn mark_explicit(&mut self, name: &str) {
        self.explicit.insert(name.to_string());
    }

    pub fn is_explicit(&self, name: &str) -> bool {
        self.explicit.contains(name)
    }

    /// Every function reachable from a callback.
    pub fn reachable_from_root(&self) -> FxHashSet<String> {
        let mut reached = FxHashSet::default();
        let mut dfs = Dfs::new(&self.graph, self.root);
        while let Some(node) = dfs.next(&self.graph) {
            if let Some(name) = self.graph[node].name() {
                reached.insert(name.to_string());
            }
        }
        reached
    }

    /// A cycle through the lexically first function that lies on one, as the
    /// names along it with that function repeated at the end.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let start = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .flatten()
            .min_by(|a, b| self.graph[*a].sort_key().cmp(self.graph[*b].sort_key()))?;

        let name = |n: NodeIndex| self.graph[n].sort_key().to_string();
        let next = self
            .successors(start)
            .into_iter()
            .find(|&succ| succ == start || has_path_connecting(&self.graph, succ, start, None))?;
        if next == start {
            return Some(vec![name(start), name(start)]);
        }

        let (_, path) = astar(&self.graph, next, |n| n == start, |_| 1u32, |_| 0)?;
        let mut cycle = vec![name(start)];
        cycle.extend(path.into_iter().map(name));
        Some(cycle)
    }

    /// A linear extension of the graph with callers before callees.
    ///
    /// The nodes are handed to the sort in lexical order, so the result only
    /// depends on the names and calls, not on the order they were recorded.
    /// Empty when the graph has a cycle.
    pub fn topological_order(&self) -> Vec<String> {
        let mut sorted: DiGraph<Option<&str>, ()> =
            DiGraph::with_capacity(self.graph.node_count(), self.graph.edge_count());
        let mut remap: FxHashMap<NodeIndex, NodeIndex> = FxHashMap::default();
        for node in self.sorted_nodes() {
            remap.insert(node, sorted.add_node(self.graph[node].name()));
        }
        for edge in self.graph.edge_references() {
            sorted.add_edge(remap[&edge.source()], remap[&edge.target()], ());
        }

        match toposort(&sorted, None) {
            Ok(order) => order.into_iter().filter_map(|n| sorted[n]).map(str::to_string).collect(),
            Err(cycle) => {
                tracing::debug!(at = ?sorted[cycle.node_id()], "call graph has a cycle");
                Vec::new()
            }
        }
    }

    fn sorted_nodes(&self) -> Vec<NodeIndex> {
        let mut nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        nodes.sort_by(|a, b| self.graph[*a].sort_key().cmp(self.graph[*b].sort_key()));
        nodes
    }

    /// petgraph walks adjacency lists newest first.
    fn successors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut succ: Vec<NodeIndex> = self.graph.neighbors(node).collect();
        succ.reverse();
        succ
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reachability_from_callbacks() {
        let mut graph = CallGraph::new();
        graph.add_call(None, "main");
        graph.add_call(Some("main"), "helper");
        graph.add_call(Some("dead"), "only_from_dead");
        graph.ensure("lonely");

        let reached = graph.reachable_from_root();
        assert!(reached.contains("main"));
        assert!(reached.contains("helper"));
        assert!(!reached.contains("dead"));
        assert!(!reached.contains("only_from_dead"));
        assert!(!reached.contains("lonely"));
    }

    #[test]
    fn cycle_is_reported_as_path() {
        let mut graph = CallGraph::new();
        graph.add_call(None, "a");
        graph.add_call(Some("a"), "b");
        graph.add_call(Some("b"), "a");
        assert_eq!(
            graph.find_cycle(),
            Some(vec!["a".to_string(), "b".to_string(), "a".to_string()])
        );
    }

    #[test]
    fn self_call_is_a_cycle() {
        let mut graph = CallGraph::new();
        graph.add_call(Some("f"), "f");
        assert_eq!(graph.find_cycle(), Some(vec!["f".to_string(), "f".to_string()]));
    }

    #[test]
    fn acyclic_graph_has_no_cycle() {
        let mut graph = CallGraph::new();
        graph.add_call(None, "a");
        graph.add_call(None, "b");
        graph.add_call(Some("a"), "c");
        graph.add_call(Some("b"), "c");
        assert_eq!(graph.find_cycle(), None);
    }

    #[test]
    fn topological_order_puts_callers_first() {
        let mut graph = CallGraph::new();
        graph.add_call(None, "outer");
        graph.add_call(Some("outer"), "middle");
        graph.add_call(Some("middle"), "inner");
        graph.add_call(Some("outer"), "inner");

        let order = graph.topological_order();
        let pos = |name: &str| order.iter().position(|n| n == name).expect("present");
        assert!(pos("outer") < pos("middle"));
        assert!(pos("middle") < pos("inner"));
    }

    #[test]
    fn topological_order_ignores_recording_order() {
        let build = |names: [&str; 4]| {
            let mut graph = CallGraph::new();
            for name in names {
                graph.ensure(name);
            }
            graph.add_call(Some("d"), "a");
            graph.topological_order()
        };
        let order = build(["d", "a", "c", "b"]);
        assert_eq!(order, build(["a", "b", "c", "d"]));
        assert_eq!(order.len(), 4);
        let pos = |name: &str| order.iter().position(|n| n == name).expect("present");
        assert!(pos("d") < pos("a"));
    }

    #[test]
    fn cycle_starts_at_the_first_name_on_it() {
        let mut graph = CallGraph::new();
        graph.add_call(None, "zeta");
        graph.add_call(Some("zeta"), "mid");
        graph.add_call(Some("mid"), "beta");
        graph.add_call(Some("beta"), "zeta");
        graph.add_call(Some("alpha"), "zeta");
        assert_eq!(
            graph.find_cycle(),
            Some(vec!["beta".to_string(), "zeta".to_string(), "mid".to_string(), "beta".to_string()])
        );
    }

    #[test]
    fn cyclic_graph_has_no_topological_order() {
        let mut graph = CallGraph::new();
        graph.add_call(Some("a"), "b");
        graph.add_call(Some("b"), "a");
        assert!(graph.topological_order().is_empty());
    }

    #[test]
    fn explicit_calls() {
        let mut graph = CallGraph::new();
        graph.add_call(None, "tick");
        graph.mark_explicit("tick");
        assert!(graph.is_explicit("tick"));
        assert!(!graph.is_explicit("other"));
    }
}
