//! Graph representations of the possible calls between the methods of a
//! program.
//!
//! A [`CallGraph`] is generic over its call site type so that the same
//! structure holds both plain call graphs (call sites are statements,
//! nodes are methods) and context sensitive ones (call sites and methods
//! are qualified by a calling context).

use fw_ir::{CallKind, MethodId, StmtRef};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub trait CallSite: Copy + Ord + fmt::Debug {
    type Method: Copy + Ord + fmt::Debug;

    /// The method containing the call site.
    fn container(&self) -> Self::Method;
}

impl CallSite for StmtRef {
    type Method = MethodId;

    fn container(&self) -> MethodId {
        self.method
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Edge<C: CallSite> {
    pub kind: CallKind,
    pub call_site: C,
    pub callee: C::Method,
}

#[derive(Debug, Clone)]
pub struct CallGraph<C: CallSite> {
    inner: DiGraph<C::Method, Edge<C>>,
    node_ids: BTreeMap<C::Method, NodeIndex>,
    entries: Vec<C::Method>,
    reachable: BTreeSet<C::Method>,
    callees: BTreeMap<C, BTreeSet<C::Method>>,
    callers: BTreeMap<C::Method, BTreeSet<C>>,
    edges: BTreeSet<Edge<C>>,
}

impl<C: CallSite> Default for CallGraph<C> {
    fn default() -> Self {
        Self {
            inner: DiGraph::new(),
            node_ids: BTreeMap::new(),
            entries: Vec::new(),
            reachable: BTreeSet::new(),
            callees: BTreeMap::new(),
            callers: BTreeMap::new(),
            edges: BTreeSet::new(),
        }
    }
}

impl<C: CallSite> CallGraph<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, method: C::Method) -> NodeIndex {
        if let Some(id) = self.node_ids.get(&method) {
            return *id;
        }
        let id = self.inner.add_node(method);
        self.node_ids.insert(method, id);
        id
    }

    /// Records `method` as an entry method. It still has to be made
    /// reachable with [`CallGraph::add_reachable_method`].
    pub fn add_entry_method(&mut self, method: C::Method) {
        if !self.entries.contains(&method) {
            self.entries.push(method);
        }
    }

    /// Marks `method` as reachable, returning whether it was not already.
    pub fn add_reachable_method(&mut self, method: C::Method) -> bool {
        if self.reachable.insert(method) {
            self.node(method);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn contains(&self, method: C::Method) -> bool {
        self.reachable.contains(&method)
    }

    /// Adds a call edge, returning whether it is new.
    pub fn add_edge(&mut self, edge: Edge<C>) -> bool {
        if !self.edges.insert(edge) {
            return false;
        }
        let src = self.node(edge.call_site.container());
        let dst = self.node(edge.callee);
        self.inner.add_edge(src, dst, edge);
        self.callees
            .entry(edge.call_site)
            .or_default()
            .insert(edge.callee);
        self.callers
            .entry(edge.callee)
            .or_default()
            .insert(edge.call_site);
        true
    }

    pub fn callees_of(&self, call_site: C) -> impl Iterator<Item = C::Method> + '_ {
        self.callees
            .get(&call_site)
            .into_iter()
            .flat_map(|callees| callees.iter().copied())
    }

    pub fn callers_of(&self, method: C::Method) -> impl Iterator<Item = C> + '_ {
        self.callers
            .get(&method)
            .into_iter()
            .flat_map(|callers| callers.iter().copied())
    }

    /// Call sites having at least one callee.
    pub fn call_sites(&self) -> impl Iterator<Item = C> + '_ {
        self.callees.keys().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge<C>> {
        self.edges.iter()
    }

    pub fn reachable_methods(&self) -> impl Iterator<Item = C::Method> + '_ {
        self.reachable.iter().copied()
    }

    #[must_use]
    pub fn entry_methods(&self) -> &[C::Method] {
        &self.entries
    }

    #[must_use]
    pub fn nb_reachable_methods(&self) -> usize {
        self.reachable.len()
    }

    #[must_use]
    pub fn nb_edges(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn nb_call_sites(&self) -> usize {
        self.callees.len()
    }

    /// Keeps only the methods lying on a call path leading to a method
    /// that satisfies `predicate`.
    #[must_use]
    pub fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(C::Method) -> bool,
    {
        // backward traversal from targets
        let mut keep = BTreeSet::new();
        let reversed = Reversed(&self.inner);
        let mut dfs = Dfs::empty(reversed);
        for id in self.inner.node_indices() {
            if predicate(self.inner[id]) {
                dfs.move_to(id);
                while let Some(keep_id) = dfs.next(reversed) {
                    keep.insert(self.inner[keep_id]);
                }
            }
        }

        let mut filtered = Self::new();
        for method in &self.entries {
            if keep.contains(method) {
                filtered.add_entry_method(*method);
            }
        }
        for method in self.reachable.iter().filter(|m| keep.contains(m)) {
            filtered.add_reachable_method(*method);
        }
        for edge in &self.edges {
            if keep.contains(&edge.call_site.container()) && keep.contains(&edge.callee) {
                filtered.add_edge(*edge);
            }
        }
        filtered
    }

    /// Graphviz export, methods being labelled with `name`.
    #[must_use]
    pub fn to_dot<F>(&self, name: F) -> String
    where
        F: Fn(C::Method) -> String,
    {
        format!(
            "digraph {{\n  rankdir=LR;\n{:?}}}",
            Dot::with_attr_getters(
                &self.inner,
                &[Config::GraphContentOnly, Config::NodeNoLabel, Config::EdgeNoLabel],
                &|_, edge| {
                    let style = match edge.weight().kind {
                        CallKind::Static | CallKind::Special => "solid",
                        CallKind::Virtual | CallKind::Interface => "dashed",
                    };
                    format!("style={style}")
                },
                &|_, (_, method)| {
                    let color = if self.entries.contains(method) {
                        "blue"
                    } else {
                        "black"
                    };
                    let label = name(*method).replace('"', "\\\"");
                    format!("label=\"{label}\",color={color},shape=box")
                }
            )
        )
    }
}
