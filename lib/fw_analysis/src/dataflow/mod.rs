//! Dataflow analysis framework.
//!
//! Clients describe their lattice and transfer functions by implementing
//! [`ForwardAnalysis`] or [`BackwardAnalysis`]; the [`forward`] and
//! [`backward`] worklist solvers compute the fixpoint over a method
//! control flow graph.

use crate::controlflow::Cfg;
use fixedbitset::FixedBitSet;
use fw_ir::Stmt;
use petgraph::graph::NodeIndex;
use petgraph::visit::DfsPostOrder;
use std::collections::BTreeMap;

mod backward;
pub mod fact;
mod forward;

pub use backward::backward;
pub use fact::{CpFact, SetFact, Value};
pub use forward::forward;

/// Dataflow analysis result object.
///
/// Contains the facts holding before (`entries`) and after (`exits`) every
/// node of the analyzed graph, after reaching fixpoint.
#[derive(Debug, Clone)]
pub struct Dataflow<N: Ord, F> {
    pub entries: BTreeMap<N, F>,
    pub exits: BTreeMap<N, F>,
}

impl<N: Ord, F> Dataflow<N, F> {
    #[must_use]
    pub fn in_fact(&self, node: &N) -> Option<&F> {
        self.entries.get(node)
    }

    #[must_use]
    pub fn out_fact(&self, node: &N) -> Option<&F> {
        self.exits.get(node)
    }
}

pub trait ForwardAnalysis {
    type Fact: Clone + Eq;

    /// The fact holding at the entry of the method.
    fn new_boundary_fact(&self, cfg: &Cfg) -> Self::Fact;

    /// The fact every other node starts from.
    fn new_initial_fact(&self) -> Self::Fact;

    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact);

    /// Computes `out_fact` from `in_fact` through `stmt`, returning whether
    /// `out_fact` changed.
    fn transfer_node(&self, stmt: &Stmt, in_fact: &Self::Fact, out_fact: &mut Self::Fact) -> bool;
}

pub trait BackwardAnalysis {
    type Fact: Clone + Eq;

    /// The fact holding at the exit of the method.
    fn new_boundary_fact(&self, cfg: &Cfg) -> Self::Fact;

    fn new_initial_fact(&self) -> Self::Fact;

    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact);

    /// Computes `in_fact` from `out_fact` through `stmt`, returning whether
    /// `in_fact` changed.
    fn transfer_node(&self, stmt: &Stmt, out_fact: &Self::Fact, in_fact: &mut Self::Fact) -> bool;
}

// Postorder of the nodes reachable from entry, followed by the unreachable
// ones, which are still analyzed so that every node gets a fact.
fn visit_order(cfg: &Cfg) -> (Vec<NodeIndex>, Vec<NodeIndex>) {
    let graph = &cfg.inner;
    let mut visited = FixedBitSet::with_capacity(graph.node_count());
    let mut postorder = Vec::with_capacity(graph.node_count());
    let mut dfs = DfsPostOrder::new(graph, cfg.index_of(cfg.entry()));
    while let Some(id) = dfs.next(graph) {
        visited.insert(id.index());
        postorder.push(id);
    }
    let unreachable = graph
        .node_indices()
        .filter(|id| !visited.contains(id.index()))
        .collect();
    (postorder, unreachable)
}
