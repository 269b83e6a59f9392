//! Interprocedural dataflow analysis framework.
//!
//! Analyses run over an [`Icfg`], with transfer functions on nodes and on
//! edges: call and return edges map facts between the caller and callee
//! variables.

use crate::controlflow::Branch;
use crate::icfg::{Icfg, IcfgEdge, IcfgNode};
use fw_ir::{MethodId, Stmt, StmtRef};

pub mod constprop;
mod solver;

pub use solver::InterSolver;

pub trait InterDataflowAnalysis {
    type Fact: Clone + Eq;

    /// The fact holding at `entry`, the entry node of an entry method.
    fn new_boundary_fact(&self, entry: IcfgNode) -> Self::Fact;

    fn new_initial_fact(&self) -> Self::Fact;

    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact);

    /// Node transfer of call sites linked to their callees.
    fn transfer_call_node(&self, stmt: &Stmt, in_fact: &Self::Fact, out_fact: &mut Self::Fact)
        -> bool;

    fn transfer_non_call_node(
        &self,
        stmt: &Stmt,
        in_fact: &Self::Fact,
        out_fact: &mut Self::Fact,
    ) -> bool;

    fn transfer_normal_edge(&self, _branch: Branch, out_fact: &Self::Fact) -> Self::Fact {
        out_fact.clone()
    }

    fn transfer_call_to_return_edge(&self, call_site: StmtRef, out_fact: &Self::Fact)
        -> Self::Fact;

    fn transfer_call_edge(
        &self,
        call_site: StmtRef,
        callee: MethodId,
        out_fact: &Self::Fact,
    ) -> Self::Fact;

    fn transfer_return_edge(
        &self,
        call_site: StmtRef,
        callee: MethodId,
        out_fact: &Self::Fact,
    ) -> Self::Fact;

    /// Dispatches to the call or non-call node transfer function.
    fn transfer_node(
        &self,
        icfg: &Icfg,
        node: IcfgNode,
        in_fact: &Self::Fact,
        out_fact: &mut Self::Fact,
    ) -> bool {
        let stmt = icfg.stmt_of(node);
        if icfg.is_call_node(node) {
            self.transfer_call_node(stmt, in_fact, out_fact)
        } else {
            self.transfer_non_call_node(stmt, in_fact, out_fact)
        }
    }

    /// Transfers the out fact of an edge source along the edge.
    fn transfer_edge(&self, edge: &IcfgEdge, out_fact: &Self::Fact) -> Self::Fact {
        match edge {
            IcfgEdge::Normal(branch) => self.transfer_normal_edge(*branch, out_fact),
            IcfgEdge::CallToReturn { call_site } => {
                self.transfer_call_to_return_edge(*call_site, out_fact)
            }
            IcfgEdge::Call { call_site, callee } => {
                self.transfer_call_edge(*call_site, *callee, out_fact)
            }
            IcfgEdge::Return { call_site, callee } => {
                self.transfer_return_edge(*call_site, *callee, out_fact)
            }
        }
    }
}
