use crate::controlflow::{Cfg, CfgNode};
use crate::dataflow::{visit_order, BackwardAnalysis, Dataflow};
use fixedbitset::FixedBitSet;
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use std::collections::VecDeque;

/// Performs a backward dataflow analysis over `cfg`.
///
/// Symmetric to [`super::forward`]: the exit node holds the boundary fact
/// as its out fact, out facts are the meet of successors in facts, and the
/// transfer function recomputes in facts.
pub fn backward<A: BackwardAnalysis>(cfg: &Cfg, analysis: &A) -> Dataflow<CfgNode, A::Fact> {
    let graph = &cfg.inner;
    let exit = cfg.index_of(cfg.exit());

    let mut out_facts: Vec<A::Fact> = graph
        .node_indices()
        .map(|id| {
            if id == exit {
                analysis.new_boundary_fact(cfg)
            } else {
                analysis.new_initial_fact()
            }
        })
        .collect();
    let mut in_facts: Vec<A::Fact> = graph
        .node_indices()
        .map(|_| analysis.new_initial_fact())
        .collect();

    // For backward dataflow, postorder is a good approximation of the
    // reverse postorder of the reversed graph.
    let mut worklist: VecDeque<NodeIndex> = VecDeque::new();
    let mut queued = FixedBitSet::with_capacity(graph.node_count());
    let (postorder, unreachable) = visit_order(cfg);
    for id in postorder.into_iter().chain(unreachable) {
        worklist.push_front(id);
        queued.insert(id.index());
    }

    let mut iterations = 0usize;
    while let Some(id) = worklist.pop_back() {
        queued.set(id.index(), false);
        iterations += 1;

        if id != exit {
            let mut out_fact = analysis.new_initial_fact();
            for succ in graph.neighbors_directed(id, Direction::Outgoing) {
                analysis.meet_into(&in_facts[succ.index()], &mut out_fact);
            }
            out_facts[id.index()] = out_fact;
        }

        let stmt = cfg.stmt_of(graph[id]);
        if analysis.transfer_node(stmt, &out_facts[id.index()], &mut in_facts[id.index()]) {
            log::trace!("in fact of node {} changed", graph[id]);
            for pred in graph.neighbors_directed(id, Direction::Incoming) {
                if !queued.put(pred.index()) {
                    worklist.push_front(pred);
                }
            }
        }
    }
    log::debug!(
        "backward analysis of {} nodes reached fixpoint after {iterations} iterations",
        graph.node_count()
    );

    let nodes: Vec<CfgNode> = graph.node_indices().map(|id| graph[id]).collect();
    Dataflow {
        entries: nodes.iter().copied().zip(in_facts).collect(),
        exits: nodes.into_iter().zip(out_facts).collect(),
    }
}
