use crate::controlflow::{Cfg, CfgNode};
use crate::dataflow::{visit_order, Dataflow, ForwardAnalysis};
use fixedbitset::FixedBitSet;
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use std::collections::VecDeque;

/// Performs a forward dataflow analysis over `cfg`.
///
/// The entry node holds the boundary fact, every other node starts from
/// the initial fact. The worklist is drained until no node out fact
/// changes anymore.
pub fn forward<A: ForwardAnalysis>(cfg: &Cfg, analysis: &A) -> Dataflow<CfgNode, A::Fact> {
    let graph = &cfg.inner;
    let entry = cfg.index_of(cfg.entry());

    let mut in_facts: Vec<A::Fact> = graph
        .node_indices()
        .map(|id| {
            if id == entry {
                analysis.new_boundary_fact(cfg)
            } else {
                analysis.new_initial_fact()
            }
        })
        .collect();
    let mut out_facts: Vec<A::Fact> = graph
        .node_indices()
        .map(|_| analysis.new_initial_fact())
        .collect();

    // For forward dataflow, optimal order is reverse postorder.
    // The postorder here is reversed when we pop_back from the deque.
    let mut worklist: VecDeque<NodeIndex> = VecDeque::new();
    let mut queued = FixedBitSet::with_capacity(graph.node_count());
    let (postorder, unreachable) = visit_order(cfg);
    for id in postorder {
        worklist.push_back(id);
        queued.insert(id.index());
    }
    for id in unreachable {
        worklist.push_front(id);
        queued.insert(id.index());
    }

    let mut iterations = 0usize;
    while let Some(id) = worklist.pop_back() {
        queued.set(id.index(), false);
        iterations += 1;

        // entry keeps its boundary fact, other nodes meet their predecessors
        if id != entry {
            let mut in_fact = analysis.new_initial_fact();
            for pred in graph.neighbors_directed(id, Direction::Incoming) {
                analysis.meet_into(&out_facts[pred.index()], &mut in_fact);
            }
            in_facts[id.index()] = in_fact;
        }

        let stmt = cfg.stmt_of(graph[id]);
        if analysis.transfer_node(stmt, &in_facts[id.index()], &mut out_facts[id.index()]) {
            log::trace!("out fact of node {} changed", graph[id]);
            for succ in graph.neighbors_directed(id, Direction::Outgoing) {
                if !queued.put(succ.index()) {
                    worklist.push_front(succ);
                }
            }
        }
    }
    log::debug!(
        "forward analysis of {} nodes reached fixpoint after {iterations} iterations",
        graph.node_count()
    );

    let nodes: Vec<CfgNode> = graph.node_indices().map(|id| graph[id]).collect();
    Dataflow {
        entries: nodes.iter().copied().zip(in_facts).collect(),
        exits: nodes.into_iter().zip(out_facts).collect(),
    }
}
