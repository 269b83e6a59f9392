use crate::dataflow::Dataflow;
use crate::icfg::{Icfg, IcfgNode};
use crate::inter::InterDataflowAnalysis;
use fixedbitset::FixedBitSet;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::VecDeque;

/// Worklist solver of interprocedural analyses.
pub struct InterSolver<'a, 'p, A: InterDataflowAnalysis> {
    icfg: &'a Icfg<'p>,
    analysis: &'a A,
}

impl<'a, 'p, A: InterDataflowAnalysis> InterSolver<'a, 'p, A> {
    #[must_use]
    pub fn new(icfg: &'a Icfg<'p>, analysis: &'a A) -> Self {
        Self { icfg, analysis }
    }

    /// Computes the fixpoint of the analysis over the whole ICFG.
    ///
    /// The in fact of a node is recomputed from scratch every time, as the
    /// meet of the out facts of its predecessors transferred along the
    /// connecting edges.
    #[must_use]
    pub fn solve(&self) -> Dataflow<IcfgNode, A::Fact> {
        let graph = &self.icfg.inner;
        let entries: Vec<NodeIndex> = self
            .icfg
            .entry_methods()
            .iter()
            .map(|method| self.icfg.index_of(self.icfg.entry_of(*method)))
            .collect();

        let mut in_facts: Vec<A::Fact> = graph
            .node_indices()
            .map(|_| self.analysis.new_initial_fact())
            .collect();
        let mut out_facts = in_facts.clone();

        let mut worklist: VecDeque<NodeIndex> = graph.node_indices().collect();
        let mut queued = FixedBitSet::with_capacity(graph.node_count());
        queued.insert_range(..);

        let mut iterations = 0usize;
        while let Some(id) = worklist.pop_front() {
            queued.set(id.index(), false);
            iterations += 1;
            let node = graph[id];

            let mut in_fact = if entries.contains(&id) {
                self.analysis.new_boundary_fact(node)
            } else {
                self.analysis.new_initial_fact()
            };
            for edge in graph.edges_directed(id, Direction::Incoming) {
                let fact = self
                    .analysis
                    .transfer_edge(edge.weight(), &out_facts[edge.source().index()]);
                self.analysis.meet_into(&fact, &mut in_fact);
            }
            in_facts[id.index()] = in_fact;

            if self.analysis.transfer_node(
                self.icfg,
                node,
                &in_facts[id.index()],
                &mut out_facts[id.index()],
            ) {
                log::trace!("out fact of node {node} changed");
                for succ in graph.neighbors_directed(id, Direction::Outgoing) {
                    if !queued.put(succ.index()) {
                        worklist.push_back(succ);
                    }
                }
            }
        }
        log::debug!(
            "interprocedural analysis of {} nodes reached fixpoint after {iterations} iterations",
            graph.node_count()
        );

        let nodes: Vec<IcfgNode> = graph.node_indices().map(|id| graph[id]).collect();
        Dataflow {
            entries: nodes.iter().copied().zip(in_facts).collect(),
            exits: nodes.into_iter().zip(out_facts).collect(),
        }
    }
}
