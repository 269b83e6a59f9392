//! Interprocedural control flow graph: the control flow graphs of every
//! reachable method, linked together along call graph edges.

use crate::callgraph::CallGraph;
use crate::controlflow::{Branch, Cfg, CfgNode};
use fw_ir::{MethodId, Program, Stmt, StmtRef};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IcfgNode {
    pub method: MethodId,
    pub node: CfgNode,
}

impl fmt::Display for IcfgNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "m{}:{}", self.method.idx(), self.node)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcfgEdge {
    /// Intraprocedural edge.
    Normal(Branch),
    /// From a call site to its return site, bypassing the callees.
    CallToReturn { call_site: StmtRef },
    /// From a call site to the entry of a callee.
    Call { call_site: StmtRef, callee: MethodId },
    /// From the exit of a callee to the return site of a call.
    Return { call_site: StmtRef, callee: MethodId },
}

impl fmt::Display for IcfgEdge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Normal(branch) => write!(f, "{branch}"),
            Self::CallToReturn { .. } => write!(f, "<c2r>"),
            Self::Call { .. } => write!(f, "<call>"),
            Self::Return { .. } => write!(f, "<ret>"),
        }
    }
}

pub struct Icfg<'p> {
    program: &'p Program,
    cfgs: BTreeMap<MethodId, Cfg<'p>>,
    pub(crate) inner: DiGraph<IcfgNode, IcfgEdge>,
    node_ids: BTreeMap<IcfgNode, NodeIndex>,
    callees: BTreeMap<StmtRef, BTreeSet<MethodId>>,
    entries: Vec<MethodId>,
}

impl<'p> Icfg<'p> {
    /// Builds the ICFG of the methods reachable in `call_graph`.
    ///
    /// Only call sites with at least one callee having a body are linked
    /// to their callees; other calls are handled as plain statements.
    #[must_use]
    pub fn build(program: &'p Program, call_graph: &CallGraph<StmtRef>) -> Self {
        let mut cfgs = BTreeMap::new();
        for method in call_graph.reachable_methods() {
            if let Ok(cfg) = Cfg::build(program.method(method)) {
                cfgs.insert(method, cfg);
            }
        }

        let mut inner = DiGraph::new();
        let mut node_ids = BTreeMap::new();
        for (method, cfg) in &cfgs {
            for node in cfg.nodes() {
                let node = IcfgNode {
                    method: *method,
                    node,
                };
                node_ids.insert(node, inner.add_node(node));
            }
        }

        let mut callees: BTreeMap<StmtRef, BTreeSet<MethodId>> = BTreeMap::new();
        for method in cfgs.keys() {
            for site in program.method(*method).iter_stmt_refs() {
                let targets: BTreeSet<MethodId> = call_graph
                    .callees_of(site)
                    .filter(|callee| cfgs.contains_key(callee))
                    .collect();
                if !targets.is_empty() {
                    callees.insert(site, targets);
                }
            }
        }

        for (method, cfg) in &cfgs {
            let at = |node| node_ids[&IcfgNode {
                method: *method,
                node,
            }];
            for src in cfg.nodes() {
                let call_site = match src {
                    CfgNode::Stmt(index) => Some(StmtRef::new(*method, index))
                        .filter(|site| callees.contains_key(site)),
                    _ => None,
                };
                for (branch, dst) in cfg.out_edges_of(src) {
                    let Some(call_site) = call_site else {
                        inner.add_edge(at(src), at(dst), IcfgEdge::Normal(branch));
                        continue;
                    };
                    inner.add_edge(at(src), at(dst), IcfgEdge::CallToReturn { call_site });
                    for callee in &callees[&call_site] {
                        let exit = node_ids[&IcfgNode {
                            method: *callee,
                            node: CfgNode::Exit,
                        }];
                        inner.add_edge(
                            exit,
                            at(dst),
                            IcfgEdge::Return {
                                call_site,
                                callee: *callee,
                            },
                        );
                    }
                }
                if let Some(call_site) = call_site {
                    for callee in &callees[&call_site] {
                        let entry = node_ids[&IcfgNode {
                            method: *callee,
                            node: CfgNode::Entry,
                        }];
                        inner.add_edge(
                            at(src),
                            entry,
                            IcfgEdge::Call {
                                call_site,
                                callee: *callee,
                            },
                        );
                    }
                }
            }
        }

        let entries = call_graph
            .entry_methods()
            .iter()
            .copied()
            .filter(|method| cfgs.contains_key(method))
            .collect();
        log::debug!(
            "ICFG built over {} methods: {} nodes, {} edges",
            cfgs.len(),
            inner.node_count(),
            inner.edge_count()
        );
        Self {
            program,
            cfgs,
            inner,
            node_ids,
            callees,
            entries,
        }
    }

    #[inline]
    #[must_use]
    pub fn program(&self) -> &'p Program {
        self.program
    }

    #[must_use]
    pub fn entry_methods(&self) -> &[MethodId] {
        &self.entries
    }

    pub fn methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        self.cfgs.keys().copied()
    }

    #[must_use]
    pub fn cfg_of(&self, method: MethodId) -> Option<&Cfg<'p>> {
        self.cfgs.get(&method)
    }

    pub fn nodes(&self) -> impl Iterator<Item = IcfgNode> + '_ {
        self.node_ids.keys().copied()
    }

    #[must_use]
    pub fn nb_nodes(&self) -> usize {
        self.inner.node_count()
    }

    #[must_use]
    pub fn entry_of(&self, method: MethodId) -> IcfgNode {
        IcfgNode {
            method,
            node: CfgNode::Entry,
        }
    }

    #[must_use]
    pub fn exit_of(&self, method: MethodId) -> IcfgNode {
        IcfgNode {
            method,
            node: CfgNode::Exit,
        }
    }

    pub(crate) fn index_of(&self, node: IcfgNode) -> NodeIndex {
        self.node_ids[&node]
    }

    #[must_use]
    pub fn stmt_of(&self, node: IcfgNode) -> &'p Stmt {
        match self.cfgs.get(&node.method) {
            Some(cfg) => cfg.stmt_of(node.node),
            None => &crate::controlflow::NOP,
        }
    }

    /// The call site of `node` when it is a call linked to its callees.
    #[must_use]
    pub fn call_site_of(&self, node: IcfgNode) -> Option<StmtRef> {
        match node.node {
            CfgNode::Stmt(index) => Some(StmtRef::new(node.method, index))
                .filter(|site| self.callees.contains_key(site)),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_call_node(&self, node: IcfgNode) -> bool {
        self.call_site_of(node).is_some()
    }

    pub fn callees_of(&self, call_site: StmtRef) -> impl Iterator<Item = MethodId> + '_ {
        self.callees
            .get(&call_site)
            .into_iter()
            .flat_map(|callees| callees.iter().copied())
    }

    /// Incoming edges of `node`, as `(source, edge)` pairs.
    #[must_use]
    pub fn in_edges_of(&self, node: IcfgNode) -> Vec<(IcfgNode, IcfgEdge)> {
        self.inner
            .edges_directed(self.index_of(node), Direction::Incoming)
            .map(|edge| (self.inner[edge.source()], *edge.weight()))
            .collect()
    }

    /// Outgoing edges of `node`, as `(edge, target)` pairs.
    #[must_use]
    pub fn out_edges_of(&self, node: IcfgNode) -> Vec<(IcfgEdge, IcfgNode)> {
        self.inner
            .edges_directed(self.index_of(node), Direction::Outgoing)
            .map(|edge| (*edge.weight(), self.inner[edge.target()]))
            .collect()
    }

    #[must_use]
    pub fn succs_of(&self, node: IcfgNode) -> Vec<IcfgNode> {
        self.inner
            .neighbors_directed(self.index_of(node), Direction::Outgoing)
            .map(|id| self.inner[id])
            .collect()
    }

    #[must_use]
    pub fn preds_of(&self, node: IcfgNode) -> Vec<IcfgNode> {
        self.inner
            .neighbors_directed(self.index_of(node), Direction::Incoming)
            .map(|id| self.inner[id])
            .collect()
    }

    /// Graphviz export, one cluster per method.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut res = String::new();
        res.push_str("digraph {\n");
        for (method, cfg) in &self.cfgs {
            let signature = self.program.method_signature(*method).replace('"', "\\\"");
            res.push_str(&format!("  subgraph cluster_{} {{\n", method.idx()));
            res.push_str(&format!("    label=\"{signature}\";\n"));
            for node in cfg.nodes() {
                let id = self.index_of(IcfgNode {
                    method: *method,
                    node,
                });
                res.push_str(&format!(
                    "    {} [label=\"{node}\",shape=box];\n",
                    id.index()
                ));
            }
            res.push_str("  }\n");
        }
        for edge in self.inner.raw_edges() {
            let color = match edge.weight {
                IcfgEdge::Normal(_) => "black",
                IcfgEdge::CallToReturn { .. } => "gray",
                IcfgEdge::Call { .. } => "blue",
                IcfgEdge::Return { .. } => "red",
            };
            res.push_str(&format!(
                "  {} -> {} [color={color}];\n",
                edge.source().index(),
                edge.target().index()
            ));
        }
        res.push('}');
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cha::Cha;
    use crate::hierarchy::Hierarchy;

    #[test]
    fn call_and_return_edges() {
        let program = fw_ir::parse(
            r"
            class Main {
                static method main() : void {
                    var int a, r;
                    a = 1;
                    r = invokestatic <Main: int id(int)>(a);
                    invokestatic <Main: void missing()>();
                    return;
                }
                static method id(int x) : int { return x; }
            }
            ",
        )
        .unwrap();
        let hierarchy = Hierarchy::build(&program);
        let cg = Cha::new(&hierarchy).build_call_graph().unwrap();
        let icfg = Icfg::build(&program, &cg);
        let main = program.find_method("Main", "main").unwrap();
        let id = program.find_method("Main", "id").unwrap();
        let node = |method, index| IcfgNode {
            method,
            node: CfgNode::Stmt(index),
        };

        assert_eq!(icfg.entry_methods(), &[main]);
        assert_eq!(icfg.nb_nodes(), 6 + 3);
        assert!(icfg.is_call_node(node(main, 1)));
        assert!(!icfg.is_call_node(node(main, 2)));

        let mut out = icfg.out_edges_of(node(main, 1));
        out.sort_by_key(|(_, target)| *target);
        assert_eq!(
            out,
            vec![
                (
                    IcfgEdge::CallToReturn {
                        call_site: StmtRef::new(main, 1)
                    },
                    node(main, 2)
                ),
                (
                    IcfgEdge::Call {
                        call_site: StmtRef::new(main, 1),
                        callee: id
                    },
                    icfg.entry_of(id)
                ),
            ]
        );
        let returning: Vec<_> = icfg
            .in_edges_of(node(main, 2))
            .into_iter()
            .filter(|(_, edge)| matches!(edge, IcfgEdge::Return { .. }))
            .map(|(src, _)| src)
            .collect();
        assert_eq!(returning, vec![icfg.exit_of(id)]);
        let dot = icfg.to_dot();
        assert!(dot.contains(&format!("subgraph cluster_{} {{", id.idx())));
        assert!(dot.contains("[color=blue]"));
        assert!(dot.contains("[color=red]"));
    }
}
