//! Control flow graph representation.

use crate::errors::{AnalysisError, AnalysisResult};
use fw_ir::{Method, Program, Stmt};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Statement executed by the synthetic entry and exit nodes.
pub(crate) static NOP: Stmt = Stmt::Nop;

/// A control flow graph node: one per statement, plus a synthetic entry
/// and a synthetic exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CfgNode {
    Entry,
    Stmt(usize),
    Exit,
}

impl fmt::Display for CfgNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Entry => write!(f, "ENTRY"),
            Self::Stmt(index) => write!(f, "{index}"),
            Self::Exit => write!(f, "EXIT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Sequence,
    Jmp,
    IfTrue,
    IfFalse,
    Switch(i32),
    SwitchDefault,
    Return,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Sequence => write!(f, "<seq>"),
            Self::Jmp => write!(f, "<jmp>"),
            Self::IfTrue => write!(f, "<true>"),
            Self::IfFalse => write!(f, "<false>"),
            Self::Switch(case) => write!(f, "<switch {case}>"),
            Self::SwitchDefault => write!(f, "<switch _>"),
            Self::Return => write!(f, "<return>"),
        }
    }
}

#[derive(Debug)]
pub struct Cfg<'p> {
    method: &'p Method,
    pub(crate) inner: DiGraph<CfgNode, Branch>,
    node_ids: BTreeMap<CfgNode, NodeIndex>,
}

impl<'p> Cfg<'p> {
    pub fn build(method: &'p Method) -> AnalysisResult<Self> {
        if !method.has_body() {
            return Err(AnalysisError::NoCode);
        }
        let stmts = method.stmts();

        let mut inner = DiGraph::new();
        let mut node_ids = BTreeMap::new();
        node_ids.insert(CfgNode::Entry, inner.add_node(CfgNode::Entry));
        for index in 0..stmts.len() {
            let node = CfgNode::Stmt(index);
            node_ids.insert(node, inner.add_node(node));
        }
        node_ids.insert(CfgNode::Exit, inner.add_node(CfgNode::Exit));

        // falling off the end of the body leads to the exit node
        let next = |index: usize| {
            if index + 1 < stmts.len() {
                CfgNode::Stmt(index + 1)
            } else {
                CfgNode::Exit
            }
        };

        let mut edges = Vec::new();
        let first = if stmts.is_empty() {
            CfgNode::Exit
        } else {
            CfgNode::Stmt(0)
        };
        edges.push((CfgNode::Entry, Branch::Sequence, first));
        for (index, stmt) in stmts.iter().enumerate() {
            let src = CfgNode::Stmt(index);
            match stmt {
                Stmt::If { target, .. } => {
                    edges.push((src, Branch::IfTrue, CfgNode::Stmt(*target)));
                    edges.push((src, Branch::IfFalse, next(index)));
                }
                Stmt::Goto { target } => edges.push((src, Branch::Jmp, CfgNode::Stmt(*target))),
                Stmt::Switch { cases, default, .. } => {
                    for (case, target) in cases {
                        edges.push((src, Branch::Switch(*case), CfgNode::Stmt(*target)));
                    }
                    edges.push((src, Branch::SwitchDefault, CfgNode::Stmt(*default)));
                }
                Stmt::Return { .. } => edges.push((src, Branch::Return, CfgNode::Exit)),
                _ => edges.push((src, Branch::Sequence, next(index))),
            }
        }
        for (src, branch, dst) in edges {
            inner.add_edge(node_ids[&src], node_ids[&dst], branch);
        }

        Ok(Self {
            method,
            inner,
            node_ids,
        })
    }

    #[inline]
    #[must_use]
    pub fn method(&self) -> &'p Method {
        self.method
    }

    #[inline]
    #[must_use]
    pub fn entry(&self) -> CfgNode {
        CfgNode::Entry
    }

    #[inline]
    #[must_use]
    pub fn exit(&self) -> CfgNode {
        CfgNode::Exit
    }

    /// Nodes in their natural order: entry, statements, exit.
    pub fn nodes(&self) -> impl Iterator<Item = CfgNode> + '_ {
        self.node_ids.keys().copied()
    }

    #[must_use]
    pub fn nb_nodes(&self) -> usize {
        self.inner.node_count()
    }

    #[must_use]
    pub fn nb_edges(&self) -> usize {
        self.inner.edge_count()
    }

    /// The statement of a node; synthetic nodes execute a `nop`.
    #[must_use]
    pub fn stmt_of(&self, node: CfgNode) -> &'p Stmt {
        match node {
            CfgNode::Stmt(index) => self.method.stmt(index),
            CfgNode::Entry | CfgNode::Exit => &NOP,
        }
    }

    pub(crate) fn index_of(&self, node: CfgNode) -> NodeIndex {
        self.node_ids[&node]
    }

    /// Incoming edges of `node`, as `(source, branch)` pairs.
    #[must_use]
    pub fn in_edges_of(&self, node: CfgNode) -> Vec<(CfgNode, Branch)> {
        self.inner
            .edges_directed(self.index_of(node), Direction::Incoming)
            .map(|edge| (self.inner[edge.source()], *edge.weight()))
            .collect()
    }

    /// Outgoing edges of `node`, as `(branch, target)` pairs.
    #[must_use]
    pub fn out_edges_of(&self, node: CfgNode) -> Vec<(Branch, CfgNode)> {
        self.inner
            .edges_directed(self.index_of(node), Direction::Outgoing)
            .map(|edge| (*edge.weight(), self.inner[edge.target()]))
            .collect()
    }

    #[must_use]
    pub fn preds_of(&self, node: CfgNode) -> Vec<CfgNode> {
        self.inner
            .neighbors_directed(self.index_of(node), Direction::Incoming)
            .map(|id| self.inner[id])
            .collect()
    }

    #[must_use]
    pub fn succs_of(&self, node: CfgNode) -> Vec<CfgNode> {
        self.inner
            .neighbors_directed(self.index_of(node), Direction::Outgoing)
            .map(|id| self.inner[id])
            .collect()
    }

    #[must_use]
    pub fn to_dot(&self, program: &Program) -> String {
        format!(
            "digraph {{\n  nodesep=1;\n{}}}",
            Dot::with_attr_getters(
                &self.inner,
                &[Config::GraphContentOnly, Config::EdgeNoLabel, Config::NodeNoLabel],
                &|_, edge| {
                    let color = match edge.weight() {
                        Branch::IfTrue => "green",
                        Branch::IfFalse => "red",
                        Branch::Switch(_) | Branch::SwitchDefault => "purple",
                        Branch::Jmp => "blue",
                        Branch::Sequence | Branch::Return => "black",
                    };
                    format!("color={},xlabel=\"{}\"", color, edge.weight())
                },
                &|_, (_, node)| {
                    let label = match node {
                        CfgNode::Stmt(index) => format!(
                            "{index}: {}",
                            fw_ir::PrettyPrinter(self.method.stmt(*index), program)
                        ),
                        _ => node.to_string(),
                    };
                    format!("shape=box,label=\"{}\"", label.replace('"', "\\\""))
                }
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branching_edges() {
        let program = fw_ir::parse(
            r"
            class Main {
                static method main(int x) : int {
                    var int y;
                    if x > x goto Else;
                    y = 1;
                    goto End;
            Else:   y = 2;
            End:    switch y { 1 -> Ret, default -> Ret };
            Ret:    return y;
                }
            }
            ",
        )
        .unwrap();
        let method = program.method(program.find_method("Main", "main").unwrap());
        let cfg = Cfg::build(method).unwrap();

        assert_eq!(cfg.nb_nodes(), 8);
        assert_eq!(cfg.succs_of(CfgNode::Entry), vec![CfgNode::Stmt(0)]);
        let mut out = cfg.out_edges_of(CfgNode::Stmt(0));
        out.sort_by_key(|(_, node)| *node);
        assert_eq!(
            out,
            vec![
                (Branch::IfFalse, CfgNode::Stmt(1)),
                (Branch::IfTrue, CfgNode::Stmt(3))
            ]
        );
        assert_eq!(
            cfg.out_edges_of(CfgNode::Stmt(2)),
            vec![(Branch::Jmp, CfgNode::Stmt(4))]
        );
        let mut preds = cfg.preds_of(CfgNode::Stmt(4));
        preds.sort();
        assert_eq!(preds, vec![CfgNode::Stmt(2), CfgNode::Stmt(3)]);
        assert_eq!(cfg.in_edges_of(CfgNode::Stmt(5)).len(), 2);
        assert_eq!(cfg.preds_of(CfgNode::Exit), vec![CfgNode::Stmt(5)]);
        assert!(matches!(cfg.stmt_of(CfgNode::Exit), Stmt::Nop));
        assert!(cfg.to_dot(&program).contains("xlabel=\"<true>\""));
    }

    #[test]
    fn empty_and_abstract_methods() {
        let program = fw_ir::parse(
            r"
            interface I { abstract method m() : void; }
            class Main { static method main() : void { } }
            ",
        )
        .unwrap();
        let main = program.method(program.find_method("Main", "main").unwrap());
        let cfg = Cfg::build(main).unwrap();
        assert_eq!(cfg.succs_of(CfgNode::Entry), vec![CfgNode::Exit]);

        let m = program.method(program.find_method("I", "m").unwrap());
        assert!(matches!(Cfg::build(m), Err(AnalysisError::NoCode)));
    }
}
