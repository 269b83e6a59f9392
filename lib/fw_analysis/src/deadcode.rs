//! Dead code detection, on top of constant propagation and live variables.
//!
//! A statement is dead when no execution can reach it, either because no
//! control flow path leads to it or because the paths leading to it all
//! go through branches that constant propagation proves infeasible, or
//! when it assigns a variable that is never read afterwards and computing
//! its right-hand side has no side effect.

use crate::constprop::{evaluate, ConstantPropagation};
use crate::controlflow::{Branch, Cfg, CfgNode};
use crate::dataflow::{backward, forward, CpFact, Dataflow, SetFact, Value};
use crate::errors::AnalysisResult;
use crate::livevar::LiveVariables;
use fw_ir::{MethodId, Program, Stmt, VarId};
use std::collections::{BTreeSet, VecDeque};

/// Returns the sorted indexes of the dead statements of `method`.
pub fn detect(program: &Program, method: MethodId) -> AnalysisResult<BTreeSet<usize>> {
    let cfg = Cfg::build(program.method(method))?;
    let constants = forward(&cfg, &ConstantPropagation::new(program));
    let live = backward(&cfg, &LiveVariables);
    let dead = dead_code(&cfg, &constants, &live);
    log::debug!(
        "{} dead statements in {}",
        dead.len(),
        program.method_signature(method)
    );
    Ok(dead)
}

fn dead_code(
    cfg: &Cfg,
    constants: &Dataflow<CfgNode, CpFact>,
    live: &Dataflow<CfgNode, SetFact<VarId>>,
) -> BTreeSet<usize> {
    let mut dead = BTreeSet::new();

    let mut reached = BTreeSet::new();
    let mut queue = VecDeque::from([cfg.entry()]);
    while let Some(node) = queue.pop_front() {
        if !reached.insert(node) {
            continue;
        }
        let in_fact = constants.in_fact(&node);
        let feasible = |branch: &Branch| match (cfg.stmt_of(node), in_fact) {
            (Stmt::If { cond, .. }, Some(fact)) => match evaluate(cond, fact) {
                Value::Constant(0) => *branch == Branch::IfFalse,
                Value::Constant(_) => *branch == Branch::IfTrue,
                _ => true,
            },
            (Stmt::Switch { var, cases, .. }, Some(fact)) => match fact.get(*var) {
                Value::Constant(value) if cases.iter().any(|(case, _)| *case == value) => {
                    *branch == Branch::Switch(value)
                }
                Value::Constant(_) => *branch == Branch::SwitchDefault,
                _ => true,
            },
            _ => true,
        };
        for (branch, succ) in cfg.out_edges_of(node) {
            if feasible(&branch) && !reached.contains(&succ) {
                queue.push_back(succ);
            }
        }
    }

    for node in cfg.nodes() {
        let CfgNode::Stmt(index) = node else {
            continue;
        };
        if !reached.contains(&node) {
            dead.insert(index);
            continue;
        }
        let stmt = cfg.stmt_of(node);
        if let (Some(var), Some(live_out)) = (stmt.def(), live.out_fact(&node)) {
            if !live_out.contains(&var) && has_no_side_effect(stmt) {
                dead.insert(index);
            }
        }
    }
    dead
}

fn has_no_side_effect(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::AssignLiteral { .. } | Stmt::Copy { .. } => true,
        Stmt::Binary { exp, .. } => !exp.op.can_throw(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dead_in_main(source: &str) -> BTreeSet<usize> {
        let program = fw_ir::parse(source).unwrap();
        let main = program.find_method("Main", "main").unwrap();
        detect(&program, main).unwrap()
    }

    #[test]
    fn constant_condition_kills_branch() {
        let dead = dead_in_main(
            r"
            class Main {
                static method main() : int {
                    var int a, b, c, four, x;
                    a = 2;
                    b = 3;
                    c = a + b;
                    four = 4;
                    if c > four goto L1;
                    x = 0;
                    goto End;
                L1: x = 1;
                End: return x;
                }
            }
            ",
        );
        assert_eq!(dead, BTreeSet::from([5, 6]));
    }

    #[test]
    fn unreachable_and_dead_assignments() {
        let dead = dead_in_main(
            r"
            class Main {
                static method main(int p) : int {
                    var int a, b, zero, q;
                    a = p + p;
                    b = a;
                    zero = 0;
                    q = p / zero;
                    return a;
                    a = 1;
                }
            }
            ",
        );
        // the division may throw, so it is kept even though `q` is unused
        assert_eq!(dead, BTreeSet::from([1, 5]));
    }

    #[test]
    fn constant_switch() {
        let dead = dead_in_main(
            r"
            class Main {
                static method main() : int {
                    var int k, r;
                    k = 2;
                    switch k { 1 -> One, 2 -> Two, default -> Other };
            One:    r = 10;
                    return r;
            Two:    r = 20;
                    return r;
            Other:  r = 30;
                    return r;
                }
            }
            ",
        );
        assert_eq!(dead, BTreeSet::from([2, 3, 6, 7]));
    }
}
