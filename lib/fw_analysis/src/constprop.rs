//! Intraprocedural constant propagation.
//!
//! Integer arithmetic follows 32-bit two's complement semantics: every
//! operation wraps around, shift counts are masked to their 5 low bits and
//! `>>>` shifts in zeros.

use crate::controlflow::{Cfg, CfgNode};
use crate::dataflow::{forward, CpFact, Dataflow, ForwardAnalysis, Value};
use crate::errors::AnalysisResult;
use fw_ir::{BinaryExp, BinaryOp, Literal, MethodId, Program, Stmt, VarId};

pub struct ConstantPropagation<'p> {
    program: &'p Program,
}

impl<'p> ConstantPropagation<'p> {
    #[must_use]
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    /// Runs the analysis on one method.
    pub fn analyze(&self, method: MethodId) -> AnalysisResult<Dataflow<CfgNode, CpFact>> {
        let cfg = Cfg::build(self.program.method(method))?;
        Ok(forward(&cfg, self))
    }

    pub(crate) fn can_hold_int(&self, var: VarId) -> bool {
        self.program.var(var).ty().can_hold_int()
    }

    fn evaluate_def(&self, stmt: &Stmt, in_fact: &CpFact) -> Value {
        match stmt {
            Stmt::AssignLiteral {
                literal: Literal::Int(i),
                ..
            } => Value::Constant(*i),
            Stmt::Copy { rvalue, .. } => in_fact.get(*rvalue),
            Stmt::Binary { exp, .. } => evaluate(exp, in_fact),
            // loads, casts and call results are not tracked
            _ => Value::Nac,
        }
    }
}

/// Meets every value of `fact` into `target`.
pub(crate) fn meet_facts(fact: &CpFact, target: &mut CpFact) {
    for (var, value) in fact.iter() {
        target.update(var, value.meet(target.get(var)));
    }
}

/// Evaluates a binary expression in `fact`.
///
/// Division and remainder by the constant zero evaluate to `Undef`, other
/// expressions are constant when both operands are, `Nac` when any of them
/// is, `Undef` otherwise.
#[must_use]
pub fn evaluate(exp: &BinaryExp, fact: &CpFact) -> Value {
    let left = fact.get(exp.left);
    let right = fact.get(exp.right);
    if exp.op.can_throw() && right == Value::Constant(0) {
        return Value::Undef;
    }
    match (left, right) {
        (Value::Constant(l), Value::Constant(r)) => Value::Constant(compute(exp.op, l, r)),
        (Value::Nac, _) | (_, Value::Nac) => Value::Nac,
        _ => Value::Undef,
    }
}

// `r` is never zero for Div and Rem, see `evaluate`.
fn compute(op: BinaryOp, l: i32, r: i32) -> i32 {
    match op {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Mul => l.wrapping_mul(r),
        BinaryOp::Div => l.wrapping_div(r),
        BinaryOp::Rem => l.wrapping_rem(r),
        BinaryOp::And => l & r,
        BinaryOp::Or => l | r,
        BinaryOp::Xor => l ^ r,
        BinaryOp::Shl => l.wrapping_shl(r as u32),
        BinaryOp::Shr => l.wrapping_shr(r as u32),
        BinaryOp::Ushr => (l as u32).wrapping_shr(r as u32) as i32,
        BinaryOp::Eq => i32::from(l == r),
        BinaryOp::Ne => i32::from(l != r),
        BinaryOp::Lt => i32::from(l < r),
        BinaryOp::Le => i32::from(l <= r),
        BinaryOp::Gt => i32::from(l > r),
        BinaryOp::Ge => i32::from(l >= r),
    }
}

impl<'p> ForwardAnalysis for ConstantPropagation<'p> {
    type Fact = CpFact;

    fn new_boundary_fact(&self, cfg: &Cfg) -> CpFact {
        let mut fact = CpFact::new();
        for param in cfg.method().params() {
            if self.can_hold_int(*param) {
                fact.update(*param, Value::Nac);
            }
        }
        fact
    }

    fn new_initial_fact(&self) -> CpFact {
        CpFact::new()
    }

    fn meet_into(&self, fact: &CpFact, target: &mut CpFact) {
        meet_facts(fact, target);
    }

    fn transfer_node(&self, stmt: &Stmt, in_fact: &CpFact, out_fact: &mut CpFact) -> bool {
        let mut new_fact = in_fact.clone();
        if let Some(var) = stmt.def() {
            if self.can_hold_int(var) {
                new_fact.update(var, self.evaluate_def(stmt, in_fact));
            }
        }
        out_fact.copy_from(&new_fact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(source: &str) -> (Program, MethodId, Dataflow<CfgNode, CpFact>) {
        let program = fw_ir::parse(source).unwrap();
        let method = program.find_method("Main", "main").unwrap();
        let result = ConstantPropagation::new(&program).analyze(method).unwrap();
        (program, method, result)
    }

    #[test]
    fn straight_line_constants() {
        let (program, main, result) = analyze(
            r"
            class Main {
                static method main(int p) : int {
                    var int a, b, c, four, d;
                    a = 2;
                    b = 3;
                    c = a + b;
                    four = 4;
                    if c > four goto L1;
                    d = p;
                    return d;
                L1: d = c * p;
                    return d;
                }
            }
            ",
        );
        let var = |name| program.var_by_name(main, name).unwrap();
        let at_if = result.in_fact(&CfgNode::Stmt(4)).unwrap();
        assert_eq!(at_if.get(var("c")), Value::Constant(5));
        assert_eq!(at_if.get(var("p")), Value::Nac);
        // `d` is split in one variable per assignment
        let d = program.method(main).stmt(7).def().unwrap();
        let end = result.out_fact(&CfgNode::Stmt(7)).unwrap();
        assert_eq!(end.get(d), Value::Nac);
    }

    #[test]
    fn division_by_zero_is_undef() {
        let (program, main, result) = analyze(
            r"
            class Main {
                static method main() : void {
                    var int ten, zero, x, y;
                    ten = 10;
                    zero = 0;
                    x = ten / zero;
                    y = ten % zero;
                    return;
                }
            }
            ",
        );
        let out = result.out_fact(&CfgNode::Stmt(3)).unwrap();
        assert_eq!(out.get(program.var_by_name(main, "x").unwrap()), Value::Undef);
        assert_eq!(out.get(program.var_by_name(main, "y").unwrap()), Value::Undef);
    }

    #[test]
    fn loops_reach_nac() {
        let (program, main, result) = analyze(
            r"
            class Main {
                static method main() : void {
                    var int i, one, n, k;
                    i = 0;
                    one = 1;
                    n = 10;
                    k = 7;
                L:  i = i + one;
                    if i < n goto L;
                    return;
                }
            }
            ",
        );
        let var = |name| program.var_by_name(main, name).unwrap();
        let exit = result.in_fact(&CfgNode::Exit).unwrap();
        assert_eq!(exit.get(var("i")), Value::Nac);
        assert_eq!(exit.get(var("k")), Value::Constant(7));

        // converged facts are stable under the transfer function
        let analysis = ConstantPropagation::new(&program);
        let cfg = Cfg::build(program.method(main)).unwrap();
        for node in cfg.nodes() {
            let mut out = result.out_fact(&node).unwrap().clone();
            let in_fact = result.in_fact(&node).unwrap();
            assert!(!analysis.transfer_node(cfg.stmt_of(node), in_fact, &mut out));
        }
    }

    #[test]
    fn wrapping_arithmetic() {
        assert_eq!(compute(BinaryOp::Add, i32::MAX, 1), i32::MIN);
        assert_eq!(compute(BinaryOp::Mul, 1 << 30, 4), 0);
        assert_eq!(compute(BinaryOp::Div, i32::MIN, -1), i32::MIN);
        assert_eq!(compute(BinaryOp::Rem, -7, 2), -1);
        assert_eq!(compute(BinaryOp::Shl, 1, 33), 2);
        assert_eq!(compute(BinaryOp::Shr, -8, 1), -4);
        assert_eq!(compute(BinaryOp::Ushr, -1, 28), 15);
        assert_eq!(compute(BinaryOp::Ge, 3, 3), 1);
        assert_eq!(compute(BinaryOp::Ne, 3, 3), 0);
    }
}
