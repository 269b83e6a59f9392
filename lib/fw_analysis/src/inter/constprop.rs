//! Interprocedural constant propagation.
//!
//! Constants flow from the arguments of a call to the parameters of its
//! callees, and from the returned variables back to the call result.

use crate::cha::Cha;
use crate::constprop::{meet_facts, ConstantPropagation};
use crate::dataflow::{CpFact, Dataflow, ForwardAnalysis, Value};
use crate::errors::AnalysisResult;
use crate::hierarchy::Hierarchy;
use crate::icfg::{Icfg, IcfgNode};
use crate::inter::{InterDataflowAnalysis, InterSolver};
use fw_ir::{MethodId, Program, Stmt, StmtRef};

pub struct InterConstantPropagation<'p> {
    program: &'p Program,
    intra: ConstantPropagation<'p>,
}

impl<'p> InterConstantPropagation<'p> {
    #[must_use]
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            intra: ConstantPropagation::new(program),
        }
    }

    /// Runs the analysis over the ICFG built from the CHA call graph.
    pub fn analyze(&self, hierarchy: &Hierarchy<'p>) -> AnalysisResult<Dataflow<IcfgNode, CpFact>> {
        let call_graph = Cha::new(hierarchy).build_call_graph()?;
        let icfg = Icfg::build(self.program, &call_graph);
        Ok(self.analyze_icfg(&icfg))
    }

    #[must_use]
    pub fn analyze_icfg(&self, icfg: &Icfg<'p>) -> Dataflow<IcfgNode, CpFact> {
        InterSolver::new(icfg, self).solve()
    }
}

impl<'p> InterDataflowAnalysis for InterConstantPropagation<'p> {
    type Fact = CpFact;

    fn new_boundary_fact(&self, entry: IcfgNode) -> CpFact {
        let mut fact = CpFact::new();
        for param in self.program.method(entry.method).params() {
            if self.intra.can_hold_int(*param) {
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

    fn transfer_call_node(&self, _stmt: &Stmt, in_fact: &CpFact, out_fact: &mut CpFact) -> bool {
        out_fact.copy_from(in_fact)
    }

    fn transfer_non_call_node(&self, stmt: &Stmt, in_fact: &CpFact, out_fact: &mut CpFact) -> bool {
        self.intra.transfer_node(stmt, in_fact, out_fact)
    }

    fn transfer_call_to_return_edge(&self, call_site: StmtRef, out_fact: &CpFact) -> CpFact {
        let mut fact = out_fact.clone();
        // the result comes from the return edges
        if let Some(var) = self.program.stmt(call_site).def() {
            fact.remove(var);
        }
        fact
    }

    fn transfer_call_edge(&self, call_site: StmtRef, callee: MethodId, out_fact: &CpFact) -> CpFact {
        let mut fact = CpFact::new();
        let Some(invoke) = self.program.stmt(call_site).as_invoke() else {
            return fact;
        };
        let params = self.program.method(callee).params();
        for (arg, param) in invoke.args.iter().zip(params) {
            if self.intra.can_hold_int(*param) {
                fact.update(*param, out_fact.get(*arg));
            }
        }
        fact
    }

    fn transfer_return_edge(&self, call_site: StmtRef, callee: MethodId, out_fact: &CpFact) -> CpFact {
        let mut fact = CpFact::new();
        let Some(result) = self.program.stmt(call_site).def() else {
            return fact;
        };
        if !self.intra.can_hold_int(result) {
            return fact;
        }
        let value = self
            .program
            .method(callee)
            .ret_vars()
            .iter()
            .fold(Value::Undef, |value, var| value.meet(out_fact.get(*var)));
        fact.update(result, value);
        fact
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlflow::CfgNode;

    fn analyze(source: &str) -> (Program, Dataflow<IcfgNode, CpFact>) {
        let program = fw_ir::parse(source).unwrap();
        let hierarchy = Hierarchy::build(&program);
        let result = InterConstantPropagation::new(&program)
            .analyze(&hierarchy)
            .unwrap();
        (program, result)
    }

    #[test]
    fn constants_through_calls() {
        let (program, result) = analyze(
            r"
            class Main {
                static method main() : void {
                    var int a, b, c, two, d;
                    a = 1;
                    b = 2;
                    c = invokestatic <Main: int add(int,int)>(a, b);
                    two = 2;
                    d = c + two;
                    return;
                }
                static method add(int x, int y) : int {
                    var int z;
                    z = x + y;
                    return z;
                }
            }
            ",
        );
        let main = program.find_method("Main", "main").unwrap();
        let add = program.find_method("Main", "add").unwrap();
        let var = |method, name| program.var_by_name(method, name).unwrap();

        let at_add = result
            .in_fact(&IcfgNode {
                method: add,
                node: CfgNode::Stmt(0),
            })
            .unwrap();
        assert_eq!(at_add.get(var(add, "x")), Value::Constant(1));
        assert_eq!(at_add.get(var(add, "y")), Value::Constant(2));

        let end = result
            .out_fact(&IcfgNode {
                method: main,
                node: CfgNode::Stmt(4),
            })
            .unwrap();
        assert_eq!(end.get(var(main, "c")), Value::Constant(3));
        assert_eq!(end.get(var(main, "d")), Value::Constant(5));
    }

    #[test]
    fn returned_values_meet() {
        let (program, result) = analyze(
            r"
            class Main {
                static method main() : void {
                    var int a, r, s;
                    a = 3;
                    r = invokestatic <Main: int pick(int)>(a);
                    s = invokestatic <Main: int same(int)>(a);
                    return;
                }
                static method pick(int p) : int {
                    var int v;
                    if p > p goto L;
                    v = 1;
                    return v;
                L:  v = 2;
                    return v;
                }
                static method same(int p) : int {
                    var int v;
                    if p > p goto L;
                    v = 7;
                    return v;
                L:  v = 7;
                    return v;
                }
            }
            ",
        );
        let main = program.find_method("Main", "main").unwrap();
        let var = |name| program.var_by_name(main, name).unwrap();
        let end = result
            .in_fact(&IcfgNode {
                method: main,
                node: CfgNode::Stmt(3),
            })
            .unwrap();
        assert_eq!(end.get(var("a")), Value::Constant(3));
        assert_eq!(end.get(var("r")), Value::Nac);
        assert_eq!(end.get(var("s")), Value::Constant(7));
    }

    #[test]
    fn pointer_analysis_call_graph_prunes_callees() {
        let program = fw_ir::parse(
            r"
            interface Shape { abstract method area() : int; }
            class Square implements Shape {
                method area() : int { var int r; r = 1; return r; }
            }
            class Circle implements Shape {
                method area() : int { var int r; r = 2; return r; }
            }
            class Main {
                static method main() : void {
                    var Shape s; var int a;
                    s = new Square;
                    a = invokeinterface s.<Shape: int area()>();
                    return;
                }
            }
            ",
        )
        .unwrap();
        let hierarchy = Hierarchy::build(&program);
        let main = program.find_method("Main", "main").unwrap();
        let a = program.var_by_name(main, "a").unwrap();
        let at_return = IcfgNode {
            method: main,
            node: CfgNode::Stmt(2),
        };
        let analysis = InterConstantPropagation::new(&program);

        let pta = crate::pta::analyze_ci(&hierarchy).unwrap();
        let icfg = Icfg::build(&program, &pta.ci_call_graph());
        let circle_area = program.find_method("Circle", "area").unwrap();
        assert!(icfg.cfg_of(circle_area).is_none());
        let result = analysis.analyze_icfg(&icfg);
        assert_eq!(
            result.in_fact(&at_return).unwrap().get(a),
            Value::Constant(1)
        );

        // both implementations are callees under CHA
        let result = analysis.analyze(&hierarchy).unwrap();
        assert_eq!(result.in_fact(&at_return).unwrap().get(a), Value::Nac);
    }
}
