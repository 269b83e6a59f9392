//! Live variables analysis.

use crate::controlflow::{Cfg, CfgNode};
use crate::dataflow::{backward, BackwardAnalysis, Dataflow, SetFact};
use crate::errors::AnalysisResult;
use fw_ir::{Method, Stmt, VarId};

/// A variable is live at a point when some path from that point reads it
/// before redefining it.
pub struct LiveVariables;

impl LiveVariables {
    pub fn analyze(method: &Method) -> AnalysisResult<Dataflow<CfgNode, SetFact<VarId>>> {
        let cfg = Cfg::build(method)?;
        Ok(backward(&cfg, &Self))
    }
}

impl BackwardAnalysis for LiveVariables {
    type Fact = SetFact<VarId>;

    fn new_boundary_fact(&self, _cfg: &Cfg) -> Self::Fact {
        SetFact::new()
    }

    fn new_initial_fact(&self) -> Self::Fact {
        SetFact::new()
    }

    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact) {
        target.union(fact);
    }

    fn transfer_node(&self, stmt: &Stmt, out_fact: &Self::Fact, in_fact: &mut Self::Fact) -> bool {
        let mut new_fact = out_fact.clone();
        if let Some(var) = stmt.def() {
            new_fact.remove(&var);
        }
        for var in stmt.uses() {
            new_fact.add(var);
        }
        in_fact.copy_from(&new_fact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liveness_through_loop() {
        let program = fw_ir::parse(
            r"
            class Main {
                static method main(int n) : int {
                    var int i, one, dead;
                    i = 0;
                    one = 1;
                    dead = 5;
                L:  i = i + one;
                    if i < n goto L;
                    return i;
                }
            }
            ",
        )
        .unwrap();
        let main = program.find_method("Main", "main").unwrap();
        let var = |name| program.var_by_name(main, name).unwrap();
        let result = LiveVariables::analyze(program.method(main)).unwrap();

        let after_dead = result.out_fact(&CfgNode::Stmt(2)).unwrap();
        assert!(!after_dead.contains(&var("dead")));
        assert!(after_dead.contains(&var("i")));
        assert!(after_dead.contains(&var("one")));
        assert!(after_dead.contains(&var("n")));

        // `one` is still needed at the loop back edge
        let at_if = result.out_fact(&CfgNode::Stmt(4)).unwrap();
        assert!(at_if.contains(&var("one")));
        assert!(result.in_fact(&CfgNode::Entry).unwrap().contains(&var("n")));
        assert!(result.in_fact(&CfgNode::Exit).unwrap().is_empty());
    }
}
