//! Class hierarchy analysis: call resolution from declared types only.

use crate::callgraph::{CallGraph, Edge};
use crate::errors::{AnalysisError, AnalysisResult};
use crate::hierarchy::Hierarchy;
use fw_ir::{CallKind, Invoke, MethodId, StmtRef};
use std::collections::{BTreeSet, VecDeque};

pub struct Cha<'h, 'p> {
    hierarchy: &'h Hierarchy<'p>,
}

impl<'h, 'p> Cha<'h, 'p> {
    #[must_use]
    pub fn new(hierarchy: &'h Hierarchy<'p>) -> Self {
        Self { hierarchy }
    }

    /// The methods a call may invoke.
    ///
    /// Static and special calls dispatch on the declaring class. Virtual
    /// and interface calls may reach the dispatch target of any subtype of
    /// the declaring type. An empty result means that the call cannot be
    /// resolved.
    #[must_use]
    pub fn resolve(&self, invoke: &Invoke) -> BTreeSet<MethodId> {
        let class = invoke.method_ref.class;
        let subsignature = &invoke.method_ref.subsignature;
        match invoke.kind {
            CallKind::Static | CallKind::Special => self
                .hierarchy
                .dispatch(class, subsignature)
                .into_iter()
                .collect(),
            CallKind::Virtual | CallKind::Interface => {
                let mut targets = BTreeSet::new();
                let mut visited = BTreeSet::new();
                let mut stack = vec![class];
                while let Some(class) = stack.pop() {
                    if !visited.insert(class) {
                        continue;
                    }
                    if let Some(target) = self.hierarchy.dispatch(class, subsignature) {
                        targets.insert(target);
                    }
                    if self.hierarchy.is_interface(class) {
                        stack.extend(self.hierarchy.direct_implementors_of(class));
                        stack.extend(self.hierarchy.direct_subinterfaces_of(class));
                    } else {
                        stack.extend(self.hierarchy.direct_subclasses_of(class));
                    }
                }
                targets
            }
        }
    }

    /// Builds the call graph of the methods reachable from the program
    /// entry methods.
    pub fn build_call_graph(&self) -> AnalysisResult<CallGraph<StmtRef>> {
        let program = self.hierarchy.program();
        if program.entry_methods().is_empty() {
            return Err(AnalysisError::NoEntryMethod);
        }

        let mut call_graph = CallGraph::new();
        let mut worklist = VecDeque::new();
        for entry in program.entry_methods() {
            call_graph.add_entry_method(*entry);
            worklist.push_back(*entry);
        }
        while let Some(method) = worklist.pop_front() {
            if !call_graph.add_reachable_method(method) {
                continue;
            }
            for site in program.method(method).iter_stmt_refs() {
                let Some(invoke) = program.stmt(site).as_invoke() else {
                    continue;
                };
                let callees = self.resolve(invoke);
                if callees.is_empty() {
                    log::trace!("unresolved call at {site}");
                }
                for callee in callees {
                    call_graph.add_edge(Edge {
                        kind: invoke.kind,
                        call_site: site,
                        callee,
                    });
                    if !call_graph.contains(callee) {
                        worklist.push_back(callee);
                    }
                }
            }
        }
        log::debug!(
            "CHA call graph: {} reachable methods, {} edges",
            call_graph.nb_reachable_methods(),
            call_graph.nb_edges()
        );
        Ok(call_graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: &str = r"
        interface Shape { abstract method area() : int; }
        interface Polygon extends Shape { }
        class Square implements Polygon {
            method area() : int { var int r; r = 1; return r; }
        }
        class BigSquare extends Square { }
        class Circle implements Shape {
            method area() : int { var int r; r = 2; return r; }
        }
        class Main {
            static method main() : void {
                var Shape s; var Square q; var int a;
                s = new Circle;
                a = invokeinterface s.<Shape: int area()>();
                q = new BigSquare;
                a = invokevirtual q.<Square: int area()>();
                a = invokestatic <Main: int unknown()>();
                return;
            }
        }
    ";

    #[test]
    fn resolution() {
        let program = fw_ir::parse(PROGRAM).unwrap();
        let hierarchy = Hierarchy::build(&program);
        let cha = Cha::new(&hierarchy);
        let main = program.find_method("Main", "main").unwrap();
        let square_area = program.find_method("Square", "area").unwrap();
        let circle_area = program.find_method("Circle", "area").unwrap();

        let invoke = |index| program.method(main).stmt(index).as_invoke().unwrap();
        assert_eq!(
            cha.resolve(invoke(1)),
            BTreeSet::from([square_area, circle_area])
        );
        assert_eq!(cha.resolve(invoke(3)), BTreeSet::from([square_area]));
        assert!(cha.resolve(invoke(4)).is_empty());
    }

    #[test]
    fn call_graph_reachability() {
        let program = fw_ir::parse(
            r"
            class A { method m() : void { invokestatic <Main: void helper()>(); return; } }
            class B extends A { method m() : void { return; } }
            class Main {
                static method main() : void {
                    var A a;
                    a = new A;
                    invokevirtual a.<A: void m()>();
                    return;
                }
                static method helper() : void { return; }
                static method never() : void { return; }
            }
            ",
        )
        .unwrap();
        let hierarchy = Hierarchy::build(&program);
        let cg = Cha::new(&hierarchy).build_call_graph().unwrap();
        let reachable: BTreeSet<_> = cg.reachable_methods().collect();
        assert!(reachable.contains(&program.find_method("A", "m").unwrap()));
        assert!(reachable.contains(&program.find_method("B", "m").unwrap()));
        assert!(reachable.contains(&program.find_method("Main", "helper").unwrap()));
        assert!(!reachable.contains(&program.find_method("Main", "never").unwrap()));
        assert_eq!(cg.nb_edges(), 3);
    }

    #[test]
    fn no_entry_method() {
        let program = fw_ir::parse("class A { static method run() : void { return; } }").unwrap();
        let hierarchy = Hierarchy::build(&program);
        assert!(matches!(
            Cha::new(&hierarchy).build_call_graph(),
            Err(AnalysisError::NoEntryMethod)
        ));
    }
}
