//! Whole program pointer analysis.
//!
//! The analysis computes the set of abstract objects every pointer may
//! point to, along with the call graph, resolving virtual calls from the
//! objects that actually flow to their receiver. Context sensitivity is
//! selected by a [`ContextSelector`](context::ContextSelector).
//!
//! ```rust
//! use fw_analysis::hierarchy::Hierarchy;
//!
//! let program = fw_ir::parse(
//!     r"
//!     class A { }
//!     class Main {
//!         static method main() : void {
//!             var A a, b;
//!             a = new A;
//!             b = a;
//!             return;
//!         }
//!     }
//!     ",
//! )?;
//! let hierarchy = Hierarchy::build(&program);
//! let result = fw_analysis::pta::analyze_ci(&hierarchy)?;
//! let main = program.entry_methods()[0];
//! let b = program.var_by_name(main, "b").unwrap();
//! assert_eq!(result.points_to_var(b).len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::errors::AnalysisResult;
use crate::hierarchy::Hierarchy;

pub mod context;
pub mod elements;
pub mod heap;
pub mod pfg;
pub mod pts;
mod result;
mod solver;
pub mod worklist;

use context::{ContextInsensitive, ContextSelector};
use heap::AllocationSiteHeapModel;

pub use result::{PointerAnalysisResult, PtaStats};
pub use solver::Solver;

/// Runs the pointer analysis with the allocation site heap model.
pub fn analyze<'p, S: ContextSelector + ?Sized>(
    hierarchy: &Hierarchy<'p>,
    selector: &S,
) -> AnalysisResult<PointerAnalysisResult<'p>> {
    Solver::new(hierarchy, selector, AllocationSiteHeapModel::new()).solve()
}

/// Runs the context insensitive pointer analysis.
pub fn analyze_ci<'p>(hierarchy: &Hierarchy<'p>) -> AnalysisResult<PointerAnalysisResult<'p>> {
    analyze(hierarchy, &ContextInsensitive)
}

#[cfg(test)]
mod tests {
    use super::context::{selector_from_str, KCallSiteSelector, KObjectSelector};
    use super::heap::ObjId;
    use super::pfg::Pointer;
    use super::*;
    use crate::cha::Cha;
    use fw_ir::{Program, StmtRef};
    use std::collections::BTreeSet;

    fn objs_of(program: &Program, result: &PointerAnalysisResult, var: &str) -> BTreeSet<usize> {
        let main = program.find_method("Main", "main").unwrap();
        let var = program.var_by_name(main, var).unwrap();
        result
            .points_to_var(var)
            .into_iter()
            .map(|obj| result.obj(obj).site.index)
            .collect()
    }

    #[test]
    fn assignments_are_flow_edges() {
        let program = fw_ir::parse(
            r"
            class Foo { }
            class Main {
                static method main() : void {
                    var Foo a, b, c, d;
                    a = new Foo;
                    b = a;
                    c = new Foo;
                    b = c;
                    d = b;
                    return;
                }
            }
            ",
        )
        .unwrap();
        let hierarchy = Hierarchy::build(&program);
        let result = analyze_ci(&hierarchy).unwrap();
        assert_eq!(objs_of(&program, &result, "a"), BTreeSet::from([0]));
        assert_eq!(objs_of(&program, &result, "c"), BTreeSet::from([2]));
        // `d` reads the last assignment of `b` only
        assert_eq!(objs_of(&program, &result, "d"), BTreeSet::from([2]));
        assert_eq!(result.stats().objs, 2);
    }

    const SHAPES: &str = r"
        interface Shape { abstract method area() : int; }
        class Square implements Shape {
            method area() : int { var int r; r = 1; return r; }
        }
        class Circle implements Shape {
            method area() : int { var int r; r = 2; return r; }
        }
        class Main {
            static method main() : void {
                var Shape s, t; var int a;
                s = new Square;
                a = invokeinterface s.<Shape: int area()>();
                t = new Circle;
                return;
            }
        }
    ";

    #[test]
    fn dispatch_on_receiver_objects() {
        let program = fw_ir::parse(SHAPES).unwrap();
        let hierarchy = Hierarchy::build(&program);
        let main = program.find_method("Main", "main").unwrap();
        let call = StmtRef::new(main, 1);

        let result = analyze_ci(&hierarchy).unwrap();
        let callees = result.callees_of(call);
        assert_eq!(
            callees,
            BTreeSet::from([program.find_method("Square", "area").unwrap()])
        );

        let cha = Cha::new(&hierarchy);
        let cha_callees = cha.resolve(program.stmt(call).as_invoke().unwrap());
        assert_eq!(cha_callees.len(), 2);
        assert!(callees.len() < cha_callees.len());
        assert!(!result
            .reachable_methods()
            .contains(&program.find_method("Circle", "area").unwrap()));
    }

    #[test]
    fn casts_keep_dispatch_within_cha() {
        let program = fw_ir::parse(
            r"
            class Square {
                method area() : int { var int r; r = 1; return r; }
            }
            class Circle {
                method area() : int { var int r; r = 2; return r; }
            }
            class Main {
                static method main() : void {
                    var java/lang/Object o; var Square s; var int a;
                    o = new Circle;
                    s = (Square) o;
                    a = invokevirtual s.<Square: int area()>();
                    return;
                }
            }
            ",
        )
        .unwrap();
        let hierarchy = Hierarchy::build(&program);
        let main = program.find_method("Main", "main").unwrap();
        let call = StmtRef::new(main, 2);

        let result = analyze_ci(&hierarchy).unwrap();
        // the cast lets the `Circle` object flow to `s`
        assert_eq!(objs_of(&program, &result, "s"), BTreeSet::from([0]));
        let cha_callees = Cha::new(&hierarchy).resolve(program.stmt(call).as_invoke().unwrap());
        assert_eq!(
            cha_callees,
            BTreeSet::from([program.find_method("Square", "area").unwrap()])
        );
        let callees = result.callees_of(call);
        assert!(callees.is_subset(&cha_callees));
        assert!(callees.is_empty());
        assert!(!result
            .reachable_methods()
            .contains(&program.find_method("Circle", "area").unwrap()));
    }

    #[test]
    fn static_fields() {
        let program = fw_ir::parse(
            r"
            class A { static field A g; }
            class Main {
                static method main() : void {
                    var A a, x;
                    a = new A;
                    A::g = a;
                    x = invokestatic <Main: A read()>();
                    return;
                }
                static method read() : A {
                    var A y;
                    y = A::g;
                    return y;
                }
            }
            ",
        )
        .unwrap();
        let hierarchy = Hierarchy::build(&program);
        let result = analyze_ci(&hierarchy).unwrap();
        let g = program.find_field("A", "g").unwrap();
        let read = program.find_method("Main", "read").unwrap();
        let y = program.var_by_name(read, "y").unwrap();

        assert_eq!(result.points_to_static_field(g), BTreeSet::from([ObjId(0)]));
        assert_eq!(result.points_to_var(y), BTreeSet::from([ObjId(0)]));
        assert_eq!(objs_of(&program, &result, "x"), BTreeSet::from([0]));
        assert!(result.points_to(&Pointer::StaticField(g)).is_some());
    }

    #[test]
    fn refines_cha_call_graph() {
        let program = fw_ir::parse(
            r"
            class A {
                field A next;
                method m() : A { var A r; r = this.next; return r; }
            }
            class B extends A {
                method m() : A { var A r; r = new C; return r; }
            }
            class C extends A { }
            class Main {
                static method main() : void {
                    var A x, y, z; var A[] arr; var int i;
                    x = new B;
                    y = invokevirtual x.<A: A m()>();
                    i = 0;
                    arr = new A[];
                    arr[i] = y;
                    z = arr[i];
                    z = invokevirtual z.<A: A m()>();
                    invokestatic <Main: void unknown()>();
                    return;
                }
            }
            ",
        )
        .unwrap();
        let hierarchy = Hierarchy::build(&program);
        let result = analyze_ci(&hierarchy).unwrap();
        let pta = result.ci_call_graph();
        let cha = Cha::new(&hierarchy).build_call_graph().unwrap();
        for site in pta.call_sites() {
            let cha_callees: BTreeSet<_> = cha.callees_of(site).collect();
            for callee in pta.callees_of(site) {
                assert!(cha_callees.contains(&callee));
            }
        }
        assert!(pta.nb_edges() <= cha.nb_edges());
        assert_eq!(pta.entry_methods(), cha.entry_methods());

        // the array element flows to `z`, dispatching on the `C` object
        let main = program.find_method("Main", "main").unwrap();
        let a_m = program.find_method("A", "m").unwrap();
        assert_eq!(
            result.callees_of(StmtRef::new(main, 6)),
            BTreeSet::from([a_m])
        );
        let arr_obj = result
            .objs()
            .find(|obj| obj.site == StmtRef::new(main, 3))
            .unwrap()
            .id;
        assert_eq!(result.points_to_array(arr_obj).len(), 1);
    }

    #[test]
    fn idempotent_pfg_edges() {
        let program = fw_ir::parse(
            r"
            class A { }
            class Main {
                static method main() : void {
                    var A a, b, c; var int i;
                    a = new A;
                    i = 0;
                    if i > i goto L;
                    b = a;
                    goto End;
            L:      b = a;
            End:    c = b;
                    return;
                }
            }
            ",
        )
        .unwrap();
        let hierarchy = Hierarchy::build(&program);
        let mut solver = Solver::new(&hierarchy, &ContextInsensitive, AllocationSiteHeapModel::new());
        solver.initialize().unwrap();
        // both copies to `b` map to the same edge
        assert!(solver.iterate_once());
        assert_eq!(solver.worklist().len(), 1);
        assert_eq!(solver.pfg().nb_edges(), 2);
        while solver.iterate_once() {}
        assert_eq!(solver.pfg().nb_edges(), 2);

        let result = solver.solve().unwrap();
        assert_eq!(objs_of(&program, &result, "b"), BTreeSet::from([0]));
        assert_eq!(objs_of(&program, &result, "c"), BTreeSet::from([0]));
    }

    #[test]
    fn points_to_sets_only_grow() {
        let program = fw_ir::parse(SHAPES).unwrap();
        let hierarchy = Hierarchy::build(&program);
        let selector = KCallSiteSelector::new(1);
        let mut solver = Solver::new(&hierarchy, &selector, AllocationSiteHeapModel::new());
        solver.initialize().unwrap();
        let mut sizes: Vec<usize> = Vec::new();
        while solver.iterate_once() {
            let pfg = solver.pfg();
            for (id, _) in pfg.pointers() {
                let size = pfg.pts(id).len();
                match sizes.get_mut(id.idx()) {
                    Some(previous) => {
                        assert!(*previous <= size);
                        *previous = size;
                    }
                    None => sizes.push(size),
                }
            }
        }
        assert!(sizes.iter().any(|size| *size > 0));
    }

    #[test]
    fn call_site_sensitivity() {
        let program = fw_ir::parse(
            r"
            class A { }
            class B { }
            class Main {
                static method main() : void {
                    var java/lang/Object a, b, x, y;
                    a = new A;
                    b = new B;
                    x = invokestatic <Main: java/lang/Object id(java/lang/Object)>(a);
                    y = invokestatic <Main: java/lang/Object id(java/lang/Object)>(b);
                    return;
                }
                static method id(java/lang/Object o) : java/lang/Object { return o; }
            }
            ",
        )
        .unwrap();
        let hierarchy = Hierarchy::build(&program);

        let ci = analyze_ci(&hierarchy).unwrap();
        assert_eq!(objs_of(&program, &ci, "x"), BTreeSet::from([0, 1]));

        let cs = analyze(&hierarchy, &KCallSiteSelector::new(1)).unwrap();
        assert_eq!(objs_of(&program, &cs, "x"), BTreeSet::from([0]));
        assert_eq!(objs_of(&program, &cs, "y"), BTreeSet::from([1]));
        // `id` is analyzed in two contexts, projected back to one method
        assert_eq!(cs.call_graph().nb_reachable_methods(), 3);
        assert_eq!(cs.reachable_methods().len(), 2);
        assert_eq!(cs.stats().selector, "1-call");
    }

    #[test]
    fn object_sensitivity() {
        let program = fw_ir::parse(
            r"
            class A { }
            class B { }
            class Box {
                field java/lang/Object v;
                method set(java/lang/Object o) : void { this.v = o; return; }
                method get() : java/lang/Object {
                    var java/lang/Object r;
                    r = this.v;
                    return r;
                }
            }
            class Main {
                static method main() : void {
                    var Box b1, b2; var java/lang/Object o1, o2, x, y;
                    b1 = new Box;
                    b2 = new Box;
                    o1 = new A;
                    o2 = new B;
                    invokevirtual b1.<Box: void set(java/lang/Object)>(o1);
                    invokevirtual b2.<Box: void set(java/lang/Object)>(o2);
                    x = invokevirtual b1.<Box: java/lang/Object get()>();
                    y = invokevirtual b2.<Box: java/lang/Object get()>();
                    return;
                }
            }
            ",
        )
        .unwrap();
        let hierarchy = Hierarchy::build(&program);

        let ci = analyze_ci(&hierarchy).unwrap();
        assert_eq!(objs_of(&program, &ci, "x"), BTreeSet::from([2, 3]));

        let selector = selector_from_str("1-obj").unwrap();
        let cs = analyze(&hierarchy, selector.as_ref()).unwrap();
        assert_eq!(objs_of(&program, &cs, "x"), BTreeSet::from([2]));
        assert_eq!(objs_of(&program, &cs, "y"), BTreeSet::from([3]));

        let field = program.find_field("Box", "v").unwrap();
        let first_box = ObjId(0);
        assert_eq!(cs.obj(first_box).site.index, 0);
        assert_eq!(cs.points_to_instance_field(first_box, field).len(), 1);
        assert!(cs.points_to(&Pointer::StaticField(field)).is_none());

        let two_obj = analyze(&hierarchy, &KObjectSelector::new(2)).unwrap();
        assert_eq!(objs_of(&program, &two_obj, "x"), BTreeSet::from([2]));
    }
}
