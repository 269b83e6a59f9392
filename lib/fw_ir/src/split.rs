//! Local variables splitting.
//!
//! A variable assigned at several places is split into one variable per
//! web of definitions: two definitions belong to the same web when they
//! both reach a common use. After splitting, `b = a; ...; b = c;` defines
//! two distinct variables unless some use of `b` may observe both values.

use crate::ids::{MethodId, VarId};
use crate::program::{Program, Var};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum DefSite {
    Entry,
    Stmt(usize),
}

type Def = (VarId, DefSite);

struct UnionFind {
    parents: BTreeMap<Def, Def>,
}

impl UnionFind {
    fn find(&mut self, def: Def) -> Def {
        let parent = *self.parents.entry(def).or_insert(def);
        if parent == def {
            return def;
        }
        let root = self.find(parent);
        self.parents.insert(def, root);
        root
    }

    fn union(&mut self, a: Def, b: Def) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            // smallest definition is the representative
            let (root, child) = if a < b { (a, b) } else { (b, a) };
            self.parents.insert(child, root);
        }
    }
}

fn reaching_definitions(program: &Program, method: MethodId) -> Vec<BTreeSet<Def>> {
    let method = program.method(method);
    let stmts = method.stmts();
    let mut ins: Vec<BTreeSet<Def>> = vec![BTreeSet::new(); stmts.len()];
    if stmts.is_empty() {
        return ins;
    }
    ins[0] = method
        .this()
        .iter()
        .chain(method.params())
        .map(|var| (*var, DefSite::Entry))
        .collect();

    let mut worklist: VecDeque<usize> = (0..stmts.len()).collect();
    while let Some(index) = worklist.pop_front() {
        let stmt = &stmts[index];
        let mut out = ins[index].clone();
        if let Some(var) = stmt.def() {
            out.retain(|(v, _)| *v != var);
            out.insert((var, DefSite::Stmt(index)));
        }
        for succ in stmt.successors(index, stmts.len()) {
            let before = ins[succ].len();
            ins[succ].extend(out.iter().copied());
            if ins[succ].len() != before && !worklist.contains(&succ) {
                worklist.push_back(succ);
            }
        }
    }
    ins
}

pub(crate) fn split_locals(program: &mut Program, method: MethodId) {
    let reaching = reaching_definitions(program, method);
    let stmts = program.method(method).stmts();

    let mut webs = UnionFind {
        parents: BTreeMap::new(),
    };
    let entry_defs = program.method(method).this().into_iter();
    for var in entry_defs.chain(program.method(method).params().iter().copied()) {
        webs.find((var, DefSite::Entry));
    }
    for (index, stmt) in stmts.iter().enumerate() {
        if let Some(var) = stmt.def() {
            webs.find((var, DefSite::Stmt(index)));
        }
        for var in stmt.uses() {
            let mut defs = reaching[index].iter().filter(|(v, _)| *v == var);
            if let Some(first) = defs.next() {
                webs.find(*first);
                for def in defs {
                    webs.union(*first, *def);
                }
            }
        }
    }

    // one variable per web, the web containing the smallest definition
    // keeps the original variable
    let defs: Vec<Def> = webs.parents.keys().copied().collect();
    let mut roots: BTreeMap<VarId, BTreeSet<Def>> = BTreeMap::new();
    for def in defs {
        let root = webs.find(def);
        roots.entry(def.0).or_default().insert(root);
    }
    let mut renaming: BTreeMap<Def, VarId> = BTreeMap::new();
    for (var, var_roots) in roots {
        for (i, root) in var_roots.into_iter().enumerate() {
            let new_var = if i == 0 {
                var
            } else {
                let id = VarId(program.vars.len());
                let orig = program.var(var);
                let name = format!("{}#{i}", orig.name());
                log::trace!("splitting variable {} into {name}", orig.name());
                let ty = orig.ty().clone();
                program.vars.push(Var::new(id, method, &name, ty));
                program.methods[method.0].vars.push(id);
                id
            };
            renaming.insert(root, new_var);
        }
    }

    let mut stmts = std::mem::take(&mut program.methods[method.0].stmts);
    for (index, stmt) in stmts.iter_mut().enumerate() {
        let mut use_renaming = BTreeMap::new();
        for var in stmt.uses() {
            if let Some(def) = reaching[index].iter().find(|(v, _)| *v == var) {
                if let Some(new_var) = renaming.get(&webs.find(*def)) {
                    use_renaming.insert(var, *new_var);
                }
            }
        }
        let def_var = stmt
            .def()
            .and_then(|var| renaming.get(&webs.find((var, DefSite::Stmt(index)))))
            .copied();
        stmt.rename_vars(
            |var| def_var.unwrap_or(var),
            |var| use_renaming.get(&var).copied().unwrap_or(var),
        );
    }
    program.methods[method.0].stmts = stmts;
}

#[cfg(test)]
mod tests {
    use crate::parse;
    use crate::stmts::Stmt;

    #[test]
    fn split_reassigned_variable() {
        let program = parse(
            r"
            class Foo {}
            class Main {
                static method main() : void {
                    var Foo a, b, c;
                    a = new Foo;
                    b = a;
                    c = new Foo;
                    b = c;
                    return;
                }
            }
            ",
        )
        .unwrap();
        let main = program.method(program.find_method("Main", "main").unwrap());
        let first = main.stmt(1).def().unwrap();
        let second = main.stmt(3).def().unwrap();
        assert_ne!(first, second);
        assert_eq!(program.var(first).name(), "b");
        assert_eq!(program.var(second).name(), "b#1");
    }

    #[test]
    fn loop_variable_is_kept() {
        let program = parse(
            r"
            class Main {
                static method main() : void {
                    var int i, one, n;
                    i = 0;
                    one = 1;
                    n = 10;
                L:  i = i + one;
                    if i < n goto L;
                    return;
                }
            }
            ",
        )
        .unwrap();
        let main = program.method(program.find_method("Main", "main").unwrap());
        let i = program.var_by_name(main.id(), "i").unwrap();
        assert_eq!(main.stmt(0).def(), Some(i));
        assert_eq!(main.stmt(3).def(), Some(i));
        assert!(matches!(main.stmt(4), Stmt::If { cond, .. } if cond.left == i));
        assert_eq!(main.vars().len(), 3);
    }

    #[test]
    fn parameters_keep_their_variable() {
        let program = parse(
            r"
            class Main {
                static method f(int p) : int {
                    var int q;
                    q = p;
                    p = q;
                    return p;
                }
            }
            ",
        )
        .unwrap();
        let f = program.method(program.find_method("Main", "f").unwrap());
        let p = f.params()[0];
        assert!(matches!(f.stmt(0), Stmt::Copy { rvalue, .. } if *rvalue == p));
        let redefined = f.stmt(1).def().unwrap();
        assert_ne!(redefined, p);
        assert_eq!(f.ret_vars(), &[redefined]);
    }
}
