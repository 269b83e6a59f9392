//! Classes hierarchy graph representation.

use fw_ir::{Class, ClassId, MethodId, Program, Subsignature};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Edges go from a type to its direct supertype. Interfaces extending
/// other interfaces are linked with `Extends`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inheritance {
    Extends,
    Implements,
}

impl fmt::Display for Inheritance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Extends => write!(f, "<extends>"),
            Self::Implements => write!(f, "<implements>"),
        }
    }
}

#[derive(Debug)]
pub struct Hierarchy<'p> {
    program: &'p Program,
    inner: DiGraph<&'p Class, Inheritance>,
    node_ids: BTreeMap<ClassId, NodeIndex>,
}

impl<'p> Hierarchy<'p> {
    #[must_use]
    pub fn build(program: &'p Program) -> Self {
        let mut inner = DiGraph::new();
        let mut node_ids = BTreeMap::new();
        for class in program.iter_classes() {
            node_ids.insert(class.id(), inner.add_node(class));
        }
        for class in program.iter_classes() {
            let src = node_ids[&class.id()];
            if let Some(superclass) = class.superclass() {
                inner.add_edge(src, node_ids[&superclass], Inheritance::Extends);
            }
            let link = if class.is_interface() {
                Inheritance::Extends
            } else {
                Inheritance::Implements
            };
            for interface in class.interfaces() {
                inner.add_edge(src, node_ids[interface], link);
            }
        }
        log::debug!(
            "class hierarchy built with {} classes and {} links",
            inner.node_count(),
            inner.edge_count()
        );
        Self {
            program,
            inner,
            node_ids,
        }
    }

    #[inline]
    #[must_use]
    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn iter_classes(&self) -> impl Iterator<Item = &'p Class> + '_ {
        self.inner.node_weights().copied()
    }

    #[inline]
    #[must_use]
    pub fn is_interface(&self, class: ClassId) -> bool {
        self.program.class(class).is_interface()
    }

    #[inline]
    #[must_use]
    pub fn superclass_of(&self, class: ClassId) -> Option<ClassId> {
        self.program.class(class).superclass()
    }

    fn direct_subtypes(
        &self,
        class: ClassId,
        link: Inheritance,
        interfaces: bool,
    ) -> impl Iterator<Item = ClassId> + '_ {
        self.inner
            .edges_directed(self.node_ids[&class], Direction::Incoming)
            .filter(move |edge| *edge.weight() == link)
            .map(|edge| self.inner[edge.source()])
            .filter(move |sub| sub.is_interface() == interfaces)
            .map(Class::id)
    }

    /// Classes whose superclass is `class`.
    #[must_use]
    pub fn direct_subclasses_of(&self, class: ClassId) -> Vec<ClassId> {
        self.direct_subtypes(class, Inheritance::Extends, false)
            .collect()
    }

    /// Interfaces directly extending interface `class`.
    #[must_use]
    pub fn direct_subinterfaces_of(&self, class: ClassId) -> Vec<ClassId> {
        self.direct_subtypes(class, Inheritance::Extends, true)
            .collect()
    }

    /// Classes declaring that they implement interface `class`.
    #[must_use]
    pub fn direct_implementors_of(&self, class: ClassId) -> Vec<ClassId> {
        self.direct_subtypes(class, Inheritance::Implements, false)
            .collect()
    }

    /// All the supertypes of `class`, `class` included.
    #[must_use]
    pub fn ancestors_of(&self, class: ClassId) -> BTreeSet<ClassId> {
        let mut ancestors = BTreeSet::new();
        let mut dfs = Dfs::new(&self.inner, self.node_ids[&class]);
        while let Some(id) = dfs.next(&self.inner) {
            ancestors.insert(self.inner[id].id());
        }
        ancestors
    }

    #[must_use]
    pub fn is_subtype(&self, sub: ClassId, sup: ClassId) -> bool {
        self.ancestors_of(sub).contains(&sup)
    }

    /// Looks up the method that would run when `subsignature` is called on
    /// an object of class `class`: the first concrete declaration found
    /// walking up the superclass chain.
    #[must_use]
    pub fn dispatch(&self, class: ClassId, subsignature: &Subsignature) -> Option<MethodId> {
        let mut current = Some(class);
        while let Some(id) = current {
            let class = self.program.class(id);
            if let Some(method) = class.declared_method(subsignature) {
                if !self.program.method(method).is_abstract() {
                    return Some(method);
                }
            }
            current = class.superclass();
        }
        None
    }

    #[must_use]
    pub fn to_dot(&self) -> String {
        format!(
            "{}",
            Dot::with_attr_getters(
                &self.inner,
                &[Config::EdgeNoLabel],
                &|_, edge| {
                    let style = match edge.weight() {
                        Inheritance::Extends => "solid",
                        Inheritance::Implements => "dashed",
                    };
                    format!("arrowType=empty,style={style}")
                },
                &|_, (_, class)| {
                    let style = if class.is_interface() {
                        "dashed"
                    } else if class.is_abstract() {
                        "dotted"
                    } else {
                        "solid"
                    };
                    format!("shape=box,style={style}")
                }
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: &str = r"
        interface I { abstract method m() : void; }
        interface J extends I { }
        abstract class A implements I { }
        class B extends A { method m() : void { return; } }
        class C extends B { }
        class D implements J { method m() : void { return; } }
        class Main { static method main() : void { return; } }
    ";

    #[test]
    fn subtypes_queries() {
        let program = fw_ir::parse(PROGRAM).unwrap();
        let hierarchy = Hierarchy::build(&program);
        let id = |name| program.class_by_name(name).unwrap();

        assert_eq!(hierarchy.direct_subclasses_of(id("A")), vec![id("B")]);
        assert_eq!(hierarchy.direct_subclasses_of(id("B")), vec![id("C")]);
        assert_eq!(hierarchy.direct_implementors_of(id("I")), vec![id("A")]);
        assert_eq!(hierarchy.direct_implementors_of(id("J")), vec![id("D")]);
        assert_eq!(hierarchy.direct_subinterfaces_of(id("I")), vec![id("J")]);
        assert!(hierarchy.direct_subclasses_of(id("I")).is_empty());
        assert!(hierarchy.is_interface(id("J")));
        assert_eq!(hierarchy.superclass_of(id("C")), Some(id("B")));

        assert!(hierarchy.is_subtype(id("C"), id("I")));
        assert!(hierarchy.is_subtype(id("D"), id("I")));
        assert!(!hierarchy.is_subtype(id("D"), id("A")));
        assert!(hierarchy
            .ancestors_of(id("C"))
            .contains(&id(fw_ir::types::JAVA_LANG_OBJECT)));
    }

    #[test]
    fn dispatch_walks_superclasses() {
        let program = fw_ir::parse(PROGRAM).unwrap();
        let hierarchy = Hierarchy::build(&program);
        let id = |name| program.class_by_name(name).unwrap();
        let m = program.method(program.find_method("B", "m").unwrap());

        assert_eq!(
            hierarchy.dispatch(id("C"), m.subsignature()),
            Some(m.id())
        );
        assert_eq!(hierarchy.dispatch(id("A"), m.subsignature()), None);
        assert_eq!(hierarchy.dispatch(id("I"), m.subsignature()), None);
        assert!(hierarchy.to_dot().contains("style=dashed"));
    }
}
