use crate::callgraph::{CallGraph, Edge};
use crate::pta::context::Contexts;
use crate::pta::elements::{CsCallSite, CsManager, CsObj, CsObjId};
use crate::pta::heap::{Obj, ObjId};
use crate::pta::pfg::{Pointer, PointerFlowGraph};
use crate::pta::pts::PointsToSet;
use fw_ir::{FieldId, MethodId, Program, StmtRef, VarId};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize)]
pub struct PtaStats {
    pub selector: String,
    pub iterations: usize,
    pub contexts: usize,
    pub objs: usize,
    pub cs_objs: usize,
    pub pointers: usize,
    pub pfg_edges: usize,
    pub cs_methods: usize,
    pub cs_call_edges: usize,
}

/// Pointer analysis result, queryable with or without contexts.
pub struct PointerAnalysisResult<'p> {
    program: &'p Program,
    contexts: Contexts,
    cs_manager: CsManager,
    objs: Vec<Obj>,
    pfg: PointerFlowGraph,
    call_graph: CallGraph<CsCallSite>,
    stats: PtaStats,
}

impl<'p> PointerAnalysisResult<'p> {
    pub(crate) fn new(
        program: &'p Program,
        contexts: Contexts,
        cs_manager: CsManager,
        objs: Vec<Obj>,
        pfg: PointerFlowGraph,
        call_graph: CallGraph<CsCallSite>,
        stats: PtaStats,
    ) -> Self {
        Self {
            program,
            contexts,
            cs_manager,
            objs,
            pfg,
            call_graph,
            stats,
        }
    }

    #[inline]
    #[must_use]
    pub fn program(&self) -> &'p Program {
        self.program
    }

    #[must_use]
    pub fn contexts(&self) -> &Contexts {
        &self.contexts
    }

    #[must_use]
    pub fn pfg(&self) -> &PointerFlowGraph {
        &self.pfg
    }

    /// The context sensitive call graph.
    #[must_use]
    pub fn call_graph(&self) -> &CallGraph<CsCallSite> {
        &self.call_graph
    }

    /// The call graph with contexts dropped.
    #[must_use]
    pub fn ci_call_graph(&self) -> CallGraph<StmtRef> {
        let mut call_graph = CallGraph::new();
        for method in self.call_graph.entry_methods() {
            call_graph.add_entry_method(method.method);
        }
        for method in self.call_graph.reachable_methods() {
            call_graph.add_reachable_method(method.method);
        }
        for edge in self.call_graph.edges() {
            call_graph.add_edge(Edge {
                kind: edge.kind,
                call_site: edge.call_site.site,
                callee: edge.callee.method,
            });
        }
        call_graph
    }

    #[must_use]
    pub fn callees_of(&self, site: StmtRef) -> BTreeSet<MethodId> {
        self.call_graph
            .edges()
            .filter(|edge| edge.call_site.site == site)
            .map(|edge| edge.callee.method)
            .collect()
    }

    #[must_use]
    pub fn reachable_methods(&self) -> BTreeSet<MethodId> {
        self.call_graph
            .reachable_methods()
            .map(|method| method.method)
            .collect()
    }

    #[must_use]
    pub fn obj(&self, id: ObjId) -> &Obj {
        &self.objs[id.idx()]
    }

    pub fn objs(&self) -> impl Iterator<Item = &Obj> {
        self.objs.iter()
    }

    #[must_use]
    pub fn cs_obj(&self, id: CsObjId) -> &CsObj {
        self.cs_manager.cs_obj(id)
    }

    /// The context sensitive points-to set of `pointer`.
    #[must_use]
    pub fn points_to(&self, pointer: &Pointer) -> Option<&PointsToSet> {
        self.pfg.find(pointer).map(|id| self.pfg.pts(id))
    }

    fn project<'r>(&self, sets: impl Iterator<Item = &'r PointsToSet>) -> BTreeSet<ObjId> {
        sets.flat_map(|pts| pts.iter())
            .map(|obj| self.cs_manager.cs_obj(obj).obj)
            .collect()
    }

    /// The objects `var` may point to, in any context.
    #[must_use]
    pub fn points_to_var(&self, var: VarId) -> BTreeSet<ObjId> {
        self.project(self.pfg.var_pointers(var).map(|id| self.pfg.pts(id)))
    }

    #[must_use]
    pub fn points_to_static_field(&self, field: FieldId) -> BTreeSet<ObjId> {
        self.project(self.points_to(&Pointer::StaticField(field)).into_iter())
    }

    /// The objects the field `field` of `base` may point to, in any heap
    /// context of `base`.
    #[must_use]
    pub fn points_to_instance_field(&self, base: ObjId, field: FieldId) -> BTreeSet<ObjId> {
        self.project(self.pfg.pointers().filter_map(|(id, pointer)| match pointer {
            Pointer::InstanceField {
                base: cs_base,
                field: f,
            } if f == field && self.cs_manager.cs_obj(cs_base).obj == base => {
                Some(self.pfg.pts(id))
            }
            _ => None,
        }))
    }

    /// The objects the elements of the array `base` may point to.
    #[must_use]
    pub fn points_to_array(&self, base: ObjId) -> BTreeSet<ObjId> {
        self.project(self.pfg.pointers().filter_map(|(id, pointer)| match pointer {
            Pointer::ArrayIndex(cs_base) if self.cs_manager.cs_obj(cs_base).obj == base => {
                Some(self.pfg.pts(id))
            }
            _ => None,
        }))
    }

    #[must_use]
    pub fn stats(&self) -> &PtaStats {
        &self.stats
    }
}
