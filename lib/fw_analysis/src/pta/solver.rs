//! Points-to analysis solver, building the call graph on the fly.
//!
//! Methods become reachable as call edges are discovered, and call edges
//! are discovered as receiver objects flow to call sites: both grow
//! together through a single worklist.

use crate::callgraph::{CallGraph, Edge};
use crate::errors::{AnalysisError, AnalysisResult};
use crate::hierarchy::Hierarchy;
use crate::pta::context::{Context, ContextSelector, Contexts};
use crate::pta::elements::{CsCallSite, CsManager, CsMethod, CsObjId};
use crate::pta::heap::{HeapModel, ObjId};
use crate::pta::pfg::{Pointer, PointerFlowGraph, PointerId};
use crate::pta::pts::PointsToSet;
use crate::pta::result::{PointerAnalysisResult, PtaStats};
use crate::pta::worklist::{WorkItem, WorkList};
use fw_ir::types::JAVA_LANG_OBJECT;
use fw_ir::{CallKind, ClassId, FieldId, Invoke, Program, Stmt, StmtRef, StmtVisitor, Type, VarId};

pub struct Solver<'a, 'p, S: ContextSelector + ?Sized, H: HeapModel> {
    program: &'p Program,
    hierarchy: &'a Hierarchy<'p>,
    selector: &'a S,
    heap: H,
    contexts: Contexts,
    cs_manager: CsManager,
    pfg: PointerFlowGraph,
    worklist: WorkList,
    call_graph: CallGraph<CsCallSite>,
    iterations: usize,
}

impl<'a, 'p, S: ContextSelector + ?Sized, H: HeapModel> Solver<'a, 'p, S, H> {
    #[must_use]
    pub fn new(hierarchy: &'a Hierarchy<'p>, selector: &'a S, heap: H) -> Self {
        Self {
            program: hierarchy.program(),
            hierarchy,
            selector,
            heap,
            contexts: Contexts::new(),
            cs_manager: CsManager::new(),
            pfg: PointerFlowGraph::new(),
            worklist: WorkList::new(),
            call_graph: CallGraph::new(),
            iterations: 0,
        }
    }

    /// Schedules the entry methods of the program, in the empty context.
    pub fn initialize(&mut self) -> AnalysisResult<()> {
        let entries = self.program.entry_methods();
        if entries.is_empty() {
            return Err(AnalysisError::NoEntryMethod);
        }
        let ctx = self.selector.empty_context(&self.contexts);
        for method in entries {
            let method = CsMethod {
                ctx,
                method: *method,
            };
            self.call_graph.add_entry_method(method);
            self.worklist.add_method(method);
        }
        Ok(())
    }

    /// Processes one worklist entry, returning `false` once the worklist
    /// is empty.
    pub fn iterate_once(&mut self) -> bool {
        let Some(item) = self.worklist.pop() else {
            return false;
        };
        self.iterations += 1;
        match item {
            WorkItem::Method(method) => self.add_reachable(method),
            WorkItem::Points(pointer, pts) => {
                let delta = self.propagate(pointer, &pts);
                if let Pointer::Var { var, ctx } = self.pfg.pointer(pointer) {
                    for obj in delta.iter() {
                        self.process_instance_accesses(ctx, var, obj);
                        self.process_call(ctx, var, obj);
                    }
                }
            }
        }
        true
    }

    /// Runs the analysis to fixpoint.
    pub fn solve(mut self) -> AnalysisResult<PointerAnalysisResult<'p>> {
        self.initialize()?;
        while self.iterate_once() {}
        log::debug!(
            "{} pointer analysis reached fixpoint after {} iterations: {} reachable methods, {} pointers, {} PFG edges",
            self.selector.name(),
            self.iterations,
            self.call_graph.nb_reachable_methods(),
            self.pfg.nb_pointers(),
            self.pfg.nb_edges()
        );
        Ok(self.finish())
    }

    #[must_use]
    pub fn pfg(&self) -> &PointerFlowGraph {
        &self.pfg
    }

    #[must_use]
    pub fn worklist(&self) -> &WorkList {
        &self.worklist
    }

    #[must_use]
    pub fn call_graph(&self) -> &CallGraph<CsCallSite> {
        &self.call_graph
    }

    fn finish(self) -> PointerAnalysisResult<'p> {
        let objs = (0..self.heap.nb_objs())
            .map(|index| self.heap.obj(ObjId(index)).clone())
            .collect();
        let stats = PtaStats {
            selector: self.selector.name(),
            iterations: self.iterations,
            contexts: self.contexts.len(),
            objs: self.heap.nb_objs(),
            cs_objs: self.cs_manager.nb_cs_objs(),
            pointers: self.pfg.nb_pointers(),
            pfg_edges: self.pfg.nb_edges(),
            cs_methods: self.call_graph.nb_reachable_methods(),
            cs_call_edges: self.call_graph.nb_edges(),
        };
        PointerAnalysisResult::new(
            self.program,
            self.contexts,
            self.cs_manager,
            objs,
            self.pfg,
            self.call_graph,
            stats,
        )
    }

    fn var_pointer(&mut self, ctx: Context, var: VarId) -> PointerId {
        self.pfg.get_pointer(Pointer::Var { var, ctx })
    }

    fn is_reference(&self, var: VarId) -> bool {
        self.program.var(var).ty().is_reference()
    }

    /// Makes `method` reachable and processes its statements the first
    /// time only.
    fn add_reachable(&mut self, method: CsMethod) {
        if !self.call_graph.add_reachable_method(method) {
            return;
        }
        log::trace!(
            "reachable: {} in {}",
            self.program.method_signature(method.method),
            self.contexts.display(method.ctx)
        );
        let program = self.program;
        for site in program.method(method.method).iter_stmt_refs() {
            program.stmt(site).accept(&mut StmtProcessor {
                solver: &mut *self,
                method,
                site,
            });
        }
    }

    /// Adds a PFG edge, flowing the objects already known by `src` into
    /// `dst` when the edge is new.
    fn add_pfg_edge(&mut self, src: PointerId, dst: PointerId) {
        if self.pfg.add_edge(src, dst) {
            let pts = self.pfg.pts(src);
            if !pts.is_empty() {
                self.worklist.add_points(dst, pts.clone());
            }
        }
    }

    /// Adds the objects of `pts` to `pointer`, and schedules the new ones
    /// for its successors. Returns the new objects.
    fn propagate(&mut self, pointer: PointerId, pts: &PointsToSet) -> PointsToSet {
        let delta = self.pfg.pts(pointer).diff(pts);
        if !delta.is_empty() {
            self.pfg.pts_mut(pointer).add_all(&delta);
            for succ in self.pfg.succs_of(pointer).to_vec() {
                self.worklist.add_points(succ, delta.clone());
            }
        }
        delta
    }

    // field and array accesses through `var`, with `obj` as base
    fn process_instance_accesses(&mut self, ctx: Context, var: VarId, obj: CsObjId) {
        let program = self.program;
        let var_data = program.var(var);
        for site in var_data.store_fields() {
            if let Stmt::StoreField { field, rvalue, .. } = program.stmt(*site) {
                if self.is_reference(*rvalue) {
                    let src = self.var_pointer(ctx, *rvalue);
                    let dst = self.field_pointer(obj, *field);
                    self.add_pfg_edge(src, dst);
                }
            }
        }
        for site in var_data.load_fields() {
            if let Stmt::LoadField { lvalue, field, .. } = program.stmt(*site) {
                if self.is_reference(*lvalue) {
                    let src = self.field_pointer(obj, *field);
                    let dst = self.var_pointer(ctx, *lvalue);
                    self.add_pfg_edge(src, dst);
                }
            }
        }
        for site in var_data.store_arrays() {
            if let Stmt::StoreArray { rvalue, .. } = program.stmt(*site) {
                if self.is_reference(*rvalue) {
                    let src = self.var_pointer(ctx, *rvalue);
                    let dst = self.pfg.get_pointer(Pointer::ArrayIndex(obj));
                    self.add_pfg_edge(src, dst);
                }
            }
        }
        for site in var_data.load_arrays() {
            if let Stmt::LoadArray { lvalue, .. } = program.stmt(*site) {
                if self.is_reference(*lvalue) {
                    let src = self.pfg.get_pointer(Pointer::ArrayIndex(obj));
                    let dst = self.var_pointer(ctx, *lvalue);
                    self.add_pfg_edge(src, dst);
                }
            }
        }
    }

    fn field_pointer(&mut self, base: CsObjId, field: FieldId) -> PointerId {
        self.pfg.get_pointer(Pointer::InstanceField { base, field })
    }

    // class on which calls on `obj` dispatch
    fn class_of(&self, obj: CsObjId) -> Option<ClassId> {
        let obj = self.heap.obj(self.cs_manager.cs_obj(obj).obj);
        match &obj.ty {
            Type::Class(name) => self.program.class_by_name(name),
            Type::Array(_) => self.program.class_by_name(JAVA_LANG_OBJECT),
            _ => None,
        }
    }

    /// Resolves the instance calls on `var` for the new receiver `recv`.
    ///
    /// Virtual and interface calls dispatch on the class of `recv`, and are
    /// left unresolved when that class is not a subtype of the declaring
    /// class of the called method.
    fn process_call(&mut self, ctx: Context, var: VarId, recv: CsObjId) {
        let program = self.program;
        for site in program.var(var).invokes() {
            let Some(invoke) = program.stmt(*site).as_invoke() else {
                continue;
            };
            let declaring = invoke.method_ref.class;
            let subsignature = &invoke.method_ref.subsignature;
            let callee = match invoke.kind {
                CallKind::Special => self.hierarchy.dispatch(declaring, subsignature),
                _ => self
                    .class_of(recv)
                    .filter(|class| self.hierarchy.is_subtype(*class, declaring))
                    .and_then(|class| self.hierarchy.dispatch(class, subsignature)),
            };
            let Some(callee) = callee else {
                log::trace!("unresolved call at {site} on {recv:?}");
                continue;
            };

            let call_site = CsCallSite { ctx, site: *site };
            let recv_obj = *self.cs_manager.cs_obj(recv);
            let callee_ctx =
                self.selector
                    .select_context(&mut self.contexts, &call_site, Some(&recv_obj), callee);
            if let Some(this) = program.method(callee).this() {
                let this = self.var_pointer(callee_ctx, this);
                self.worklist.add_points(this, PointsToSet::singleton(recv));
            }
            self.add_call_edge(
                invoke,
                call_site,
                CsMethod {
                    ctx: callee_ctx,
                    method: callee,
                },
            );
        }
    }

    fn process_static_call(&mut self, invoke: &Invoke, call_site: CsCallSite) {
        let Some(callee) = self
            .hierarchy
            .dispatch(invoke.method_ref.class, &invoke.method_ref.subsignature)
        else {
            log::trace!("unresolved static call at {}", call_site.site);
            return;
        };
        let ctx = self
            .selector
            .select_context(&mut self.contexts, &call_site, None, callee);
        self.add_call_edge(invoke, call_site, CsMethod { ctx, method: callee });
    }

    /// Links arguments to parameters and returned values to the call
    /// result, the first time the edge is seen.
    fn add_call_edge(&mut self, invoke: &Invoke, call_site: CsCallSite, callee: CsMethod) {
        let edge = Edge {
            kind: invoke.kind,
            call_site,
            callee,
        };
        if !self.call_graph.add_edge(edge) {
            return;
        }
        self.worklist.add_method(callee);

        let method = self.program.method(callee.method);
        for (arg, param) in invoke.args.iter().zip(method.params()) {
            if self.is_reference(*param) {
                let src = self.var_pointer(call_site.ctx, *arg);
                let dst = self.var_pointer(callee.ctx, *param);
                self.add_pfg_edge(src, dst);
            }
        }
        if let Some(result) = invoke.result {
            if self.is_reference(result) {
                let dst = self.var_pointer(call_site.ctx, result);
                for ret in method.ret_vars() {
                    let src = self.var_pointer(callee.ctx, *ret);
                    self.add_pfg_edge(src, dst);
                }
            }
        }
    }
}

/// Statement handlers run once per reachable method.
///
/// Only allocations, copies, static field accesses and static calls are
/// handled here: instance accesses and calls depend on the objects their
/// base variable points to, and are processed as these objects arrive.
struct StmtProcessor<'s, 'a, 'p, S: ContextSelector + ?Sized, H: HeapModel> {
    solver: &'s mut Solver<'a, 'p, S, H>,
    method: CsMethod,
    site: StmtRef,
}

impl<'s, 'a, 'p, S: ContextSelector + ?Sized, H: HeapModel> StmtProcessor<'s, 'a, 'p, S, H> {
    fn copy(&mut self, lvalue: VarId, rvalue: VarId) {
        if self.solver.is_reference(lvalue) {
            let src = self.solver.var_pointer(self.method.ctx, rvalue);
            let dst = self.solver.var_pointer(self.method.ctx, lvalue);
            self.solver.add_pfg_edge(src, dst);
        }
    }
}

impl<'s, 'a, 'p, S: ContextSelector + ?Sized, H: HeapModel> StmtVisitor
    for StmtProcessor<'s, 'a, 'p, S, H>
{
    fn visit_new(&mut self, lvalue: VarId, ty: &Type) {
        let solver = &mut *self.solver;
        let obj = solver.heap.get_obj(self.site, ty);
        let heap_ctx = solver
            .selector
            .select_heap_context(&mut solver.contexts, &self.method, obj);
        let cs_obj = solver.cs_manager.get_cs_obj(heap_ctx, obj);
        let pointer = solver.var_pointer(self.method.ctx, lvalue);
        solver
            .worklist
            .add_points(pointer, PointsToSet::singleton(cs_obj));
    }

    fn visit_copy(&mut self, lvalue: VarId, rvalue: VarId) {
        self.copy(lvalue, rvalue);
    }

    fn visit_cast(&mut self, lvalue: VarId, _ty: &Type, rvalue: VarId) {
        self.copy(lvalue, rvalue);
    }

    fn visit_load_field(&mut self, lvalue: VarId, base: Option<VarId>, field: FieldId) {
        if base.is_none() && self.solver.is_reference(lvalue) {
            let src = self.solver.pfg.get_pointer(Pointer::StaticField(field));
            let dst = self.solver.var_pointer(self.method.ctx, lvalue);
            self.solver.add_pfg_edge(src, dst);
        }
    }

    fn visit_store_field(&mut self, base: Option<VarId>, field: FieldId, rvalue: VarId) {
        if base.is_none() && self.solver.is_reference(rvalue) {
            let src = self.solver.var_pointer(self.method.ctx, rvalue);
            let dst = self.solver.pfg.get_pointer(Pointer::StaticField(field));
            self.solver.add_pfg_edge(src, dst);
        }
    }

    fn visit_invoke(&mut self, invoke: &Invoke) {
        if invoke.is_static() {
            let call_site = CsCallSite {
                ctx: self.method.ctx,
                site: self.site,
            };
            self.solver.process_static_call(invoke, call_site);
        }
    }
}
