//! Calling contexts and context sensitivity policies.
//!
//! Contexts are interned in a [`Contexts`] arena and manipulated through
//! [`Context`] handles, so that context qualified elements stay `Copy` and
//! are compared in constant time.

use crate::errors::{AnalysisError, AnalysisResult};
use crate::pta::elements::{CsCallSite, CsMethod, CsObj};
use crate::pta::heap::ObjId;
use fw_ir::{MethodId, StmtRef};
use std::collections::BTreeMap;

/// Handle of an interned context, `Context::default()` being the empty one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Context(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContextElem {
    CallSite(StmtRef),
    Obj(ObjId),
}

#[derive(Debug)]
pub struct Contexts {
    elems: Vec<Vec<ContextElem>>,
    ids: BTreeMap<Vec<ContextElem>, Context>,
}

impl Default for Contexts {
    fn default() -> Self {
        let mut ids = BTreeMap::new();
        ids.insert(Vec::new(), Context(0));
        Self {
            elems: vec![Vec::new()],
            ids,
        }
    }
}

impl Contexts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn empty(&self) -> Context {
        Context(0)
    }

    /// Elements of a context, oldest first.
    #[must_use]
    pub fn get(&self, ctx: Context) -> &[ContextElem] {
        &self.elems[ctx.0]
    }

    fn intern(&mut self, elems: Vec<ContextElem>) -> Context {
        if let Some(ctx) = self.ids.get(&elems) {
            return *ctx;
        }
        let ctx = Context(self.elems.len());
        self.elems.push(elems.clone());
        self.ids.insert(elems, ctx);
        ctx
    }

    /// Pushes `elem` on top of `ctx`, keeping the `limit` most recent
    /// elements.
    pub fn append(&mut self, ctx: Context, elem: ContextElem, limit: usize) -> Context {
        let mut elems = self.get(ctx).to_vec();
        elems.push(elem);
        let skip = elems.len().saturating_sub(limit);
        self.intern(elems.split_off(skip))
    }

    /// Keeps the `limit` most recent elements of `ctx`.
    pub fn truncate(&mut self, ctx: Context, limit: usize) -> Context {
        let elems = self.get(ctx);
        if elems.len() <= limit {
            return ctx;
        }
        let kept = elems[elems.len() - limit..].to_vec();
        self.intern(kept)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    #[must_use]
    pub fn display(&self, ctx: Context) -> String {
        let elems: Vec<String> = self
            .get(ctx)
            .iter()
            .map(|elem| match elem {
                ContextElem::CallSite(site) => site.to_string(),
                ContextElem::Obj(obj) => obj.to_string(),
            })
            .collect();
        format!("[{}]", elems.join(", "))
    }
}

/// Context sensitivity policy of the pointer analysis.
pub trait ContextSelector {
    fn name(&self) -> String;

    fn empty_context(&self, contexts: &Contexts) -> Context {
        contexts.empty()
    }

    /// The context of `callee` when called from `call_site`, `recv` being
    /// the receiver object of instance calls.
    fn select_context(
        &self,
        contexts: &mut Contexts,
        call_site: &CsCallSite,
        recv: Option<&CsObj>,
        callee: MethodId,
    ) -> Context;

    /// The heap context of the objects allocated by `method`.
    fn select_heap_context(&self, contexts: &mut Contexts, method: &CsMethod, obj: ObjId)
        -> Context;
}

/// Every method is analyzed under the empty context.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextInsensitive;

impl ContextSelector for ContextInsensitive {
    fn name(&self) -> String {
        "ci".to_string()
    }

    fn select_context(
        &self,
        contexts: &mut Contexts,
        _call_site: &CsCallSite,
        _recv: Option<&CsObj>,
        _callee: MethodId,
    ) -> Context {
        contexts.empty()
    }

    fn select_heap_context(
        &self,
        contexts: &mut Contexts,
        _method: &CsMethod,
        _obj: ObjId,
    ) -> Context {
        contexts.empty()
    }
}

/// k-limited call-site sensitivity, with `k - 1` limited heap contexts.
#[derive(Debug, Clone, Copy)]
pub struct KCallSiteSelector {
    k: usize,
}

impl KCallSiteSelector {
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl ContextSelector for KCallSiteSelector {
    fn name(&self) -> String {
        format!("{}-call", self.k)
    }

    fn select_context(
        &self,
        contexts: &mut Contexts,
        call_site: &CsCallSite,
        _recv: Option<&CsObj>,
        _callee: MethodId,
    ) -> Context {
        contexts.append(call_site.ctx, ContextElem::CallSite(call_site.site), self.k)
    }

    fn select_heap_context(
        &self,
        contexts: &mut Contexts,
        method: &CsMethod,
        _obj: ObjId,
    ) -> Context {
        contexts.truncate(method.ctx, self.k.saturating_sub(1))
    }
}

/// k-limited object sensitivity, with `k - 1` limited heap contexts.
/// Static calls are analyzed in the context of their caller.
#[derive(Debug, Clone, Copy)]
pub struct KObjectSelector {
    k: usize,
}

impl KObjectSelector {
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl ContextSelector for KObjectSelector {
    fn name(&self) -> String {
        format!("{}-obj", self.k)
    }

    fn select_context(
        &self,
        contexts: &mut Contexts,
        call_site: &CsCallSite,
        recv: Option<&CsObj>,
        _callee: MethodId,
    ) -> Context {
        match recv {
            Some(recv) => contexts.append(recv.ctx, ContextElem::Obj(recv.obj), self.k),
            None => call_site.ctx,
        }
    }

    fn select_heap_context(
        &self,
        contexts: &mut Contexts,
        method: &CsMethod,
        _obj: ObjId,
    ) -> Context {
        contexts.truncate(method.ctx, self.k.saturating_sub(1))
    }
}

/// Parses a selector name: `ci`, `<k>-call` or `<k>-obj`.
pub fn selector_from_str(name: &str) -> AnalysisResult<Box<dyn ContextSelector>> {
    let unknown = || AnalysisError::UnknownSelector(name.to_string());
    if name == "ci" {
        return Ok(Box::new(ContextInsensitive));
    }
    let (k, kind) = name.split_once('-').ok_or_else(unknown)?;
    let k: usize = k.parse().map_err(|_| unknown())?;
    match (k, kind) {
        (0, "call" | "obj") => Ok(Box::new(ContextInsensitive)),
        (_, "call") => Ok(Box::new(KCallSiteSelector::new(k))),
        (_, "obj") => Ok(Box::new(KObjectSelector::new(k))),
        _ => Err(unknown()),
    }
}
