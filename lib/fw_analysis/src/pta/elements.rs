//! Context qualified program elements.

use crate::callgraph::CallSite;
use crate::pta::context::Context;
use crate::pta::heap::ObjId;
use fw_ir::{MethodId, StmtRef};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CsMethod {
    pub ctx: Context,
    pub method: MethodId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CsCallSite {
    pub ctx: Context,
    pub site: StmtRef,
}

impl CallSite for CsCallSite {
    type Method = CsMethod;

    fn container(&self) -> CsMethod {
        CsMethod {
            ctx: self.ctx,
            method: self.site.method,
        }
    }
}

/// An abstract object qualified by its heap context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CsObj {
    pub ctx: Context,
    pub obj: ObjId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CsObjId(pub(crate) usize);

impl CsObjId {
    #[inline]
    #[must_use]
    pub fn idx(self) -> usize {
        self.0
    }
}

/// Interner of context qualified objects, points-to sets store their
/// dense indexes.
#[derive(Debug, Default)]
pub struct CsManager {
    objs: Vec<CsObj>,
    ids: BTreeMap<CsObj, CsObjId>,
}

impl CsManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_cs_obj(&mut self, ctx: Context, obj: ObjId) -> CsObjId {
        let cs_obj = CsObj { ctx, obj };
        if let Some(id) = self.ids.get(&cs_obj) {
            return *id;
        }
        let id = CsObjId(self.objs.len());
        self.objs.push(cs_obj);
        self.ids.insert(cs_obj, id);
        id
    }

    #[must_use]
    pub fn cs_obj(&self, id: CsObjId) -> &CsObj {
        &self.objs[id.0]
    }

    #[must_use]
    pub fn nb_cs_objs(&self) -> usize {
        self.objs.len()
    }
}
