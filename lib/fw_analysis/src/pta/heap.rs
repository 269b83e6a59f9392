//! Heap abstraction: maps allocation statements to abstract objects.

use fw_ir::{StmtRef, Type};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ObjId(pub(crate) usize);

impl ObjId {
    #[inline]
    #[must_use]
    pub fn idx(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "o{}", self.0)
    }
}

/// An abstract object, standing for every runtime object allocated at
/// `site`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Obj {
    pub id: ObjId,
    pub site: StmtRef,
    pub ty: Type,
}

pub trait HeapModel {
    /// The abstract object of an allocation of type `ty` at `site`.
    ///
    /// Successive calls for the same site must return the same object.
    fn get_obj(&mut self, site: StmtRef, ty: &Type) -> ObjId;

    fn obj(&self, id: ObjId) -> &Obj;

    fn nb_objs(&self) -> usize;
}

/// One abstract object per allocation site.
#[derive(Debug, Default)]
pub struct AllocationSiteHeapModel {
    objs: Vec<Obj>,
    ids: BTreeMap<StmtRef, ObjId>,
}

impl AllocationSiteHeapModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl HeapModel for AllocationSiteHeapModel {
    fn get_obj(&mut self, site: StmtRef, ty: &Type) -> ObjId {
        if let Some(id) = self.ids.get(&site) {
            return *id;
        }
        let id = ObjId(self.objs.len());
        self.objs.push(Obj {
            id,
            site,
            ty: ty.clone(),
        });
        self.ids.insert(site, id);
        id
    }

    fn obj(&self, id: ObjId) -> &Obj {
        &self.objs[id.0]
    }

    fn nb_objs(&self) -> usize {
        self.objs.len()
    }
}
