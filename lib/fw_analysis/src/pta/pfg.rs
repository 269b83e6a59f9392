//! Pointer flow graph.
//!
//! Pointers live in an arena and are designated by [`PointerId`] handles.
//! Each pointer owns its points-to set, edges only reference pointers.

use crate::pta::context::Context;
use crate::pta::elements::CsObjId;
use crate::pta::pts::PointsToSet;
use fw_ir::{FieldId, VarId};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointerId(usize);

impl PointerId {
    #[inline]
    #[must_use]
    pub fn idx(self) -> usize {
        self.0
    }
}

/// A memory location that may hold references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pointer {
    Var { var: VarId, ctx: Context },
    StaticField(FieldId),
    InstanceField { base: CsObjId, field: FieldId },
    /// All the elements of an array object.
    ArrayIndex(CsObjId),
}

#[derive(Debug, Default)]
pub struct PointerFlowGraph {
    pointers: Vec<Pointer>,
    ids: BTreeMap<Pointer, PointerId>,
    pts: Vec<PointsToSet>,
    succs: Vec<Vec<PointerId>>,
    edges: BTreeSet<(PointerId, PointerId)>,
}

impl PointerFlowGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The handle of `pointer`, created with an empty points-to set on
    /// first request.
    pub fn get_pointer(&mut self, pointer: Pointer) -> PointerId {
        if let Some(id) = self.ids.get(&pointer) {
            return *id;
        }
        let id = PointerId(self.pointers.len());
        self.pointers.push(pointer);
        self.pts.push(PointsToSet::new());
        self.succs.push(Vec::new());
        self.ids.insert(pointer, id);
        id
    }

    #[must_use]
    pub fn find(&self, pointer: &Pointer) -> Option<PointerId> {
        self.ids.get(pointer).copied()
    }

    /// The pointers of `var`, one per context it has been analyzed in.
    pub fn var_pointers(&self, var: VarId) -> impl Iterator<Item = PointerId> + '_ {
        let from = Pointer::Var {
            var,
            ctx: Context(0),
        };
        let to = Pointer::Var {
            var,
            ctx: Context(usize::MAX),
        };
        self.ids.range(from..=to).map(|(_, id)| *id)
    }

    #[must_use]
    pub fn pointer(&self, id: PointerId) -> Pointer {
        self.pointers[id.0]
    }

    pub fn pointers(&self) -> impl Iterator<Item = (PointerId, Pointer)> + '_ {
        self.pointers
            .iter()
            .enumerate()
            .map(|(index, pointer)| (PointerId(index), *pointer))
    }

    #[must_use]
    pub fn pts(&self, id: PointerId) -> &PointsToSet {
        &self.pts[id.0]
    }

    pub(crate) fn pts_mut(&mut self, id: PointerId) -> &mut PointsToSet {
        &mut self.pts[id.0]
    }

    #[must_use]
    pub fn succs_of(&self, id: PointerId) -> &[PointerId] {
        &self.succs[id.0]
    }

    /// Adds the edge `src -> dst`, returning whether it is new.
    pub fn add_edge(&mut self, src: PointerId, dst: PointerId) -> bool {
        if !self.edges.insert((src, dst)) {
            return false;
        }
        self.succs[src.0].push(dst);
        true
    }

    #[must_use]
    pub fn has_edge(&self, src: PointerId, dst: PointerId) -> bool {
        self.edges.contains(&(src, dst))
    }

    #[must_use]
    pub fn nb_pointers(&self) -> usize {
        self.pointers.len()
    }

    #[must_use]
    pub fn nb_edges(&self) -> usize {
        self.edges.len()
    }
}
