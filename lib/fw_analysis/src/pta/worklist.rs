use crate::pta::elements::CsMethod;
use crate::pta::pfg::PointerId;
use crate::pta::pts::PointsToSet;
use std::collections::VecDeque;

/// Pending work of the pointer analysis solver: objects flowing to a
/// pointer, or a method that became reachable.
#[derive(Debug)]
pub enum WorkItem {
    Points(PointerId, PointsToSet),
    Method(CsMethod),
}

#[derive(Debug, Default)]
pub struct WorkList {
    items: VecDeque<WorkItem>,
}

impl WorkList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_points(&mut self, pointer: PointerId, pts: PointsToSet) {
        self.items.push_back(WorkItem::Points(pointer, pts));
    }

    pub fn add_method(&mut self, method: CsMethod) {
        self.items.push_back(WorkItem::Method(method));
    }

    pub fn pop(&mut self) -> Option<WorkItem> {
        self.items.pop_front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
