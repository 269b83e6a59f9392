use crate::pta::elements::CsObjId;
use fixedbitset::FixedBitSet;

/// Set of context qualified objects.
///
/// Membership is tested on a bit set indexed by object id, iteration
/// follows the insertion order.
#[derive(Debug, Clone, Default)]
pub struct PointsToSet {
    bits: FixedBitSet,
    objs: Vec<CsObjId>,
}

impl PointsToSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn singleton(obj: CsObjId) -> Self {
        let mut pts = Self::new();
        pts.add(obj);
        pts
    }

    #[must_use]
    pub fn contains(&self, obj: CsObjId) -> bool {
        self.bits.contains(obj.0)
    }

    /// Adds `obj`, returning whether it was not already present.
    pub fn add(&mut self, obj: CsObjId) -> bool {
        if obj.0 >= self.bits.len() {
            self.bits.grow(obj.0 + 1);
        }
        if self.bits.put(obj.0) {
            return false;
        }
        self.objs.push(obj);
        true
    }

    /// Adds every object of `other`, returning whether the set grew.
    pub fn add_all(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for obj in other.iter() {
            changed |= self.add(obj);
        }
        changed
    }

    /// The objects of `incoming` that are not in this set.
    #[must_use]
    pub fn diff(&self, incoming: &Self) -> Self {
        let mut delta = Self::new();
        for obj in incoming.iter().filter(|obj| !self.contains(*obj)) {
            delta.add(obj);
        }
        delta
    }

    pub fn iter(&self) -> impl Iterator<Item = CsObjId> + '_ {
        self.objs.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_and_union() {
        let mut pts = PointsToSet::singleton(CsObjId(3));
        assert!(pts.add(CsObjId(70)));
        assert!(!pts.add(CsObjId(3)));

        let mut incoming = PointsToSet::singleton(CsObjId(70));
        incoming.add(CsObjId(1));
        let delta = pts.diff(&incoming);
        assert_eq!(delta.iter().collect::<Vec<_>>(), vec![CsObjId(1)]);

        assert!(pts.add_all(&delta));
        assert!(!pts.add_all(&incoming));
        assert!(pts.diff(&incoming).is_empty());
        assert_eq!(
            pts.iter().collect::<Vec<_>>(),
            vec![CsObjId(3), CsObjId(70), CsObjId(1)]
        );
    }
}
