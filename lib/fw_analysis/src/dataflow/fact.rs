//! Lattice values and the containers carrying them along the control flow.

use fw_ir::VarId;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Constant propagation lattice value.
///
/// Ordered as `Undef ⊑ Constant(_) ⊑ Nac`: `Undef` is the bottom (no value
/// observed yet) and `Nac` the top (not a constant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Value {
    Undef,
    Constant(i32),
    Nac,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Undef => write!(f, "UNDEF"),
            Self::Constant(i) => write!(f, "{i}"),
            Self::Nac => write!(f, "NAC"),
        }
    }
}

impl Value {
    #[inline]
    #[must_use]
    pub fn meet(self, other: Self) -> Self {
        match (self, other) {
            (Self::Nac, _) | (_, Self::Nac) => Self::Nac,
            (Self::Undef, v) | (v, Self::Undef) => v,
            (Self::Constant(a), Self::Constant(b)) if a == b => self,
            (Self::Constant(_), Self::Constant(_)) => Self::Nac,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_constant(self) -> bool {
        matches!(self, Self::Constant(_))
    }

    #[inline]
    #[must_use]
    pub fn as_constant(self) -> Option<i32> {
        match self {
            Self::Constant(i) => Some(i),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_nac(self) -> bool {
        matches!(self, Self::Nac)
    }

    #[inline]
    #[must_use]
    pub fn is_undef(self) -> bool {
        matches!(self, Self::Undef)
    }
}

/// Mapping from variables to lattice values.
///
/// Absent variables are `Undef`, so that two facts are equal exactly when
/// they map every variable to the same value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CpFact {
    values: BTreeMap<VarId, Value>,
}

impl fmt::Display for CpFact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (var, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "v{}={value}", var.idx())?;
        }
        write!(f, "}}")
    }
}

impl CpFact {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, var: VarId) -> Value {
        self.values.get(&var).copied().unwrap_or(Value::Undef)
    }

    /// Sets the value of `var`, returning whether the fact changed.
    pub fn update(&mut self, var: VarId, value: Value) -> bool {
        if value.is_undef() {
            self.values.remove(&var).is_some()
        } else {
            self.values.insert(var, value) != Some(value)
        }
    }

    pub fn remove(&mut self, var: VarId) -> Value {
        self.values.remove(&var).unwrap_or(Value::Undef)
    }

    /// Replaces the content of `self` with the one of `other`, returning
    /// whether it changed.
    pub fn copy_from(&mut self, other: &Self) -> bool {
        if self == other {
            false
        } else {
            self.values.clone_from(&other.values);
            true
        }
    }

    /// Variables with a value other than `Undef`.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, Value)> + '_ {
        self.values.iter().map(|(var, value)| (*var, *value))
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Set container with union meet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetFact<T: Ord> {
    elems: BTreeSet<T>,
}

impl<T: Ord> Default for SetFact<T> {
    fn default() -> Self {
        Self {
            elems: BTreeSet::new(),
        }
    }
}

impl<T: Ord + Clone> SetFact<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, elem: &T) -> bool {
        self.elems.contains(elem)
    }

    pub fn add(&mut self, elem: T) -> bool {
        self.elems.insert(elem)
    }

    pub fn remove(&mut self, elem: &T) -> bool {
        self.elems.remove(elem)
    }

    /// Adds every element of `other`, returning whether `self` grew.
    pub fn union(&mut self, other: &Self) -> bool {
        let before = self.elems.len();
        self.elems.extend(other.elems.iter().cloned());
        self.elems.len() != before
    }

    pub fn copy_from(&mut self, other: &Self) -> bool {
        if self == other {
            false
        } else {
            self.elems.clone_from(&other.elems);
            true
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.elems.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }
}

impl<T: Ord> FromIterator<T> for SetFact<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            elems: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALUES: [Value; 5] = [
        Value::Undef,
        Value::Constant(0),
        Value::Constant(1),
        Value::Constant(-7),
        Value::Nac,
    ];

    #[test]
    fn meet_is_commutative_associative_idempotent() {
        for a in VALUES {
            assert_eq!(a.meet(a), a);
            for b in VALUES {
                assert_eq!(a.meet(b), b.meet(a));
                for c in VALUES {
                    assert_eq!(a.meet(b.meet(c)), a.meet(b).meet(c));
                }
            }
        }
    }

    #[test]
    fn meet_goes_up() {
        assert_eq!(Value::Undef.meet(Value::Constant(3)), Value::Constant(3));
        assert_eq!(Value::Constant(3).meet(Value::Constant(3)), Value::Constant(3));
        assert_eq!(Value::Constant(3).meet(Value::Constant(4)), Value::Nac);
        assert_eq!(Value::Nac.meet(Value::Undef), Value::Nac);
    }

    #[test]
    fn absent_variables_are_undef() {
        let program = fw_ir::parse(
            "class Main { static method main() : void { var int a, b; a = 1; b = 2; } }",
        )
        .unwrap();
        let main = program.find_method("Main", "main").unwrap();
        let a = program.var_by_name(main, "a").unwrap();
        let b = program.var_by_name(main, "b").unwrap();

        let mut fact = CpFact::new();
        assert_eq!(fact.get(a), Value::Undef);
        assert!(fact.update(a, Value::Constant(1)));
        assert!(!fact.update(a, Value::Constant(1)));
        assert!(fact.update(b, Value::Nac));
        assert_eq!(fact.len(), 2);

        // going back to undef is the same as having no entry
        assert!(fact.update(a, Value::Undef));
        let mut other = CpFact::new();
        other.update(b, Value::Nac);
        assert_eq!(fact, other);
        assert!(!fact.copy_from(&other));
        assert_eq!(fact.remove(b), Value::Nac);
        assert!(fact.is_empty());
    }

    #[test]
    fn set_fact_union() {
        let mut a: SetFact<u32> = [1, 2].into_iter().collect();
        let b: SetFact<u32> = [2, 3].into_iter().collect();
        assert!(a.union(&b));
        assert!(!a.union(&b));
        assert_eq!(a.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
