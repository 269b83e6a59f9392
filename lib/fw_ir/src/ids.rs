use serde::Serialize;
use std::fmt;

/// Index of a class in the program.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize)]
pub struct ClassId(pub(crate) usize);

/// Index of a method in the program.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize)]
pub struct MethodId(pub(crate) usize);

/// Index of a field in the program.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize)]
pub struct FieldId(pub(crate) usize);

/// Index of a variable in the program. Variables are unique program-wide,
/// each of them belongs to exactly one method.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize)]
pub struct VarId(pub(crate) usize);

macro_rules! impl_idx {
    ($($id:ident),*) => {
        $(
            impl $id {
                #[inline]
                #[must_use]
                pub fn idx(self) -> usize {
                    self.0
                }
            }
        )*
    };
}

impl_idx!(ClassId, MethodId, FieldId, VarId);

/// Designates a statement by its method and its position in the method body.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize)]
pub struct StmtRef {
    pub method: MethodId,
    pub index: usize,
}

impl StmtRef {
    #[must_use]
    pub fn new(method: MethodId, index: usize) -> Self {
        Self { method, index }
    }
}

impl fmt::Display for StmtRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "m{}@{}", self.method.0, self.index)
    }
}
