//! Types of values manipulated by the IR.

use serde::Serialize;
use std::fmt;

pub const JAVA_LANG_OBJECT: &str = "java/lang/Object";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Type {
    Void,
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Class(String),
    Array(Box<Type>),
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Boolean => write!(f, "boolean"),
            Self::Byte => write!(f, "byte"),
            Self::Short => write!(f, "short"),
            Self::Char => write!(f, "char"),
            Self::Int => write!(f, "int"),
            Self::Long => write!(f, "long"),
            Self::Float => write!(f, "float"),
            Self::Double => write!(f, "double"),
            Self::Class(name) => write!(f, "{name}"),
            Self::Array(elem) => write!(f, "{elem}[]"),
        }
    }
}

impl Type {
    /// Returns `true` for primitive types whose values fit in a 32-bits
    /// signed integer.
    #[must_use]
    pub fn can_hold_int(&self) -> bool {
        matches!(
            self,
            Self::Boolean | Self::Byte | Self::Short | Self::Char | Self::Int
        )
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Class(_) | Self::Array(_))
    }

    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Self::Class(name) => Some(name),
            _ => None,
        }
    }

    /// The innermost element type of an array type, or the type itself.
    #[must_use]
    pub fn base_type(&self) -> &Self {
        match self {
            Self::Array(elem) => elem.base_type(),
            _ => self,
        }
    }
}
