//! IR errors definitions.

use std::io;
use thiserror::Error;

/// An alias for result that can be a [`IrError`].
pub type IrResult<T> = Result<T, IrError>;

/// The IR error type.
#[derive(Debug, Error)]
pub enum IrError {
    /// Error that can be returned when doing [std::io](I/O) operations.
    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    /// Error that can be returned at parsing, with the unparsed input
    /// beginning.
    #[error("parsing error near {0:?} ({1:?})")]
    Parsing(String, nom::error::ErrorKind),

    #[error("class not found: {0}")]
    ClassNotFound(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("field not found: {0}")]
    FieldNotFound(String),

    #[error("variable not found: {0}")]
    VarNotFound(String),

    #[error("label not found: {0}")]
    LabelNotFound(String),

    #[error("duplicate definition: {0}")]
    Duplicate(String),

    #[error("invalid declaration: {0}")]
    Invalid(String),
}

impl nom::error::ParseError<&str> for IrError {
    fn from_error_kind(input: &str, kind: nom::error::ErrorKind) -> Self {
        Self::Parsing(input.chars().take(32).collect(), kind)
    }

    fn append(_: &str, _: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}
