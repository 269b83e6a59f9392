//! Analysis errors definition.

use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("the method has no implementation")]
    NoCode,

    #[error("the program has no entry method")]
    NoEntryMethod,

    #[error("unknown context selector: {0}")]
    UnknownSelector(String),
}
