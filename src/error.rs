use thiserror::Error;
use tql_core::{CompilerErrorKind, InternalError, RuntimeError};

use crate::processor::PreparedId;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`Processor`](crate::Processor).
#[derive(Debug, Error)]
pub enum Error {
    /// Compiling or running a script failed.
    #[error(transparent)]
    Tql(#[from] tql_core::Error),

    /// The id was never issued, or the script was unprepared.
    #[error("no prepared script with id {0}")]
    UnknownPrepared(PreparedId),
}

impl Error {
    /// The compile error kind, when compilation failed.
    pub fn compiler_kind(&self) -> Option<CompilerErrorKind> {
        match self {
            Error::Tql(e) => e.compiler_kind(),
            Error::UnknownPrepared(_) => None,
        }
    }

    /// The runtime fault, when execution failed.
    pub fn runtime(&self) -> Option<&RuntimeError> {
        match self {
            Error::Tql(tql_core::Error::Runtime(e)) => Some(e),
            _ => None,
        }
    }
}

impl From<RuntimeError> for Error {
    fn from(error: RuntimeError) -> Self {
        Error::Tql(error.into())
    }
}

impl From<InternalError> for Error {
    fn from(error: InternalError) -> Self {
        Error::Tql(error.into())
    }
}
