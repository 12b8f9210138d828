//! Core types shared by every TQL crate.
//!
//! - [`Span`] - source locations
//! - [`Name`] - dot-qualified names
//! - [`Value`] - runtime values
//! - [`Error`] and its phase errors
//! - [`Repository`] / [`RepositoryFactory`] - the storage contract

pub mod error;
pub mod name;
pub mod span;
pub mod storage;
pub mod value;

pub use error::{CompilerError, CompilerErrorKind, Error, InternalError, Result, RuntimeError};
pub use name::Name;
pub use span::Span;
pub use storage::{ModuleDeclaration, NoStorage, Repository, RepositoryFactory};
pub use value::{FunctionRef, TupleValue, Value};

pub use chrono::{NaiveDateTime, TimeDelta};
