//! TQL: a typed query language over tuples, lists and sets.
//!
//! This crate is the host-facing surface. It ties together:
//!
//! - **tql-ast** - the arena-allocated script tree handed to the compiler
//! - **tql-compiler** - type checking, module binding and code generation
//! - **tql-modules** - the `System` module and in-memory storage
//!
//! Hosts build a [`ProcessorOptions`], then use a [`Processor`] to evaluate
//! scripts directly or prepare them for repeated execution.

mod error;
mod processor;

pub use error::{Error, Result};
pub use processor::{PreparedId, Processor, ProcessorOptions};

pub use tql_ast::{AstBuilder, Script};
pub use tql_compiler::{Arguments, BaseType, CompileOutput, CompilerOptions, Executable};
pub use tql_core::{RepositoryFactory, Value};
