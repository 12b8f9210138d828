//! TQL Compiler
//!
//! Compiles a parsed TQL script into an [`Executable`] and infers the type of
//! its result.
//!
//! ## Architecture
//!
//! One [`Compiler`] instance owns all state for one compilation: frames,
//! symbol contexts, the module member table and the backend. Stages return
//! tree IR ([`ir::Ir`]) which the [`backend`] lowers to bytecode once the
//! whole script has type-checked.
//!
//! ## Modules
//!
//! - [`types`]: logical types, conversions and operator typing
//! - [`frame`]: lexical scopes and the reference log
//! - [`context`]: expression contexts
//! - [`characteristic`]: purity flags deciding constant folding
//! - [`module`]: module descriptors and catalogs
//! - [`ir`]: tree IR
//! - [`backend`]: lowering, bytecode VM and executables
//! - [`compiler`]: the driver
//! - `expr`: expression and comprehension compilation

pub mod backend;
mod binder;
pub mod characteristic;
pub mod compiler;
pub mod context;
mod expr;
pub mod frame;
pub mod ir;
mod members;
pub mod module;
pub mod options;
mod type_resolver;
pub mod types;

pub use backend::{Arguments, Executable};
pub use characteristic::Characteristic;
pub use compiler::{CompileOutput, Compiler, compile};
pub use context::{ExprContext, FunctionHandle, SetTarget};
pub use frame::{FrameId, Scopes, SymbolId, SymbolKind};
pub use module::{
    ModuleBuilder, ModuleCatalog, ModuleDescriptor, NativeFn, NativeFunction, StaticCatalog,
};
pub use options::CompilerOptions;
pub use types::{BaseType, FunctionParameter, FunctionType, ScalarKind, TupleKey, TupleReference, TupleType};
