//! Host entry point for compiling and running scripts.
//!
//! A [`Processor`] compiles scripts against [`ProcessorOptions`] and either
//! runs them once (`evaluate`, `execute`) or keeps the executable under a
//! [`PreparedId`] for repeated runs with different arguments.
//!
//! # Example
//!
//! ```ignore
//! use tql::{Processor, ProcessorOptions};
//! use tql_compiler::Arguments;
//!
//! let processor = Processor::new();
//! let options = ProcessorOptions::with_default_modules()?;
//!
//! let id = processor.prepare(script, &options)?;
//! let value = processor.evaluate_prepared(id, &Arguments::new().with("limit", 10))?;
//! processor.unprepare(id);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tql_ast::Script;
use tql_compiler::{Arguments, BaseType, CompileOutput, CompilerOptions, Executable, compile};
use tql_core::{NoStorage, RepositoryFactory, Value};
use tql_modules::MemoryRepositoryFactory;
use tracing::debug;

use crate::error::{Error, Result};

/// Compiler settings plus the storage executables run against.
#[derive(Clone)]
pub struct ProcessorOptions {
    pub compiler: CompilerOptions,
    pub storage: Arc<dyn RepositoryFactory>,
}

impl ProcessorOptions {
    /// Default compiler options and no storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard module catalog with `System` bound by default, and
    /// in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns an error if a standard module descriptor fails to build.
    pub fn with_default_modules() -> Result<Self> {
        let catalog = tql_modules::default_catalog()?;
        let compiler = CompilerOptions::default()
            .with_catalog(Arc::new(catalog))
            .with_default_using(tql_modules::system::NAME);
        Ok(Self {
            compiler,
            storage: Arc::new(MemoryRepositoryFactory::new()),
        })
    }

    pub fn with_compiler(mut self, compiler: CompilerOptions) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn RepositoryFactory>) -> Self {
        self.storage = storage;
        self
    }
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            compiler: CompilerOptions::default(),
            storage: Arc::new(NoStorage),
        }
    }
}

impl fmt::Debug for ProcessorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorOptions")
            .field("compiler", &self.compiler)
            .finish_non_exhaustive()
    }
}

/// Handle to a prepared script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PreparedId(u64);

impl fmt::Display for PreparedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Prepared {
    executable: Executable,
    result_type: BaseType,
    storage: Arc<dyn RepositoryFactory>,
}

/// Compiles and runs scripts; holds prepared executables.
///
/// All methods take `&self`; a processor can be shared across threads.
#[derive(Default)]
pub struct Processor {
    prepared: Mutex<FxHashMap<PreparedId, Arc<Prepared>>>,
    next_id: AtomicU64,
}

impl Processor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile without running.
    pub fn compile(&self, script: &Script<'_>, options: &ProcessorOptions) -> Result<CompileOutput> {
        Ok(compile(script, options.compiler.clone())?)
    }

    /// Compile and run once, returning the script's result.
    pub fn evaluate(&self, script: &Script<'_>, arguments: &Arguments, options: &ProcessorOptions) -> Result<Value> {
        let output = self.compile(script, options)?;
        Ok(output.executable.invoke(arguments, options.storage.as_ref())?)
    }

    /// Compile and run once for effect; the result is discarded.
    pub fn execute(&self, script: &Script<'_>, arguments: &Arguments, options: &ProcessorOptions) -> Result<()> {
        self.evaluate(script, arguments, options).map(drop)
    }

    /// Compile and keep the executable, bound to `options.storage`.
    pub fn prepare(&self, script: &Script<'_>, options: &ProcessorOptions) -> Result<PreparedId> {
        let output = self.compile(script, options)?;
        let id = PreparedId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(id = %id, executable = output.executable.name(), "prepared script");
        let prepared = Prepared {
            executable: output.executable,
            result_type: output.result_type,
            storage: Arc::clone(&options.storage),
        };
        self.prepared.lock().insert(id, Arc::new(prepared));
        Ok(id)
    }

    /// Run a prepared script, returning its result.
    pub fn evaluate_prepared(&self, id: PreparedId, arguments: &Arguments) -> Result<Value> {
        let prepared = self.lookup(id)?;
        Ok(prepared.executable.invoke(arguments, prepared.storage.as_ref())?)
    }

    /// Run a prepared script for effect.
    pub fn execute_prepared(&self, id: PreparedId, arguments: &Arguments) -> Result<()> {
        self.evaluate_prepared(id, arguments).map(drop)
    }

    /// Result type of a prepared script.
    pub fn result_type(&self, id: PreparedId) -> Result<BaseType> {
        Ok(self.lookup(id)?.result_type.clone())
    }

    /// Forget a prepared script. Returns whether `id` was prepared.
    pub fn unprepare(&self, id: PreparedId) -> bool {
        let removed = self.prepared.lock().remove(&id).is_some();
        debug!(id = %id, removed, "unprepared script");
        removed
    }

    pub fn prepared_count(&self) -> usize {
        self.prepared.lock().len()
    }

    // The lock is released before the executable runs.
    fn lookup(&self, id: PreparedId) -> Result<Arc<Prepared>> {
        self.prepared
            .lock()
            .get(&id)
            .cloned()
            .ok_or(Error::UnknownPrepared(id))
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("prepared", &self.prepared_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tql_ast::{AstBuilder, BinaryOp};
    use tql_core::CompilerErrorKind;

    use super::*;

    #[test]
    fn evaluate_once() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let script = b.query(b.binary(b.int(20), BinaryOp::Add, b.int(22)));
        let value = Processor::new()
            .evaluate(script, &Arguments::new(), &ProcessorOptions::new())
            .unwrap();
        assert_eq!(value, Value::Int32(42));
    }

    #[test]
    fn prepared_scripts_take_arguments() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let script = b.script(
            vec![],
            vec![],
            vec![b.var("x", None, Some(b.int(1)))],
            vec![],
            Some(b.claused(vec![], vec![], None, b.binary(b.id("x"), BinaryOp::Multiply, b.int(10)))),
        );
        let processor = Processor::new();
        let id = processor.prepare(script, &ProcessorOptions::new()).unwrap();
        assert_eq!(processor.result_type(id).unwrap(), BaseType::INT32);
        assert_eq!(processor.evaluate_prepared(id, &Arguments::new()).unwrap(), Value::Int32(10));
        assert_eq!(
            processor.evaluate_prepared(id, &Arguments::new().with("x", 4)).unwrap(),
            Value::Int32(40)
        );
    }

    #[test]
    fn unprepare_forgets() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let processor = Processor::new();
        let id = processor.prepare(b.query(b.int(1)), &ProcessorOptions::new()).unwrap();
        assert_eq!(processor.prepared_count(), 1);
        assert!(processor.unprepare(id));
        assert!(!processor.unprepare(id));
        assert!(matches!(
            processor.execute_prepared(id, &Arguments::new()),
            Err(Error::UnknownPrepared(missing)) if missing == id
        ));
    }

    #[test]
    fn ids_are_not_reused() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let processor = Processor::new();
        let first = processor.prepare(b.query(b.int(1)), &ProcessorOptions::new()).unwrap();
        processor.unprepare(first);
        let second = processor.prepare(b.query(b.int(1)), &ProcessorOptions::new()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn compile_errors_surface() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let err = Processor::new()
            .execute(b.query(b.id("missing")), &Arguments::new(), &ProcessorOptions::new())
            .unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::IdentifierNotFound));
    }

    #[test]
    fn default_modules_bind_system() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let script = b.query(b.call(b.id("System.Uppercase"), vec![b.string("tql")]));
        let options = ProcessorOptions::with_default_modules().unwrap();
        let value = Processor::new().evaluate(script, &Arguments::new(), &options).unwrap();
        assert_eq!(value, Value::from("TQL"));
    }
}
