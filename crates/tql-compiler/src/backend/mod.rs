//! Code generation backend.
//!
//! The compiler hands the backend tree IR; the backend lowers it into
//! bytecode and packages the result as an immutable [`Executable`].
//!
//! ## Submodules
//!
//! - [`native`]: memoized native representations of logical types
//! - [`bytecode`]: instructions, chunks and the constant pool
//! - [`emit`]: bytecode emitter with jump patching
//! - [`lower`]: IR to bytecode lowering
//! - [`ops`]: value semantics of arithmetic and comparison
//! - [`vm`]: the stack machine that runs executables

pub mod bytecode;
pub mod emit;
pub mod lower;
pub mod native;
pub mod ops;
pub mod vm;

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tql_core::{Error, InternalError, ModuleDeclaration, Name, NoStorage, RepositoryFactory, RuntimeError, Value};

use crate::ir::{FunctionId, Ir, LocalId, ModuleSlot, NativeId};
use crate::module::NativeFunction;
use crate::types::BaseType;
use bytecode::{BytecodeChunk, ConstantPool};
use native::{NativeCache, NativeType};
use vm::Vm;

// ============================================================================
// Executable
// ============================================================================

/// A lowered function.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    pub name: String,
    /// Parameters occupy locals `0..arity`.
    pub arity: u32,
    pub locals: u32,
    pub chunk: BytecodeChunk,
}

/// A storage-backed variable of a bound module.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleVariable {
    pub name: Name,
    /// Display form of the variable's type, passed to the repository factory.
    pub type_name: String,
}

/// A module instance the executable binds when it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleBinding {
    pub name: Name,
    pub version: Option<String>,
    pub variables: Vec<ModuleVariable>,
}

impl ModuleBinding {
    pub fn declaration(&self) -> ModuleDeclaration {
        ModuleDeclaration {
            name: self.name.clone(),
            version: self.version.clone(),
            variables: self.variables.iter().map(|v| v.name.clone()).collect(),
        }
    }
}

/// Everything an executable needs at run time.
#[derive(Debug)]
pub struct Program {
    pub functions: Vec<CompiledFunction>,
    pub natives: Vec<NativeFunction>,
    pub constants: ConstantPool,
    pub modules: Vec<ModuleBinding>,
    /// Entry point; takes no arguments.
    pub main: FunctionId,
}

/// Host-supplied values that replace `var` initializers, by qualified name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: FxHashMap<Name, Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<Name>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<Name>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &Name) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A compiled script. Immutable and shareable across threads; every
/// invocation runs on its own VM.
#[derive(Clone)]
pub struct Executable {
    program: Arc<Program>,
    name: String,
    source_description: String,
}

impl Executable {
    /// Run the script. `arguments` override `var` initializers; `host`
    /// supplies module repositories.
    pub fn invoke(&self, arguments: &Arguments, host: &dyn RepositoryFactory) -> Result<Value, RuntimeError> {
        tracing::trace!(executable = %self.name, arguments = arguments.len(), "invoking");
        Vm::new(&self.program, host, arguments).run()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_description(&self) -> &str {
        &self.source_description
    }

    pub fn program(&self) -> &Program {
        &self.program
    }
}

impl fmt::Debug for Executable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executable")
            .field("name", &self.name)
            .field("source_description", &self.source_description)
            .field("functions", &self.program.functions.len())
            .field("modules", &self.program.modules.len())
            .finish()
    }
}

// ============================================================================
// Backend
// ============================================================================

#[derive(Debug)]
struct FunctionSlot {
    name: String,
    arity: u32,
    locals: u32,
    /// `None` while the function's body is still being compiled.
    body: Option<Ir>,
}

/// Collects functions, natives and module bindings during one compilation.
#[derive(Debug, Default)]
pub struct Backend {
    native_cache: NativeCache,
    functions: Vec<FunctionSlot>,
    natives: Vec<NativeFunction>,
    native_index: FxHashMap<Name, NativeId>,
    modules: Vec<ModuleBinding>,
    debug_info: bool,
}

impl Backend {
    pub fn new(debug_info: bool) -> Self {
        Self {
            debug_info,
            ..Self::default()
        }
    }

    pub fn debug_info(&self) -> bool {
        self.debug_info
    }

    /// The memoized native representation of `ty`.
    pub fn native(&mut self, ty: &BaseType) -> Arc<NativeType> {
        self.native_cache.get(ty)
    }

    /// Allocate a function id before its body is compiled, so the body can
    /// refer to itself.
    pub fn reserve_function(&mut self, name: impl Into<String>) -> FunctionId {
        let id = self.functions.len() as FunctionId;
        self.functions.push(FunctionSlot {
            name: name.into(),
            arity: 0,
            locals: 0,
            body: None,
        });
        id
    }

    pub fn define_function(&mut self, id: FunctionId, arity: u32, locals: u32, body: Ir) -> Result<(), InternalError> {
        let slot = self
            .functions
            .get_mut(id as usize)
            .ok_or(InternalError::UnknownSlot { kind: "function", index: id })?;
        slot.arity = arity;
        slot.locals = locals;
        slot.body = Some(body);
        Ok(())
    }

    /// Register a native function under its qualified name; registering the
    /// same name again returns the existing id.
    pub fn add_native(&mut self, qualified: Name, function: NativeFunction) -> NativeId {
        if let Some(&id) = self.native_index.get(&qualified) {
            return id;
        }
        let id = self.natives.len() as NativeId;
        self.natives.push(function);
        self.native_index.insert(qualified, id);
        id
    }

    pub fn native_function(&self, id: NativeId) -> Option<&NativeFunction> {
        self.natives.get(id as usize)
    }

    pub fn add_module(&mut self, binding: ModuleBinding) -> ModuleSlot {
        let slot = self.modules.len() as ModuleSlot;
        self.modules.push(binding);
        slot
    }

    pub fn module_mut(&mut self, slot: ModuleSlot) -> Option<&mut ModuleBinding> {
        self.modules.get_mut(slot as usize)
    }

    fn lower_program(&self, main: &Ir, main_locals: LocalId) -> Result<Program, InternalError> {
        let mut constants = ConstantPool::new();
        let mut functions = Vec::with_capacity(self.functions.len() + 1);
        let unfinished = Ir::Fail {
            message: "function is not available during constant evaluation".to_string(),
        };
        for slot in &self.functions {
            let body = slot.body.as_ref().unwrap_or(&unfinished);
            let lowered = lower::lower_function(body, slot.locals.max(slot.arity), &mut constants, self.debug_info)?;
            functions.push(CompiledFunction {
                name: slot.name.clone(),
                arity: slot.arity,
                locals: lowered.locals,
                chunk: lowered.chunk,
            });
        }
        let lowered = lower::lower_function(main, main_locals, &mut constants, self.debug_info)?;
        let main_id = functions.len() as FunctionId;
        functions.push(CompiledFunction {
            name: "<main>".to_string(),
            arity: 0,
            locals: lowered.locals,
            chunk: lowered.chunk,
        });
        Ok(Program {
            functions,
            natives: self.natives.clone(),
            constants,
            modules: self.modules.clone(),
            main: main_id,
        })
    }

    /// Run `ir` now and return its value. Used to fold constants; no storage
    /// and no arguments are available.
    pub fn evaluate(&self, ir: &Ir, locals: LocalId) -> Result<Value, Error> {
        let program = self.lower_program(ir, locals)?;
        let arguments = Arguments::new();
        let value = Vm::new(&program, &NoStorage, &arguments).run()?;
        tracing::trace!(%value, "evaluated constant");
        Ok(value)
    }

    /// Lower everything into an executable whose entry point is `main`.
    pub fn finish(
        self,
        main: &Ir,
        main_locals: LocalId,
        name: impl Into<String>,
        source_description: impl Into<String>,
    ) -> Result<Executable, InternalError> {
        let program = self.lower_program(main, main_locals)?;
        Ok(Executable {
            program: Arc::new(program),
            name: name.into(),
            source_description: source_description.into(),
        })
    }
}
