//! Bytecode: instructions, per-function chunks and the shared constant pool.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tql_core::{Name, Value};

use crate::ir::BinaryInstr;
use crate::types::{BaseType, ConversionKind};

/// One stack-machine instruction. Operands index the [`ConstantPool`], the
/// current function's locals, or the executable's tables.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Push `constants[index]`.
    Constant(u32),
    PushVoid,
    Pop,
    LoadLocal(u32),
    StoreLocal(u32),
    Negate,
    Not,
    Binary(BinaryInstr),
    Convert(ConversionKind),
    /// Continue at the absolute offset.
    Jump(u32),
    /// Pop a Boolean; continue at the offset if it is false.
    JumpIfFalse(u32),
    /// Abort with the message at `constants[index]`.
    Fail(u32),
    MakeList(u32),
    MakeSet(u32),
    /// Pop `count` values into a tuple with `layouts[layout]`.
    MakeTuple { layout: u32, count: u32 },
    /// Replace the tuple on top with its attribute named `constants[index]`.
    Attribute(u32),
    /// Pop `argc` arguments, then a function value, and call it.
    Call(u32),
    CallNative { function: u32, argc: u32 },
    /// Pop a list or set and snapshot its elements into `items`; reset `index`.
    IterInit { items: u32, index: u32 },
    /// Load the next element into `variable`, or continue at `exit` when done.
    IterNext {
        items: u32,
        index: u32,
        variable: u32,
        exit: u32,
    },
    /// Pop a value and add it to the collection in local `collection`.
    Append(u32),
    /// Replace the value on top with the host argument named by
    /// `initializers[index]`, if any, coerced to the variable's type.
    Initializer(u32),
    BindModule(u32),
    DeclareModule(u32),
    RepositoryGet { module: u32, variable: u32 },
    RepositorySet { module: u32, variable: u32 },
    Return,
}

/// The compiled code of one function.
///
/// Line numbers are kept only when debug info was requested.
#[derive(Debug, Clone, Default)]
pub struct BytecodeChunk {
    code: Vec<Instruction>,
    lines: Option<Vec<u32>>,
}

impl BytecodeChunk {
    pub fn new(debug_info: bool) -> Self {
        Self {
            code: Vec::new(),
            lines: debug_info.then(Vec::new),
        }
    }

    pub fn write(&mut self, instruction: Instruction, line: u32) {
        self.code.push(instruction);
        if let Some(lines) = &mut self.lines {
            lines.push(line);
        }
    }

    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    pub fn get(&self, offset: usize) -> Option<&Instruction> {
        self.code.get(offset)
    }

    pub(crate) fn get_mut(&mut self, offset: usize) -> Option<&mut Instruction> {
        self.code.get_mut(offset)
    }

    /// Source line of the instruction at `offset`, when known.
    pub fn line_at(&self, offset: usize) -> Option<u32> {
        self.lines
            .as_ref()
            .and_then(|lines| lines.get(offset).copied())
            .filter(|line| *line != 0)
    }

    pub fn has_debug_info(&self) -> bool {
        self.lines.is_some()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

/// A `var` that host arguments may override.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InitializerSlot {
    pub name: Name,
    pub ty: BaseType,
}

/// Executable-level constant pool with deduplication.
///
/// Shared by every function of an executable. Besides literal values it
/// holds tuple layouts and the variables initializers may override.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    values: Vec<Value>,
    index: FxHashMap<Value, u32>,
    layouts: Vec<Arc<[String]>>,
    layout_index: FxHashMap<Arc<[String]>, u32>,
    initializers: Vec<InitializerSlot>,
    initializer_index: FxHashMap<InitializerSlot, u32>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or find a value; returns its index.
    pub fn add(&mut self, value: Value) -> u32 {
        if let Some(&idx) = self.index.get(&value) {
            return idx;
        }
        let idx = self.values.len() as u32;
        self.values.push(value.clone());
        self.index.insert(value, idx);
        idx
    }

    pub fn add_layout(&mut self, names: Arc<[String]>) -> u32 {
        if let Some(&idx) = self.layout_index.get(&names) {
            return idx;
        }
        let idx = self.layouts.len() as u32;
        self.layouts.push(Arc::clone(&names));
        self.layout_index.insert(names, idx);
        idx
    }

    pub fn add_initializer(&mut self, slot: InitializerSlot) -> u32 {
        if let Some(&idx) = self.initializer_index.get(&slot) {
            return idx;
        }
        let idx = self.initializers.len() as u32;
        self.initializers.push(slot.clone());
        self.initializer_index.insert(slot, idx);
        idx
    }

    pub fn get(&self, index: u32) -> Option<&Value> {
        self.values.get(index as usize)
    }

    pub fn layout(&self, index: u32) -> Option<&Arc<[String]>> {
        self.layouts.get(index as usize)
    }

    pub fn initializer(&self, index: u32) -> Option<&InitializerSlot> {
        self.initializers.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
