//! Bytecode emitter with forward-jump patching.

use tql_core::{InternalError, Value};

use super::bytecode::{BytecodeChunk, ConstantPool, Instruction};

/// Offset of a jump whose target is patched later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpLabel(pub usize);

const PLACEHOLDER: u32 = u32::MAX;

/// Emits one function's chunk against the executable's constant pool.
pub struct BytecodeEmitter<'p> {
    chunk: BytecodeChunk,
    constants: &'p mut ConstantPool,
    line: u32,
}

impl<'p> BytecodeEmitter<'p> {
    pub fn new(constants: &'p mut ConstantPool, debug_info: bool) -> Self {
        Self {
            chunk: BytecodeChunk::new(debug_info),
            constants,
            line: 0,
        }
    }

    /// Line recorded for subsequent instructions; returns the previous one.
    pub fn set_line(&mut self, line: u32) -> u32 {
        std::mem::replace(&mut self.line, line)
    }

    pub fn emit(&mut self, instruction: Instruction) {
        self.chunk.write(instruction, self.line);
    }

    pub fn emit_constant(&mut self, value: Value) {
        if value.is_void() {
            self.emit(Instruction::PushVoid);
        } else {
            let index = self.constants.add(value);
            self.emit(Instruction::Constant(index));
        }
    }

    pub fn constants(&mut self) -> &mut ConstantPool {
        self.constants
    }

    pub fn current_offset(&self) -> usize {
        self.chunk.current_offset()
    }

    /// Emit a jump-like instruction whose target is filled in by
    /// [`patch_jump`](Self::patch_jump).
    pub fn emit_jump(&mut self, instruction: Instruction) -> JumpLabel {
        let label = JumpLabel(self.chunk.current_offset());
        self.emit(instruction);
        label
    }

    pub fn jump(&mut self) -> JumpLabel {
        self.emit_jump(Instruction::Jump(PLACEHOLDER))
    }

    pub fn jump_if_false(&mut self) -> JumpLabel {
        self.emit_jump(Instruction::JumpIfFalse(PLACEHOLDER))
    }

    pub fn iter_next(&mut self, items: u32, index: u32, variable: u32) -> JumpLabel {
        self.emit_jump(Instruction::IterNext {
            items,
            index,
            variable,
            exit: PLACEHOLDER,
        })
    }

    /// Point the jump at `label` to the current offset.
    pub fn patch_jump(&mut self, label: JumpLabel) -> Result<(), InternalError> {
        let target = self.chunk.current_offset() as u32;
        match self.chunk.get_mut(label.0) {
            Some(Instruction::Jump(t)) | Some(Instruction::JumpIfFalse(t)) => *t = target,
            Some(Instruction::IterNext { exit, .. }) => *exit = target,
            other => {
                return Err(InternalError::invariant(format!(
                    "cannot patch {other:?} at offset {}",
                    label.0
                )));
            }
        }
        Ok(())
    }

    /// Jump back to `start`.
    pub fn emit_loop(&mut self, start: usize) {
        self.emit(Instruction::Jump(start as u32));
    }

    pub fn finish(mut self) -> BytecodeChunk {
        self.emit(Instruction::Return);
        self.chunk
    }
}
