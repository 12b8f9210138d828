//! Lowering of tree IR into bytecode.
//!
//! `value` leaves exactly one value on the stack; `effect` leaves none.
//! Loops allocate hidden locals past the compiler's own slots.

use tql_core::{InternalError, Value};

use super::bytecode::{BytecodeChunk, ConstantPool, InitializerSlot, Instruction};
use super::emit::BytecodeEmitter;
use crate::ir::{Ir, UnaryInstr};

type Result<T> = std::result::Result<T, InternalError>;

/// Lowered function body and the total number of locals it needs.
pub struct Lowered {
    pub chunk: BytecodeChunk,
    pub locals: u32,
}

/// Lower a function body whose compiler-allocated locals are `0..locals`.
pub fn lower_function(body: &Ir, locals: u32, constants: &mut ConstantPool, debug_info: bool) -> Result<Lowered> {
    let mut lowering = Lowering {
        emitter: BytecodeEmitter::new(constants, debug_info),
        declared: locals,
        locals,
    };
    lowering.value(body)?;
    let locals = lowering.locals;
    Ok(Lowered {
        chunk: lowering.emitter.finish(),
        locals,
    })
}

struct Lowering<'p> {
    emitter: BytecodeEmitter<'p>,
    /// Slots allocated by the compiler; IR may only name these.
    declared: u32,
    /// All slots, including hidden loop state.
    locals: u32,
}

impl<'p> Lowering<'p> {
    fn hidden_local(&mut self) -> u32 {
        let slot = self.locals;
        self.locals += 1;
        slot
    }

    fn check_local(&self, local: u32) -> Result<u32> {
        if local < self.declared {
            Ok(local)
        } else {
            Err(InternalError::UnknownSlot {
                kind: "local",
                index: local,
            })
        }
    }

    fn value(&mut self, ir: &Ir) -> Result<()> {
        match ir {
            Ir::Const(value) => self.emitter.emit_constant(value.clone()),
            Ir::Local(local) => {
                let local = self.check_local(*local)?;
                self.emitter.emit(Instruction::LoadLocal(local));
            }
            Ir::Block { body, result } => {
                for statement in body {
                    self.effect(statement)?;
                }
                self.value(result)?;
            }
            Ir::Unary { op, operand } => {
                self.value(operand)?;
                self.emitter.emit(match op {
                    UnaryInstr::Negate => Instruction::Negate,
                    UnaryInstr::Not => Instruction::Not,
                });
            }
            Ir::Binary { op, left, right } => {
                self.value(left)?;
                self.value(right)?;
                self.emitter.emit(Instruction::Binary(*op));
            }
            Ir::Convert { kind, value } => {
                self.value(value)?;
                self.emitter.emit(Instruction::Convert(*kind));
            }
            Ir::If { test, then, otherwise } => {
                self.value(test)?;
                let else_label = self.emitter.jump_if_false();
                self.value(then)?;
                let end_label = self.emitter.jump();
                self.emitter.patch_jump(else_label)?;
                self.value(otherwise)?;
                self.emitter.patch_jump(end_label)?;
            }
            Ir::Fail { message } => {
                let index = self.emitter.constants().add(Value::String(message.clone()));
                self.emitter.emit(Instruction::Fail(index));
            }
            Ir::MakeList(items) => {
                for item in items {
                    self.value(item)?;
                }
                self.emitter.emit(Instruction::MakeList(items.len() as u32));
            }
            Ir::MakeSet(items) => {
                for item in items {
                    self.value(item)?;
                }
                self.emitter.emit(Instruction::MakeSet(items.len() as u32));
            }
            Ir::MakeTuple { names, values } => {
                if names.len() != values.len() {
                    return Err(InternalError::invariant("tuple layout does not match its values"));
                }
                for value in values {
                    self.value(value)?;
                }
                let layout = self.emitter.constants().add_layout(names.clone());
                self.emitter.emit(Instruction::MakeTuple {
                    layout,
                    count: values.len() as u32,
                });
            }
            Ir::Attribute { tuple, name } => {
                self.value(tuple)?;
                let index = self.emitter.constants().add(Value::String(name.clone()));
                self.emitter.emit(Instruction::Attribute(index));
            }
            Ir::Call { function, arguments } => {
                self.value(function)?;
                for argument in arguments {
                    self.value(argument)?;
                }
                self.emitter.emit(Instruction::Call(arguments.len() as u32));
            }
            Ir::CallNative { function, arguments } => {
                for argument in arguments {
                    self.value(argument)?;
                }
                self.emitter.emit(Instruction::CallNative {
                    function: *function,
                    argc: arguments.len() as u32,
                });
            }
            Ir::Initializer { name, ty, value } => {
                self.value(value)?;
                let index = self.emitter.constants().add_initializer(InitializerSlot {
                    name: name.clone(),
                    ty: ty.clone(),
                });
                self.emitter.emit(Instruction::Initializer(index));
            }
            Ir::RepositoryGet { module, variable } => {
                self.emitter.emit(Instruction::RepositoryGet {
                    module: *module,
                    variable: *variable,
                });
            }
            Ir::At { line, inner } => {
                let previous = self.emitter.set_line(*line);
                self.value(inner)?;
                self.emitter.set_line(previous);
            }
            Ir::Store { .. }
            | Ir::ForEach { .. }
            | Ir::Append { .. }
            | Ir::BindModule { .. }
            | Ir::DeclareModule { .. }
            | Ir::RepositorySet { .. } => {
                self.effect(ir)?;
                self.emitter.emit(Instruction::PushVoid);
            }
        }
        Ok(())
    }

    fn effect(&mut self, ir: &Ir) -> Result<()> {
        match ir {
            Ir::Const(_) => {}
            Ir::Store { local, value } => {
                let local = self.check_local(*local)?;
                self.value(value)?;
                self.emitter.emit(Instruction::StoreLocal(local));
            }
            Ir::Block { body, result } => {
                for statement in body {
                    self.effect(statement)?;
                }
                self.effect(result)?;
            }
            Ir::If { test, then, otherwise } => {
                self.value(test)?;
                let else_label = self.emitter.jump_if_false();
                self.effect(then)?;
                let end_label = self.emitter.jump();
                self.emitter.patch_jump(else_label)?;
                self.effect(otherwise)?;
                self.emitter.patch_jump(end_label)?;
            }
            Ir::ForEach { variable, source, body } => {
                let variable = self.check_local(*variable)?;
                self.value(source)?;
                let items = self.hidden_local();
                let index = self.hidden_local();
                self.emitter.emit(Instruction::IterInit { items, index });
                let start = self.emitter.current_offset();
                let exit = self.emitter.iter_next(items, index, variable);
                self.effect(body)?;
                self.emitter.emit_loop(start);
                self.emitter.patch_jump(exit)?;
            }
            Ir::Append { collection, value } => {
                let collection = self.check_local(*collection)?;
                self.value(value)?;
                self.emitter.emit(Instruction::Append(collection));
            }
            Ir::BindModule { module } => self.emitter.emit(Instruction::BindModule(*module)),
            Ir::DeclareModule { module } => self.emitter.emit(Instruction::DeclareModule(*module)),
            Ir::RepositorySet { module, variable, value } => {
                self.value(value)?;
                self.emitter.emit(Instruction::RepositorySet {
                    module: *module,
                    variable: *variable,
                });
            }
            Ir::At { line, inner } => {
                let previous = self.emitter.set_line(*line);
                self.effect(inner)?;
                self.emitter.set_line(previous);
            }
            other => {
                self.value(other)?;
                self.emitter.emit(Instruction::Pop);
            }
        }
        Ok(())
    }
}
