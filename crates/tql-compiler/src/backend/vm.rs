//! Stack virtual machine.
//!
//! Each invocation of an executable creates its own [`Vm`]; the program is
//! shared and immutable. Script functions run in their own frame of locals,
//! with calls bounded by a depth limit.

use std::collections::BTreeSet;
use std::sync::Arc;

use tql_core::{FunctionRef, InternalError, Repository, RepositoryFactory, RuntimeError, TupleValue, Value};

use super::bytecode::Instruction;
use super::ops;
use super::{Arguments, CompiledFunction, Program};
use crate::ir::UnaryInstr;

type Result<T> = std::result::Result<T, RuntimeError>;

/// Default bound on nested script function calls.
pub const DEFAULT_CALL_LIMIT: usize = 256;

pub struct Vm<'a> {
    program: &'a Program,
    host: &'a dyn RepositoryFactory,
    arguments: &'a Arguments,
    /// Repositories per module binding, filled by `BindModule`.
    modules: Vec<Option<Vec<Arc<dyn Repository>>>>,
    depth: usize,
    call_limit: usize,
}

fn missing(kind: &'static str, index: u32) -> RuntimeError {
    RuntimeError::Internal(InternalError::UnknownSlot { kind, index })
}

impl<'a> Vm<'a> {
    pub fn new(program: &'a Program, host: &'a dyn RepositoryFactory, arguments: &'a Arguments) -> Self {
        Self {
            program,
            host,
            arguments,
            modules: vec![None; program.modules.len()],
            depth: 0,
            call_limit: DEFAULT_CALL_LIMIT,
        }
    }

    pub fn with_call_limit(mut self, limit: usize) -> Self {
        self.call_limit = limit;
        self
    }

    /// Run the program's entry point.
    pub fn run(&mut self) -> Result<Value> {
        self.call_script(self.program.main, Vec::new())
    }

    fn call_script(&mut self, id: u32, arguments: Vec<Value>) -> Result<Value> {
        if self.depth >= self.call_limit {
            return Err(RuntimeError::StackOverflow { limit: self.call_limit });
        }
        let program = self.program;
        let function = program.functions.get(id as usize).ok_or_else(|| missing("function", id))?;
        if arguments.len() != function.arity as usize {
            return Err(RuntimeError::Internal(InternalError::invariant(format!(
                "'{}' expects {} arguments, got {}",
                function.name,
                function.arity,
                arguments.len()
            ))));
        }
        let mut locals = arguments;
        locals.resize(function.locals as usize, Value::Void);

        self.depth += 1;
        let result = self.execute(function, &mut locals);
        self.depth -= 1;
        result
    }

    fn call_native(&mut self, id: u32, arguments: &[Value]) -> Result<Value> {
        let native = self.program.natives.get(id as usize).ok_or_else(|| missing("native function", id))?;
        native.invoke(arguments)
    }

    fn call_value(&mut self, function: Value, arguments: Vec<Value>) -> Result<Value> {
        match function {
            Value::Function(FunctionRef::Script(id)) => self.call_script(id, arguments),
            Value::Function(FunctionRef::Native(id)) => self.call_native(id, &arguments),
            other => Err(RuntimeError::type_mismatch("Function", &other)),
        }
    }

    fn repository(&self, module: u32, variable: u32) -> Result<&Arc<dyn Repository>> {
        self.modules
            .get(module as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| missing("bound module", module))?
            .get(variable as usize)
            .ok_or_else(|| missing("module variable", variable))
    }

    fn execute(&mut self, function: &CompiledFunction, locals: &mut [Value]) -> Result<Value> {
        let mut stack: Vec<Value> = Vec::new();
        let mut pc = 0usize;
        loop {
            let instruction = function
                .chunk
                .get(pc)
                .ok_or_else(|| missing("instruction", pc as u32))?;
            let at = pc;
            pc += 1;
            match self.step(instruction, &mut stack, locals, &mut pc) {
                Ok(Some(result)) => return Ok(result),
                Ok(None) => {}
                Err(error) => return Err(tag_line(error, function, at)),
            }
        }
    }

    /// Execute one instruction; `Some` when the function returns.
    fn step(
        &mut self,
        instruction: &Instruction,
        stack: &mut Vec<Value>,
        locals: &mut [Value],
        pc: &mut usize,
    ) -> Result<Option<Value>> {
        let program = self.program;
        let constants = &program.constants;
        match instruction {
            Instruction::Constant(index) => {
                let value = constants.get(*index).ok_or_else(|| missing("constant", *index))?;
                stack.push(value.clone());
            }
            Instruction::PushVoid => stack.push(Value::Void),
            Instruction::Pop => {
                pop(stack)?;
            }
            Instruction::LoadLocal(local) => {
                let value = locals.get(*local as usize).ok_or_else(|| missing("local", *local))?;
                stack.push(value.clone());
            }
            Instruction::StoreLocal(local) => {
                let value = pop(stack)?;
                *local_mut(locals, *local)? = value;
            }
            Instruction::Negate => {
                let value = pop(stack)?;
                stack.push(ops::unary(UnaryInstr::Negate, value)?);
            }
            Instruction::Not => {
                let value = pop(stack)?;
                stack.push(ops::unary(UnaryInstr::Not, value)?);
            }
            Instruction::Binary(op) => {
                let right = pop(stack)?;
                let left = pop(stack)?;
                stack.push(ops::binary(*op, left, right)?);
            }
            Instruction::Convert(kind) => {
                let value = pop(stack)?;
                stack.push(ops::convert(*kind, value)?);
            }
            Instruction::Jump(target) => *pc = *target as usize,
            Instruction::JumpIfFalse(target) => match pop(stack)? {
                Value::Boolean(true) => {}
                Value::Boolean(false) => *pc = *target as usize,
                other => return Err(RuntimeError::type_mismatch("Boolean", &other)),
            },
            Instruction::Fail(index) => {
                let message = constants
                    .get(*index)
                    .and_then(Value::as_str)
                    .unwrap_or("unmatched case")
                    .to_string();
                return Err(RuntimeError::UnhandledCase { message });
            }
            Instruction::MakeList(count) => {
                let items = pop_n(stack, *count)?;
                stack.push(Value::List(items));
            }
            Instruction::MakeSet(count) => {
                let items = pop_n(stack, *count)?;
                stack.push(Value::Set(items.into_iter().collect::<BTreeSet<_>>()));
            }
            Instruction::MakeTuple { layout, count } => {
                let names = constants.layout(*layout).ok_or_else(|| missing("tuple layout", *layout))?;
                let values = pop_n(stack, *count)?;
                stack.push(Value::Tuple(TupleValue::new(Arc::clone(names), values)));
            }
            Instruction::Attribute(index) => {
                let name = constants
                    .get(*index)
                    .and_then(Value::as_str)
                    .ok_or_else(|| missing("attribute name", *index))?;
                let value = match pop(stack)? {
                    Value::Tuple(tuple) => tuple.get(name).cloned().ok_or_else(|| {
                        RuntimeError::Internal(InternalError::invariant(format!("tuple has no attribute '{name}'")))
                    })?,
                    other => return Err(RuntimeError::type_mismatch("Tuple", &other)),
                };
                stack.push(value);
            }
            Instruction::Call(argc) => {
                let arguments = pop_n(stack, *argc)?;
                let function = pop(stack)?;
                let result = self.call_value(function, arguments)?;
                stack.push(result);
            }
            Instruction::CallNative { function, argc } => {
                let arguments = pop_n(stack, *argc)?;
                let result = self.call_native(*function, &arguments)?;
                stack.push(result);
            }
            Instruction::IterInit { items, index } => {
                let source = pop(stack)?;
                let elements = source
                    .elements()
                    .ok_or_else(|| RuntimeError::type_mismatch("List or Set", &source))?;
                *local_mut(locals, *items)? = Value::List(elements);
                *local_mut(locals, *index)? = Value::Int64(0);
            }
            Instruction::IterNext {
                items,
                index,
                variable,
                exit,
            } => {
                let position = match locals.get(*index as usize) {
                    Some(Value::Int64(i)) => *i as usize,
                    _ => return Err(missing("iteration index", *index)),
                };
                let next = match locals.get(*items as usize) {
                    Some(Value::List(elements)) => elements.get(position).cloned(),
                    _ => return Err(missing("iteration source", *items)),
                };
                match next {
                    Some(element) => {
                        *local_mut(locals, *variable)? = element;
                        *local_mut(locals, *index)? = Value::Int64(position as i64 + 1);
                    }
                    None => *pc = *exit as usize,
                }
            }
            Instruction::Append(collection) => {
                let value = pop(stack)?;
                match local_mut(locals, *collection)? {
                    Value::List(items) => items.push(value),
                    Value::Set(items) => {
                        items.insert(value);
                    }
                    other => return Err(RuntimeError::type_mismatch("List or Set", other)),
                }
            }
            Instruction::Initializer(index) => {
                let slot = constants.initializer(*index).ok_or_else(|| missing("initializer", *index))?;
                if let Some(value) = self.arguments.get(&slot.name) {
                    pop(stack)?;
                    let fitted = ops::coerce(value.clone(), &slot.ty).ok_or_else(|| RuntimeError::ArgumentType {
                        name: slot.name.clone(),
                        expected: slot.ty.to_string(),
                        found: value.kind_name(),
                    })?;
                    stack.push(fitted);
                }
            }
            Instruction::BindModule(slot) => {
                let binding = program.modules.get(*slot as usize).ok_or_else(|| missing("module", *slot))?;
                let repositories = binding
                    .variables
                    .iter()
                    .map(|v| self.host.repository(&binding.name, &v.name, &v.type_name))
                    .collect::<Result<Vec<_>>>()?;
                tracing::trace!(module = %binding.name, repositories = repositories.len(), "bound module");
                self.modules[*slot as usize] = Some(repositories);
            }
            Instruction::DeclareModule(slot) => {
                let binding = program.modules.get(*slot as usize).ok_or_else(|| missing("module", *slot))?;
                self.host.declare_module(&binding.declaration())?;
            }
            Instruction::RepositoryGet { module, variable } => {
                let value = self.repository(*module, *variable)?.get(None, None)?;
                stack.push(value);
            }
            Instruction::RepositorySet { module, variable } => {
                let value = pop(stack)?;
                self.repository(*module, *variable)?.set(None, value)?;
            }
            Instruction::Return => return Ok(Some(pop(stack)?)),
        }
        Ok(None)
    }
}

fn pop(stack: &mut Vec<Value>) -> Result<Value> {
    stack
        .pop()
        .ok_or_else(|| RuntimeError::Internal(InternalError::invariant("operand stack underflow")))
}

fn pop_n(stack: &mut Vec<Value>, count: u32) -> Result<Vec<Value>> {
    let count = count as usize;
    if stack.len() < count {
        return Err(RuntimeError::Internal(InternalError::invariant("operand stack underflow")));
    }
    Ok(stack.split_off(stack.len() - count))
}

fn local_mut(locals: &mut [Value], local: u32) -> Result<&mut Value> {
    locals.get_mut(local as usize).ok_or_else(|| missing("local", local))
}

fn tag_line(error: RuntimeError, function: &CompiledFunction, offset: usize) -> RuntimeError {
    if matches!(error, RuntimeError::AtLine { .. }) {
        return error;
    }
    match function.chunk.line_at(offset) {
        Some(line) => RuntimeError::AtLine {
            line,
            source: Box::new(error),
        },
        None => error,
    }
}
