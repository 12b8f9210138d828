//! Expression contexts: the result of compiling an expression or resolving
//! a symbol.

use tql_core::{CompilerError, CompilerErrorKind, Span, Value};

use crate::Characteristic;
use crate::ir::{FunctionId, Ir, LocalId, ModuleSlot, NativeId};
use crate::types::{BaseType, Conversion, ScalarKind};

/// Where an assignment writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetTarget {
    Local(LocalId),
    Repository { module: ModuleSlot, variable: u32 },
}

impl SetTarget {
    /// The IR that stores `value` into this target.
    pub fn store(self, value: Ir) -> Ir {
        match self {
            SetTarget::Local(local) => Ir::store(local, value),
            SetTarget::Repository { module, variable } => Ir::RepositorySet {
                module,
                variable,
                value: Box::new(value),
            },
        }
    }
}

/// A statically known callee.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionHandle {
    /// A compiled function selector, with the characteristic of its body.
    Script { id: FunctionId, body: Characteristic },
    /// A module function. Generic functions list their type parameters.
    Native {
        id: NativeId,
        type_parameters: Vec<String>,
    },
}

/// The compiled form of an expression.
///
/// A context without `get` denotes a type (typedef), not a value.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprContext {
    pub ty: BaseType,
    pub characteristic: Characteristic,
    pub get: Option<Ir>,
    pub set: Option<SetTarget>,
    pub function: Option<FunctionHandle>,
}

impl ExprContext {
    pub fn value(ty: BaseType, characteristic: Characteristic, get: Ir) -> Self {
        Self {
            ty,
            characteristic,
            get: Some(get),
            set: None,
            function: None,
        }
    }

    /// A compile-time constant.
    pub fn constant(ty: BaseType, value: Value) -> Self {
        Self::value(ty, Characteristic::CONSTANT, Ir::Const(value))
    }

    pub fn typedef(ty: BaseType) -> Self {
        Self {
            ty,
            characteristic: Characteristic::CONSTANT,
            get: None,
            set: None,
            function: None,
        }
    }

    /// A Void-typed effect, such as an assignment.
    pub fn statement(ir: Ir, characteristic: Characteristic) -> Self {
        Self::value(BaseType::Void, characteristic, ir)
    }

    pub fn with_set(mut self, target: SetTarget) -> Self {
        self.set = Some(target);
        self
    }

    pub fn with_function(mut self, handle: FunctionHandle) -> Self {
        self.function = Some(handle);
        self
    }

    pub fn is_type(&self) -> bool {
        self.get.is_none()
    }

    pub fn is_boolean(&self) -> bool {
        self.ty.scalar() == Some(ScalarKind::Boolean)
    }

    /// The value IR; a typedef used as a value is an error.
    pub fn into_get(self, span: Span) -> Result<Ir, CompilerError> {
        match self.get {
            Some(ir) => Ok(ir),
            None => Err(CompilerError::new(
                CompilerErrorKind::IncorrectTypeReferenced,
                span,
                format!("type {} used where a value is expected", self.ty),
            )),
        }
    }

    /// Apply a conversion found for this context, retyping it as `target`.
    pub fn converted(self, conversion: Conversion, target: BaseType) -> Self {
        let get = match (self.get, conversion.kind) {
            (Some(ir), Some(kind)) => Some(Ir::Convert {
                kind,
                value: Box::new(ir),
            }),
            (get, _) => get,
        };
        let function = if conversion.is_retype() { self.function } else { None };
        Self {
            ty: target,
            characteristic: self.characteristic,
            get,
            set: None,
            function,
        }
    }
}
