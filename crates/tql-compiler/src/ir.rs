//! Tree IR produced by the expression compiler.
//!
//! Every node evaluates to exactly one value. Nodes that exist only for
//! their effect (stores, loops, module binding) evaluate to `Void`; the
//! backend drops that value when the node is used as a statement.

use std::sync::Arc;

use tql_core::{Name, Value};

use crate::types::{BaseType, ConversionKind};

/// Local slot within one function's frame.
pub type LocalId = u32;
/// Index into the executable's script function table.
pub type FunctionId = u32;
/// Index into the executable's native function table.
pub type NativeId = u32;
/// Index into the executable's module binding table.
pub type ModuleSlot = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryInstr {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Xor,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryInstr {
    Negate,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ir {
    Const(Value),
    Local(LocalId),
    Store {
        local: LocalId,
        value: Box<Ir>,
    },
    /// Run `body` as statements, then evaluate `result`.
    Block {
        body: Vec<Ir>,
        result: Box<Ir>,
    },
    Unary {
        op: UnaryInstr,
        operand: Box<Ir>,
    },
    Binary {
        op: BinaryInstr,
        left: Box<Ir>,
        right: Box<Ir>,
    },
    Convert {
        kind: ConversionKind,
        value: Box<Ir>,
    },
    If {
        test: Box<Ir>,
        then: Box<Ir>,
        otherwise: Box<Ir>,
    },
    /// Abort execution with [`tql_core::RuntimeError::UnhandledCase`].
    Fail {
        message: String,
    },
    /// Items evaluated in order.
    MakeList(Vec<Ir>),
    MakeSet(Vec<Ir>),
    /// Values evaluated in layout order.
    MakeTuple {
        names: Arc<[String]>,
        values: Vec<Ir>,
    },
    Attribute {
        tuple: Box<Ir>,
        name: String,
    },
    /// Call a function value.
    Call {
        function: Box<Ir>,
        arguments: Vec<Ir>,
    },
    CallNative {
        function: NativeId,
        arguments: Vec<Ir>,
    },
    /// Bind each element of `source` to `variable` and run `body`.
    ForEach {
        variable: LocalId,
        source: Box<Ir>,
        body: Box<Ir>,
    },
    /// Add a value to the list or set held in `collection`.
    Append {
        collection: LocalId,
        value: Box<Ir>,
    },
    /// A `var` initializer: the host argument named `name` replaces `value`
    /// when supplied, after coercion to `ty`.
    Initializer {
        name: Name,
        ty: BaseType,
        value: Box<Ir>,
    },
    /// Construct the module instance and fetch its repositories.
    BindModule {
        module: ModuleSlot,
    },
    /// Announce a script-declared module to the host.
    DeclareModule {
        module: ModuleSlot,
    },
    RepositoryGet {
        module: ModuleSlot,
        variable: u32,
    },
    RepositorySet {
        module: ModuleSlot,
        variable: u32,
        value: Box<Ir>,
    },
    /// Source line marker, emitted only when debug info is requested.
    At {
        line: u32,
        inner: Box<Ir>,
    },
}

impl Ir {
    pub fn void() -> Ir {
        Ir::Const(Value::Void)
    }

    pub fn boolean(value: bool) -> Ir {
        Ir::Const(Value::Boolean(value))
    }

    pub fn block(body: Vec<Ir>, result: Ir) -> Ir {
        if body.is_empty() {
            return result;
        }
        Ir::Block {
            body,
            result: Box::new(result),
        }
    }

    pub fn if_(test: Ir, then: Ir, otherwise: Ir) -> Ir {
        Ir::If {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn binary(op: BinaryInstr, left: Ir, right: Ir) -> Ir {
        Ir::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn store(local: LocalId, value: Ir) -> Ir {
        Ir::Store {
            local,
            value: Box::new(value),
        }
    }

    /// Wrap in a line marker unless the line is unknown.
    pub fn at(self, line: u32) -> Ir {
        if line == 0 {
            return self;
        }
        Ir::At {
            line,
            inner: Box::new(self),
        }
    }

    /// The literal value, if this node is a constant.
    pub fn as_const(&self) -> Option<&Value> {
        match self {
            Ir::Const(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the node exists only for its effect and yields `Void`.
    pub fn is_effect(&self) -> bool {
        match self {
            Ir::Store { .. }
            | Ir::ForEach { .. }
            | Ir::Append { .. }
            | Ir::BindModule { .. }
            | Ir::DeclareModule { .. }
            | Ir::RepositorySet { .. } => true,
            Ir::At { inner, .. } => inner.is_effect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_block_collapses() {
        assert_eq!(Ir::block(vec![], Ir::boolean(true)), Ir::boolean(true));
    }

    #[test]
    fn unknown_line_is_not_marked() {
        assert_eq!(Ir::void().at(0), Ir::void());
        assert!(matches!(Ir::void().at(3), Ir::At { line: 3, .. }));
    }

    #[test]
    fn effects() {
        assert!(Ir::store(0, Ir::void()).is_effect());
        assert!(Ir::store(0, Ir::void()).at(2).is_effect());
        assert!(!Ir::Local(0).is_effect());
    }
}
