//! Literal compilation.

use tql_ast::Literal;
use tql_core::Value;

use crate::context::ExprContext;
use crate::types::BaseType;

/// Literals are always constant; `null` is typed `Void` and converts to
/// anything.
pub fn compile_literal(literal: &Literal<'_>) -> ExprContext {
    let (ty, value) = match *literal {
        Literal::Null => (BaseType::Void, Value::Void),
        Literal::Boolean(b) => (BaseType::BOOLEAN, Value::Boolean(b)),
        Literal::Int32(v) => (BaseType::INT32, Value::Int32(v)),
        Literal::Int64(v) => (BaseType::INT64, Value::Int64(v)),
        Literal::Double(v) => (BaseType::DOUBLE, Value::double(v)),
        Literal::Char(c) => (BaseType::CHAR, Value::Char(c)),
        Literal::String(s) => (BaseType::STRING, Value::string(s)),
        Literal::DateTime(dt) => (BaseType::DATE_TIME, Value::DateTime(dt)),
        Literal::TimeSpan(ts) => (BaseType::TIME_SPAN, Value::TimeSpan(ts)),
    };
    ExprContext::constant(ty, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_types() {
        let ctx = compile_literal(&Literal::Int64(7));
        assert_eq!(ctx.ty, BaseType::INT64);
        assert!(ctx.characteristic.is_constant());
        assert_eq!(ctx.get.as_ref().and_then(|ir| ir.as_const()), Some(&Value::Int64(7)));

        let null = compile_literal(&Literal::Null);
        assert_eq!(null.ty, BaseType::Void);
    }
}
