//! Binary and unary operator expressions, including `.` attribute access.

use tql_ast::{BinaryExpr, BinaryOp, Expr, UnaryExpr};
use tql_core::{CompilerError, CompilerErrorKind, Name, Result, Span};

use super::compile_value;
use crate::compiler::Compiler;
use crate::context::ExprContext;
use crate::frame::FrameId;
use crate::ir::Ir;
use crate::types::{BaseType, operators};

/// Compile a binary expression. The right operand is compiled with the left
/// operand's type as its hint.
pub fn compile_binary(compiler: &mut Compiler<'_>, expr: &BinaryExpr<'_>, frame: FrameId) -> Result<ExprContext> {
    if expr.op == BinaryOp::Dereference {
        return compile_dereference(compiler, expr, frame);
    }
    let left = compile_value(compiler, expr.left, frame, None)?;
    let right = compile_value(compiler, expr.right, frame, Some(&left.ty))?;
    Ok(operators::compile_binary(expr.op, left, right, expr.span)?)
}

pub fn compile_unary(compiler: &mut Compiler<'_>, expr: &UnaryExpr<'_>, frame: FrameId) -> Result<ExprContext> {
    let operand = compile_value(compiler, expr.operand, frame, None)?;
    Ok(operators::compile_unary(expr.op, operand, expr.span)?)
}

fn compile_dereference(compiler: &mut Compiler<'_>, expr: &BinaryExpr<'_>, frame: FrameId) -> Result<ExprContext> {
    let Expr::Ident(attribute) = expr.right else {
        return Err(CompilerError::new(
            CompilerErrorKind::IncorrectType,
            expr.right.span(),
            "right side of '.' must be an attribute name",
        )
        .into());
    };
    let mut ctx = compile_value(compiler, expr.left, frame, None)?;
    for component in attribute.to_name().components() {
        ctx = dereference(ctx, component, attribute.span)?;
    }
    Ok(ctx)
}

/// Read attribute `name` of a tuple-typed context.
pub(super) fn dereference(tuple: ExprContext, name: &str, span: Span) -> Result<ExprContext> {
    let attribute_ty = match &tuple.ty {
        BaseType::Tuple(t) => t
            .attribute(name)
            .cloned()
            .ok_or_else(|| CompilerError::identifier_not_found(span, &Name::simple(name)))?,
        other => return Err(CompilerError::incorrect_type(span, other, "a tuple").into()),
    };
    let characteristic = tuple.characteristic;
    let get = tuple.into_get(span)?;
    Ok(ExprContext::value(
        attribute_ty,
        characteristic,
        Ir::Attribute {
            tuple: Box::new(get),
            name: name.to_string(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tql_ast::{AstBuilder, Script, UnaryOp};
    use tql_core::{CompilerErrorKind, NoStorage, Value};

    use super::*;
    use crate::{Arguments, CompilerOptions, compile};

    fn eval(script: &Script<'_>) -> Result<(Value, BaseType)> {
        let output = compile(script, CompilerOptions::default())?;
        let value = output.executable.invoke(&Arguments::new(), &NoStorage)?;
        Ok((value, output.result_type))
    }

    #[test]
    fn arithmetic_with_promotion() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let expr = b.binary(b.int(2), BinaryOp::Multiply, b.binary(b.long(3), BinaryOp::Add, b.double(0.5)));
        assert_eq!(eval(b.query(expr)).unwrap(), (Value::double(7.0), BaseType::DOUBLE));
    }

    #[test]
    fn string_concatenation_with_char() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let expr = b.binary(b.string("ab"), BinaryOp::Add, b.char('c'));
        assert_eq!(eval(b.query(expr)).unwrap(), (Value::from("abc"), BaseType::STRING));
    }

    #[test]
    fn short_circuit_and() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        // The right side would divide by zero if evaluated.
        let expr = b.binary(
            b.boolean(false),
            BinaryOp::And,
            b.binary(b.binary(b.int(1), BinaryOp::Divide, b.int(0)), BinaryOp::Equal, b.int(1)),
        );
        assert_eq!(eval(b.query(expr)).unwrap().0, Value::Boolean(false));
    }

    #[test]
    fn membership_and_negation() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let expr = b.unary(
            UnaryOp::Not,
            b.binary(b.int(4), BinaryOp::In, b.set(vec![b.int(1), b.int(2)])),
        );
        assert_eq!(eval(b.query(expr)).unwrap().0, Value::Boolean(true));
    }

    #[test]
    fn attribute_access() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let tuple = b.tuple(vec![(Some("name"), b.string("Ann")), (Some("age"), b.int(41))]);
        let (value, ty) = eval(b.query(b.attribute(tuple, "age"))).unwrap();
        assert_eq!(value, Value::Int32(41));
        assert_eq!(ty, BaseType::INT32);
    }

    #[test]
    fn missing_attribute() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let tuple = b.tuple(vec![(Some("name"), b.string("Ann"))]);
        let err = eval(b.query(b.attribute(tuple, "age"))).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::IdentifierNotFound));
    }

    #[test]
    fn attribute_of_scalar() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let err = eval(b.query(b.attribute(b.int(1), "x"))).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::IncorrectType));
    }

    #[test]
    fn mismatched_operands() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let err = eval(b.query(b.binary(b.boolean(true), BinaryOp::Add, b.int(1)))).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::IncorrectType));
    }

    #[test]
    fn division_by_zero_at_run_time() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let err = eval(b.query(b.binary(b.int(1), BinaryOp::Divide, b.int(0)))).unwrap_err();
        assert!(matches!(err, tql_core::Error::Runtime(ref e) if *e.root() == tql_core::RuntimeError::DivisionByZero));
    }
}
