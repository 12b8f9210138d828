//! Operator typing.
//!
//! Binary operators dispatch on the left operand's type, unary operators on
//! the operand's type. Equality and membership are defined for every type and
//! handled before dispatch. `and`/`or` lower to conditionals so the right
//! operand is evaluated only when needed.

use tql_ast::{BinaryOp, UnaryOp};
use tql_core::{CompilerError, CompilerErrorKind, Span};

use super::conversion::{find_conversion, promote_numeric};
use super::{BaseType, ScalarKind};
use crate::context::ExprContext;
use crate::ir::{BinaryInstr, Ir, UnaryInstr};

type Result<T> = std::result::Result<T, CompilerError>;

fn no_operator(op: impl std::fmt::Display, left: &BaseType, right: Option<&BaseType>, span: Span) -> CompilerError {
    let message = match right {
        Some(right) => format!("operator '{op}' is not defined for {left} and {right}"),
        None => format!("operator '{op}' is not defined for {left}"),
    };
    CompilerError::new(CompilerErrorKind::IncorrectType, span, message)
}

fn instr(op: BinaryOp) -> Option<BinaryInstr> {
    Some(match op {
        BinaryOp::Add => BinaryInstr::Add,
        BinaryOp::Subtract => BinaryInstr::Subtract,
        BinaryOp::Multiply => BinaryInstr::Multiply,
        BinaryOp::Divide => BinaryInstr::Divide,
        BinaryOp::Modulo => BinaryInstr::Modulo,
        BinaryOp::Power => BinaryInstr::Power,
        BinaryOp::Equal => BinaryInstr::Equal,
        BinaryOp::NotEqual => BinaryInstr::NotEqual,
        BinaryOp::Less => BinaryInstr::Less,
        BinaryOp::LessOrEqual => BinaryInstr::LessOrEqual,
        BinaryOp::Greater => BinaryInstr::Greater,
        BinaryOp::GreaterOrEqual => BinaryInstr::GreaterOrEqual,
        BinaryOp::Xor => BinaryInstr::Xor,
        BinaryOp::In => BinaryInstr::In,
        BinaryOp::And | BinaryOp::Or | BinaryOp::Dereference => return None,
    })
}

/// Convert `ctx` to `target` and return its value IR.
fn coerce(ctx: ExprContext, target: &BaseType, span: Span) -> Result<Ir> {
    let conversion = find_conversion(&ctx.ty, target)
        .ok_or_else(|| CompilerError::incorrect_type(span, &ctx.ty, target))?;
    ctx.converted(conversion, target.clone()).into_get(span)
}

/// The type both operands convert to, preferring the right operand's type.
fn common_type(left: &BaseType, right: &BaseType) -> Option<BaseType> {
    if find_conversion(left, right).is_some() {
        Some(right.clone())
    } else if find_conversion(right, left).is_some() {
        Some(left.clone())
    } else {
        None
    }
}

/// Type a binary operation. `.` is resolved by the caller.
pub fn compile_binary(op: BinaryOp, left: ExprContext, right: ExprContext, span: Span) -> Result<ExprContext> {
    match op {
        BinaryOp::Equal | BinaryOp::NotEqual => return equality(op, left, right, span),
        BinaryOp::In => return membership(left, right, span),
        _ => {}
    }
    match left.ty.clone() {
        BaseType::Scalar(kind) => scalar_binary(kind, op, left, right, span),
        BaseType::List(_) | BaseType::Set(_) => collection_binary(op, left, right, span),
        other => Err(no_operator(op, &other, Some(&right.ty), span)),
    }
}

fn equality(op: BinaryOp, left: ExprContext, right: ExprContext, span: Span) -> Result<ExprContext> {
    let target = common_type(&left.ty, &right.ty)
        .ok_or_else(|| no_operator(op, &left.ty, Some(&right.ty), span))?;
    let characteristic = left.characteristic.merge(right.characteristic);
    let l = coerce(left, &target, span)?;
    let r = coerce(right, &target, span)?;
    let instr = if op == BinaryOp::Equal {
        BinaryInstr::Equal
    } else {
        BinaryInstr::NotEqual
    };
    Ok(ExprContext::value(BaseType::BOOLEAN, characteristic, Ir::binary(instr, l, r)))
}

fn membership(left: ExprContext, right: ExprContext, span: Span) -> Result<ExprContext> {
    let element = right
        .ty
        .element()
        .cloned()
        .ok_or_else(|| no_operator(BinaryOp::In, &left.ty, Some(&right.ty), span))?;
    let characteristic = left.characteristic.merge(right.characteristic);
    let l = coerce(left, &element, span)?;
    let r = right.into_get(span)?;
    Ok(ExprContext::value(BaseType::BOOLEAN, characteristic, Ir::binary(BinaryInstr::In, l, r)))
}

fn scalar_binary(kind: ScalarKind, op: BinaryOp, left: ExprContext, right: ExprContext, span: Span) -> Result<ExprContext> {
    let characteristic = left.characteristic.merge(right.characteristic);
    let right_kind = right.ty.scalar();
    let fail = |l: &BaseType, r: &BaseType| no_operator(op, l, Some(r), span);

    match op {
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
            if kind != ScalarKind::Boolean || right_kind != Some(ScalarKind::Boolean) {
                return Err(fail(&left.ty, &right.ty));
            }
            let (l, r) = (left.into_get(span)?, right.into_get(span)?);
            let ir = match op {
                BinaryOp::And => Ir::if_(l, r, Ir::boolean(false)),
                BinaryOp::Or => Ir::if_(l, Ir::boolean(true), r),
                _ => Ir::binary(BinaryInstr::Xor, l, r),
            };
            Ok(ExprContext::value(BaseType::BOOLEAN, characteristic, ir))
        }

        BinaryOp::Less | BinaryOp::LessOrEqual | BinaryOp::Greater | BinaryOp::GreaterOrEqual => {
            let target = common_type(&left.ty, &right.ty)
                .filter(|t| t.scalar().is_some_and(ScalarKind::is_ordered))
                .ok_or_else(|| fail(&left.ty, &right.ty))?;
            let (l, r) = (coerce(left, &target, span)?, coerce(right, &target, span)?);
            let instr = instr(op).ok_or_else(|| fail(&target, &target))?;
            Ok(ExprContext::value(BaseType::BOOLEAN, characteristic, Ir::binary(instr, l, r)))
        }

        BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo | BinaryOp::Power => {
            let right_kind = right_kind.ok_or_else(|| fail(&left.ty, &right.ty))?;
            let instr = instr(op).ok_or_else(|| fail(&left.ty, &right.ty))?;

            if let Some(promoted) = promote_numeric(kind, right_kind) {
                let target = BaseType::Scalar(promoted);
                let (l, r) = (coerce(left, &target, span)?, coerce(right, &target, span)?);
                return Ok(ExprContext::value(target, characteristic, Ir::binary(instr, l, r)));
            }

            let result = match (kind, op, right_kind) {
                (ScalarKind::String | ScalarKind::Char, BinaryOp::Add, ScalarKind::String | ScalarKind::Char) => {
                    let target = BaseType::STRING;
                    let (l, r) = (coerce(left, &target, span)?, coerce(right, &target, span)?);
                    return Ok(ExprContext::value(target, characteristic, Ir::binary(instr, l, r)));
                }
                (ScalarKind::DateTime, BinaryOp::Add | BinaryOp::Subtract, ScalarKind::TimeSpan) => BaseType::DATE_TIME,
                (ScalarKind::DateTime, BinaryOp::Subtract, ScalarKind::DateTime) => BaseType::TIME_SPAN,
                (ScalarKind::TimeSpan, BinaryOp::Add | BinaryOp::Subtract, ScalarKind::TimeSpan) => BaseType::TIME_SPAN,
                _ => return Err(fail(&left.ty, &right.ty)),
            };
            let (l, r) = (left.into_get(span)?, right.into_get(span)?);
            Ok(ExprContext::value(result, characteristic, Ir::binary(instr, l, r)))
        }

        _ => Err(fail(&left.ty, &right.ty)),
    }
}

fn collection_binary(op: BinaryOp, left: ExprContext, right: ExprContext, span: Span) -> Result<ExprContext> {
    let allowed = match (&left.ty, op) {
        (BaseType::List(_), BinaryOp::Add) => true,
        (BaseType::Set(_), BinaryOp::Add | BinaryOp::Subtract) => true,
        _ => false,
    };
    if !allowed {
        return Err(no_operator(op, &left.ty, Some(&right.ty), span));
    }
    let target = left.ty.clone();
    let characteristic = left.characteristic.merge(right.characteristic);
    let instr = instr(op).ok_or_else(|| no_operator(op, &target, Some(&right.ty), span))?;
    let l = left.into_get(span)?;
    let r = coerce(right, &target, span)?;
    Ok(ExprContext::value(target, characteristic, Ir::binary(instr, l, r)))
}

/// Type a unary operation.
pub fn compile_unary(op: UnaryOp, operand: ExprContext, span: Span) -> Result<ExprContext> {
    let valid = match (&operand.ty, op) {
        (BaseType::Scalar(kind), UnaryOp::Negate) => kind.is_numeric() || *kind == ScalarKind::TimeSpan,
        (BaseType::Scalar(ScalarKind::Boolean), UnaryOp::Not) => true,
        _ => false,
    };
    if !valid {
        return Err(no_operator(op, &operand.ty, None, span));
    }
    let instr = match op {
        UnaryOp::Negate => UnaryInstr::Negate,
        UnaryOp::Not => UnaryInstr::Not,
    };
    let ty = operand.ty.clone();
    let characteristic = operand.characteristic;
    let ir = Ir::Unary {
        op: instr,
        operand: Box::new(operand.into_get(span)?),
    };
    Ok(ExprContext::value(ty, characteristic, ir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Characteristic;
    use tql_core::Value;

    fn lit(ty: BaseType, value: Value) -> ExprContext {
        ExprContext::constant(ty, value)
    }

    fn var(ty: BaseType) -> ExprContext {
        ExprContext::value(ty, Characteristic::default(), Ir::Local(0))
    }

    #[test]
    fn arithmetic_promotes() {
        let ctx = compile_binary(
            BinaryOp::Add,
            lit(BaseType::INT32, Value::Int32(1)),
            lit(BaseType::DOUBLE, Value::double(2.0)),
            Span::default(),
        )
        .unwrap();
        assert_eq!(ctx.ty, BaseType::DOUBLE);
        assert!(ctx.characteristic.is_constant());
    }

    #[test]
    fn comparison_yields_boolean() {
        let ctx = compile_binary(BinaryOp::Less, var(BaseType::INT64), lit(BaseType::INT32, Value::Int32(3)), Span::default())
            .unwrap();
        assert_eq!(ctx.ty, BaseType::BOOLEAN);
        assert!(!ctx.characteristic.is_constant());
    }

    #[test]
    fn string_plus_int_rejected() {
        let err = compile_binary(
            BinaryOp::Add,
            lit(BaseType::STRING, Value::from("a")),
            lit(BaseType::INT32, Value::Int32(1)),
            Span::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind, CompilerErrorKind::IncorrectType);
    }

    #[test]
    fn and_lowers_to_conditional() {
        let ctx = compile_binary(BinaryOp::And, var(BaseType::BOOLEAN), var(BaseType::BOOLEAN), Span::default()).unwrap();
        assert!(matches!(ctx.get, Some(Ir::If { .. })));
    }

    #[test]
    fn equality_across_optional() {
        let ctx = compile_binary(
            BinaryOp::Equal,
            var(BaseType::optional(BaseType::INT32)),
            lit(BaseType::Void, Value::Void),
            Span::default(),
        )
        .unwrap();
        assert_eq!(ctx.ty, BaseType::BOOLEAN);
    }

    #[test]
    fn membership_requires_collection() {
        let ok = compile_binary(BinaryOp::In, var(BaseType::INT32), var(BaseType::set(BaseType::INT64)), Span::default());
        assert!(ok.is_ok());
        let err = compile_binary(BinaryOp::In, var(BaseType::INT32), var(BaseType::INT32), Span::default()).unwrap_err();
        assert_eq!(err.kind, CompilerErrorKind::IncorrectType);
    }

    #[test]
    fn set_difference_and_list_concat() {
        let set = BaseType::set(BaseType::INT32);
        assert!(compile_binary(BinaryOp::Subtract, var(set.clone()), var(set.clone()), Span::default()).is_ok());
        let list = BaseType::list(BaseType::INT32);
        assert!(compile_binary(BinaryOp::Subtract, var(list.clone()), var(list), Span::default()).is_err());
    }

    #[test]
    fn date_arithmetic() {
        let ctx = compile_binary(BinaryOp::Subtract, var(BaseType::DATE_TIME), var(BaseType::DATE_TIME), Span::default())
            .unwrap();
        assert_eq!(ctx.ty, BaseType::TIME_SPAN);
    }

    #[test]
    fn unary_rules() {
        assert!(compile_unary(UnaryOp::Not, var(BaseType::BOOLEAN), Span::default()).is_ok());
        assert!(compile_unary(UnaryOp::Negate, var(BaseType::TIME_SPAN), Span::default()).is_ok());
        assert!(compile_unary(UnaryOp::Not, var(BaseType::INT32), Span::default()).is_err());
    }
}
