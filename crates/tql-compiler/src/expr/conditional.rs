//! `if` and `case` expressions.
//!
//! Branches are unified to one result type: each branch either converts to
//! the current common type or widens it. `if` prefers the hint when both
//! branches convert to it.

use tql_ast::{BinaryOp, CaseExpr, IfExpr};
use tql_core::{CompilerError, CompilerErrorKind, Result, Span};

use super::compile_value;
use crate::Characteristic;
use crate::compiler::Compiler;
use crate::context::ExprContext;
use crate::frame::FrameId;
use crate::ir::Ir;
use crate::types::conversion::can_convert;
use crate::types::{BaseType, operators};

pub fn compile_if(
    compiler: &mut Compiler<'_>,
    expr: &IfExpr<'_>,
    frame: FrameId,
    hint: Option<&BaseType>,
) -> Result<ExprContext> {
    let test = compile_value(compiler, expr.test, frame, None)?;
    require_boolean(&test, expr.test.span())?;
    let then = compile_value(compiler, expr.then_expr, frame, hint)?;
    let otherwise = compile_value(compiler, expr.else_expr, frame, hint)?;

    let target = match hint {
        Some(hint) if can_convert(&then.ty, hint) && can_convert(&otherwise.ty, hint) => hint.clone(),
        _ => common_type(&then.ty, &otherwise.ty).ok_or_else(|| {
            CompilerError::incorrect_type(expr.else_expr.span(), &otherwise.ty, &then.ty)
        })?,
    };

    let characteristic = Characteristic::merge_all([test.characteristic, then.characteristic, otherwise.characteristic]);
    let test = test.into_get(expr.test.span())?;
    let then = compiler.convert(then, &target, expr.then_expr.span())?.into_get(expr.then_expr.span())?;
    let otherwise = compiler
        .convert(otherwise, &target, expr.else_expr.span())?
        .into_get(expr.else_expr.span())?;
    Ok(ExprContext::value(target, characteristic, Ir::if_(test, then, otherwise)))
}

/// Compile a `case`.
///
/// With a test expression (selector form) the test is evaluated once into a
/// local and compared to each `when` for equality; either `strict` with no
/// `else`, or non-strict with an `else`. Without a test (conditional form)
/// each `when` is a Boolean and `else` is required. An unmatched strict case
/// fails at run time.
pub fn compile_case(
    compiler: &mut Compiler<'_>,
    expr: &CaseExpr<'_>,
    frame: FrameId,
    hint: Option<&BaseType>,
) -> Result<ExprContext> {
    check_form(expr)?;

    let mut characteristic = Characteristic::CONSTANT;
    let mut prelude = Vec::new();
    let selector = match expr.test {
        Some(test) => {
            let ctx = compile_value(compiler, test, frame, None)?;
            characteristic = characteristic.merge(ctx.characteristic);
            let ty = ctx.ty.clone();
            let slot = compiler.allocate_local()?;
            prelude.push(Ir::store(slot, ctx.into_get(test.span())?));
            Some((ty, slot))
        }
        None => None,
    };

    let mut conditions = Vec::with_capacity(expr.items.len());
    let mut branches = Vec::with_capacity(expr.items.len());
    for item in expr.items {
        let condition = match &selector {
            Some((ty, slot)) => {
                let when = compile_value(compiler, item.when, frame, Some(ty))?;
                let test = ExprContext::value(ty.clone(), characteristic, Ir::Local(*slot));
                operators::compile_binary(BinaryOp::Equal, test, when, item.when.span())?
            }
            None => {
                let when = compile_value(compiler, item.when, frame, None)?;
                require_boolean(&when, item.when.span())?;
                when
            }
        };
        characteristic = characteristic.merge(condition.characteristic);
        conditions.push(condition.into_get(item.when.span())?);
        let then = compile_value(compiler, item.then, frame, hint)?;
        branches.push((then, item.then.span()));
    }
    let otherwise = match expr.else_expr {
        Some(else_expr) => Some((compile_value(compiler, else_expr, frame, hint)?, else_expr.span())),
        None => None,
    };

    // Selector form seeds the common type with `else`, the conditional form
    // with its first branch.
    let seed = match (&selector, &otherwise) {
        (Some(_), Some((ctx, _))) => Some(ctx.ty.clone()),
        _ => branches.first().map(|(ctx, _)| ctx.ty.clone()),
    };
    let mut target = seed.unwrap_or_default();
    for (ctx, span) in branches.iter().chain(otherwise.iter()) {
        target = widen(&target, &ctx.ty, *span)?;
    }
    if let Some(hint) = hint.filter(|hint| can_convert(&target, hint)) {
        target = hint.clone();
    }

    let mut result = match otherwise {
        Some((ctx, span)) => {
            characteristic = characteristic.merge(ctx.characteristic);
            compiler.convert(ctx, &target, span)?.into_get(span)?
        }
        None => Ir::Fail {
            message: format!("no case matched at {}", expr.span),
        },
    };
    let mut lowered = Vec::with_capacity(branches.len());
    for (ctx, span) in branches {
        characteristic = characteristic.merge(ctx.characteristic);
        lowered.push(compiler.convert(ctx, &target, span)?.into_get(span)?);
    }
    for (condition, then) in conditions.into_iter().zip(lowered).rev() {
        result = Ir::if_(condition, then, result);
    }
    Ok(ExprContext::value(target, characteristic, Ir::block(prelude, result)))
}

fn check_form(expr: &CaseExpr<'_>) -> Result<()> {
    let message = match (expr.test.is_some(), expr.is_strict, expr.else_expr.is_some()) {
        (_, true, true) => "a strict case cannot have an else",
        (true, false, false) => "a non-strict case needs an else",
        (false, true, _) => "a case without a test cannot be strict",
        (false, false, false) => "a case without a test needs an else",
        _ => return Ok(()),
    };
    Err(CompilerError::new(CompilerErrorKind::InvalidCaseForm, expr.span, message).into())
}

fn require_boolean(ctx: &ExprContext, span: Span) -> Result<()> {
    if ctx.is_boolean() {
        Ok(())
    } else {
        Err(CompilerError::incorrect_type(span, &ctx.ty, &BaseType::BOOLEAN).into())
    }
}

/// The type both `a` and `b` convert to, preferring `a`.
fn common_type(a: &BaseType, b: &BaseType) -> Option<BaseType> {
    if can_convert(b, a) {
        Some(a.clone())
    } else if can_convert(a, b) {
        Some(b.clone())
    } else {
        None
    }
}

fn widen(current: &BaseType, next: &BaseType, span: Span) -> Result<BaseType> {
    common_type(current, next).ok_or_else(|| CompilerError::incorrect_type(span, next, current).into())
}
