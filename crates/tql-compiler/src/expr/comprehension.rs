//! Claused expressions: `for`, `let`, `where` and the return expression.
//!
//! Without a `for` clause a claused expression is just its `let` bindings
//! followed by the expression. With one or more `for` clauses it becomes a
//! comprehension: nested loops over the sources, a `where` filter in the
//! innermost loop, per-iteration `let` bindings and an accumulator that
//! collects the return expression.
//!
//! ## Lowering
//!
//! ```text
//! acc := []                    // fresh on every evaluation
//! for x in xs:
//!     for y in ys:
//!         if where:
//!             let ...
//!             acc.append(expr)
//! acc
//! ```

use tql_ast::{ClausedExpr, LetClause};
use tql_core::{CompilerError, CompilerErrorKind, Result};

use super::compile_value;
use crate::Characteristic;
use crate::compiler::Compiler;
use crate::context::ExprContext;
use crate::frame::FrameId;
use crate::ir::{Ir, LocalId};
use crate::types::BaseType;

pub(crate) fn compile_claused(
    compiler: &mut Compiler<'_>,
    claused: &ClausedExpr<'_>,
    frame: FrameId,
    hint: Option<&BaseType>,
) -> Result<ExprContext> {
    if claused.for_clauses.is_empty() {
        compile_let_only(compiler, claused, frame, hint)
    } else {
        compile_comprehension(compiler, claused, frame, hint)
    }
}

fn compile_let_only(
    compiler: &mut Compiler<'_>,
    claused: &ClausedExpr<'_>,
    frame: FrameId,
    hint: Option<&BaseType>,
) -> Result<ExprContext> {
    if let Some(where_clause) = claused.where_clause {
        return Err(CompilerError::new(
            CompilerErrorKind::UnsupportedClause,
            where_clause.span(),
            "a where clause needs at least one for clause",
        )
        .into());
    }
    if claused.let_clauses.is_empty() {
        return compile_value(compiler, claused.expression, frame, hint);
    }

    let mut characteristic = Characteristic::CONSTANT;
    let (frame, statements) = compile_lets(compiler, claused.let_clauses, frame, &mut characteristic)?;
    let result = compile_value(compiler, claused.expression, frame, hint)?;
    let ty = result.ty.clone();
    let characteristic = characteristic.merge(result.characteristic);
    let result = result.into_get(claused.expression.span())?;
    Ok(ExprContext::value(ty, characteristic, Ir::block(statements, result)))
}

fn compile_comprehension(
    compiler: &mut Compiler<'_>,
    claused: &ClausedExpr<'_>,
    frame: FrameId,
    hint: Option<&BaseType>,
) -> Result<ExprContext> {
    let mut characteristic = Characteristic::CONSTANT;
    let mut all_sets = true;
    let mut loops: Vec<(LocalId, Ir)> = Vec::with_capacity(claused.for_clauses.len());
    let mut frame = frame;

    for clause in claused.for_clauses {
        let source = compile_value(compiler, clause.source, frame, None)?;
        let element = match &source.ty {
            BaseType::Set(element) => element.as_ref().clone(),
            BaseType::List(element) => {
                all_sets = false;
                element.as_ref().clone()
            }
            other => {
                return Err(CompilerError::new(
                    CompilerErrorKind::InvalidForExpressionTarget,
                    clause.source.span(),
                    format!("cannot iterate over a value of type {other}"),
                )
                .into());
            }
        };
        let source_characteristic = source.characteristic;
        characteristic = characteristic.merge(source_characteristic);

        frame = compiler.scopes.child(frame);
        let variable = compiler.allocate_local()?;
        compiler.define(
            frame,
            clause.name.to_name(),
            clause.name.span,
            ExprContext::value(element, source_characteristic, Ir::Local(variable)),
        )?;
        loops.push((variable, source.into_get(clause.source.span())?));
    }

    let test = match claused.where_clause {
        Some(where_clause) => {
            let ctx = compile_value(compiler, where_clause, frame, None)?;
            if !ctx.is_boolean() {
                return Err(CompilerError::incorrect_type(where_clause.span(), &ctx.ty, &BaseType::BOOLEAN).into());
            }
            characteristic = characteristic.merge(ctx.characteristic);
            Some(ctx.into_get(where_clause.span())?)
        }
        None => None,
    };

    let (frame, mut body) = compile_lets(compiler, claused.let_clauses, frame, &mut characteristic)?;

    let element_hint = hint.and_then(BaseType::element);
    let result = compile_value(compiler, claused.expression, frame, element_hint)?;
    characteristic = characteristic.merge(result.characteristic);
    let element = result.ty.clone();
    let result = result.into_get(claused.expression.span())?;

    let accumulator = compiler.allocate_local()?;
    body.push(Ir::Append {
        collection: accumulator,
        value: Box::new(result),
    });
    let mut body = Ir::block(body, Ir::void());
    if let Some(test) = test {
        body = Ir::if_(test, body, Ir::void());
    }
    for (variable, source) in loops.into_iter().rev() {
        body = Ir::ForEach {
            variable,
            source: Box::new(source),
            body: Box::new(body),
        };
    }

    let (ty, empty) = if all_sets {
        (BaseType::set(element), Ir::MakeSet(Vec::new()))
    } else {
        (BaseType::list(element), Ir::MakeList(Vec::new()))
    };
    let statements = vec![Ir::store(accumulator, empty), compiler.mark(body, claused.span)];
    Ok(ExprContext::value(ty, characteristic, Ir::block(statements, Ir::Local(accumulator))))
}

/// Bind each `let` in its own child frame so later bindings see earlier
/// ones. Returns the innermost frame and the stores.
fn compile_lets(
    compiler: &mut Compiler<'_>,
    lets: &[LetClause<'_>],
    mut frame: FrameId,
    characteristic: &mut Characteristic,
) -> Result<(FrameId, Vec<Ir>)> {
    let mut statements = Vec::with_capacity(lets.len());
    for clause in lets {
        let value = compile_value(compiler, clause.value, frame, None)?;
        *characteristic = characteristic.merge(value.characteristic);
        let ty = value.ty.clone();
        let value_characteristic = value.characteristic;
        let local = compiler.allocate_local()?;
        statements.push(Ir::store(local, value.into_get(clause.value.span())?));

        frame = compiler.scopes.child(frame);
        compiler.define(
            frame,
            clause.name.to_name(),
            clause.name.span,
            ExprContext::value(ty, value_characteristic, Ir::Local(local)),
        )?;
    }
    Ok((frame, statements))
}
