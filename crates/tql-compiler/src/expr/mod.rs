//! Expression compilation.
//!
//! Every expression compiles to an [`ExprContext`]: its static type, its
//! purity characteristic and the IR that reads it (and writes it, for
//! assignable targets). Compilation is a `match` over the closed
//! [`Expr`] enum; each arm delegates to a submodule.
//!
//! `hint` is the type the surrounding construct expects. It only steers
//! inference where an expression alone is ambiguous (empty collections,
//! `null` branches); conversion to the expected type is the caller's job.

mod calls;
pub(crate) mod comprehension;
mod conditional;
mod identifiers;
pub(crate) mod lambda;
mod literals;
mod operators;
mod selectors;

use tql_ast::Expr;
use tql_core::{CompilerError, CompilerErrorKind, Result};

use crate::compiler::Compiler;
use crate::context::ExprContext;
use crate::frame::FrameId;
use crate::types::BaseType;

/// Compile `expr` in `frame`.
pub(crate) fn compile_expr(
    compiler: &mut Compiler<'_>,
    expr: &Expr<'_>,
    frame: FrameId,
    hint: Option<&BaseType>,
) -> Result<ExprContext> {
    match expr {
        Expr::Literal(lit) => Ok(literals::compile_literal(&lit.value)),
        Expr::Ident(ident) => identifiers::compile_ident(compiler, ident, frame),
        Expr::Binary(binary) => operators::compile_binary(compiler, binary, frame),
        Expr::Unary(unary) => operators::compile_unary(compiler, unary, frame),
        Expr::Call(call) => calls::compile_call(compiler, call, frame),
        Expr::If(if_expr) => conditional::compile_if(compiler, if_expr, frame, hint),
        Expr::Case(case) => conditional::compile_case(compiler, case, frame, hint),
        Expr::Claused(claused) => comprehension::compile_claused(compiler, claused, frame, hint),
        Expr::Tuple(tuple) => selectors::compile_tuple(compiler, tuple, frame),
        Expr::List(list) => selectors::compile_collection(compiler, list, frame, hint, false),
        Expr::Set(set) => selectors::compile_collection(compiler, set, frame, hint, true),
        Expr::Function(function) => lambda::compile_function(compiler, function, frame),
    }
}

/// Compile `expr` and require a value.
pub(crate) fn compile_value(
    compiler: &mut Compiler<'_>,
    expr: &Expr<'_>,
    frame: FrameId,
    hint: Option<&BaseType>,
) -> Result<ExprContext> {
    let ctx = compile_expr(compiler, expr, frame, hint)?;
    if ctx.is_type() {
        return Err(CompilerError::new(
            CompilerErrorKind::IncorrectTypeReferenced,
            expr.span(),
            format!("type {} used where a value is expected", ctx.ty),
        )
        .into());
    }
    Ok(ctx)
}
