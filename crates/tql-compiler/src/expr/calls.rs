//! Function call compilation.
//!
//! Calls dispatch on the callee's type: only `Function` types are callable.
//! Generic native functions have their type parameters bound either from
//! explicit type arguments or by unifying parameter types with argument
//! types, left to right.

use rustc_hash::FxHashMap;
use tql_ast::CallExpr;
use tql_core::{CompilerError, CompilerErrorKind, Result, Span};

use super::compile_value;
use crate::Characteristic;
use crate::compiler::Compiler;
use crate::context::{ExprContext, FunctionHandle};
use crate::frame::FrameId;
use crate::ir::Ir;
use crate::types::BaseType;
use crate::types::conversion::can_convert;

type Bindings = FxHashMap<String, BaseType>;

pub fn compile_call(compiler: &mut Compiler<'_>, call: &CallExpr<'_>, frame: FrameId) -> Result<ExprContext> {
    let span = call.span;
    let callee = compile_value(compiler, call.function, frame, None)?;
    let Some(signature) = callee.ty.as_function().cloned() else {
        return Err(CompilerError::new(
            CompilerErrorKind::CannotInvokeNonFunction,
            call.function.span(),
            format!("a value of type {} cannot be called", callee.ty),
        )
        .into());
    };
    if call.arguments.len() != signature.parameters.len() {
        return Err(CompilerError::new(
            CompilerErrorKind::IncorrectType,
            span,
            format!(
                "function {} expects {} arguments, got {}",
                callee.ty,
                signature.parameters.len(),
                call.arguments.len()
            ),
        )
        .into());
    }

    let type_parameters = match &callee.function {
        Some(FunctionHandle::Native { type_parameters, .. }) => type_parameters.clone(),
        _ => Vec::new(),
    };
    let mut bindings = Bindings::default();
    if !call.type_arguments.is_empty() {
        if call.type_arguments.len() != type_parameters.len() {
            return Err(mismatched(
                span,
                format!(
                    "{} type arguments given, function takes {}",
                    call.type_arguments.len(),
                    type_parameters.len()
                ),
            ));
        }
        for (name, decl) in type_parameters.iter().zip(call.type_arguments) {
            let ty = compiler.compile_type(decl, frame)?;
            bindings.insert(name.clone(), ty);
        }
    }

    let mut arguments = Vec::with_capacity(call.arguments.len());
    for (argument, parameter) in call.arguments.iter().zip(&signature.parameters) {
        let expected = parameter.ty.substitute(&bindings);
        let hint = (!expected.is_generic()).then_some(&expected);
        let ctx = compile_value(compiler, argument, frame, hint)?;
        if expected.is_generic() && !unify(&expected, &ctx.ty, &mut bindings) {
            return Err(mismatched(
                argument.span(),
                format!("argument of type {} does not fit parameter '{}: {}'", ctx.ty, parameter.name, parameter.ty),
            ));
        }
        arguments.push(ctx);
    }
    if let Some(unbound) = type_parameters.iter().find(|p| !bindings.contains_key(*p)) {
        return Err(mismatched(span, format!("type parameter '{unbound}' could not be inferred")));
    }

    let mut characteristic = callee.characteristic;
    let mut lowered = Vec::with_capacity(arguments.len());
    for ((argument, parameter), expr) in arguments.into_iter().zip(&signature.parameters).zip(call.arguments) {
        let target = parameter.ty.substitute(&bindings);
        let argument = compiler.convert(argument, &target, expr.span())?;
        characteristic = characteristic.merge(argument.characteristic);
        lowered.push(argument.into_get(expr.span())?);
    }
    let return_type = signature.return_type.substitute(&bindings);

    let (body, ir) = match callee.function {
        Some(FunctionHandle::Native { id, .. }) => {
            let body = compiler
                .backend
                .native_function(id)
                .map(|native| native.characteristic)
                .unwrap_or_default();
            (
                body,
                Ir::CallNative {
                    function: id,
                    arguments: lowered,
                },
            )
        }
        Some(FunctionHandle::Script { body, .. }) => (body, call_value(callee.get, lowered, span)?),
        None => (Characteristic::default(), call_value(callee.get, lowered, span)?),
    };
    Ok(ExprContext::value(return_type, characteristic.merge(body), ir))
}

fn call_value(function: Option<Ir>, arguments: Vec<Ir>, span: Span) -> Result<Ir> {
    let function = function.ok_or_else(|| {
        CompilerError::new(CompilerErrorKind::CannotInvokeNonFunction, span, "callee has no value")
    })?;
    Ok(Ir::Call {
        function: Box::new(function),
        arguments,
    })
}

fn mismatched(span: Span, message: String) -> tql_core::Error {
    CompilerError::new(CompilerErrorKind::MismatchedGenericParameters, span, message).into()
}

/// Bind the type parameters in `pattern` so that `actual` fits it. A
/// parameter bound twice keeps the wider of the two types.
fn unify(pattern: &BaseType, actual: &BaseType, bindings: &mut Bindings) -> bool {
    match (pattern, actual) {
        (BaseType::Generic(name), _) => match bindings.get(name) {
            None => {
                bindings.insert(name.clone(), actual.clone());
                true
            }
            Some(bound) if can_convert(actual, bound) => true,
            Some(bound) if can_convert(bound, actual) => {
                bindings.insert(name.clone(), actual.clone());
                true
            }
            Some(_) => false,
        },
        (BaseType::List(p), BaseType::List(a))
        | (BaseType::Set(p), BaseType::Set(a))
        | (BaseType::Optional(p), BaseType::Optional(a)) => unify(p, a, bindings),
        (BaseType::Optional(p), _) => unify(p, actual, bindings),
        (BaseType::Tuple(p), BaseType::Tuple(a)) => {
            p.len() == a.len()
                && p.attributes().all(|(name, ty)| match a.attribute(name) {
                    Some(actual) => unify(ty, actual, bindings),
                    None => false,
                })
        }
        (BaseType::Function(p), BaseType::Function(a)) => {
            p.parameters.len() == a.parameters.len()
                && p.parameters
                    .iter()
                    .zip(&a.parameters)
                    .all(|(p, a)| unify(&p.ty, &a.ty, bindings))
                && unify(&p.return_type, &a.return_type, bindings)
        }
        (_, BaseType::Void) => true,
        _ => !pattern.is_generic(),
    }
}
