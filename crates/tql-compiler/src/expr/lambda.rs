//! Function selector compilation.
//!
//! A function selector becomes an independent script function. Its body
//! frame chains off the import frame, not the lexical frame, so a body sees
//! its parameters, imported module members and (when a return type is
//! declared) `self`, but never the locals around it.

use rustc_hash::FxHashSet;
use tql_ast::FunctionSelector;
use tql_core::{CompilerError, FunctionRef, Name, Result, Value};

use super::compile_value;
use crate::Characteristic;
use crate::compiler::Compiler;
use crate::context::{ExprContext, FunctionHandle};
use crate::frame::FrameId;
use crate::ir::Ir;
use crate::types::{BaseType, FunctionParameter, FunctionType};

pub fn compile_function(
    compiler: &mut Compiler<'_>,
    selector: &FunctionSelector<'_>,
    frame: FrameId,
) -> Result<ExprContext> {
    let mut seen = FxHashSet::default();
    let mut parameters = Vec::with_capacity(selector.parameters.len());
    for parameter in selector.parameters {
        if !seen.insert(parameter.name.name) {
            return Err(CompilerError::duplicate_name(parameter.name.span, &parameter.name.to_name()).into());
        }
        let ty = compiler.compile_type(parameter.ty, frame)?;
        parameters.push(FunctionParameter::new(parameter.name.name, ty));
    }
    let declared_return = match selector.return_type {
        Some(decl) => Some(compiler.compile_type(decl, frame)?),
        None => None,
    };

    let id = compiler.backend.reserve_function(format!("function@{}", selector.span));
    let body_frame = compiler.scopes.child(compiler.import_frame);
    compiler.push_scope();

    for (parameter, decl) in parameters.iter().zip(selector.parameters) {
        let slot = compiler.allocate_local()?;
        let ctx = ExprContext::value(parameter.ty.clone(), Characteristic::CONSTANT, Ir::Local(slot));
        compiler.define(body_frame, Name::simple(parameter.name.clone()), decl.span, ctx)?;
    }
    if let Some(return_type) = &declared_return {
        let signature = BaseType::Function(FunctionType::new(parameters.clone(), return_type.clone()));
        // Assume a pure body while the body itself is being compiled.
        let this = ExprContext::constant(signature, Value::Function(FunctionRef::Script(id))).with_function(
            FunctionHandle::Script {
                id,
                body: Characteristic::CONSTANT,
            },
        );
        compiler.define(body_frame, Name::simple("self"), selector.span, this)?;
    }

    let body = compile_value(compiler, selector.body, body_frame, declared_return.as_ref())?;
    let body = match &declared_return {
        Some(return_type) => compiler.convert(body, return_type, selector.body.span())?,
        None => body,
    };
    let return_type = body.ty.clone();
    let characteristic = body.characteristic;
    let body = body.into_get(selector.body.span())?;

    let scope = compiler.pop_scope()?;
    compiler
        .backend
        .define_function(id, parameters.len() as u32, scope.locals, body)?;
    tracing::trace!(function = id, arity = parameters.len(), "compiled function selector");

    let signature = BaseType::Function(FunctionType::new(parameters, return_type));
    Ok(
        ExprContext::constant(signature, Value::Function(FunctionRef::Script(id)))
            .with_function(FunctionHandle::Script { id, body: characteristic }),
    )
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tql_ast::{AstBuilder, BinaryOp, Script};
    use tql_core::{CompilerErrorKind, NoStorage};

    use super::*;
    use crate::{Arguments, CompilerOptions, compile};

    fn eval(script: &Script<'_>) -> Result<(Value, BaseType)> {
        let output = compile(script, CompilerOptions::default())?;
        let value = output.executable.invoke(&Arguments::new(), &NoStorage)?;
        Ok((value, output.result_type))
    }

    #[test]
    fn immediate_call() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let function = b.function(
            vec![("x", b.named_type("Int32"))],
            Some(b.named_type("Int32")),
            b.binary(b.id("x"), BinaryOp::Multiply, b.int(2)),
        );
        assert_eq!(eval(b.query(b.call(function, vec![b.int(21)]))).unwrap(), (Value::Int32(42), BaseType::INT32));
    }

    #[test]
    fn recursion_through_self() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let n = || b.id("n");
        let factorial = b.function(
            vec![("n", b.named_type("Int64"))],
            Some(b.named_type("Int64")),
            b.if_(
                b.binary(n(), BinaryOp::LessOrEqual, b.int(1)),
                b.int(1),
                b.binary(n(), BinaryOp::Multiply, b.call(b.id("self"), vec![b.binary(n(), BinaryOp::Subtract, b.int(1))])),
            ),
        );
        let script = b.script(
            vec![],
            vec![],
            vec![b.var("factorial", None, Some(factorial))],
            vec![],
            Some(b.claused(vec![], vec![], None, b.call(b.id("factorial"), vec![b.int(5)]))),
        );
        assert_eq!(eval(script).unwrap(), (Value::Int64(120), BaseType::INT64));
    }

    #[test]
    fn inferred_return_type() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let function = b.function(vec![("s", b.named_type("String"))], None, b.binary(b.id("s"), BinaryOp::Add, b.string("!")));
        let (_, ty) = eval(b.query(function)).unwrap();
        assert_eq!(
            ty,
            BaseType::function(vec![FunctionParameter::new("s", BaseType::STRING)], BaseType::STRING)
        );
    }

    #[test]
    fn body_cannot_see_enclosing_variables() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let function = b.function(vec![], None, b.id("outer"));
        let script = b.script(
            vec![],
            vec![],
            vec![b.var("outer", None, Some(b.int(1))), b.var("f", None, Some(function))],
            vec![],
            None,
        );
        let err = eval(script).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::IdentifierNotFound));
    }

    #[test]
    fn self_requires_declared_return_type() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let function = b.function(vec![], None, b.call(b.id("self"), vec![]));
        let err = eval(b.query(function)).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::IdentifierNotFound));
    }

    #[test]
    fn duplicate_parameter() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let function = b.function(
            vec![("a", b.named_type("Int32")), ("a", b.named_type("Int32"))],
            None,
            b.id("a"),
        );
        let err = eval(b.query(function)).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::DuplicateName));
    }

    #[test]
    fn body_must_convert_to_return_type() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let function = b.function(vec![], Some(b.named_type("Int32")), b.string("x"));
        let err = eval(b.query(function)).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::IncorrectType));
    }
}
