//! Tuple, list and set selectors.
//!
//! Members are compiled against the selector's own frame; siblings never
//! see each other.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tql_ast::{BinaryOp, CollectionSelector, Expr, TupleSelector};
use tql_core::{CompilerError, CompilerErrorKind, Name, Result};

use super::compile_value;
use crate::Characteristic;
use crate::compiler::Compiler;
use crate::context::ExprContext;
use crate::frame::FrameId;
use crate::ir::Ir;
use crate::types::{BaseType, TupleType};

pub fn compile_tuple(compiler: &mut Compiler<'_>, selector: &TupleSelector<'_>, frame: FrameId) -> Result<ExprContext> {
    let mut tuple = TupleType::new();
    let mut values = FxHashMap::default();
    let mut characteristic = Characteristic::CONSTANT;

    for attribute in selector.attributes {
        let name = match attribute.name {
            Some(ident) => ident.name.to_string(),
            None => infer_name(attribute.value).ok_or_else(|| {
                CompilerError::new(
                    CompilerErrorKind::CannotInferNameFromExpression,
                    attribute.value.span(),
                    "attribute needs a name; only identifiers and attribute reads supply one",
                )
            })?,
        };
        let ctx = compile_value(compiler, attribute.value, frame, None)?;
        if !tuple.add_attribute(name.clone(), ctx.ty.clone()) {
            return Err(CompilerError::duplicate_name(attribute.span, &Name::simple(name)).into());
        }
        characteristic = characteristic.merge(ctx.characteristic);
        values.insert(name, ctx.into_get(attribute.span)?);
    }
    compiler.add_constraints(&mut tuple, selector.keys, selector.references, frame)?;

    let ty = BaseType::Tuple(tuple);
    let native = compiler.backend.native(&ty);
    let names: Arc<[String]> = match native.tuple_layout() {
        Some(layout) => Arc::clone(&layout.names),
        None => return Err(tql_core::InternalError::invariant(format!("{ty} has no tuple layout")).into()),
    };
    let values = names
        .iter()
        .map(|name| {
            values
                .remove(name)
                .ok_or_else(|| tql_core::InternalError::invariant(format!("layout attribute '{name}' has no value")))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ExprContext::value(ty, characteristic, Ir::MakeTuple { names, values }))
}

/// `x` names its attribute `x`; `a.b` and `a.b.c` name theirs after the last
/// component.
fn infer_name(expr: &Expr<'_>) -> Option<String> {
    match expr {
        Expr::Ident(ident) => Some(ident.to_name().last().to_string()),
        Expr::Binary(binary) if binary.op == BinaryOp::Dereference => match binary.right {
            Expr::Ident(ident) => Some(ident.to_name().last().to_string()),
            _ => None,
        },
        _ => None,
    }
}

/// Compile `[..]` or `{..}`. The element type is that of the first item
/// that is not `null`, else the hint's element type, else `Void`.
pub fn compile_collection(
    compiler: &mut Compiler<'_>,
    selector: &CollectionSelector<'_>,
    frame: FrameId,
    hint: Option<&BaseType>,
    is_set: bool,
) -> Result<ExprContext> {
    let hint_element = hint.and_then(BaseType::element);
    let mut items = Vec::with_capacity(selector.items.len());
    for item in selector.items {
        items.push((compile_value(compiler, item, frame, hint_element)?, item.span()));
    }

    let element = items
        .iter()
        .map(|(ctx, _)| &ctx.ty)
        .find(|ty| !ty.is_void())
        .or(hint_element)
        .cloned()
        .unwrap_or_default();

    let mut characteristic = Characteristic::CONSTANT;
    let mut lowered = Vec::with_capacity(items.len());
    for (ctx, span) in items {
        let ctx = compiler.convert(ctx, &element, span)?;
        characteristic = characteristic.merge(ctx.characteristic);
        lowered.push(ctx.into_get(span)?);
    }
    let (ty, ir) = if is_set {
        (BaseType::set(element), Ir::MakeSet(lowered))
    } else {
        (BaseType::list(element), Ir::MakeList(lowered))
    };
    Ok(ExprContext::value(ty, characteristic, ir))
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tql_ast::{AstBuilder, Script};
    use tql_core::{NoStorage, TupleValue, Value};

    use super::*;
    use crate::{Arguments, CompilerOptions, compile};

    fn eval(script: &Script<'_>) -> Result<(Value, BaseType)> {
        let output = compile(script, CompilerOptions::default())?;
        let value = output.executable.invoke(&Arguments::new(), &NoStorage)?;
        Ok((value, output.result_type))
    }

    #[test]
    fn tuple_names_inferred_from_identifiers() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let script = b.script(
            vec![],
            vec![],
            vec![b.var("id", None, Some(b.int(7)))],
            vec![],
            Some(b.claused(vec![], vec![], None, b.tuple(vec![(None, b.id("id")), (Some("ok"), b.boolean(true))]))),
        );
        let (value, ty) = eval(script).unwrap();
        assert_eq!(
            value,
            Value::Tuple(TupleValue::from_pairs([("id", Value::Int32(7)), ("ok", Value::Boolean(true))]))
        );
        assert_eq!(
            ty,
            BaseType::Tuple(TupleType::from_attributes([("ok", BaseType::BOOLEAN), ("id", BaseType::INT32)]))
        );
    }

    #[test]
    fn unnamed_literal_attribute() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let err = eval(b.query(b.tuple(vec![(None, b.int(1))]))).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::CannotInferNameFromExpression));
    }

    #[test]
    fn duplicate_attribute() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let err = eval(b.query(b.tuple(vec![(Some("a"), b.int(1)), (Some("a"), b.int(2))]))).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::DuplicateName));
    }

    #[test]
    fn key_on_unknown_attribute() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let tuple = b.tuple_with(vec![(Some("a"), b.int(1))], vec![b.key(&["b"])], vec![]);
        let err = eval(b.query(tuple)).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::IdentifierNotFound));
    }

    #[test]
    fn attribute_order_does_not_matter() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let left = b.tuple(vec![(Some("a"), b.int(1)), (Some("b"), b.string("x"))]);
        let right = b.tuple(vec![(Some("b"), b.string("x")), (Some("a"), b.int(1))]);
        let (value, _) = eval(b.query(b.binary(left, BinaryOp::Equal, right))).unwrap();
        assert_eq!(value, Value::Boolean(true));
    }

    #[test]
    fn list_element_from_first_non_null() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let (value, ty) = eval(b.query(b.list(vec![b.null(), b.int(1)]))).unwrap();
        assert_eq!(ty, BaseType::list(BaseType::INT32));
        assert_eq!(value, Value::List(vec![Value::Void, Value::Int32(1)]));
    }

    #[test]
    fn empty_collections() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        assert_eq!(eval(b.query(b.set(vec![]))).unwrap().1, BaseType::set(BaseType::Void));

        let script = b.script(
            vec![],
            vec![],
            vec![b.var("xs", Some(b.list_type(b.named_type("Int64"))), Some(b.list(vec![])))],
            vec![],
            Some(b.claused(vec![], vec![], None, b.id("xs"))),
        );
        assert_eq!(eval(script).unwrap(), (Value::List(vec![]), BaseType::list(BaseType::INT64)));
    }

    #[test]
    fn set_deduplicates() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let (value, _) = eval(b.query(b.set(vec![b.int(2), b.int(1), b.int(2)]))).unwrap();
        assert_eq!(value, Value::Set([Value::Int32(1), Value::Int32(2)].into_iter().collect()));
    }

    #[test]
    fn items_must_convert_to_element_type() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let err = eval(b.query(b.list(vec![b.int(1), b.string("x")]))).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::IncorrectType));

        let widened = eval(b.query(b.list(vec![b.long(1), b.int(2)]))).unwrap();
        assert_eq!(widened.0, Value::List(vec![Value::Int64(1), Value::Int64(2)]));
    }

    #[test]
    fn native_layout_shared_between_selectors() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let script = b.query(b.list(vec![
            b.tuple(vec![(Some("x"), b.int(1)), (Some("y"), b.int(2))]),
            b.tuple(vec![(Some("y"), b.int(4)), (Some("x"), b.int(3))]),
        ]));
        let (value, _) = eval(script).unwrap();
        let Value::List(items) = value else {
            panic!("expected a list");
        };
        let Value::Tuple(second) = &items[1] else {
            panic!("expected a tuple");
        };
        assert_eq!(second.names(), &["x".to_string(), "y".to_string()]);
        assert_eq!(second.get("y"), Some(&Value::Int32(4)));
    }
}
