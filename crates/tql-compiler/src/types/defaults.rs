//! Default values and declaration reconstruction, both expressed as AST so
//! they go through the ordinary compilation path.

use tql_ast::{AstBuilder, Expr, TypeDecl};
use tql_core::{NaiveDateTime, TimeDelta};

use super::{BaseType, ScalarKind, TupleType};

/// An expression producing the default value of `ty`.
pub fn build_default<'a>(ty: &BaseType, b: &AstBuilder<'a>) -> Expr<'a> {
    match ty {
        BaseType::Void | BaseType::Optional(_) | BaseType::Generic(_) => b.null(),
        BaseType::Scalar(kind) => match kind {
            ScalarKind::Boolean => b.boolean(false),
            ScalarKind::Int32 => b.int(0),
            ScalarKind::Int64 => b.long(0),
            ScalarKind::Double => b.double(0.0),
            ScalarKind::Char => b.char('\0'),
            ScalarKind::String => b.string(""),
            ScalarKind::DateTime => b.date_time(NaiveDateTime::default()),
            ScalarKind::TimeSpan => b.time_span(TimeDelta::zero()),
        },
        BaseType::List(_) => b.list(vec![]),
        BaseType::Set(_) => b.set(vec![]),
        BaseType::Tuple(tuple) => {
            let attributes = tuple
                .attributes()
                .map(|(name, ty)| (Some(name), build_default(ty, b)))
                .collect();
            let (keys, references) = constraints(tuple, b);
            b.tuple_with(attributes, keys, references)
        }
        BaseType::Function(function) => {
            let parameters = function
                .parameters
                .iter()
                .map(|p| (p.name.as_str(), build_dom(&p.ty, b)))
                .collect();
            b.function(
                parameters,
                Some(build_dom(&function.return_type, b)),
                build_default(&function.return_type, b),
            )
        }
    }
}

/// A type declaration that compiles back to a type equal to `ty`.
pub fn build_dom<'a>(ty: &BaseType, b: &AstBuilder<'a>) -> TypeDecl<'a> {
    match ty {
        BaseType::Void => b.named_type("Void"),
        BaseType::Scalar(kind) => b.named_type(kind.name()),
        BaseType::Generic(name) => b.named_type(name),
        BaseType::List(of) => b.list_type(build_dom(of, b)),
        BaseType::Set(of) => b.set_type(build_dom(of, b)),
        BaseType::Optional(of) => b.optional_type(build_dom(of, b)),
        BaseType::Tuple(tuple) => {
            let attributes = tuple
                .attributes()
                .map(|(name, ty)| (name, build_dom(ty, b)))
                .collect();
            let (keys, references) = constraints(tuple, b);
            b.tuple_type(attributes, keys, references)
        }
        BaseType::Function(function) => {
            let parameters = function
                .parameters
                .iter()
                .map(|p| (p.name.as_str(), build_dom(&p.ty, b)))
                .collect();
            b.function_type(parameters, build_dom(&function.return_type, b))
        }
    }
}

fn constraints<'a>(
    tuple: &TupleType,
    b: &AstBuilder<'a>,
) -> (Vec<tql_ast::KeyDecl<'a>>, Vec<tql_ast::ReferenceDecl<'a>>) {
    let keys = tuple
        .keys
        .iter()
        .map(|key| {
            let names: Vec<&str> = key.attribute_names.iter().map(String::as_str).collect();
            b.key(&names)
        })
        .collect();
    let references = tuple
        .references
        .iter()
        .map(|(name, reference)| {
            let source: Vec<&str> = reference.source_attribute_names.iter().map(String::as_str).collect();
            let target: Vec<&str> = reference.target_attribute_names.iter().map(String::as_str).collect();
            b.reference(name, &source, &reference.target.to_string(), &target)
        })
        .collect();
    (keys, references)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FunctionParameter;
    use bumpalo::Bump;
    use tql_ast::Literal;

    #[test]
    fn scalar_defaults() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let Expr::Literal(lit) = build_default(&BaseType::INT64, &b) else {
            panic!("expected literal");
        };
        assert_eq!(lit.value, Literal::Int64(0));
        let Expr::Literal(lit) = build_default(&BaseType::optional(BaseType::INT32), &b) else {
            panic!("expected literal");
        };
        assert_eq!(lit.value, Literal::Null);
    }

    #[test]
    fn tuple_default_names_every_attribute() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let ty = BaseType::Tuple(TupleType::from_attributes([("a", BaseType::STRING), ("b", BaseType::BOOLEAN)]));
        let Expr::Tuple(selector) = build_default(&ty, &b) else {
            panic!("expected tuple selector");
        };
        let names: Vec<_> = selector.attributes.iter().map(|a| a.name.map(|n| n.name)).collect();
        assert_eq!(names, vec![Some("a"), Some("b")]);
    }

    #[test]
    fn function_default_has_return_type() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let ty = BaseType::function(vec![FunctionParameter::new("x", BaseType::INT32)], BaseType::STRING);
        let Expr::Function(selector) = build_default(&ty, &b) else {
            panic!("expected function selector");
        };
        assert_eq!(selector.parameters.len(), 1);
        assert!(matches!(selector.return_type, Some(TypeDecl::Named(id)) if id.name == "String"));
    }

    #[test]
    fn dom_of_nested_collection() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let decl = build_dom(&BaseType::list(BaseType::set(BaseType::CHAR)), &b);
        let TypeDecl::List(inner, _) = decl else {
            panic!("expected list type");
        };
        assert!(matches!(inner, TypeDecl::Set(TypeDecl::Named(id), _) if id.name == "Char"));
    }
}
