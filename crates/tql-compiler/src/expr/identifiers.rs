//! Identifier compilation.
//!
//! A qualified identifier is first looked up as a whole (`System.Pi`,
//! `Color.Red`). When that fails, the longest prefix that names a symbol is
//! used and the remaining components are read as tuple attributes
//! (`person.address.city`).

use tql_ast::Ident;
use tql_core::{CompilerError, Name, Result};

use super::operators::dereference;
use crate::compiler::Compiler;
use crate::context::ExprContext;
use crate::frame::FrameId;

pub fn compile_ident(compiler: &mut Compiler<'_>, ident: &Ident<'_>, frame: FrameId) -> Result<ExprContext> {
    let name = ident.to_name();
    let span = ident.span;

    if let Some(id) = compiler.scopes.lookup(frame, &name) {
        compiler.scopes.resolve(frame, &name, span)?;
        return compiler.symbol_context(id, span);
    }

    let components = name.components();
    for split in (1..components.len()).rev() {
        let prefix = Name::from_components(components[..split].iter().cloned());
        if compiler.scopes.lookup(frame, &prefix).is_none() {
            continue;
        }
        let id = compiler.scopes.resolve(frame, &prefix, span)?;
        let mut ctx = compiler.symbol_context(id, span)?;
        for attribute in &components[split..] {
            ctx = dereference(ctx, attribute, span)?;
        }
        return Ok(ctx);
    }

    Err(CompilerError::identifier_not_found(span, &name).into())
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tql_ast::{AstBuilder, BinaryOp};
    use tql_core::{CompilerErrorKind, NoStorage, Value};

    use crate::types::BaseType;
    use crate::{Arguments, CompilerOptions, compile};

    #[test]
    fn variable_attribute_path() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let person = b.tuple(vec![
            (Some("name"), b.string("Ann")),
            (Some("address"), b.tuple(vec![(Some("city"), b.string("Oslo"))])),
        ]);
        let script = b.script(
            vec![],
            vec![],
            vec![b.var("person", None, Some(person))],
            vec![],
            Some(b.claused(vec![], vec![], None, b.id("person.address.city"))),
        );
        let output = compile(script, CompilerOptions::default()).unwrap();
        assert_eq!(output.result_type, BaseType::STRING);
        let value = output.executable.invoke(&Arguments::new(), &NoStorage).unwrap();
        assert_eq!(value, Value::from("Oslo"));
    }

    #[test]
    fn unknown_identifier() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let err = compile(b.query(b.binary(b.id("missing"), BinaryOp::Add, b.int(1))), CompilerOptions::default())
            .unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::IdentifierNotFound));
    }

    #[test]
    fn unknown_qualified_identifier() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let err = compile(b.query(b.id("Nowhere.Thing")), CompilerOptions::default()).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::IdentifierNotFound));
    }
}
