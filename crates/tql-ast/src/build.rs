//! Programmatic AST construction.
//!
//! ```ignore
//! let arena = Bump::new();
//! let b = AstBuilder::new(&arena);
//! let query = b.comprehension(
//!     vec![("x", b.set(vec![b.int(1), b.int(2), b.int(3)]))],
//!     vec![],
//!     Some(b.binary(b.id("x"), BinaryOp::Greater, b.int(1))),
//!     b.id("x"),
//! );
//! ```
//!
//! Every node gets a point span on the builder's current line (see
//! [`AstBuilder::at_line`]).

use std::cell::Cell;

use bumpalo::Bump;
use tql_core::{NaiveDateTime, Span, TimeDelta};

use crate::*;

pub struct AstBuilder<'a> {
    arena: &'a Bump,
    line: Cell<u32>,
}

impl<'a> AstBuilder<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self {
            arena,
            line: Cell::new(1),
        }
    }

    pub fn arena(&self) -> &'a Bump {
        self.arena
    }

    /// Nodes built after this call carry `line` in their spans.
    pub fn at_line(&self, line: u32) -> &Self {
        self.line.set(line);
        self
    }

    fn span(&self) -> Span {
        Span::point(self.line.get(), 1)
    }

    pub fn alloc<T>(&self, value: T) -> &'a T {
        self.arena.alloc(value)
    }

    pub fn slice<T>(&self, items: Vec<T>) -> &'a [T] {
        self.arena.alloc_slice_fill_iter(items)
    }

    pub fn ident(&self, name: &str) -> Ident<'a> {
        Ident::new(self.arena.alloc_str(name), self.span())
    }

    fn idents(&self, names: &[&str]) -> &'a [Ident<'a>] {
        self.slice(names.iter().map(|n| self.ident(n)).collect())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn literal(&self, value: Literal<'a>) -> Expr<'a> {
        Expr::Literal(LiteralExpr {
            value,
            span: self.span(),
        })
    }

    pub fn null(&self) -> Expr<'a> {
        self.literal(Literal::Null)
    }

    pub fn boolean(&self, value: bool) -> Expr<'a> {
        self.literal(Literal::Boolean(value))
    }

    pub fn int(&self, value: i32) -> Expr<'a> {
        self.literal(Literal::Int32(value))
    }

    pub fn long(&self, value: i64) -> Expr<'a> {
        self.literal(Literal::Int64(value))
    }

    pub fn double(&self, value: f64) -> Expr<'a> {
        self.literal(Literal::Double(value))
    }

    pub fn char(&self, value: char) -> Expr<'a> {
        self.literal(Literal::Char(value))
    }

    pub fn string(&self, value: &str) -> Expr<'a> {
        self.literal(Literal::String(self.arena.alloc_str(value)))
    }

    pub fn date_time(&self, value: NaiveDateTime) -> Expr<'a> {
        self.literal(Literal::DateTime(value))
    }

    pub fn time_span(&self, value: TimeDelta) -> Expr<'a> {
        self.literal(Literal::TimeSpan(value))
    }

    pub fn id(&self, name: &str) -> Expr<'a> {
        Expr::Ident(self.ident(name))
    }

    pub fn binary(&self, left: Expr<'a>, op: BinaryOp, right: Expr<'a>) -> Expr<'a> {
        Expr::Binary(self.alloc(BinaryExpr {
            left: self.alloc(left),
            op,
            right: self.alloc(right),
            span: self.span(),
        }))
    }

    /// `tuple.attribute`
    pub fn attribute(&self, tuple: Expr<'a>, attribute: &str) -> Expr<'a> {
        self.binary(tuple, BinaryOp::Dereference, self.id(attribute))
    }

    pub fn unary(&self, op: UnaryOp, operand: Expr<'a>) -> Expr<'a> {
        Expr::Unary(self.alloc(UnaryExpr {
            op,
            operand: self.alloc(operand),
            span: self.span(),
        }))
    }

    pub fn call(&self, function: Expr<'a>, arguments: Vec<Expr<'a>>) -> Expr<'a> {
        self.call_generic(function, vec![], arguments)
    }

    pub fn call_generic(
        &self,
        function: Expr<'a>,
        type_arguments: Vec<TypeDecl<'a>>,
        arguments: Vec<Expr<'a>>,
    ) -> Expr<'a> {
        Expr::Call(self.alloc(CallExpr {
            function: self.alloc(function),
            type_arguments: self.slice(type_arguments),
            arguments: self.slice(arguments),
            span: self.span(),
        }))
    }

    pub fn if_(&self, test: Expr<'a>, then_expr: Expr<'a>, else_expr: Expr<'a>) -> Expr<'a> {
        Expr::If(self.alloc(IfExpr {
            test: self.alloc(test),
            then_expr: self.alloc(then_expr),
            else_expr: self.alloc(else_expr),
            span: self.span(),
        }))
    }

    pub fn case(
        &self,
        is_strict: bool,
        test: Option<Expr<'a>>,
        items: Vec<(Expr<'a>, Expr<'a>)>,
        else_expr: Option<Expr<'a>>,
    ) -> Expr<'a> {
        let items = items
            .into_iter()
            .map(|(when, then)| CaseItem {
                when: self.alloc(when),
                then: self.alloc(then),
                span: self.span(),
            })
            .collect();
        Expr::Case(self.alloc(CaseExpr {
            is_strict,
            test: test.map(|t| self.alloc(t)),
            items: self.slice(items),
            else_expr: else_expr.map(|e| self.alloc(e)),
            span: self.span(),
        }))
    }

    pub fn list(&self, items: Vec<Expr<'a>>) -> Expr<'a> {
        Expr::List(self.alloc(CollectionSelector {
            items: self.slice(items),
            span: self.span(),
        }))
    }

    pub fn set(&self, items: Vec<Expr<'a>>) -> Expr<'a> {
        Expr::Set(self.alloc(CollectionSelector {
            items: self.slice(items),
            span: self.span(),
        }))
    }

    /// A tuple selector; `None` names are inferred from identifier values.
    pub fn tuple(&self, attributes: Vec<(Option<&str>, Expr<'a>)>) -> Expr<'a> {
        self.tuple_with(attributes, vec![], vec![])
    }

    pub fn tuple_with(
        &self,
        attributes: Vec<(Option<&str>, Expr<'a>)>,
        keys: Vec<KeyDecl<'a>>,
        references: Vec<ReferenceDecl<'a>>,
    ) -> Expr<'a> {
        let attributes = attributes
            .into_iter()
            .map(|(name, value)| AttributeSelector {
                name: name.map(|n| self.ident(n)),
                value: self.alloc(value),
                span: self.span(),
            })
            .collect();
        Expr::Tuple(self.alloc(TupleSelector {
            attributes: self.slice(attributes),
            keys: self.slice(keys),
            references: self.slice(references),
            span: self.span(),
        }))
    }

    pub fn param(&self, name: &str, ty: TypeDecl<'a>) -> ParamDecl<'a> {
        ParamDecl {
            name: self.ident(name),
            ty: self.alloc(ty),
            span: self.span(),
        }
    }

    pub fn function(
        &self,
        parameters: Vec<(&str, TypeDecl<'a>)>,
        return_type: Option<TypeDecl<'a>>,
        body: Expr<'a>,
    ) -> Expr<'a> {
        let parameters = parameters.into_iter().map(|(n, t)| self.param(n, t)).collect();
        Expr::Function(self.alloc(FunctionSelector {
            parameters: self.slice(parameters),
            return_type: return_type.map(|t| self.alloc(t)),
            body: self.alloc(body),
            span: self.span(),
        }))
    }

    pub fn claused(
        &self,
        for_clauses: Vec<(&str, Expr<'a>)>,
        let_clauses: Vec<(&str, Expr<'a>)>,
        where_clause: Option<Expr<'a>>,
        expression: Expr<'a>,
    ) -> ClausedExpr<'a> {
        let for_clauses = for_clauses
            .into_iter()
            .map(|(name, source)| ForClause {
                name: self.ident(name),
                source: self.alloc(source),
                span: self.span(),
            })
            .collect();
        let let_clauses = let_clauses
            .into_iter()
            .map(|(name, value)| LetClause {
                name: self.ident(name),
                value: self.alloc(value),
                span: self.span(),
            })
            .collect();
        ClausedExpr {
            for_clauses: self.slice(for_clauses),
            let_clauses: self.slice(let_clauses),
            where_clause: where_clause.map(|w| &*self.alloc(w)),
            expression: self.alloc(expression),
            span: self.span(),
        }
    }

    /// A claused expression in expression position.
    pub fn comprehension(
        &self,
        for_clauses: Vec<(&str, Expr<'a>)>,
        let_clauses: Vec<(&str, Expr<'a>)>,
        where_clause: Option<Expr<'a>>,
        expression: Expr<'a>,
    ) -> Expr<'a> {
        Expr::Claused(self.alloc(self.claused(for_clauses, let_clauses, where_clause, expression)))
    }

    // ========================================================================
    // Types
    // ========================================================================

    pub fn named_type(&self, name: &str) -> TypeDecl<'a> {
        TypeDecl::Named(self.ident(name))
    }

    pub fn list_type(&self, of: TypeDecl<'a>) -> TypeDecl<'a> {
        TypeDecl::List(self.alloc(of), self.span())
    }

    pub fn set_type(&self, of: TypeDecl<'a>) -> TypeDecl<'a> {
        TypeDecl::Set(self.alloc(of), self.span())
    }

    pub fn optional_type(&self, of: TypeDecl<'a>) -> TypeDecl<'a> {
        TypeDecl::Optional(self.alloc(of), self.span())
    }

    pub fn tuple_type(
        &self,
        attributes: Vec<(&str, TypeDecl<'a>)>,
        keys: Vec<KeyDecl<'a>>,
        references: Vec<ReferenceDecl<'a>>,
    ) -> TypeDecl<'a> {
        let attributes = attributes
            .into_iter()
            .map(|(name, ty)| TupleAttributeDecl {
                name: self.ident(name),
                ty: self.alloc(ty),
                span: self.span(),
            })
            .collect();
        TypeDecl::Tuple(self.alloc(TupleTypeDecl {
            attributes: self.slice(attributes),
            keys: self.slice(keys),
            references: self.slice(references),
            span: self.span(),
        }))
    }

    pub fn function_type(
        &self,
        parameters: Vec<(&str, TypeDecl<'a>)>,
        return_type: TypeDecl<'a>,
    ) -> TypeDecl<'a> {
        let parameters = parameters.into_iter().map(|(n, t)| self.param(n, t)).collect();
        TypeDecl::Function(self.alloc(FunctionTypeDecl {
            parameters: self.slice(parameters),
            return_type: self.alloc(return_type),
            span: self.span(),
        }))
    }

    pub fn key(&self, attribute_names: &[&str]) -> KeyDecl<'a> {
        KeyDecl {
            attribute_names: self.idents(attribute_names),
            span: self.span(),
        }
    }

    pub fn reference(
        &self,
        name: &str,
        source_attribute_names: &[&str],
        target: &str,
        target_attribute_names: &[&str],
    ) -> ReferenceDecl<'a> {
        ReferenceDecl {
            name: self.ident(name),
            source_attribute_names: self.idents(source_attribute_names),
            target: self.ident(target),
            target_attribute_names: self.idents(target_attribute_names),
            span: self.span(),
        }
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    pub fn using(&self, target: &str, alias: Option<&str>) -> Using<'a> {
        Using {
            target: self.ident(target),
            alias: alias.map(|a| self.ident(a)),
            span: self.span(),
        }
    }

    pub fn var(&self, name: &str, ty: Option<TypeDecl<'a>>, initializer: Option<Expr<'a>>) -> VarDecl<'a> {
        VarDecl {
            name: self.ident(name),
            ty: ty.map(|t| &*self.alloc(t)),
            initializer: initializer.map(|e| &*self.alloc(e)),
            span: self.span(),
        }
    }

    pub fn module(&self, name: &str, version: Option<Version>, members: Vec<ModuleMember<'a>>) -> ModuleDecl<'a> {
        ModuleDecl {
            name: self.ident(name),
            version,
            members: self.slice(members),
            span: self.span(),
        }
    }

    pub fn var_member(&self, name: &str, ty: TypeDecl<'a>) -> ModuleMember<'a> {
        ModuleMember::Var {
            name: self.ident(name),
            ty: self.alloc(ty),
            span: self.span(),
        }
    }

    pub fn typedef_member(&self, name: &str, ty: TypeDecl<'a>) -> ModuleMember<'a> {
        ModuleMember::Typedef {
            name: self.ident(name),
            ty: self.alloc(ty),
            span: self.span(),
        }
    }

    pub fn const_member(&self, name: &str, value: Expr<'a>) -> ModuleMember<'a> {
        ModuleMember::Const {
            name: self.ident(name),
            value: self.alloc(value),
            span: self.span(),
        }
    }

    pub fn enum_member(&self, name: &str, values: &[&str]) -> ModuleMember<'a> {
        ModuleMember::Enum {
            name: self.ident(name),
            values: self.idents(values),
            span: self.span(),
        }
    }

    pub fn assignment(&self, target: Expr<'a>, source: Expr<'a>) -> Assignment<'a> {
        Assignment {
            target: self.alloc(target),
            source: self.alloc(source),
            span: self.span(),
        }
    }

    /// A `set` statement without clauses.
    pub fn assign(&self, target: Expr<'a>, source: Expr<'a>) -> ClausedAssignment<'a> {
        ClausedAssignment {
            for_clauses: &[],
            let_clauses: &[],
            where_clause: None,
            assignments: self.slice(vec![self.assignment(target, source)]),
            span: self.span(),
        }
    }

    /// A script consisting only of a result expression.
    pub fn query(&self, expression: Expr<'a>) -> &'a Script<'a> {
        let expression = self.claused(vec![], vec![], None, expression);
        self.script(vec![], vec![], vec![], vec![], Some(expression))
    }

    pub fn script(
        &self,
        usings: Vec<Using<'a>>,
        modules: Vec<ModuleDecl<'a>>,
        vars: Vec<VarDecl<'a>>,
        assignments: Vec<ClausedAssignment<'a>>,
        expression: Option<ClausedExpr<'a>>,
    ) -> &'a Script<'a> {
        self.alloc(Script {
            usings: self.slice(usings),
            modules: self.slice(modules),
            vars: self.slice(vars),
            assignments: self.slice(assignments),
            expression: expression.map(|e| &*self.alloc(e)),
            span: self.span(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_comprehension() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let expr = b.comprehension(
            vec![("x", b.set(vec![b.int(1), b.int(2)]))],
            vec![],
            Some(b.binary(b.id("x"), BinaryOp::Greater, b.int(1))),
            b.id("x"),
        );
        let Expr::Claused(claused) = expr else {
            panic!("expected claused expression");
        };
        assert_eq!(claused.for_clauses.len(), 1);
        assert_eq!(claused.for_clauses[0].name.name, "x");
        assert!(claused.where_clause.is_some());
    }

    #[test]
    fn spans_follow_current_line() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let first = b.int(1);
        b.at_line(7);
        let second = b.id("y");
        assert_eq!(first.span().line, 1);
        assert_eq!(second.span(), Span::point(7, 1));
    }

    #[test]
    fn qualified_ident_to_name() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let name = b.ident("System.ToList").to_name();
        assert_eq!(name.components().len(), 2);
        assert_eq!(name.last(), "ToList");
    }
}
