//! Expression nodes.
//!
//! Children are arena references; slices hold expressions by value.

use tql_core::{NaiveDateTime, Span, TimeDelta};

use crate::types::{KeyDecl, ParamDecl, ReferenceDecl, TypeDecl};
use crate::{BinaryOp, Ident, UnaryOp};

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'ast> {
    Literal(LiteralExpr<'ast>),
    Ident(Ident<'ast>),
    Binary(&'ast BinaryExpr<'ast>),
    Unary(&'ast UnaryExpr<'ast>),
    Call(&'ast CallExpr<'ast>),
    If(&'ast IfExpr<'ast>),
    Case(&'ast CaseExpr<'ast>),
    /// `for ... let ... where ... return ...`
    Claused(&'ast ClausedExpr<'ast>),
    Tuple(&'ast TupleSelector<'ast>),
    List(&'ast CollectionSelector<'ast>),
    Set(&'ast CollectionSelector<'ast>),
    Function(&'ast FunctionSelector<'ast>),
}

impl<'ast> Expr<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(e) => e.span,
            Expr::Ident(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::If(e) => e.span,
            Expr::Case(e) => e.span,
            Expr::Claused(e) => e.span,
            Expr::Tuple(e) => e.span,
            Expr::List(e) | Expr::Set(e) => e.span,
            Expr::Function(e) => e.span,
        }
    }
}

/// Literal payloads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal<'ast> {
    /// `null`
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Char(char),
    String(&'ast str),
    DateTime(NaiveDateTime),
    TimeSpan(TimeDelta),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralExpr<'ast> {
    pub value: Literal<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr<'ast> {
    pub left: &'ast Expr<'ast>,
    pub op: BinaryOp,
    pub right: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr<'ast> {
    pub op: UnaryOp,
    pub operand: &'ast Expr<'ast>,
    pub span: Span,
}

/// `f<T, ...>(a, b)`
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr<'ast> {
    pub function: &'ast Expr<'ast>,
    pub type_arguments: &'ast [TypeDecl<'ast>],
    pub arguments: &'ast [Expr<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr<'ast> {
    pub test: &'ast Expr<'ast>,
    pub then_expr: &'ast Expr<'ast>,
    pub else_expr: &'ast Expr<'ast>,
    pub span: Span,
}

/// One `when ... then ...` arm.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseItem<'ast> {
    pub when: &'ast Expr<'ast>,
    pub then: &'ast Expr<'ast>,
    pub span: Span,
}

/// `case [strict] [test] when ... then ... [else ...] end`
///
/// With a test expression each `when` is compared to the test; without one
/// each `when` is a Boolean condition.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr<'ast> {
    pub is_strict: bool,
    pub test: Option<&'ast Expr<'ast>>,
    pub items: &'ast [CaseItem<'ast>],
    pub else_expr: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForClause<'ast> {
    pub name: Ident<'ast>,
    pub source: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LetClause<'ast> {
    pub name: Ident<'ast>,
    pub value: &'ast Expr<'ast>,
    pub span: Span,
}

/// An expression with optional comprehension clauses.
///
/// With no `for` clauses this is just `expression` (plus any `let`s).
#[derive(Debug, Clone, PartialEq)]
pub struct ClausedExpr<'ast> {
    pub for_clauses: &'ast [ForClause<'ast>],
    pub let_clauses: &'ast [LetClause<'ast>],
    pub where_clause: Option<&'ast Expr<'ast>>,
    pub expression: &'ast Expr<'ast>,
    pub span: Span,
}

/// One attribute of a tuple selector. A missing name is inferred from an
/// identifier value.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSelector<'ast> {
    pub name: Option<Ident<'ast>>,
    pub value: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TupleSelector<'ast> {
    pub attributes: &'ast [AttributeSelector<'ast>],
    pub keys: &'ast [KeyDecl<'ast>],
    pub references: &'ast [ReferenceDecl<'ast>],
    pub span: Span,
}

/// `[a, b]` or `{a, b}`.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSelector<'ast> {
    pub items: &'ast [Expr<'ast>],
    pub span: Span,
}

/// `(x: Int32, y: Int32): Int32 => x + y`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSelector<'ast> {
    pub parameters: &'ast [ParamDecl<'ast>],
    pub return_type: Option<&'ast TypeDecl<'ast>>,
    pub body: &'ast Expr<'ast>,
    pub span: Span,
}
