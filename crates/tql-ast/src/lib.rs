//! Abstract syntax tree for TQL scripts.
//!
//! Nodes are allocated in a [`bumpalo::Bump`] arena and borrow from it for
//! `'ast`. The tree is produced by an external front end; [`AstBuilder`]
//! offers the same construction surface to hosts and tests that assemble
//! scripts programmatically.

pub mod build;
pub mod decl;
pub mod expr;
pub mod ops;
pub mod types;

pub use build::AstBuilder;
pub use decl::{Assignment, ClausedAssignment, ModuleDecl, ModuleMember, Script, Using, VarDecl, Version};
pub use expr::{
    AttributeSelector, BinaryExpr, CallExpr, CaseExpr, CaseItem, ClausedExpr, CollectionSelector, Expr,
    ForClause, FunctionSelector, IfExpr, LetClause, Literal, LiteralExpr, TupleSelector, UnaryExpr,
};
pub use ops::{BinaryOp, UnaryOp};
pub use types::{FunctionTypeDecl, KeyDecl, ParamDecl, ReferenceDecl, TupleAttributeDecl, TupleTypeDecl, TypeDecl};

use tql_core::{Name, Span};

/// An identifier as written, possibly qualified (`System.ToList`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ident<'ast> {
    pub name: &'ast str,
    pub span: Span,
}

impl<'ast> Ident<'ast> {
    pub fn new(name: &'ast str, span: Span) -> Self {
        Self { name, span }
    }

    pub fn to_name(&self) -> Name {
        Name::parse(self.name)
    }
}
