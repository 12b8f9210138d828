//! Script-level declarations: usings, modules, variables and assignments.

use tql_core::Span;

use crate::expr::{ClausedExpr, Expr, ForClause, LetClause};
use crate::types::TypeDecl;
use crate::Ident;

/// A complete script.
///
/// Sections are compiled in declaration order: usings, modules, variables,
/// assignments, then the optional result expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Script<'ast> {
    pub usings: &'ast [Using<'ast>],
    pub modules: &'ast [ModuleDecl<'ast>],
    pub vars: &'ast [VarDecl<'ast>],
    pub assignments: &'ast [ClausedAssignment<'ast>],
    pub expression: Option<&'ast ClausedExpr<'ast>>,
    pub span: Span,
}

/// `using Alias = Module`.
#[derive(Debug, Clone, PartialEq)]
pub struct Using<'ast> {
    pub target: Ident<'ast>,
    pub alias: Option<Ident<'ast>>,
    pub span: Span,
}

/// `major.minor.revision` of a declared module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub revision: u32,
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)
    }
}

/// `module Name version { members }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDecl<'ast> {
    pub name: Ident<'ast>,
    pub version: Option<Version>,
    pub members: &'ast [ModuleMember<'ast>],
    pub span: Span,
}

/// A member of a script-declared module.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleMember<'ast> {
    /// A storage-backed variable.
    Var {
        name: Ident<'ast>,
        ty: &'ast TypeDecl<'ast>,
        span: Span,
    },
    /// A named type.
    Typedef {
        name: Ident<'ast>,
        ty: &'ast TypeDecl<'ast>,
        span: Span,
    },
    /// A compile-time constant or a named function.
    Const {
        name: Ident<'ast>,
        value: &'ast Expr<'ast>,
        span: Span,
    },
    /// An enumeration; each value becomes an ordinal constant.
    Enum {
        name: Ident<'ast>,
        values: &'ast [Ident<'ast>],
        span: Span,
    },
}

impl<'ast> ModuleMember<'ast> {
    pub fn name(&self) -> &Ident<'ast> {
        match self {
            ModuleMember::Var { name, .. }
            | ModuleMember::Typedef { name, .. }
            | ModuleMember::Const { name, .. }
            | ModuleMember::Enum { name, .. } => name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ModuleMember::Var { span, .. }
            | ModuleMember::Typedef { span, .. }
            | ModuleMember::Const { span, .. }
            | ModuleMember::Enum { span, .. } => *span,
        }
    }
}

/// `var name [: Type] [:= initializer]`.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl<'ast> {
    pub name: Ident<'ast>,
    pub ty: Option<&'ast TypeDecl<'ast>>,
    pub initializer: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

/// `target := source`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment<'ast> {
    pub target: &'ast Expr<'ast>,
    pub source: &'ast Expr<'ast>,
    pub span: Span,
}

/// `set` statement: assignments with optional clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct ClausedAssignment<'ast> {
    pub for_clauses: &'ast [ForClause<'ast>],
    pub let_clauses: &'ast [LetClause<'ast>],
    pub where_clause: Option<&'ast Expr<'ast>>,
    pub assignments: &'ast [Assignment<'ast>],
    pub span: Span,
}
