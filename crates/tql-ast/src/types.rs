//! Type declaration nodes (`Int32`, `Person*`, `{ id: Int32, key { id } }`, ...).

use tql_core::Span;

use crate::Ident;

/// A written type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDecl<'ast> {
    /// A reference to a typedef by name.
    Named(Ident<'ast>),
    /// `T?`
    Optional(&'ast TypeDecl<'ast>, Span),
    /// `[T]`
    List(&'ast TypeDecl<'ast>, Span),
    /// `{T}`
    Set(&'ast TypeDecl<'ast>, Span),
    /// `{ name: T, ..., key { ... }, ref ... }`
    Tuple(&'ast TupleTypeDecl<'ast>),
    /// `(a: A, b: B) => R`
    Function(&'ast FunctionTypeDecl<'ast>),
}

impl<'ast> TypeDecl<'ast> {
    pub fn span(&self) -> Span {
        match self {
            TypeDecl::Named(id) => id.span,
            TypeDecl::Optional(_, span) | TypeDecl::List(_, span) | TypeDecl::Set(_, span) => *span,
            TypeDecl::Tuple(t) => t.span,
            TypeDecl::Function(f) => f.span,
        }
    }
}

/// One attribute of a tuple type.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleAttributeDecl<'ast> {
    pub name: Ident<'ast>,
    pub ty: &'ast TypeDecl<'ast>,
    pub span: Span,
}

/// A candidate key: a set of attribute names.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyDecl<'ast> {
    pub attribute_names: &'ast [Ident<'ast>],
    pub span: Span,
}

/// A foreign-key style reference from this tuple to another table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDecl<'ast> {
    pub name: Ident<'ast>,
    pub source_attribute_names: &'ast [Ident<'ast>],
    /// The referenced variable; must hold a set or list of tuples.
    pub target: Ident<'ast>,
    pub target_attribute_names: &'ast [Ident<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TupleTypeDecl<'ast> {
    pub attributes: &'ast [TupleAttributeDecl<'ast>],
    pub keys: &'ast [KeyDecl<'ast>],
    pub references: &'ast [ReferenceDecl<'ast>],
    pub span: Span,
}

/// A named, typed parameter of a function type or function selector.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl<'ast> {
    pub name: Ident<'ast>,
    pub ty: &'ast TypeDecl<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTypeDecl<'ast> {
    pub parameters: &'ast [ParamDecl<'ast>],
    pub return_type: &'ast TypeDecl<'ast>,
    pub span: Span,
}
