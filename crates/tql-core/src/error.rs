//! Error types for every phase of TQL processing.
//!
//! ## Error Hierarchy
//!
//! ```text
//! Error (top-level wrapper)
//! ├── CompilerError  - user-facing compile errors (with CompilerErrorKind)
//! ├── InternalError  - broken contracts between compiler, modules and backend
//! └── RuntimeError   - faults raised while an executable runs
//! ```
//!
//! Compilation stops at the first fault; there is no error recovery.

use thiserror::Error;

use crate::{Name, Span};

// ============================================================================
// Compiler Errors
// ============================================================================

/// Categories of compile errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilerErrorKind {
    /// A name did not resolve through the frame chain.
    IdentifierNotFound,
    /// A value's type cannot be used where it appears.
    IncorrectType,
    /// A name resolved, but to the wrong kind of symbol or context.
    IncorrectTypeReferenced,
    /// The target of an assignment has no setter.
    CannotAssignToTarget,
    /// A module member refers back to itself while compiling.
    RecursiveDeclaration,
    /// Type arguments of a generic call could not be determined.
    MismatchedGenericParameters,
    /// The callee of a call is not a function.
    CannotInvokeNonFunction,
    /// A `for` clause ranges over something other than a list or set.
    InvalidForExpressionTarget,
    /// A `const` member's value is not a compile-time constant.
    ConstantExpressionExpected,
    /// A tuple selector attribute has no name and its value is not an identifier.
    CannotInferNameFromExpression,
    /// A case expression violates the strict/else rules.
    InvalidCaseForm,
    /// A name is declared twice in the same scope.
    DuplicateName,
    /// A clause appears where it has no meaning.
    UnsupportedClause,
}

impl CompilerErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerErrorKind::IdentifierNotFound => "identifier not found",
            CompilerErrorKind::IncorrectType => "incorrect type",
            CompilerErrorKind::IncorrectTypeReferenced => "incorrect type referenced",
            CompilerErrorKind::CannotAssignToTarget => "cannot assign to target",
            CompilerErrorKind::RecursiveDeclaration => "recursive declaration",
            CompilerErrorKind::MismatchedGenericParameters => "mismatched generic parameters",
            CompilerErrorKind::CannotInvokeNonFunction => "cannot invoke non-function",
            CompilerErrorKind::InvalidForExpressionTarget => "invalid for expression target",
            CompilerErrorKind::ConstantExpressionExpected => "constant expression expected",
            CompilerErrorKind::CannotInferNameFromExpression => {
                "cannot infer name from expression"
            }
            CompilerErrorKind::InvalidCaseForm => "invalid case form",
            CompilerErrorKind::DuplicateName => "duplicate name",
            CompilerErrorKind::UnsupportedClause => "unsupported clause",
        }
    }
}

impl std::fmt::Display for CompilerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compile error at a source location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {span}: {message}")]
pub struct CompilerError {
    pub kind: CompilerErrorKind,
    pub span: Span,
    pub message: String,
}

impl CompilerError {
    pub fn new(kind: CompilerErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    pub fn identifier_not_found(span: Span, name: &Name) -> Self {
        Self::new(
            CompilerErrorKind::IdentifierNotFound,
            span,
            format!("'{name}' is not defined"),
        )
    }

    pub fn duplicate_name(span: Span, name: &Name) -> Self {
        Self::new(
            CompilerErrorKind::DuplicateName,
            span,
            format!("'{name}' is already declared in this scope"),
        )
    }

    /// `found` was supplied where `expected` is required.
    pub fn incorrect_type(span: Span, found: impl std::fmt::Display, expected: impl std::fmt::Display) -> Self {
        Self::new(
            CompilerErrorKind::IncorrectType,
            span,
            format!("found {found}, expected {expected}"),
        )
    }

    pub fn incorrect_type_referenced(span: Span, name: &Name, expected: &str) -> Self {
        Self::new(
            CompilerErrorKind::IncorrectTypeReferenced,
            span,
            format!("'{name}' does not refer to a {expected}"),
        )
    }

    pub fn recursive_declaration(span: Span, name: &Name) -> Self {
        Self::new(
            CompilerErrorKind::RecursiveDeclaration,
            span,
            format!("'{name}' refers to itself"),
        )
    }
}

// ============================================================================
// Internal Errors
// ============================================================================

/// Violations of contracts between the compiler and its collaborators.
///
/// These indicate a bug in a module, host or the compiler itself, never a
/// mistake in the script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    /// A module descriptor is inconsistent.
    #[error("module '{module}' is malformed: {message}")]
    MalformedModule { module: Name, message: String },

    /// Lowered code referred to a slot that was never allocated.
    #[error("unknown {kind} slot {index}")]
    UnknownSlot { kind: &'static str, index: u32 },

    /// A compiler invariant did not hold.
    #[error("internal compiler error: {message}")]
    Invariant { message: String },
}

impl InternalError {
    pub fn invariant(message: impl Into<String>) -> Self {
        InternalError::Invariant {
            message: message.into(),
        }
    }
}

// ============================================================================
// Runtime Errors
// ============================================================================

/// Faults raised while an executable runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// No `when` of a strict case matched.
    #[error("no case matched: {message}")]
    UnhandledCase { message: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow in {operation}")]
    Overflow { operation: &'static str },

    /// A value reached an instruction that cannot handle it.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: &'static str },

    /// The storage layer failed or refused a request.
    #[error("repository '{repository}' failed: {message}")]
    Repository { repository: Name, message: String },

    /// A native module function reported a failure.
    #[error("native function '{function}' failed: {message}")]
    Native { function: Name, message: String },

    #[error("call depth exceeded {limit}")]
    StackOverflow { limit: usize },

    /// A host argument does not fit the variable it overrides.
    #[error("argument '{name}' expects {expected}, found {found}")]
    ArgumentType {
        name: Name,
        expected: String,
        found: &'static str,
    },

    /// The executable referenced something it does not contain.
    #[error(transparent)]
    Internal(#[from] InternalError),

    /// Another runtime error, tagged with the script line it occurred on.
    #[error("line {line}: {source}")]
    AtLine {
        line: u32,
        #[source]
        source: Box<RuntimeError>,
    },
}

impl RuntimeError {
    pub fn native(function: impl Into<Name>, message: impl Into<String>) -> Self {
        RuntimeError::Native {
            function: function.into(),
            message: message.into(),
        }
    }

    pub fn type_mismatch(expected: &'static str, found: &crate::Value) -> Self {
        RuntimeError::TypeMismatch {
            expected,
            found: found.kind_name(),
        }
    }

    /// The innermost error, with line tags stripped.
    pub fn root(&self) -> &RuntimeError {
        match self {
            RuntimeError::AtLine { source, .. } => source.root(),
            other => other,
        }
    }
}

// ============================================================================
// Unified Error
// ============================================================================

/// Any error produced by compiling or running a script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Compiler(#[from] CompilerError),

    #[error(transparent)]
    Internal(#[from] InternalError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl Error {
    /// The compile error kind, when this is a compile error.
    pub fn compiler_kind(&self) -> Option<CompilerErrorKind> {
        match self {
            Error::Compiler(e) => Some(e.kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiler_error_display() {
        let err = CompilerError::identifier_not_found(Span::new(2, 7, 3), &Name::parse("foo.bar"));
        assert_eq!(
            err.to_string(),
            "identifier not found at 2:7: 'foo.bar' is not defined"
        );
    }

    #[test]
    fn unified_error_keeps_kind() {
        let err: Error = CompilerError::new(CompilerErrorKind::InvalidCaseForm, Span::default(), "x").into();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::InvalidCaseForm));
        let err: Error = RuntimeError::DivisionByZero.into();
        assert_eq!(err.compiler_kind(), None);
    }

    #[test]
    fn root_strips_line_tags() {
        let err = RuntimeError::AtLine {
            line: 4,
            source: Box::new(RuntimeError::DivisionByZero),
        };
        assert_eq!(err.root(), &RuntimeError::DivisionByZero);
        assert_eq!(err.to_string(), "line 4: division by zero");
    }
}
