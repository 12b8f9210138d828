//! The compilation driver.
//!
//! A [`Compiler`] is the explicit context object for one compilation. Every
//! stage borrows it mutably; nothing is static or shared, so separate
//! compilations never alias state.
//!
//! Sections of a script are compiled in order: usings, module declarations,
//! variables, assignments, then the result expression. The first error
//! aborts the whole compilation.

use std::sync::Arc;

use bumpalo::Bump;
use rustc_hash::FxHashMap;
use tql_ast::{AstBuilder, ClausedAssignment, Script, VarDecl};
use tql_core::{CompilerError, CompilerErrorKind, InternalError, Name, Result, Span};
use tracing::{debug, instrument};

use crate::Characteristic;
use crate::backend::{Backend, Executable};
use crate::context::{ExprContext, SetTarget};
use crate::expr;
use crate::frame::{FrameId, Scopes, SymbolId, SymbolKind};
use crate::ir::{Ir, LocalId};
use crate::members::Member;
use crate::module::ModuleDescriptor;
use crate::options::CompilerOptions;
use crate::types::BaseType;
use crate::types::conversion::find_conversion;
use crate::types::defaults::build_default;

/// Result of a successful compilation.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub executable: Executable,
    /// Statically inferred type of the script's result; `Void` when the
    /// script has no result expression.
    pub result_type: BaseType,
}

/// Locals of the function currently being compiled.
#[derive(Debug)]
pub(crate) struct FunctionScope {
    pub(crate) locals: LocalId,
}

/// State of one compilation.
pub struct Compiler<'ast> {
    pub(crate) options: CompilerOptions,
    pub(crate) scopes: Scopes,
    pub(crate) contexts: FxHashMap<SymbolId, ExprContext>,
    pub(crate) members: Vec<Member<'ast>>,
    /// Catalog listing; `SymbolKind::Module` indexes into it.
    pub(crate) catalog: Vec<Arc<ModuleDescriptor>>,
    /// Frame holding the catalog's modules by name. Only usings resolve here.
    pub(crate) modules_frame: FrameId,
    /// Root of every scope chain: scalar types and imported module members.
    pub(crate) import_frame: FrameId,
    /// Script variables.
    pub(crate) script_frame: FrameId,
    pub(crate) backend: Backend,
    function_scopes: Vec<FunctionScope>,
}

impl<'ast> Compiler<'ast> {
    pub fn new(options: CompilerOptions) -> Self {
        let mut scopes = Scopes::new();
        let modules_frame = scopes.root();
        let import_frame = scopes.root();
        let script_frame = scopes.child(import_frame);
        let backend = Backend::new(options.debug_info);
        Self {
            options,
            scopes,
            contexts: FxHashMap::default(),
            members: Vec::new(),
            catalog: Vec::new(),
            modules_frame,
            import_frame,
            script_frame,
            backend,
            function_scopes: Vec::new(),
        }
    }

    /// Compile `script` into an executable.
    pub fn compile(mut self, script: &'ast Script<'ast>) -> Result<CompileOutput> {
        let (main, result_type) = self.compile_main(script)?;
        let scope = self.pop_scope()?;
        let Compiler { options, backend, .. } = self;
        let executable = backend.finish(&main, scope.locals, options.artifact_name, options.source_description)?;
        debug!(executable = executable.name(), result = %result_type, "compiled script");
        Ok(CompileOutput {
            executable,
            result_type,
        })
    }

    /// Type-check the script and build the entry point's IR. Leaves the main
    /// function scope open.
    #[instrument(level = "trace", skip_all, fields(artifact = %self.options.artifact_name))]
    pub(crate) fn compile_main(&mut self, script: &'ast Script<'ast>) -> Result<(Ir, BaseType)> {
        self.push_scope();
        self.seed_import_frame()?;

        let mut statements = Vec::new();
        self.bind_usings(script.usings, &mut statements)?;
        for module in script.modules {
            self.declare_module(module, &mut statements)?;
        }
        for var in script.vars {
            statements.push(self.compile_var(var)?);
        }
        for assignment in script.assignments {
            self.compile_assignment(assignment, &mut statements)?;
        }

        let frame = self.script_frame;
        let (result, span) = match script.expression {
            Some(expression) => (expr::comprehension::compile_claused(self, expression, frame, None)?, expression.span),
            None => (ExprContext::constant(BaseType::Void, tql_core::Value::Void), script.span),
        };
        let result_type = result.ty.clone();
        let get = result.into_get(span)?;
        Ok((Ir::block(statements, get), result_type))
    }

    fn seed_import_frame(&mut self) -> Result<()> {
        let frame = self.import_frame;
        let scalars: Vec<(String, BaseType)> = self
            .options
            .scalar_types
            .iter()
            .map(|(name, ty)| (name.clone(), ty.clone()))
            .collect();
        for (name, ty) in scalars {
            self.define(frame, Name::parse(&name), Span::default(), ExprContext::typedef(ty))?;
        }

        self.catalog = self.options.catalog.modules();
        for (index, module) in self.catalog.iter().enumerate() {
            self.scopes
                .add(self.modules_frame, module.name.clone(), SymbolKind::Module(index), Span::default())?;
        }
        Ok(())
    }

    // ========================================================================
    // Variables and assignments
    // ========================================================================

    fn compile_var(&mut self, var: &VarDecl<'_>) -> Result<Ir> {
        let frame = self.script_frame;
        let name = var.name.to_name();
        let declared = match var.ty {
            Some(ty) => Some(self.compile_type(ty, frame)?),
            None => None,
        };

        let value = match (var.initializer, declared) {
            (Some(initializer), declared) => {
                let ctx = expr::compile_expr(self, initializer, frame, declared.as_ref())?;
                match declared {
                    Some(ty) => self.convert(ctx, &ty, initializer.span())?,
                    None => ctx,
                }
            }
            (None, Some(ty)) => {
                let arena = Bump::new();
                let builder = AstBuilder::new(&arena);
                builder.at_line(var.span.line);
                let default = build_default(&ty, &builder);
                let ctx = expr::compile_expr(self, &default, frame, Some(&ty))?;
                self.convert(ctx, &ty, var.span)?
            }
            (None, None) => {
                return Err(CompilerError::new(
                    CompilerErrorKind::IncorrectType,
                    var.span,
                    format!("variable '{name}' needs a type or an initializer"),
                )
                .into());
            }
        };

        let ty = value.ty.clone();
        let get = value.into_get(var.span)?;
        let slot = self.allocate_local()?;
        let ir = Ir::store(
            slot,
            Ir::Initializer {
                name: name.clone(),
                ty: ty.clone(),
                value: Box::new(get),
            },
        );
        let ctx = ExprContext::value(ty, Characteristic::default(), Ir::Local(slot)).with_set(SetTarget::Local(slot));
        self.define(frame, name, var.name.span, ctx)?;
        Ok(ir)
    }

    fn compile_assignment(&mut self, assignment: &ClausedAssignment<'_>, statements: &mut Vec<Ir>) -> Result<()> {
        if !assignment.for_clauses.is_empty() || !assignment.let_clauses.is_empty() || assignment.where_clause.is_some()
        {
            return Err(CompilerError::new(
                CompilerErrorKind::UnsupportedClause,
                assignment.span,
                "assignments cannot have for, let or where clauses",
            )
            .into());
        }

        let frame = self.script_frame;
        for item in assignment.assignments {
            let target = expr::compile_expr(self, item.target, frame, None)?;
            let set = target.set.ok_or_else(|| {
                CompilerError::new(
                    CompilerErrorKind::CannotAssignToTarget,
                    item.target.span(),
                    "target of an assignment must be a variable",
                )
            })?;
            let source = expr::compile_expr(self, item.source, frame, Some(&target.ty))?;
            let source = self.convert(source, &target.ty, item.source.span())?;
            let ir = set.store(source.into_get(item.source.span())?);
            statements.push(self.mark(ir, item.span));
        }
        Ok(())
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    /// Declare `name` in `frame` with a known context.
    pub(crate) fn define(&mut self, frame: FrameId, name: Name, span: Span, ctx: ExprContext) -> Result<SymbolId> {
        let kind = if ctx.is_type() { SymbolKind::Type } else { SymbolKind::Value };
        let id = self.scopes.add(frame, name, kind, span)?;
        self.contexts.insert(id, ctx);
        Ok(id)
    }

    /// The context of a resolved symbol, compiling module members on demand.
    pub(crate) fn symbol_context(&mut self, id: SymbolId, span: Span) -> Result<ExprContext> {
        match self.scopes.symbol(id).kind {
            SymbolKind::Member(member) => self.compile_member(member, span),
            SymbolKind::Module(_) => {
                let name = &self.scopes.symbol(id).name;
                Err(CompilerError::incorrect_type_referenced(span, name, "value or type").into())
            }
            SymbolKind::Value | SymbolKind::Type => self.contexts.get(&id).cloned().ok_or_else(|| {
                InternalError::invariant(format!("symbol '{}' has no context", self.scopes.symbol(id).name)).into()
            }),
        }
    }

    /// Convert `ctx` to `target`, failing with `IncorrectType`.
    pub(crate) fn convert(&self, ctx: ExprContext, target: &BaseType, span: Span) -> Result<ExprContext> {
        match find_conversion(&ctx.ty, target) {
            Some(conversion) => Ok(ctx.converted(conversion, target.clone())),
            None => Err(CompilerError::incorrect_type(span, &ctx.ty, target).into()),
        }
    }

    /// Attach the span's line when debug info is enabled.
    pub(crate) fn mark(&self, ir: Ir, span: Span) -> Ir {
        if self.backend.debug_info() { ir.at(span.line) } else { ir }
    }

    pub(crate) fn push_scope(&mut self) {
        self.function_scopes.push(FunctionScope { locals: 0 });
    }

    pub(crate) fn pop_scope(&mut self) -> Result<FunctionScope> {
        self.function_scopes
            .pop()
            .ok_or_else(|| InternalError::invariant("function scope stack is empty").into())
    }

    /// A fresh local in the function currently being compiled.
    pub(crate) fn allocate_local(&mut self) -> Result<LocalId> {
        let scope = self
            .function_scopes
            .last_mut()
            .ok_or_else(|| InternalError::invariant("no function scope for local"))?;
        let local = scope.locals;
        scope.locals += 1;
        Ok(local)
    }
}

/// Compile `script` with `options`.
pub fn compile<'ast>(script: &'ast Script<'ast>, options: CompilerOptions) -> Result<CompileOutput> {
    Compiler::new(options).compile(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Arguments;
    use bumpalo::Bump;
    use tql_ast::BinaryOp;
    use tql_core::{CompilerErrorKind, NoStorage, Value};

    fn run(script: &Script<'_>) -> (Value, BaseType) {
        let output = compile(script, CompilerOptions::default()).unwrap();
        let value = output.executable.invoke(&Arguments::new(), &NoStorage).unwrap();
        (value, output.result_type)
    }

    #[test]
    fn empty_script_is_void() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let script = b.script(vec![], vec![], vec![], vec![], None);
        assert_eq!(run(script), (Value::Void, BaseType::Void));
    }

    #[test]
    fn var_initializer_converts_to_declared_type() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let script = b.script(
            vec![],
            vec![],
            vec![b.var("x", Some(b.named_type("Int64")), Some(b.int(3)))],
            vec![],
            Some(b.claused(vec![], vec![], None, b.id("x"))),
        );
        assert_eq!(run(script), (Value::Int64(3), BaseType::INT64));
    }

    #[test]
    fn assignment_reads_back_converted() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let script = b.script(
            vec![],
            vec![],
            vec![b.var("x", Some(b.named_type("Double")), None)],
            vec![b.assign(b.id("x"), b.binary(b.int(2), BinaryOp::Add, b.int(3)))],
            Some(b.claused(vec![], vec![], None, b.id("x"))),
        );
        assert_eq!(run(script), (Value::double(5.0), BaseType::DOUBLE));
    }

    #[test]
    fn initializer_overridden_by_argument() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let script = b.script(
            vec![],
            vec![],
            vec![b.var("limit", None, Some(b.int(10)))],
            vec![],
            Some(b.claused(vec![], vec![], None, b.binary(b.id("limit"), BinaryOp::Multiply, b.int(2)))),
        );
        let output = compile(script, CompilerOptions::default()).unwrap();
        let args = Arguments::new().with("limit", 21);
        assert_eq!(output.executable.invoke(&args, &NoStorage).unwrap(), Value::Int32(42));
        assert_eq!(
            output.executable.invoke(&Arguments::new(), &NoStorage).unwrap(),
            Value::Int32(20)
        );
    }

    #[test]
    fn arguments_are_fitted_to_the_var_type() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let script = b.script(
            vec![],
            vec![],
            vec![b.var("x", Some(b.named_type("Int64")), Some(b.long(1)))],
            vec![],
            Some(b.claused(vec![], vec![], None, b.id("x"))),
        );
        let output = compile(script, CompilerOptions::default()).unwrap();
        assert_eq!(output.result_type, BaseType::INT64);

        let widened = output.executable.invoke(&Arguments::new().with("x", 5), &NoStorage);
        assert_eq!(widened, Ok(Value::Int64(5)));

        let err = output
            .executable
            .invoke(&Arguments::new().with("x", "oops"), &NoStorage)
            .unwrap_err();
        assert_eq!(
            err,
            tql_core::RuntimeError::ArgumentType {
                name: Name::parse("x"),
                expected: "Int64".to_string(),
                found: "String",
            }
        );
    }

    #[test]
    fn unkeyed_rows_fill_a_keyed_table() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let table = b.set_type(b.tuple_type(vec![("id", b.named_type("Int32"))], vec![b.key(&["id"])], vec![]));
        let row = |id: i32| b.tuple(vec![(Some("id"), b.int(id))]);
        let script = b.script(
            vec![],
            vec![],
            vec![b.var("rows", Some(table), Some(b.set(vec![row(1)])))],
            vec![b.assign(b.id("rows"), b.set(vec![row(2), row(3)]))],
            Some(b.claused(vec![], vec![], None, b.binary(row(3), BinaryOp::In, b.id("rows")))),
        );
        assert_eq!(run(script), (Value::Boolean(true), BaseType::BOOLEAN));
    }

    #[test]
    fn var_without_type_or_initializer() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let script = b.script(vec![], vec![], vec![b.var("x", None, None)], vec![], None);
        let err = compile(script, CompilerOptions::default()).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::IncorrectType));
    }

    #[test]
    fn assignment_to_literal_rejected() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let script = b.script(vec![], vec![], vec![], vec![b.assign(b.int(1), b.int(2))], None);
        let err = compile(script, CompilerOptions::default()).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::CannotAssignToTarget));
    }

    #[test]
    fn assignment_with_clauses_unsupported() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut assignment = b.assign(b.id("x"), b.int(1));
        assignment.where_clause = Some(b.alloc(b.boolean(true)));
        let script = b.script(
            vec![],
            vec![],
            vec![b.var("x", None, Some(b.int(0)))],
            vec![assignment],
            None,
        );
        let err = compile(script, CompilerOptions::default()).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::UnsupportedClause));
    }

    #[test]
    fn duplicate_variable() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let script = b.script(
            vec![],
            vec![],
            vec![b.var("x", None, Some(b.int(0))), b.var("x", None, Some(b.int(1)))],
            vec![],
            None,
        );
        let err = compile(script, CompilerOptions::default()).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::DuplicateName));
    }

    #[test]
    fn typedef_as_result_is_rejected() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let err = compile(b.query(b.id("Int32")), CompilerOptions::default()).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::IncorrectTypeReferenced));
    }

    #[test]
    fn compilations_are_independent() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let first = b.script(vec![], vec![], vec![b.var("x", None, Some(b.int(1)))], vec![], None);
        let second = b.query(b.id("x"));
        assert!(compile(first, CompilerOptions::default()).is_ok());
        let err = compile(second, CompilerOptions::default()).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::IdentifierNotFound));
    }
}
