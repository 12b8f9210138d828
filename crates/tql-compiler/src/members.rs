//! Script-declared modules and their members.
//!
//! Members are registered up front and compiled lazily: on first reference,
//! or in declaration order when the module is flushed. Each member is
//! compiled at most once. Reaching a member that is still being compiled
//! means the declarations depend on each other and fails with
//! `RecursiveDeclaration`.
//!
//! Inside its module a member is visible by its bare name; from the script
//! it is `Module.member`.

use tql_ast::{Expr, ModuleDecl, ModuleMember};
use tql_core::{CompilerError, CompilerErrorKind, InternalError, Name, Result, Span, Value};
use tracing::{debug, trace};

use crate::Characteristic;
use crate::backend::{ModuleBinding, ModuleVariable};
use crate::compiler::Compiler;
use crate::context::{ExprContext, SetTarget};
use crate::expr;
use crate::frame::{FrameId, MemberId, SymbolKind};
use crate::ir::{Ir, ModuleSlot};
use crate::types::BaseType;

#[derive(Debug, Clone)]
pub(crate) enum MemberState {
    Uncompiled,
    Compiling,
    Compiled(ExprContext),
}

/// A member of a script-declared module.
#[derive(Debug)]
pub(crate) struct Member<'ast> {
    pub(crate) decl: &'ast ModuleMember<'ast>,
    /// `Module.member`.
    pub(crate) name: Name,
    /// The module's frame; member bodies resolve names here.
    pub(crate) frame: FrameId,
    pub(crate) slot: ModuleSlot,
    /// Index among the module's `var` members.
    pub(crate) variable: Option<u32>,
    pub(crate) state: MemberState,
}

impl<'ast> Compiler<'ast> {
    /// Register the members of `module`, compile them all, and emit the
    /// statements that announce and bind the module at run time.
    pub(crate) fn declare_module(&mut self, module: &'ast ModuleDecl<'ast>, statements: &mut Vec<Ir>) -> Result<()> {
        let module_name = module.name.to_name();
        let slot = self.backend.add_module(ModuleBinding {
            name: module_name.clone(),
            version: module.version.as_ref().map(ToString::to_string),
            variables: Vec::new(),
        });
        let frame = self.scopes.child(self.script_frame);
        let first = self.members.len();
        let mut variables = 0;

        for decl in module.members {
            let ident = decl.name();
            let local = ident.to_name();
            let qualified = module_name.join(&local);
            let variable = match decl {
                ModuleMember::Var { .. } => {
                    variables += 1;
                    Some(variables - 1)
                }
                _ => None,
            };

            let id = self.members.len();
            self.members.push(Member {
                decl,
                name: qualified.clone(),
                frame,
                slot,
                variable,
                state: MemberState::Uncompiled,
            });
            self.scopes.add(frame, local.clone(), SymbolKind::Member(id), ident.span)?;
            self.scopes
                .add(self.script_frame, qualified.clone(), SymbolKind::Member(id), ident.span)?;

            if let ModuleMember::Enum { values, .. } = decl {
                for (ordinal, value) in values.iter().enumerate() {
                    let ctx = ExprContext::constant(BaseType::INT32, Value::Int32(ordinal as i32));
                    self.define(frame, local.child(value.name), value.span, ctx.clone())?;
                    self.define(self.script_frame, qualified.child(value.name), value.span, ctx)?;
                }
            }
        }

        for id in first..self.members.len() {
            let span = self.members[id].decl.span();
            self.compile_member(id, span)?;
        }

        let bound_variables: Vec<ModuleVariable> = self.members[first..]
            .iter()
            .filter_map(|member| match (member.decl, &member.state) {
                (ModuleMember::Var { name, .. }, MemberState::Compiled(ctx)) => Some(ModuleVariable {
                    name: name.to_name(),
                    type_name: ctx.ty.to_string(),
                }),
                _ => None,
            })
            .collect();
        self.backend
            .module_mut(slot)
            .ok_or(InternalError::UnknownSlot { kind: "module", index: slot })?
            .variables = bound_variables;

        debug!(module = %module_name, members = module.members.len(), variables, "declared module");
        statements.push(self.mark(Ir::DeclareModule { module: slot }, module.span));
        statements.push(self.mark(Ir::BindModule { module: slot }, module.span));
        Ok(())
    }

    /// The context of member `id`, compiling it if this is the first use.
    pub(crate) fn compile_member(&mut self, id: MemberId, span: Span) -> Result<ExprContext> {
        let member = self.members.get(id).ok_or(InternalError::UnknownSlot {
            kind: "member",
            index: id as u32,
        })?;
        match &member.state {
            MemberState::Compiled(ctx) => return Ok(ctx.clone()),
            MemberState::Compiling => return Err(CompilerError::recursive_declaration(span, &member.name).into()),
            MemberState::Uncompiled => {}
        }
        let (decl, frame, slot, variable) = (member.decl, member.frame, member.slot, member.variable);
        self.members[id].state = MemberState::Compiling;

        let ctx = match decl {
            ModuleMember::Var { ty, .. } => {
                let ty = self.compile_type(ty, frame)?;
                let variable = variable.ok_or_else(|| InternalError::invariant("var member without a variable index"))?;
                ExprContext::value(ty, Characteristic::default(), Ir::RepositoryGet { module: slot, variable })
                    .with_set(SetTarget::Repository { module: slot, variable })
            }
            ModuleMember::Typedef { ty, .. } => ExprContext::typedef(self.compile_type(ty, frame)?),
            ModuleMember::Enum { .. } => ExprContext::typedef(BaseType::INT32),
            ModuleMember::Const { value, span, .. } => self.compile_constant(value, frame, *span)?,
        };

        trace!(member = %self.members[id].name, ty = %ctx.ty, "compiled member");
        self.members[id].state = MemberState::Compiled(ctx.clone());
        Ok(ctx)
    }

    /// Function selectors become callables; anything else must be constant
    /// and is evaluated now.
    fn compile_constant(&mut self, value: &Expr<'_>, frame: FrameId, span: Span) -> Result<ExprContext> {
        if let Expr::Function(selector) = value {
            return expr::lambda::compile_function(self, selector, frame);
        }

        self.push_scope();
        let compiled = expr::compile_value(self, value, frame, None);
        let scope = self.pop_scope()?;
        let ctx = compiled?;
        if !ctx.characteristic.is_constant() {
            return Err(CompilerError::new(
                CompilerErrorKind::ConstantExpressionExpected,
                value.span(),
                "module constants must be computable at compile time",
            )
            .into());
        }

        let ty = ctx.ty.clone();
        let function = ctx.function.clone();
        let ir = ctx.into_get(span)?;
        let folded = self.backend.evaluate(&ir, scope.locals)?;
        debug!(value = %folded, ty = %ty, "folded module constant");

        let mut ctx = ExprContext::constant(ty, folded);
        ctx.function = function;
        Ok(ctx)
    }
}
