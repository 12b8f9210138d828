//! Module binding for `using` declarations.
//!
//! Binding a module registers every member of its descriptor in the import
//! frame under `prefix.member`, where the prefix is the using's alias or the
//! module name, and emits one `BindModule` so the executable fetches the
//! module's repositories when it runs.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tql_ast::Using;
use tql_core::{FunctionRef, InternalError, Name, Result, Span, Value};
use tracing::debug;

use crate::Characteristic;
use crate::backend::{ModuleBinding, ModuleVariable};
use crate::compiler::Compiler;
use crate::context::{ExprContext, FunctionHandle, SetTarget};
use crate::frame::SymbolKind;
use crate::ir::Ir;
use crate::types::BaseType;

impl Compiler<'_> {
    /// Bind the script's usings, then every default using whose module the
    /// script did not name. Each module binds once; the first using wins.
    pub(crate) fn bind_usings(&mut self, usings: &[Using<'_>], statements: &mut Vec<Ir>) -> Result<()> {
        let mut bound = FxHashSet::default();
        for using in usings {
            let target = using.target.to_name();
            if !bound.insert(target.clone()) {
                continue;
            }
            let prefix = match using.alias {
                Some(alias) => alias.to_name(),
                None => target.clone(),
            };
            let index = self.resolve_module(&target, using.target.span)?;
            statements.push(self.bind_module(index, &prefix, using.span)?);
        }

        let defaults = self.options.default_usings.clone();
        for target in defaults {
            if !bound.insert(target.clone()) {
                continue;
            }
            let index = self.resolve_module(&target, Span::default())?;
            statements.push(self.bind_module(index, &target, Span::default())?);
        }
        Ok(())
    }

    fn resolve_module(&mut self, name: &Name, span: Span) -> Result<usize> {
        let id = self
            .scopes
            .resolve_kind(self.modules_frame, name, span, "module", |kind| matches!(kind, SymbolKind::Module(_)))?;
        match self.scopes.symbol(id).kind {
            SymbolKind::Module(index) => Ok(index),
            _ => Err(InternalError::invariant(format!("'{name}' resolved to a non-module")).into()),
        }
    }

    fn bind_module(&mut self, index: usize, prefix: &Name, span: Span) -> Result<Ir> {
        let module = self
            .catalog
            .get(index)
            .map(Arc::clone)
            .ok_or(InternalError::UnknownSlot {
                kind: "catalog module",
                index: index as u32,
            })?;
        let slot = self.backend.add_module(ModuleBinding {
            name: module.name.clone(),
            version: module.version.clone(),
            variables: module
                .variables
                .iter()
                .map(|variable| ModuleVariable {
                    name: variable.name.clone(),
                    type_name: variable.ty.to_string(),
                })
                .collect(),
        });
        let frame = self.import_frame;

        for function in &module.functions {
            let id = self.backend.add_native(module.name.join(&function.name), function.clone());
            let ctx = ExprContext::constant(
                BaseType::Function(function.signature.clone()),
                Value::Function(FunctionRef::Native(id)),
            )
            .with_function(FunctionHandle::Native {
                id,
                type_parameters: function.type_parameters.clone(),
            });
            self.define(frame, prefix.join(&function.name), span, ctx)?;
        }

        for enumeration in &module.enums {
            let type_name = prefix.join(&enumeration.name);
            for (ordinal, value) in enumeration.values.iter().enumerate() {
                let ctx = ExprContext::constant(BaseType::INT32, Value::Int32(ordinal as i32));
                self.define(frame, type_name.child(value.as_str()), span, ctx)?;
            }
            self.define(frame, type_name, span, ExprContext::typedef(BaseType::INT32))?;
        }

        for constant in &module.constants {
            let ctx = ExprContext::constant(constant.ty.clone(), constant.value.clone());
            self.define(frame, prefix.join(&constant.name), span, ctx)?;
        }

        for typedef in &module.typedefs {
            self.define(frame, prefix.join(&typedef.name), span, ExprContext::typedef(typedef.ty.clone()))?;
        }

        for (variable, descriptor) in module.variables.iter().enumerate() {
            let variable = variable as u32;
            let ctx = ExprContext::value(
                descriptor.ty.clone(),
                Characteristic::default(),
                Ir::RepositoryGet { module: slot, variable },
            )
            .with_set(SetTarget::Repository { module: slot, variable });
            self.define(frame, prefix.join(&descriptor.name), span, ctx)?;
        }

        debug!(module = %module.name, prefix = %prefix, slot, "bound module");
        Ok(self.mark(Ir::BindModule { module: slot }, span))
    }
}
