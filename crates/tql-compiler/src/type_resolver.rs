//! Type declarations to [`BaseType`]s.
//!
//! Named types resolve through the frame chain like any other symbol and
//! must denote a type. Tuple keys and references are checked against the
//! tuple's own attributes; reference targets must be variables holding a
//! set or list of tuples.

use rustc_hash::FxHashSet;
use tql_ast::{Ident, KeyDecl, ModuleMember, ReferenceDecl, TypeDecl};
use tql_core::{CompilerError, Name, Result};

use crate::compiler::Compiler;
use crate::frame::{FrameId, SymbolKind};
use crate::members::MemberState;
use crate::types::{BaseType, FunctionParameter, FunctionType, TupleKey, TupleReference, TupleType};

impl Compiler<'_> {
    pub(crate) fn compile_type(&mut self, decl: &TypeDecl<'_>, frame: FrameId) -> Result<BaseType> {
        match decl {
            TypeDecl::Named(ident) => {
                let name = ident.to_name();
                let id = self.scopes.resolve(frame, &name, ident.span)?;
                let ctx = self.symbol_context(id, ident.span)?;
                if ctx.is_type() {
                    Ok(ctx.ty)
                } else {
                    Err(CompilerError::incorrect_type_referenced(ident.span, &name, "type").into())
                }
            }
            TypeDecl::Optional(of, _) => Ok(BaseType::optional(self.compile_type(of, frame)?)),
            TypeDecl::List(of, _) => Ok(BaseType::list(self.compile_type(of, frame)?)),
            TypeDecl::Set(of, _) => Ok(BaseType::set(self.compile_type(of, frame)?)),
            TypeDecl::Tuple(decl) => {
                let mut tuple = TupleType::new();
                for attribute in decl.attributes {
                    let ty = self.compile_type(attribute.ty, frame)?;
                    if !tuple.add_attribute(attribute.name.name, ty) {
                        return Err(CompilerError::duplicate_name(attribute.name.span, &attribute.name.to_name()).into());
                    }
                }
                self.add_constraints(&mut tuple, decl.keys, decl.references, frame)?;
                Ok(BaseType::Tuple(tuple))
            }
            TypeDecl::Function(decl) => {
                let mut seen = FxHashSet::default();
                let mut parameters = Vec::with_capacity(decl.parameters.len());
                for parameter in decl.parameters {
                    if !seen.insert(parameter.name.name) {
                        return Err(CompilerError::duplicate_name(parameter.name.span, &parameter.name.to_name()).into());
                    }
                    parameters.push(FunctionParameter::new(parameter.name.name, self.compile_type(parameter.ty, frame)?));
                }
                let return_type = self.compile_type(decl.return_type, frame)?;
                Ok(BaseType::Function(FunctionType::new(parameters, return_type)))
            }
        }
    }

    /// Attach keys and references to `tuple`, whose attributes are final.
    pub(crate) fn add_constraints(
        &mut self,
        tuple: &mut TupleType,
        keys: &[KeyDecl<'_>],
        references: &[ReferenceDecl<'_>],
        frame: FrameId,
    ) -> Result<()> {
        for key in keys {
            let names = own_attributes(tuple, key.attribute_names)?;
            tuple.keys.insert(TupleKey::new(names));
        }

        for reference in references {
            let name = reference.name.name.to_string();
            if tuple.references.contains_key(&name) {
                return Err(CompilerError::duplicate_name(reference.name.span, &reference.name.to_name()).into());
            }
            let source_attribute_names = own_attributes(tuple, reference.source_attribute_names)?;
            let target_row = self.reference_target(reference.target, frame)?;
            let mut target_attribute_names = Vec::with_capacity(reference.target_attribute_names.len());
            for ident in reference.target_attribute_names {
                if !target_row.iter().any(|attribute| attribute == ident.name) {
                    return Err(CompilerError::identifier_not_found(ident.span, &ident.to_name()).into());
                }
                target_attribute_names.push(ident.name.to_string());
            }
            tuple.references.insert(
                name,
                TupleReference {
                    source_attribute_names,
                    target: reference.target.to_name(),
                    target_attribute_names,
                },
            );
        }
        Ok(())
    }

    /// Attribute names of the rows held by a reference target.
    ///
    /// Module variables that are not compiled yet are read from their
    /// declaration, so two variables may reference each other.
    fn reference_target(&mut self, target: Ident<'_>, frame: FrameId) -> Result<Vec<String>> {
        let name = target.to_name();
        let id = self.scopes.resolve(frame, &name, target.span)?;

        if let SymbolKind::Member(member) = self.scopes.symbol(id).kind {
            if let Some(member) = self.members.get(member) {
                if !matches!(member.state, MemberState::Compiled(_)) {
                    if let ModuleMember::Var { ty, .. } = member.decl {
                        if let Some(names) = declared_row(ty) {
                            return Ok(names);
                        }
                    }
                }
            }
        }

        let ctx = self.symbol_context(id, target.span)?;
        match ctx.ty.element().and_then(BaseType::as_tuple) {
            Some(row) if !ctx.is_type() => Ok(row.attribute_names().map(str::to_string).collect()),
            _ => Err(wrong_target(&target, &name)),
        }
    }
}

fn own_attributes(tuple: &TupleType, idents: &[Ident<'_>]) -> Result<Vec<String>> {
    idents
        .iter()
        .map(|ident| match tuple.attribute(ident.name) {
            Some(_) => Ok(ident.name.to_string()),
            None => Err(CompilerError::identifier_not_found(ident.span, &ident.to_name()).into()),
        })
        .collect()
}

fn declared_row(decl: &TypeDecl<'_>) -> Option<Vec<String>> {
    match decl {
        TypeDecl::List(of, _) | TypeDecl::Set(of, _) => match of {
            TypeDecl::Tuple(row) => Some(row.attributes.iter().map(|a| a.name.name.to_string()).collect()),
            _ => None,
        },
        _ => None,
    }
}

fn wrong_target(target: &Ident<'_>, name: &Name) -> tql_core::Error {
    CompilerError::incorrect_type_referenced(target.span, name, "variable holding a set or list of tuples").into()
}
