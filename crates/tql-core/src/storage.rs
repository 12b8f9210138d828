//! Storage contracts between executables and the host.
//!
//! Module variables are not values held by the executable; they are
//! repositories obtained from the host's [`RepositoryFactory`] when a module
//! instance is bound, and every read or write goes through them.

use std::fmt;
use std::sync::Arc;

use crate::{Name, RuntimeError, Value};

/// A storage-backed module variable.
pub trait Repository: Send + Sync + fmt::Debug {
    /// Read the stored value. `condition` and `order` are optional
    /// restrictions that repositories may ignore.
    fn get(&self, condition: Option<&Value>, order: Option<&Value>) -> Result<Value, RuntimeError>;

    /// Replace the stored value, or the part selected by `condition`.
    fn set(&self, condition: Option<&Value>, value: Value) -> Result<(), RuntimeError>;
}

/// Describes a module declared by a script, announced to the host at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDeclaration {
    pub name: Name,
    pub version: Option<String>,
    /// Names of the module's storage-backed variables.
    pub variables: Vec<Name>,
}

/// Host-side source of repositories.
pub trait RepositoryFactory: Send + Sync {
    /// Repository for `variable` of `module`. `element_type` is the display
    /// form of the variable's declared type.
    fn repository(
        &self,
        module: &Name,
        variable: &Name,
        element_type: &str,
    ) -> Result<Arc<dyn Repository>, RuntimeError>;

    /// Called when a script-declared module is reached during execution.
    fn declare_module(&self, declaration: &ModuleDeclaration) -> Result<(), RuntimeError> {
        let _ = declaration;
        Ok(())
    }
}

/// A factory that has no storage at all; every request fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStorage;

impl RepositoryFactory for NoStorage {
    fn repository(
        &self,
        module: &Name,
        variable: &Name,
        _element_type: &str,
    ) -> Result<Arc<dyn Repository>, RuntimeError> {
        Err(RuntimeError::Repository {
            repository: module.join(variable),
            message: "no storage is available".to_string(),
        })
    }
}
