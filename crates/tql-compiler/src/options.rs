//! Compiler configuration.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tql_core::Name;

use crate::module::{ModuleCatalog, StaticCatalog};
use crate::types::{BaseType, ScalarKind};

/// Options for one compilation.
#[derive(Clone)]
pub struct CompilerOptions {
    /// Unqualified type names available to every script.
    pub scalar_types: IndexMap<String, BaseType>,
    /// Modules bound after the script's own usings, unless already named.
    pub default_usings: Vec<Name>,
    /// Record source lines so runtime errors report them.
    pub debug_info: bool,
    pub artifact_name: String,
    pub source_description: String,
    pub catalog: Arc<dyn ModuleCatalog>,
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scalar_type(mut self, name: impl Into<String>, ty: BaseType) -> Self {
        self.scalar_types.insert(name.into(), ty);
        self
    }

    pub fn with_default_using(mut self, module: impl Into<Name>) -> Self {
        self.default_usings.push(module.into());
        self
    }

    pub fn with_debug_info(mut self, enabled: bool) -> Self {
        self.debug_info = enabled;
        self
    }

    pub fn with_artifact_name(mut self, name: impl Into<String>) -> Self {
        self.artifact_name = name.into();
        self
    }

    pub fn with_source_description(mut self, description: impl Into<String>) -> Self {
        self.source_description = description.into();
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn ModuleCatalog>) -> Self {
        self.catalog = catalog;
        self
    }
}

impl Default for CompilerOptions {
    fn default() -> Self {
        let mut scalar_types: IndexMap<String, BaseType> = ScalarKind::ALL
            .iter()
            .map(|kind| (kind.name().to_string(), BaseType::Scalar(*kind)))
            .collect();
        scalar_types.insert("Void".to_string(), BaseType::Void);
        Self {
            scalar_types,
            default_usings: Vec::new(),
            debug_info: false,
            artifact_name: "script".to_string(),
            source_description: String::new(),
            catalog: Arc::new(StaticCatalog::new()),
        }
    }
}

impl fmt::Debug for CompilerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerOptions")
            .field("scalar_types", &self.scalar_types.keys().collect::<Vec<_>>())
            .field("default_usings", &self.default_usings)
            .field("debug_info", &self.debug_info)
            .field("artifact_name", &self.artifact_name)
            .field("source_description", &self.source_description)
            .finish_non_exhaustive()
    }
}
