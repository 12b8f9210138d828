//! Standard modules and storage for TQL hosts.
//!
//! - **system** - the `System` module: scalar typedefs, collection, math,
//!   string and date functions
//! - **memory** - a [`RepositoryFactory`](tql_core::RepositoryFactory) that
//!   keeps module variables in process memory
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tql_compiler::CompilerOptions;
//!
//! let options = CompilerOptions::default()
//!     .with_catalog(Arc::new(tql_modules::default_catalog()?))
//!     .with_default_using(tql_modules::system::NAME);
//! ```

pub mod memory;
pub mod system;

use tql_compiler::StaticCatalog;
use tql_core::InternalError;

pub use memory::{MemoryRepository, MemoryRepositoryFactory};

/// A catalog holding every module this crate provides.
pub fn default_catalog() -> Result<StaticCatalog, InternalError> {
    Ok(StaticCatalog::new().with(system::module()?))
}

#[cfg(test)]
mod tests {
    use tql_compiler::ModuleCatalog;

    use super::*;

    #[test]
    fn catalog_lists_system() {
        let catalog = default_catalog().unwrap();
        let names: Vec<String> = catalog.modules().iter().map(|m| m.name.to_string()).collect();
        assert_eq!(names, vec!["System".to_string()]);
    }
}
