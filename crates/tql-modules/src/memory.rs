//! In-memory storage for module variables.
//!
//! Each `(module, variable)` pair owns one [`MemoryRepository`], created on
//! first request and shared by every executable that binds the module
//! through the same factory. Conditions and orderings are ignored: reads
//! return the whole value and writes replace it.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tql_core::{ModuleDeclaration, Name, Repository, RepositoryFactory, RuntimeError, Value};
use tracing::trace;

#[derive(Debug)]
pub struct MemoryRepository {
    element_type: String,
    value: Mutex<Value>,
}

impl MemoryRepository {
    /// A repository holding the empty value for `element_type`: an empty
    /// list or set for collection types, `Void` otherwise.
    pub fn new(element_type: impl Into<String>) -> Self {
        let element_type = element_type.into();
        let value = empty_value(&element_type);
        Self {
            element_type,
            value: Mutex::new(value),
        }
    }

    pub fn element_type(&self) -> &str {
        &self.element_type
    }

    pub fn value(&self) -> Value {
        self.value.lock().clone()
    }
}

impl Repository for MemoryRepository {
    fn get(&self, _condition: Option<&Value>, _order: Option<&Value>) -> Result<Value, RuntimeError> {
        Ok(self.value())
    }

    fn set(&self, _condition: Option<&Value>, value: Value) -> Result<(), RuntimeError> {
        *self.value.lock() = value;
        Ok(())
    }
}

/// Lists display as `[T]` and sets as `{T}`; tuples display as `{ a: T }`
/// and are not collections.
fn empty_value(element_type: &str) -> Value {
    if element_type.ends_with('?') {
        Value::Void
    } else if element_type.starts_with('[') {
        Value::List(Vec::new())
    } else if element_type.starts_with('{') && !element_type.starts_with("{ ") && element_type != "{}" {
        Value::Set(Default::default())
    } else {
        Value::Void
    }
}

#[derive(Debug, Default)]
pub struct MemoryRepositoryFactory {
    repositories: Mutex<FxHashMap<Name, Arc<MemoryRepository>>>,
    declarations: Mutex<Vec<ModuleDeclaration>>,
}

impl MemoryRepositoryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` in `module.variable`, creating the repository if needed.
    pub fn seed(&self, module: &str, variable: &str, value: Value) {
        let key = Name::parse(module).join(&Name::parse(variable));
        let mut repositories = self.repositories.lock();
        match repositories.get(&key) {
            Some(repository) => *repository.value.lock() = value,
            None => {
                let repository = MemoryRepository {
                    element_type: String::new(),
                    value: Mutex::new(value),
                };
                repositories.insert(key, Arc::new(repository));
            }
        }
    }

    /// Current value of `module.variable`, if it has been created.
    pub fn value(&self, module: &str, variable: &str) -> Option<Value> {
        let key = Name::parse(module).join(&Name::parse(variable));
        self.repositories.lock().get(&key).map(|r| r.value())
    }

    /// Script-declared modules announced so far, in announcement order.
    pub fn declarations(&self) -> Vec<ModuleDeclaration> {
        self.declarations.lock().clone()
    }
}

impl RepositoryFactory for MemoryRepositoryFactory {
    fn repository(
        &self,
        module: &Name,
        variable: &Name,
        element_type: &str,
    ) -> Result<Arc<dyn Repository>, RuntimeError> {
        let key = module.join(variable);
        let mut repositories = self.repositories.lock();
        let repository = repositories.entry(key).or_insert_with_key(|key| {
            trace!(repository = %key, element_type, "creating memory repository");
            Arc::new(MemoryRepository::new(element_type))
        });
        Ok(Arc::clone(repository) as Arc<dyn Repository>)
    }

    fn declare_module(&self, declaration: &ModuleDeclaration) -> Result<(), RuntimeError> {
        let mut declarations = self.declarations.lock();
        if !declarations.contains(declaration) {
            declarations.push(declaration.clone());
        }
        Ok(())
    }
}
