//! Module descriptors: the surface a module exposes to scripts.
//!
//! A module is a named bundle of native functions, enumerations, literal
//! constants, typedefs and storage-backed variables. Hosts describe modules
//! with [`ModuleBuilder`] and list them through a [`ModuleCatalog`].

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tql_core::{InternalError, Name, RuntimeError, Value};

use crate::Characteristic;
use crate::types::{BaseType, FunctionParameter, FunctionType};

/// Body of a native function. Arguments arrive already converted to the
/// declared parameter types.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: Name,
    /// Names of the `Generic` type parameters used by `signature`.
    pub type_parameters: Vec<String>,
    pub signature: FunctionType,
    pub characteristic: Characteristic,
    body: NativeFn,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<Name>,
        parameters: Vec<(&str, BaseType)>,
        return_type: BaseType,
        body: impl Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        let parameters = parameters
            .into_iter()
            .map(|(n, t)| FunctionParameter::new(n, t))
            .collect();
        Self {
            name: name.into(),
            type_parameters: Vec::new(),
            signature: FunctionType::new(parameters, return_type),
            characteristic: Characteristic::CONSTANT,
            body: Arc::new(body),
        }
    }

    pub fn with_type_parameters(mut self, names: &[&str]) -> Self {
        self.type_parameters = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_characteristic(mut self, characteristic: Characteristic) -> Self {
        self.characteristic = characteristic;
        self
    }

    pub fn arity(&self) -> usize {
        self.signature.parameters.len()
    }

    pub fn invoke(&self, arguments: &[Value]) -> Result<Value, RuntimeError> {
        (self.body)(arguments)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("type_parameters", &self.type_parameters)
            .field("signature", &self.signature)
            .field("characteristic", &self.characteristic)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor {
    pub name: Name,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantDescriptor {
    pub name: Name,
    pub ty: BaseType,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedefDescriptor {
    pub name: Name,
    pub ty: BaseType,
}

/// A storage-backed variable; reads and writes go to a host repository.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDescriptor {
    pub name: Name,
    pub ty: BaseType,
}

#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    pub name: Name,
    pub version: Option<String>,
    pub functions: Vec<NativeFunction>,
    pub enums: Vec<EnumDescriptor>,
    pub constants: Vec<ConstantDescriptor>,
    pub typedefs: Vec<TypedefDescriptor>,
    pub variables: Vec<VariableDescriptor>,
}

/// Builds and validates a [`ModuleDescriptor`].
#[derive(Debug)]
pub struct ModuleBuilder {
    descriptor: ModuleDescriptor,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            descriptor: ModuleDescriptor {
                name: name.into(),
                version: None,
                functions: Vec::new(),
                enums: Vec::new(),
                constants: Vec::new(),
                typedefs: Vec::new(),
                variables: Vec::new(),
            },
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.descriptor.version = Some(version.into());
        self
    }

    pub fn native(mut self, function: NativeFunction) -> Self {
        self.descriptor.functions.push(function);
        self
    }

    pub fn function(
        self,
        name: &str,
        parameters: Vec<(&str, BaseType)>,
        return_type: BaseType,
        body: impl Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        self.native(NativeFunction::new(name, parameters, return_type, body))
    }

    pub fn generic_function(
        self,
        name: &str,
        type_parameters: &[&str],
        parameters: Vec<(&str, BaseType)>,
        return_type: BaseType,
        body: impl Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        self.native(NativeFunction::new(name, parameters, return_type, body).with_type_parameters(type_parameters))
    }

    pub fn enumeration(mut self, name: &str, values: &[&str]) -> Self {
        self.descriptor.enums.push(EnumDescriptor {
            name: Name::parse(name),
            values: values.iter().map(|v| v.to_string()).collect(),
        });
        self
    }

    pub fn constant(mut self, name: &str, ty: BaseType, value: Value) -> Self {
        self.descriptor.constants.push(ConstantDescriptor {
            name: Name::parse(name),
            ty,
            value,
        });
        self
    }

    pub fn typedef(mut self, name: &str, ty: BaseType) -> Self {
        self.descriptor.typedefs.push(TypedefDescriptor {
            name: Name::parse(name),
            ty,
        });
        self
    }

    pub fn variable(mut self, name: &str, ty: BaseType) -> Self {
        self.descriptor.variables.push(VariableDescriptor {
            name: Name::parse(name),
            ty,
        });
        self
    }

    /// Validate and finish.
    ///
    /// Member names must be unique, and `Generic` types may only appear in
    /// function signatures that declare them.
    pub fn build(self) -> Result<ModuleDescriptor, InternalError> {
        let d = self.descriptor;
        let malformed = |message: String| InternalError::MalformedModule {
            module: d.name.clone(),
            message,
        };

        let mut seen = FxHashSet::default();
        let names = d
            .functions
            .iter()
            .map(|f| &f.name)
            .chain(d.enums.iter().map(|e| &e.name))
            .chain(d.constants.iter().map(|c| &c.name))
            .chain(d.typedefs.iter().map(|t| &t.name))
            .chain(d.variables.iter().map(|v| &v.name));
        for name in names {
            if !seen.insert(name) {
                return Err(malformed(format!("member '{name}' is declared twice")));
            }
        }

        for function in &d.functions {
            let declared: FxHashSet<&str> = function.type_parameters.iter().map(String::as_str).collect();
            let mut used = Vec::new();
            collect_generics(&BaseType::Function(function.signature.clone()), &mut used);
            if let Some(missing) = used.iter().find(|g| !declared.contains(g.as_str())) {
                return Err(malformed(format!(
                    "function '{}' uses undeclared type parameter '{missing}'",
                    function.name
                )));
            }
        }

        let plain_types = d
            .constants
            .iter()
            .map(|c| (&c.name, &c.ty))
            .chain(d.typedefs.iter().map(|t| (&t.name, &t.ty)))
            .chain(d.variables.iter().map(|v| (&v.name, &v.ty)));
        for (name, ty) in plain_types {
            if ty.is_generic() {
                return Err(malformed(format!("member '{name}' has a generic type")));
            }
        }

        Ok(d)
    }
}

fn collect_generics(ty: &BaseType, out: &mut Vec<String>) {
    match ty {
        BaseType::Generic(name) => out.push(name.clone()),
        BaseType::List(of) | BaseType::Set(of) | BaseType::Optional(of) => collect_generics(of, out),
        BaseType::Tuple(t) => t.attributes().for_each(|(_, ty)| collect_generics(ty, out)),
        BaseType::Function(f) => {
            f.parameters.iter().for_each(|p| collect_generics(&p.ty, out));
            collect_generics(&f.return_type, out);
        }
        BaseType::Void | BaseType::Scalar(_) => {}
    }
}

/// Source of the modules a script may `using`.
pub trait ModuleCatalog: Send + Sync {
    fn modules(&self) -> Vec<Arc<ModuleDescriptor>>;
}

/// A fixed list of modules.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    modules: Vec<Arc<ModuleDescriptor>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, module: ModuleDescriptor) -> Self {
        self.modules.push(Arc::new(module));
        self
    }

    pub fn add(&mut self, module: ModuleDescriptor) {
        self.modules.push(Arc::new(module));
    }
}

impl ModuleCatalog for StaticCatalog {
    fn modules(&self) -> Vec<Arc<ModuleDescriptor>> {
        self.modules.clone()
    }
}
