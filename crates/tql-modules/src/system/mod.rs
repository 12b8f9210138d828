//! The `System` module.
//!
//! Scripts reach its members as `System.Name`, or unqualified through an
//! alias-free default using. Each section file registers its own functions
//! on the shared [`ModuleBuilder`].

mod collections;
mod dates;
mod math;
mod strings;

use std::collections::BTreeSet;

use tql_compiler::{BaseType, ModuleBuilder, ModuleDescriptor, ScalarKind};
use tql_core::{InternalError, Name, NaiveDateTime, RuntimeError, Value};

pub const NAME: &str = "System";
pub const VERSION: &str = "1.0.0";

/// Build the module descriptor.
pub fn module() -> Result<ModuleDescriptor, InternalError> {
    let builder = ModuleBuilder::new(NAME).version(VERSION);
    let builder = ScalarKind::ALL
        .iter()
        .fold(builder, |builder, kind| builder.typedef(kind.name(), BaseType::Scalar(*kind)));
    let builder = collections::register(builder);
    let builder = math::register(builder);
    let builder = strings::register(builder);
    let builder = dates::register(builder);
    builder.build()
}

// =============================================================================
// ARGUMENT ACCESS
// =============================================================================

/// Typed access to the arguments of one native call.
///
/// Arguments arrive converted to the declared parameter types, so a kind
/// mismatch here means the descriptor and its body disagree.
pub(crate) struct Args<'a> {
    function: &'static str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub(crate) fn new(function: &'static str, values: &'a [Value]) -> Self {
        Self { function, values }
    }

    pub(crate) fn fail(&self, message: impl Into<String>) -> RuntimeError {
        failure(self.function, message)
    }

    pub(crate) fn get(&self, index: usize) -> Result<&'a Value, RuntimeError> {
        self.values
            .get(index)
            .ok_or_else(|| self.fail(format!("missing argument {}", index + 1)))
    }

    pub(crate) fn int32(&self, index: usize) -> Result<i32, RuntimeError> {
        match self.get(index)? {
            Value::Int32(v) => Ok(*v),
            other => Err(RuntimeError::type_mismatch("Int32", other)),
        }
    }

    pub(crate) fn int64(&self, index: usize) -> Result<i64, RuntimeError> {
        match self.get(index)? {
            Value::Int64(v) => Ok(*v),
            other => Err(RuntimeError::type_mismatch("Int64", other)),
        }
    }

    pub(crate) fn double(&self, index: usize) -> Result<f64, RuntimeError> {
        match self.get(index)? {
            Value::Double(v) => Ok(v.0),
            other => Err(RuntimeError::type_mismatch("Double", other)),
        }
    }

    pub(crate) fn string(&self, index: usize) -> Result<&'a str, RuntimeError> {
        match self.get(index)? {
            Value::String(s) => Ok(s),
            other => Err(RuntimeError::type_mismatch("String", other)),
        }
    }

    pub(crate) fn date_time(&self, index: usize) -> Result<NaiveDateTime, RuntimeError> {
        match self.get(index)? {
            Value::DateTime(dt) => Ok(*dt),
            other => Err(RuntimeError::type_mismatch("DateTime", other)),
        }
    }

    pub(crate) fn list(&self, index: usize) -> Result<&'a [Value], RuntimeError> {
        match self.get(index)? {
            Value::List(items) => Ok(items),
            other => Err(RuntimeError::type_mismatch("List", other)),
        }
    }

    pub(crate) fn set(&self, index: usize) -> Result<&'a BTreeSet<Value>, RuntimeError> {
        match self.get(index)? {
            Value::Set(items) => Ok(items),
            other => Err(RuntimeError::type_mismatch("Set", other)),
        }
    }
}

pub(crate) fn failure(function: &str, message: impl Into<String>) -> RuntimeError {
    RuntimeError::native(Name::simple(NAME).child(function), message)
}

/// Checked narrowing for counts and indexes handed back to scripts.
pub(crate) fn to_int32(value: usize, operation: &'static str) -> Result<Value, RuntimeError> {
    i32::try_from(value)
        .map(Value::Int32)
        .map_err(|_| RuntimeError::Overflow { operation })
}

#[cfg(test)]
pub(crate) mod testing {
    use tql_core::{RuntimeError, Value};

    /// Invoke a `System` function directly, bypassing the compiler.
    pub(crate) fn call(name: &str, arguments: &[Value]) -> Result<Value, RuntimeError> {
        let module = super::module().unwrap();
        let function = module
            .functions
            .iter()
            .find(|f| f.name.to_string() == name)
            .unwrap_or_else(|| panic!("System.{name} is not defined"));
        function.invoke(arguments)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bumpalo::Bump;
    use tql_ast::{AstBuilder, Script};
    use tql_compiler::{Arguments, CompilerOptions, StaticCatalog, compile};
    use tql_core::{CompilerErrorKind, NoStorage};

    use super::*;

    fn eval(script: &Script<'_>) -> tql_core::Result<(Value, BaseType)> {
        let options = CompilerOptions::default()
            .with_catalog(Arc::new(StaticCatalog::new().with(module().unwrap())))
            .with_default_using(NAME);
        let output = compile(script, options)?;
        let value = output.executable.invoke(&Arguments::new(), &NoStorage)?;
        Ok((value, output.result_type))
    }

    #[test]
    fn descriptor_builds() {
        let module = module().unwrap();
        assert_eq!(module.version.as_deref(), Some(VERSION));
        assert_eq!(module.typedefs.len(), ScalarKind::ALL.len());
        assert!(module.variables.is_empty());
    }

    #[test]
    fn typedefs_name_scalars() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let script = b.script(
            vec![],
            vec![],
            vec![b.var("x", Some(b.named_type("System.Int64")), Some(b.int(3)))],
            vec![],
            Some(b.claused(vec![], vec![], None, b.id("x"))),
        );
        assert_eq!(eval(script).unwrap(), (Value::Int64(3), BaseType::INT64));
    }

    #[test]
    fn generic_call_infers_element_type() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let expr = b.call(b.id("System.ToList"), vec![b.set(vec![b.int(2), b.int(1)])]);
        let (value, ty) = eval(b.query(expr)).unwrap();
        assert_eq!(value, Value::List(vec![Value::Int32(1), Value::Int32(2)]));
        assert_eq!(ty, BaseType::list(BaseType::INT32));
    }

    #[test]
    fn integer_arguments_widen_to_double() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let expr = b.call(b.id("System.Sqrt"), vec![b.int(16)]);
        assert_eq!(eval(b.query(expr)).unwrap(), (Value::double(4.0), BaseType::DOUBLE));
    }

    #[test]
    fn wrong_argument_type_is_rejected() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let expr = b.call(b.id("System.Uppercase"), vec![b.boolean(true)]);
        let err = eval(b.query(expr)).unwrap_err();
        assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::IncorrectType));
    }
}
