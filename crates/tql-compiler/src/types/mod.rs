//! The TQL type system.
//!
//! [`BaseType`] is a closed enum compared structurally: two tuple types with
//! the same attributes in a different order, the same keys and the same
//! references are equal and hash alike.
//!
//! ## Submodules
//!
//! - [`conversion`]: implicit conversions between types
//! - [`operators`]: operator typing (dispatch on the left operand's type)
//! - [`defaults`]: default-value and declaration reconstruction

pub mod conversion;
pub mod defaults;
pub mod operators;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use tql_core::{Name, NaiveDateTime, TimeDelta, Value};

pub use conversion::{Conversion, ConversionKind};

// ============================================================================
// Scalars
// ============================================================================

/// Built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScalarKind {
    Boolean,
    Int32,
    Int64,
    Double,
    Char,
    String,
    DateTime,
    TimeSpan,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 8] = [
        ScalarKind::Boolean,
        ScalarKind::Int32,
        ScalarKind::Int64,
        ScalarKind::Double,
        ScalarKind::Char,
        ScalarKind::String,
        ScalarKind::DateTime,
        ScalarKind::TimeSpan,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Boolean => "Boolean",
            ScalarKind::Int32 => "Int32",
            ScalarKind::Int64 => "Int64",
            ScalarKind::Double => "Double",
            ScalarKind::Char => "Char",
            ScalarKind::String => "String",
            ScalarKind::DateTime => "DateTime",
            ScalarKind::TimeSpan => "TimeSpan",
        }
    }

    /// Position in the numeric promotion order `Int32 < Int64 < Double`.
    pub fn numeric_rank(self) -> Option<u8> {
        match self {
            ScalarKind::Int32 => Some(0),
            ScalarKind::Int64 => Some(1),
            ScalarKind::Double => Some(2),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.numeric_rank().is_some()
    }

    /// Whether `< <= > >=` apply.
    pub fn is_ordered(self) -> bool {
        !matches!(self, ScalarKind::Boolean)
    }

    /// The value a variable of this type holds before assignment.
    pub fn default_value(self) -> Value {
        match self {
            ScalarKind::Boolean => Value::Boolean(false),
            ScalarKind::Int32 => Value::Int32(0),
            ScalarKind::Int64 => Value::Int64(0),
            ScalarKind::Double => Value::double(0.0),
            ScalarKind::Char => Value::Char('\0'),
            ScalarKind::String => Value::String(String::new()),
            ScalarKind::DateTime => Value::DateTime(NaiveDateTime::default()),
            ScalarKind::TimeSpan => Value::TimeSpan(TimeDelta::zero()),
        }
    }

    /// The scalar kind of a non-collection value.
    pub fn of_value(value: &Value) -> Option<ScalarKind> {
        Some(match value {
            Value::Boolean(_) => ScalarKind::Boolean,
            Value::Int32(_) => ScalarKind::Int32,
            Value::Int64(_) => ScalarKind::Int64,
            Value::Double(_) => ScalarKind::Double,
            Value::Char(_) => ScalarKind::Char,
            Value::String(_) => ScalarKind::String,
            Value::DateTime(_) => ScalarKind::DateTime,
            Value::TimeSpan(_) => ScalarKind::TimeSpan,
            _ => return None,
        })
    }
}

// ============================================================================
// BaseType
// ============================================================================

/// A logical type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum BaseType {
    /// The type of `null` and of statements.
    #[default]
    Void,
    Scalar(ScalarKind),
    List(Box<BaseType>),
    Set(Box<BaseType>),
    Optional(Box<BaseType>),
    Tuple(TupleType),
    Function(FunctionType),
    /// A type parameter of a native generic function. Never produced for
    /// script values; substituted at each call site.
    Generic(String),
}

impl BaseType {
    pub const BOOLEAN: BaseType = BaseType::Scalar(ScalarKind::Boolean);
    pub const INT32: BaseType = BaseType::Scalar(ScalarKind::Int32);
    pub const INT64: BaseType = BaseType::Scalar(ScalarKind::Int64);
    pub const DOUBLE: BaseType = BaseType::Scalar(ScalarKind::Double);
    pub const CHAR: BaseType = BaseType::Scalar(ScalarKind::Char);
    pub const STRING: BaseType = BaseType::Scalar(ScalarKind::String);
    pub const DATE_TIME: BaseType = BaseType::Scalar(ScalarKind::DateTime);
    pub const TIME_SPAN: BaseType = BaseType::Scalar(ScalarKind::TimeSpan);

    pub fn list(of: BaseType) -> Self {
        BaseType::List(Box::new(of))
    }

    pub fn set(of: BaseType) -> Self {
        BaseType::Set(Box::new(of))
    }

    pub fn optional(of: BaseType) -> Self {
        BaseType::Optional(Box::new(of))
    }

    pub fn function(parameters: Vec<FunctionParameter>, return_type: BaseType) -> Self {
        BaseType::Function(FunctionType::new(parameters, return_type))
    }

    pub fn generic(name: impl Into<String>) -> Self {
        BaseType::Generic(name.into())
    }

    pub fn is_void(&self) -> bool {
        matches!(self, BaseType::Void)
    }

    pub fn scalar(&self) -> Option<ScalarKind> {
        match self {
            BaseType::Scalar(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Element type of a list or set.
    pub fn element(&self) -> Option<&BaseType> {
        match self {
            BaseType::List(of) | BaseType::Set(of) => Some(of),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&TupleType> {
        match self {
            BaseType::Tuple(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match self {
            BaseType::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Whether a [`BaseType::Generic`] occurs anywhere inside.
    pub fn is_generic(&self) -> bool {
        match self {
            BaseType::Generic(_) => true,
            BaseType::List(of) | BaseType::Set(of) | BaseType::Optional(of) => of.is_generic(),
            BaseType::Tuple(t) => t.attributes().any(|(_, ty)| ty.is_generic()),
            BaseType::Function(f) => {
                f.return_type.is_generic() || f.parameters.iter().any(|p| p.ty.is_generic())
            }
            BaseType::Void | BaseType::Scalar(_) => false,
        }
    }

    /// Replace type parameters using `bindings`. Unbound parameters stay.
    pub fn substitute(&self, bindings: &rustc_hash::FxHashMap<String, BaseType>) -> BaseType {
        match self {
            BaseType::Generic(name) => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            BaseType::List(of) => BaseType::list(of.substitute(bindings)),
            BaseType::Set(of) => BaseType::set(of.substitute(bindings)),
            BaseType::Optional(of) => BaseType::optional(of.substitute(bindings)),
            BaseType::Tuple(t) => {
                let mut out = t.clone();
                for (_, ty) in out.attributes.iter_mut() {
                    *ty = ty.substitute(bindings);
                }
                BaseType::Tuple(out)
            }
            BaseType::Function(f) => BaseType::Function(FunctionType {
                parameters: f
                    .parameters
                    .iter()
                    .map(|p| FunctionParameter::new(p.name.clone(), p.ty.substitute(bindings)))
                    .collect(),
                return_type: Box::new(f.return_type.substitute(bindings)),
            }),
            BaseType::Void | BaseType::Scalar(_) => self.clone(),
        }
    }
}

impl From<ScalarKind> for BaseType {
    fn from(kind: ScalarKind) -> Self {
        BaseType::Scalar(kind)
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseType::Void => f.write_str("Void"),
            BaseType::Scalar(kind) => f.write_str(kind.name()),
            BaseType::List(of) => write!(f, "[{of}]"),
            BaseType::Set(of) => write!(f, "{{{of}}}"),
            BaseType::Optional(of) => write!(f, "{of}?"),
            BaseType::Tuple(t) => write!(f, "{t}"),
            BaseType::Function(func) => write!(f, "{func}"),
            BaseType::Generic(name) => f.write_str(name),
        }
    }
}

// ============================================================================
// Tuples
// ============================================================================

/// A candidate key: the set of attribute names that identify a tuple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TupleKey {
    pub attribute_names: BTreeSet<String>,
}

impl TupleKey {
    pub fn new<I: IntoIterator<Item = String>>(names: I) -> Self {
        Self {
            attribute_names: names.into_iter().collect(),
        }
    }
}

/// A reference from some attributes of this tuple to attributes of the
/// tuples held by `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleReference {
    pub source_attribute_names: Vec<String>,
    pub target: Name,
    pub target_attribute_names: Vec<String>,
}

/// A tuple type.
///
/// Attributes keep declaration order for display; tuple values are laid out
/// by attribute name. Equality and hashing ignore attribute order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TupleType {
    attributes: IndexMap<String, BaseType>,
    pub keys: BTreeSet<TupleKey>,
    pub references: BTreeMap<String, TupleReference>,
}

impl TupleType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_attributes<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (S, BaseType)>,
        S: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(|(n, t)| (n.into(), t)).collect(),
            ..Self::default()
        }
    }

    /// Add an attribute. Returns `false` if the name is already taken.
    pub fn add_attribute(&mut self, name: impl Into<String>, ty: BaseType) -> bool {
        match self.attributes.entry(name.into()) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(ty);
                true
            }
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&BaseType> {
        self.attributes.get(name)
    }

    /// Attributes in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &BaseType)> {
        self.attributes.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// Same attribute names and types, ignoring order, keys and references.
    pub fn same_attributes(&self, other: &TupleType) -> bool {
        self.attributes == other.attributes
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl Hash for TupleType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut sorted: Vec<_> = self.attributes.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        sorted.hash(state);
        self.keys.hash(state);
        self.references.hash(state);
    }
}

impl fmt::Display for TupleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, ty)) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, " {name}: {ty}")?;
        }
        for key in &self.keys {
            let names: Vec<_> = key.attribute_names.iter().map(String::as_str).collect();
            write!(f, " key {{ {} }}", names.join(", "))?;
        }
        for (name, reference) in &self.references {
            write!(
                f,
                " ref {name} {{ {} }} {} {{ {} }}",
                reference.source_attribute_names.join(", "),
                reference.target,
                reference.target_attribute_names.join(", ")
            )?;
        }
        f.write_str(" }")
    }
}

// ============================================================================
// Functions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionParameter {
    pub name: String,
    pub ty: BaseType,
}

impl FunctionParameter {
    pub fn new(name: impl Into<String>, ty: BaseType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A function signature. Parameter names take part in equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub parameters: Vec<FunctionParameter>,
    pub return_type: Box<BaseType>,
}

impl FunctionType {
    pub fn new(parameters: Vec<FunctionParameter>, return_type: BaseType) -> Self {
        Self {
            parameters,
            return_type: Box::new(return_type),
        }
    }

    /// Same parameter types and return type, ignoring parameter names.
    pub fn same_shape(&self, other: &FunctionType) -> bool {
        self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(&other.parameters)
                .all(|(a, b)| a.ty == b.ty)
            && self.return_type == other.return_type
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, p) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", p.name, p.ty)?;
        }
        write!(f, ") => {}", self.return_type)
    }
}
