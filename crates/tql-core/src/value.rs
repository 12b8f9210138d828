//! Runtime values produced by compiled scripts.
//!
//! Every value is totally ordered and hashable so that sets of any element
//! type (including tuples and nested collections) behave structurally.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDateTime, TimeDelta};
use ordered_float::OrderedFloat;

/// Reference to a callable inside one executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FunctionRef {
    /// A function compiled from a function selector.
    Script(u32),
    /// A function supplied by a bound module.
    Native(u32),
}

/// A tuple value: attribute names plus parallel values.
///
/// Attributes are kept sorted by name, so equality, ordering and hashing do
/// not depend on the order a tuple was built in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TupleValue {
    names: Arc<[String]>,
    values: Vec<Value>,
}

impl TupleValue {
    /// Build a tuple. `names` and `values` must be the same length; they
    /// are reordered by name unless `names` is already sorted.
    pub fn new(names: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        if names.is_sorted() {
            return Self { names, values };
        }
        Self::from_pairs(names.iter().cloned().zip(values))
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let mut pairs: Vec<(String, Value)> = pairs.into_iter().map(|(n, v)| (n.into(), v)).collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let (names, values): (Vec<String>, Vec<Value>) = pairs.into_iter().unzip();
        Self {
            names: names.into(),
            values,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.values[i])
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A runtime value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Value {
    /// `null`, and the result of scripts without a result expression.
    #[default]
    Void,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(OrderedFloat<f64>),
    Char(char),
    String(String),
    DateTime(NaiveDateTime),
    TimeSpan(TimeDelta),
    List(Vec<Value>),
    Set(BTreeSet<Value>),
    Tuple(TupleValue),
    Function(FunctionRef),
}

impl Value {
    pub fn double(value: f64) -> Self {
        Value::Double(OrderedFloat(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value::String(value.into())
    }

    /// Short name of the value's variant, used in runtime diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Void => "Void",
            Value::Boolean(_) => "Boolean",
            Value::Int32(_) => "Int32",
            Value::Int64(_) => "Int64",
            Value::Double(_) => "Double",
            Value::Char(_) => "Char",
            Value::String(_) => "String",
            Value::DateTime(_) => "DateTime",
            Value::TimeSpan(_) => "TimeSpan",
            Value::List(_) => "List",
            Value::Set(_) => "Set",
            Value::Tuple(_) => "Tuple",
            Value::Function(_) => "Function",
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            Value::Double(v) => Some(v.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a list or set, in iteration order.
    pub fn elements(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items.clone()),
            Value::Set(items) => Some(items.iter().cloned().collect()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

fn write_items<'a>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    close: &str,
    items: impl Iterator<Item = &'a Value>,
) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}L"),
            Value::Double(v) => write!(f, "{:?}", v.0),
            Value::Char(c) => write!(f, "'{c}'"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::TimeSpan(ts) => write!(f, "{ts}"),
            Value::List(items) => write_items(f, "[", "]", items.iter()),
            Value::Set(items) => write_items(f, "{ ", " }", items.iter()),
            Value::Tuple(tuple) => {
                f.write_str("{ ")?;
                for (i, (name, value)) in tuple.names.iter().zip(&tuple.values).enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str(" }")
            }
            Value::Function(FunctionRef::Script(id)) => write!(f, "<function #{id}>"),
            Value::Function(FunctionRef::Native(id)) => write!(f, "<native #{id}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sets_deduplicate_structurally() {
        let mut set = BTreeSet::new();
        set.insert(Value::Tuple(TupleValue::from_pairs([("a", Value::Int32(1))])));
        set.insert(Value::Tuple(TupleValue::from_pairs([("a", Value::Int32(1))])));
        set.insert(Value::Tuple(TupleValue::from_pairs([("a", Value::Int32(2))])));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn doubles_are_ordered() {
        assert!(Value::double(1.5) < Value::double(2.0));
        assert_eq!(Value::double(0.1), Value::double(0.1));
    }

    #[test]
    fn tuples_compare_by_content_not_build_order() {
        let ab = TupleValue::from_pairs([("a", Value::Int32(1)), ("b", Value::Int32(2))]);
        let ba = TupleValue::new(
            Arc::from(vec!["b".to_string(), "a".to_string()]),
            vec![Value::Int32(2), Value::Int32(1)],
        );
        assert_eq!(ab, ba);
        assert_eq!(ba.names(), &["a".to_string(), "b".to_string()]);
        assert_eq!(ba.get("b"), Some(&Value::Int32(2)));

        let set: BTreeSet<Value> = [Value::Tuple(ab), Value::Tuple(ba)].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn tuple_lookup_by_name() {
        let tuple = TupleValue::from_pairs([("id", Value::Int32(7)), ("name", Value::from("Ann"))]);
        assert_eq!(tuple.get("name"), Some(&Value::from("Ann")));
        assert_eq!(tuple.get("missing"), None);
        assert_eq!(tuple.len(), 2);
    }

    #[test]
    fn display_formats() {
        let list = Value::List(vec![Value::Int32(1), Value::Int64(2)]);
        assert_eq!(list.to_string(), "[1, 2L]");
        let tuple = Value::Tuple(TupleValue::from_pairs([("x", Value::Boolean(true))]));
        assert_eq!(tuple.to_string(), "{ x: true }");
        assert_eq!(Value::Void.to_string(), "null");
    }

    #[test]
    fn numeric_accessors() {
        assert_eq!(Value::Int32(4).as_i64(), Some(4));
        assert_eq!(Value::Int64(4).as_f64(), Some(4.0));
        assert_eq!(Value::from("x").as_i64(), None);
    }
}
