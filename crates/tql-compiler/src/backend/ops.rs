//! Value-level semantics of arithmetic, comparison and conversion
//! instructions. Operands have already been converted to a common type by
//! the compiler; anything else is a [`RuntimeError::TypeMismatch`].

use std::collections::BTreeSet;

use tql_core::{RuntimeError, TimeDelta, TupleValue, Value};

use crate::ir::{BinaryInstr, UnaryInstr};
use crate::types::conversion::scalar_widening;
use crate::types::{BaseType, ConversionKind, ScalarKind};

type Result<T> = std::result::Result<T, RuntimeError>;

fn overflow(operation: &'static str) -> RuntimeError {
    RuntimeError::Overflow { operation }
}

pub fn binary(op: BinaryInstr, left: Value, right: Value) -> Result<Value> {
    use Value::*;

    Ok(match op {
        BinaryInstr::Equal => Boolean(left == right),
        BinaryInstr::NotEqual => Boolean(left != right),
        BinaryInstr::Less => Boolean(left < right),
        BinaryInstr::LessOrEqual => Boolean(left <= right),
        BinaryInstr::Greater => Boolean(left > right),
        BinaryInstr::GreaterOrEqual => Boolean(left >= right),
        BinaryInstr::Xor => match (left, right) {
            (Boolean(a), Boolean(b)) => Boolean(a ^ b),
            (other, _) => return Err(RuntimeError::type_mismatch("Boolean", &other)),
        },
        BinaryInstr::In => match right {
            List(items) => Boolean(items.contains(&left)),
            Set(items) => Boolean(items.contains(&left)),
            other => return Err(RuntimeError::type_mismatch("List or Set", &other)),
        },
        BinaryInstr::Add => match (left, right) {
            (Int32(a), Int32(b)) => Int32(a.checked_add(b).ok_or_else(|| overflow("addition"))?),
            (Int64(a), Int64(b)) => Int64(a.checked_add(b).ok_or_else(|| overflow("addition"))?),
            (Double(a), Double(b)) => Value::double(a.0 + b.0),
            (String(mut a), String(b)) => {
                a.push_str(&b);
                String(a)
            }
            (DateTime(a), TimeSpan(b)) => DateTime(a.checked_add_signed(b).ok_or_else(|| overflow("addition"))?),
            (TimeSpan(a), TimeSpan(b)) => TimeSpan(a.checked_add(&b).ok_or_else(|| overflow("addition"))?),
            (List(mut a), List(b)) => {
                a.extend(b);
                List(a)
            }
            (Set(mut a), Set(b)) => {
                a.extend(b);
                Set(a)
            }
            (other, _) => return Err(RuntimeError::type_mismatch("addable operands", &other)),
        },
        BinaryInstr::Subtract => match (left, right) {
            (Int32(a), Int32(b)) => Int32(a.checked_sub(b).ok_or_else(|| overflow("subtraction"))?),
            (Int64(a), Int64(b)) => Int64(a.checked_sub(b).ok_or_else(|| overflow("subtraction"))?),
            (Double(a), Double(b)) => Value::double(a.0 - b.0),
            (DateTime(a), TimeSpan(b)) => DateTime(a.checked_sub_signed(b).ok_or_else(|| overflow("subtraction"))?),
            (DateTime(a), DateTime(b)) => TimeSpan(a.signed_duration_since(b)),
            (TimeSpan(a), TimeSpan(b)) => TimeSpan(a.checked_sub(&b).ok_or_else(|| overflow("subtraction"))?),
            (Set(a), Set(b)) => Set(a.difference(&b).cloned().collect()),
            (other, _) => return Err(RuntimeError::type_mismatch("subtractable operands", &other)),
        },
        BinaryInstr::Multiply => match (left, right) {
            (Int32(a), Int32(b)) => Int32(a.checked_mul(b).ok_or_else(|| overflow("multiplication"))?),
            (Int64(a), Int64(b)) => Int64(a.checked_mul(b).ok_or_else(|| overflow("multiplication"))?),
            (Double(a), Double(b)) => Value::double(a.0 * b.0),
            (other, _) => return Err(RuntimeError::type_mismatch("numeric operands", &other)),
        },
        BinaryInstr::Divide => match (left, right) {
            (Int32(_), Int32(0)) | (Int64(_), Int64(0)) => return Err(RuntimeError::DivisionByZero),
            (Int32(a), Int32(b)) => Int32(a.checked_div(b).ok_or_else(|| overflow("division"))?),
            (Int64(a), Int64(b)) => Int64(a.checked_div(b).ok_or_else(|| overflow("division"))?),
            (Double(a), Double(b)) => Value::double(a.0 / b.0),
            (other, _) => return Err(RuntimeError::type_mismatch("numeric operands", &other)),
        },
        BinaryInstr::Modulo => match (left, right) {
            (Int32(_), Int32(0)) | (Int64(_), Int64(0)) => return Err(RuntimeError::DivisionByZero),
            (Int32(a), Int32(b)) => Int32(a.checked_rem(b).ok_or_else(|| overflow("modulo"))?),
            (Int64(a), Int64(b)) => Int64(a.checked_rem(b).ok_or_else(|| overflow("modulo"))?),
            (Double(a), Double(b)) => Value::double(a.0 % b.0),
            (other, _) => return Err(RuntimeError::type_mismatch("numeric operands", &other)),
        },
        BinaryInstr::Power => match (left, right) {
            (Int32(a), Int32(b)) => {
                let exp = u32::try_from(b).map_err(|_| overflow("exponentiation"))?;
                Int32(a.checked_pow(exp).ok_or_else(|| overflow("exponentiation"))?)
            }
            (Int64(a), Int64(b)) => {
                let exp = u32::try_from(b).map_err(|_| overflow("exponentiation"))?;
                Int64(a.checked_pow(exp).ok_or_else(|| overflow("exponentiation"))?)
            }
            (Double(a), Double(b)) => Value::double(a.0.powf(b.0)),
            (other, _) => return Err(RuntimeError::type_mismatch("numeric operands", &other)),
        },
    })
}

pub fn unary(op: UnaryInstr, operand: Value) -> Result<Value> {
    Ok(match (op, operand) {
        (UnaryInstr::Not, Value::Boolean(b)) => Value::Boolean(!b),
        (UnaryInstr::Negate, Value::Int32(v)) => Value::Int32(v.checked_neg().ok_or_else(|| overflow("negation"))?),
        (UnaryInstr::Negate, Value::Int64(v)) => Value::Int64(v.checked_neg().ok_or_else(|| overflow("negation"))?),
        (UnaryInstr::Negate, Value::Double(v)) => Value::double(-v.0),
        (UnaryInstr::Negate, Value::TimeSpan(v)) => {
            Value::TimeSpan(TimeDelta::zero().checked_sub(&v).ok_or_else(|| overflow("negation"))?)
        }
        (UnaryInstr::Not, other) => return Err(RuntimeError::type_mismatch("Boolean", &other)),
        (UnaryInstr::Negate, other) => return Err(RuntimeError::type_mismatch("numeric operand", &other)),
    })
}

/// Apply a widening conversion. `null` passes through unchanged.
pub fn convert(kind: ConversionKind, value: Value) -> Result<Value> {
    Ok(match (kind, value) {
        (_, Value::Void) => Value::Void,
        (ConversionKind::Int32ToInt64, Value::Int32(v)) => Value::Int64(i64::from(v)),
        (ConversionKind::Int32ToDouble, Value::Int32(v)) => Value::double(f64::from(v)),
        (ConversionKind::Int64ToDouble, Value::Int64(v)) => Value::double(v as f64),
        (ConversionKind::CharToString, Value::Char(c)) => Value::String(c.to_string()),
        (ConversionKind::Int32ToInt64 | ConversionKind::Int32ToDouble, other) => {
            return Err(RuntimeError::type_mismatch("Int32", &other));
        }
        (ConversionKind::Int64ToDouble, other) => return Err(RuntimeError::type_mismatch("Int64", &other)),
        (ConversionKind::CharToString, other) => return Err(RuntimeError::type_mismatch("Char", &other)),
    })
}

/// Fit a host-supplied value to `ty`, widening scalars the way implicit
/// conversions do. `None` when the value has the wrong shape.
pub fn coerce(value: Value, ty: &BaseType) -> Option<Value> {
    match (ty, value) {
        (_, Value::Void) => Some(Value::Void),
        (BaseType::Generic(_), value) => Some(value),
        (BaseType::Optional(of), value) => coerce(value, of),
        (BaseType::Scalar(kind), value) => {
            let actual = ScalarKind::of_value(&value)?;
            if actual == *kind {
                return Some(value);
            }
            convert(scalar_widening(actual, *kind)?, value).ok()
        }
        (BaseType::List(of), Value::List(items)) => items
            .into_iter()
            .map(|item| coerce(item, of))
            .collect::<Option<Vec<_>>>()
            .map(Value::List),
        (BaseType::Set(of), Value::Set(items)) => items
            .into_iter()
            .map(|item| coerce(item, of))
            .collect::<Option<BTreeSet<_>>>()
            .map(Value::Set),
        (BaseType::Tuple(tuple), Value::Tuple(row)) if row.len() == tuple.len() => row
            .names()
            .iter()
            .zip(row.values())
            .map(|(name, item)| Some((name.clone(), coerce(item.clone(), tuple.attribute(name)?)?)))
            .collect::<Option<Vec<_>>>()
            .map(|pairs| Value::Tuple(TupleValue::from_pairs(pairs))),
        (BaseType::Function(_), value @ Value::Function(_)) => Some(value),
        _ => None,
    }
}
