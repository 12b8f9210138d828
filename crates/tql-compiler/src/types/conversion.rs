//! Implicit conversions.
//!
//! Allowed conversions, in the order they are tried:
//!
//! - identity (structurally equal types)
//! - `Void` to anything (`null`)
//! - scalar widening: Int32 to Int64, Int32 to Double, Int64 to Double,
//!   Char to String
//! - `T` to `Optional(U)` when `T` converts to `U`
//! - `Optional(T)` to `Optional(U)` when `T` converts to `U`
//! - function to function when parameter types and return type match
//!   exactly (names may differ)
//! - tuple to tuple with the same attributes; keys and references are
//!   metadata and may differ
//! - list to list, set to set, when the element conversion is a retype

use super::{BaseType, ScalarKind};

/// Runtime work required by a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    Int32ToInt64,
    Int32ToDouble,
    Int64ToDouble,
    CharToString,
}

/// A successful conversion; `kind` is `None` when only the logical type
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub kind: Option<ConversionKind>,
}

impl Conversion {
    const RETYPE: Conversion = Conversion { kind: None };

    fn widen(kind: ConversionKind) -> Self {
        Conversion { kind: Some(kind) }
    }

    pub fn is_retype(&self) -> bool {
        self.kind.is_none()
    }
}

pub(crate) fn scalar_widening(from: ScalarKind, to: ScalarKind) -> Option<ConversionKind> {
    match (from, to) {
        (ScalarKind::Int32, ScalarKind::Int64) => Some(ConversionKind::Int32ToInt64),
        (ScalarKind::Int32, ScalarKind::Double) => Some(ConversionKind::Int32ToDouble),
        (ScalarKind::Int64, ScalarKind::Double) => Some(ConversionKind::Int64ToDouble),
        (ScalarKind::Char, ScalarKind::String) => Some(ConversionKind::CharToString),
        _ => None,
    }
}

/// Find an implicit conversion from `from` to `to`.
pub fn find_conversion(from: &BaseType, to: &BaseType) -> Option<Conversion> {
    if from == to {
        return Some(Conversion::RETYPE);
    }
    match (from, to) {
        (BaseType::Void, _) => Some(Conversion::RETYPE),
        (BaseType::Scalar(f), BaseType::Scalar(t)) => scalar_widening(*f, *t).map(Conversion::widen),
        (BaseType::Optional(f), BaseType::Optional(t)) => find_conversion(f, t),
        (_, BaseType::Optional(t)) => find_conversion(from, t),
        (BaseType::Function(f), BaseType::Function(t)) if f.same_shape(t) => Some(Conversion::RETYPE),
        (BaseType::Tuple(f), BaseType::Tuple(t)) if f.same_attributes(t) => Some(Conversion::RETYPE),
        (BaseType::List(f), BaseType::List(t)) | (BaseType::Set(f), BaseType::Set(t)) => {
            find_conversion(f, t).filter(Conversion::is_retype)
        }
        _ => None,
    }
}

/// Whether `from` converts to `to`.
pub fn can_convert(from: &BaseType, to: &BaseType) -> bool {
    find_conversion(from, to).is_some()
}

/// The wider of two numeric scalars, for arithmetic promotion.
pub fn promote_numeric(left: ScalarKind, right: ScalarKind) -> Option<ScalarKind> {
    let (l, r) = (left.numeric_rank()?, right.numeric_rank()?);
    Some(if l >= r { left } else { right })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FunctionParameter, TupleKey, TupleType};

    #[test]
    fn identity() {
        let t = BaseType::set(BaseType::INT32);
        assert_eq!(find_conversion(&t, &t), Some(Conversion { kind: None }));
    }

    #[test]
    fn scalar_widening_rules() {
        assert_eq!(
            find_conversion(&BaseType::INT32, &BaseType::INT64).and_then(|c| c.kind),
            Some(ConversionKind::Int32ToInt64)
        );
        assert_eq!(
            find_conversion(&BaseType::INT64, &BaseType::DOUBLE).and_then(|c| c.kind),
            Some(ConversionKind::Int64ToDouble)
        );
        assert_eq!(
            find_conversion(&BaseType::CHAR, &BaseType::STRING).and_then(|c| c.kind),
            Some(ConversionKind::CharToString)
        );
        assert!(!can_convert(&BaseType::INT64, &BaseType::INT32));
        assert!(!can_convert(&BaseType::STRING, &BaseType::INT32));
    }

    #[test]
    fn null_converts_to_anything() {
        assert!(can_convert(&BaseType::Void, &BaseType::STRING));
        assert!(can_convert(&BaseType::Void, &BaseType::Tuple(TupleType::new())));
    }

    #[test]
    fn optional_wrapping() {
        let opt = BaseType::optional(BaseType::INT64);
        assert_eq!(
            find_conversion(&BaseType::INT32, &opt).and_then(|c| c.kind),
            Some(ConversionKind::Int32ToInt64)
        );
        assert!(can_convert(&BaseType::optional(BaseType::INT32), &opt));
        assert!(!can_convert(&opt, &BaseType::INT64));
    }

    #[test]
    fn functions_need_exact_shape() {
        let a = BaseType::function(vec![FunctionParameter::new("x", BaseType::INT32)], BaseType::INT32);
        let b = BaseType::function(vec![FunctionParameter::new("y", BaseType::INT32)], BaseType::INT32);
        let c = BaseType::function(vec![FunctionParameter::new("x", BaseType::INT64)], BaseType::INT32);
        let d = BaseType::function(vec![], BaseType::INT32);
        assert!(can_convert(&a, &b));
        assert!(!can_convert(&a, &c));
        assert!(!can_convert(&a, &d));
    }

    #[test]
    fn tuple_constraints_do_not_block_conversion() {
        let plain = TupleType::from_attributes([("id", BaseType::INT32), ("name", BaseType::STRING)]);
        let mut keyed = TupleType::from_attributes([("name", BaseType::STRING), ("id", BaseType::INT32)]);
        keyed.keys.insert(TupleKey::new(["id".to_string()]));
        let (plain, keyed) = (BaseType::Tuple(plain), BaseType::Tuple(keyed));
        assert_ne!(plain, keyed);
        assert_eq!(find_conversion(&plain, &keyed), Some(Conversion { kind: None }));
        assert!(can_convert(&keyed, &plain));
        assert!(can_convert(&BaseType::set(plain.clone()), &BaseType::set(keyed.clone())));

        let wider = BaseType::Tuple(TupleType::from_attributes([("id", BaseType::INT64), ("name", BaseType::STRING)]));
        assert!(!can_convert(&plain, &wider));
    }

    #[test]
    fn collections_only_retype_elements() {
        assert!(!can_convert(&BaseType::list(BaseType::INT32), &BaseType::list(BaseType::INT64)));
        assert!(!can_convert(&BaseType::list(BaseType::INT32), &BaseType::set(BaseType::INT32)));
        assert!(can_convert(&BaseType::set(BaseType::Void), &BaseType::set(BaseType::STRING)));
    }

    #[test]
    fn numeric_promotion() {
        assert_eq!(promote_numeric(ScalarKind::Int32, ScalarKind::Double), Some(ScalarKind::Double));
        assert_eq!(promote_numeric(ScalarKind::Int64, ScalarKind::Int32), Some(ScalarKind::Int64));
        assert_eq!(promote_numeric(ScalarKind::String, ScalarKind::Int32), None);
    }
}
