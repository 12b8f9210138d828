//! Math constants and functions.
//!
//! Floating point functions take and return `Double`; integer arguments
//! widen at the call site.

use std::f64::consts;

use tql_compiler::{BaseType, ModuleBuilder};
use tql_core::{RuntimeError, Value};

use super::Args;

/// Largest `decimals` accepted by `Round`.
const MAX_ROUND_DECIMALS: i32 = 15;

type Unary = fn(f64) -> f64;
type Binary = fn(f64, f64) -> f64;

const UNARY: &[(&str, Unary)] = &[
    // Sign and rounding
    ("Abs", f64::abs),
    ("Ceiling", f64::ceil),
    ("Floor", f64::floor),
    ("Truncate", f64::trunc),
    ("Frac", f64::fract),
    // Trigonometric
    ("Sin", f64::sin),
    ("Cos", f64::cos),
    ("Tan", f64::tan),
    ("Asin", f64::asin),
    ("Acos", f64::acos),
    ("Atan", f64::atan),
    // Hyperbolic
    ("Sinh", f64::sinh),
    ("Cosh", f64::cosh),
    ("Tanh", f64::tanh),
    // Exponential and logarithmic
    ("Exp", f64::exp),
    ("Ln", f64::ln),
    ("Log10", f64::log10),
    ("Sqrt", f64::sqrt),
];

const BINARY: &[(&str, &str, &str, Binary)] = &[
    ("Atan2", "y", "x", f64::atan2),
    ("Pow", "value", "power", f64::powf),
    ("Log", "value", "base", f64::log),
    ("Max", "left", "right", f64::max),
    ("Min", "left", "right", f64::min),
    ("IEEERemainder", "dividend", "divisor", ieee_remainder),
];

pub(super) fn register(builder: ModuleBuilder) -> ModuleBuilder {
    let builder = builder
        .constant("Pi", BaseType::DOUBLE, Value::double(consts::PI))
        .constant("E", BaseType::DOUBLE, Value::double(consts::E));

    let builder = UNARY.iter().fold(builder, |builder, &(name, op)| {
        builder.function(name, vec![("value", BaseType::DOUBLE)], BaseType::DOUBLE, move |values| {
            Ok(Value::double(op(Args::new(name, values).double(0)?)))
        })
    });

    let builder = BINARY.iter().fold(builder, |builder, &(name, left, right, op)| {
        builder.function(
            name,
            vec![(left, BaseType::DOUBLE), (right, BaseType::DOUBLE)],
            BaseType::DOUBLE,
            move |values| {
                let args = Args::new(name, values);
                Ok(Value::double(op(args.double(0)?, args.double(1)?)))
            },
        )
    });

    builder
        .function(
            "Round",
            vec![("value", BaseType::DOUBLE), ("decimals", BaseType::INT32)],
            BaseType::DOUBLE,
            |values| {
                let args = Args::new("Round", values);
                let (value, decimals) = (args.double(0)?, args.int32(1)?);
                if !(0..=MAX_ROUND_DECIMALS).contains(&decimals) {
                    return Err(args.fail(format!("decimals must be between 0 and {MAX_ROUND_DECIMALS}")));
                }
                Ok(Value::double(round_half_even(value, decimals)))
            },
        )
        .function("Sign", vec![("value", BaseType::DOUBLE)], BaseType::INT32, |values| {
            let args = Args::new("Sign", values);
            let value = args.double(0)?;
            if value.is_nan() {
                return Err(args.fail("the sign of NaN is undefined"));
            }
            Ok(Value::Int32(if value > 0.0 {
                1
            } else if value < 0.0 {
                -1
            } else {
                0
            }))
        })
        .function(
            "BigMul",
            vec![("left", BaseType::INT32), ("right", BaseType::INT32)],
            BaseType::INT64,
            |values| {
                let args = Args::new("BigMul", values);
                Ok(Value::Int64(i64::from(args.int32(0)?) * i64::from(args.int32(1)?)))
            },
        )
        .function("Factorial", vec![("value", BaseType::INT32)], BaseType::INT64, |values| {
            let args = Args::new("Factorial", values);
            let n = args.int32(0)?;
            if n < 0 {
                return Err(args.fail("factorial of a negative number"));
            }
            (1..=i64::from(n))
                .try_fold(1i64, |acc, k| acc.checked_mul(k))
                .map(Value::Int64)
                .ok_or(RuntimeError::Overflow { operation: "Factorial" })
        })
}

/// `x - y * round_half_even(x / y)`.
fn ieee_remainder(x: f64, y: f64) -> f64 {
    x - y * (x / y).round_ties_even()
}

fn round_half_even(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

#[cfg(test)]
mod tests {
    use super::super::testing::call;
    use super::*;

    fn double(name: &str, args: &[f64]) -> f64 {
        let args: Vec<Value> = args.iter().copied().map(Value::double).collect();
        call(name, &args).unwrap().as_f64().unwrap()
    }

    #[test]
    fn unary_functions() {
        assert!((double("Sin", &[0.0])).abs() < f64::EPSILON);
        assert!((double("Cos", &[0.0]) - 1.0).abs() < f64::EPSILON);
        assert!((double("Sqrt", &[9.0]) - 3.0).abs() < f64::EPSILON);
        assert!((double("Ln", &[consts::E]) - 1.0).abs() < f64::EPSILON);
        assert_eq!(double("Ceiling", &[1.2]), 2.0);
        assert_eq!(double("Floor", &[-1.2]), -2.0);
        assert_eq!(double("Truncate", &[-1.7]), -1.0);
        assert!((double("Frac", &[2.75]) - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn binary_functions() {
        assert_eq!(double("Pow", &[2.0, 10.0]), 1024.0);
        assert_eq!(double("Max", &[1.0, 2.0]), 2.0);
        assert!((double("Log", &[8.0, 2.0]) - 3.0).abs() < 1e-12);
        assert_eq!(double("IEEERemainder", &[10.0, 3.0]), 1.0);
        assert_eq!(double("IEEERemainder", &[11.0, 3.0]), -1.0);
    }

    #[test]
    fn round_is_half_even() {
        let round = |v: f64, d: i32| call("Round", &[Value::double(v), Value::Int32(d)]).unwrap();
        assert_eq!(round(2.5, 0), Value::double(2.0));
        assert_eq!(round(3.5, 0), Value::double(4.0));
        assert_eq!(round(1.25, 1), Value::double(1.2));
        assert!(call("Round", &[Value::double(1.0), Value::Int32(16)]).is_err());
    }

    #[test]
    fn sign() {
        assert_eq!(call("Sign", &[Value::double(-3.0)]).unwrap(), Value::Int32(-1));
        assert_eq!(call("Sign", &[Value::double(0.0)]).unwrap(), Value::Int32(0));
        assert!(call("Sign", &[Value::double(f64::NAN)]).is_err());
    }

    #[test]
    fn integer_functions() {
        assert_eq!(
            call("BigMul", &[Value::Int32(i32::MAX), Value::Int32(2)]).unwrap(),
            Value::Int64(i64::from(i32::MAX) * 2)
        );
        assert_eq!(call("Factorial", &[Value::Int32(0)]).unwrap(), Value::Int64(1));
        assert_eq!(call("Factorial", &[Value::Int32(20)]).unwrap(), Value::Int64(2_432_902_008_176_640_000));
        assert_eq!(
            call("Factorial", &[Value::Int32(21)]).unwrap_err(),
            RuntimeError::Overflow { operation: "Factorial" }
        );
        assert!(call("Factorial", &[Value::Int32(-1)]).is_err());
    }
}
