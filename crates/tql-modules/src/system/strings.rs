//! String functions. Positions and lengths count characters, not bytes.

use tql_compiler::{BaseType, ModuleBuilder};
use tql_core::{RuntimeError, Value};

use super::{Args, to_int32};

pub(super) fn register(builder: ModuleBuilder) -> ModuleBuilder {
    let string = || vec![("value", BaseType::STRING)];
    builder
        .function("Uppercase", string(), BaseType::STRING, |values| {
            Ok(Value::string(Args::new("Uppercase", values).string(0)?.to_uppercase()))
        })
        .function("Lowercase", string(), BaseType::STRING, |values| {
            Ok(Value::string(Args::new("Lowercase", values).string(0)?.to_lowercase()))
        })
        .function("Trim", string(), BaseType::STRING, |values| {
            Ok(Value::string(Args::new("Trim", values).string(0)?.trim()))
        })
        .function("Length", string(), BaseType::INT32, |values| {
            to_int32(Args::new("Length", values).string(0)?.chars().count(), "Length")
        })
        .function(
            "Concat",
            vec![("values", BaseType::list(BaseType::STRING)), ("separator", BaseType::STRING)],
            BaseType::STRING,
            |values| {
                let args = Args::new("Concat", values);
                let parts = args
                    .list(0)?
                    .iter()
                    .map(|v| v.as_str().ok_or_else(|| RuntimeError::type_mismatch("String", v)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::string(parts.join(args.string(1)?)))
            },
        )
        .function(
            "Split",
            vec![("value", BaseType::STRING), ("delimiters", BaseType::set(BaseType::CHAR))],
            BaseType::list(BaseType::STRING),
            |values| {
                let args = Args::new("Split", values);
                let value = args.string(0)?;
                let delimiters = args
                    .set(1)?
                    .iter()
                    .map(|v| match v {
                        Value::Char(c) => Ok(*c),
                        other => Err(RuntimeError::type_mismatch("Char", other)),
                    })
                    .collect::<Result<Vec<char>, _>>()?;
                Ok(Value::List(
                    value.split(|c| delimiters.contains(&c)).map(Value::string).collect(),
                ))
            },
        )
        .function(
            "Slice",
            vec![("value", BaseType::STRING), ("start", BaseType::INT32), ("length", BaseType::INT32)],
            BaseType::STRING,
            |values| {
                let args = Args::new("Slice", values);
                let value = args.string(0)?;
                let (start, length) = (args.int32(1)?, args.int32(2)?);
                let available = value.chars().count();
                let range = usize::try_from(start)
                    .ok()
                    .zip(usize::try_from(length).ok())
                    .filter(|(start, length)| start + length <= available)
                    .ok_or_else(|| {
                        args.fail(format!("range {start}+{length} is outside a string of length {available}"))
                    })?;
                Ok(Value::string(value.chars().skip(range.0).take(range.1).collect::<String>()))
            },
        )
        .function(
            "IndexOf",
            vec![("value", BaseType::STRING), ("search", BaseType::STRING)],
            BaseType::INT32,
            |values| {
                let args = Args::new("IndexOf", values);
                let value = args.string(0)?;
                char_position(value, value.find(args.string(1)?), "IndexOf")
            },
        )
        .function(
            "LastIndexOf",
            vec![("value", BaseType::STRING), ("search", BaseType::STRING)],
            BaseType::INT32,
            |values| {
                let args = Args::new("LastIndexOf", values);
                let value = args.string(0)?;
                char_position(value, value.rfind(args.string(1)?), "LastIndexOf")
            },
        )
        .function("Explode", string(), BaseType::list(BaseType::CHAR), |values| {
            let value = Args::new("Explode", values).string(0)?;
            Ok(Value::List(value.chars().map(Value::Char).collect()))
        })
        .function("Implode", vec![("chars", BaseType::list(BaseType::CHAR))], BaseType::STRING, |values| {
            let chars = Args::new("Implode", values).list(0)?;
            chars
                .iter()
                .map(|v| match v {
                    Value::Char(c) => Ok(*c),
                    other => Err(RuntimeError::type_mismatch("Char", other)),
                })
                .collect::<Result<String, _>>()
                .map(Value::String)
        })
        .generic_function("ToString", &["T"], vec![("value", BaseType::generic("T"))], BaseType::STRING, |values| {
            Ok(Value::string(render(Args::new("ToString", values).get(0)?)))
        })
}

/// Byte offset to character index; absent is -1.
fn char_position(value: &str, byte_offset: Option<usize>, operation: &'static str) -> Result<Value, RuntimeError> {
    match byte_offset {
        Some(offset) => to_int32(value[..offset].chars().count(), operation),
        None => Ok(Value::Int32(-1)),
    }
}

/// Text of a value as a script would want it shown: strings and chars
/// unquoted, integers without a width suffix.
pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Char(c) => c.to_string(),
        Value::Int64(v) => v.to_string(),
        Value::Double(v) => v.0.to_string(),
        Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use tql_core::NaiveDateTime;

    use super::super::testing::call;
    use super::*;

    fn s(value: &str) -> Value {
        Value::from(value)
    }

    #[test]
    fn case_and_length() {
        assert_eq!(call("Uppercase", &[s("abc")]).unwrap(), s("ABC"));
        assert_eq!(call("Lowercase", &[s("ÄB")]).unwrap(), s("äb"));
        assert_eq!(call("Length", &[s("héllo")]).unwrap(), Value::Int32(5));
        assert_eq!(call("Trim", &[s("  x ")]).unwrap(), s("x"));
    }

    #[test]
    fn concat_and_split() {
        let parts = Value::List(vec![s("a"), s("b"), s("c")]);
        assert_eq!(call("Concat", &[parts, s(", ")]).unwrap(), s("a, b, c"));

        let delimiters = Value::Set([Value::Char(','), Value::Char(';')].into_iter().collect());
        assert_eq!(
            call("Split", &[s("a,b;;c"), delimiters]).unwrap(),
            Value::List(vec![s("a"), s("b"), s(""), s("c")])
        );
    }

    #[test]
    fn slice_counts_characters() {
        assert_eq!(call("Slice", &[s("héllo"), Value::Int32(1), Value::Int32(3)]).unwrap(), s("éll"));
        assert_eq!(call("Slice", &[s("abc"), Value::Int32(3), Value::Int32(0)]).unwrap(), s(""));
        assert!(call("Slice", &[s("abc"), Value::Int32(2), Value::Int32(2)]).is_err());
        assert!(call("Slice", &[s("abc"), Value::Int32(-1), Value::Int32(1)]).is_err());
    }

    #[test]
    fn index_of() {
        assert_eq!(call("IndexOf", &[s("é-a-a"), s("a")]).unwrap(), Value::Int32(2));
        assert_eq!(call("LastIndexOf", &[s("é-a-a"), s("a")]).unwrap(), Value::Int32(4));
        assert_eq!(call("IndexOf", &[s("abc"), s("z")]).unwrap(), Value::Int32(-1));
    }

    #[test]
    fn explode_and_implode() {
        let chars = call("Explode", &[s("ab")]).unwrap();
        assert_eq!(chars, Value::List(vec![Value::Char('a'), Value::Char('b')]));
        assert_eq!(call("Implode", &[chars]).unwrap(), s("ab"));
    }

    #[test]
    fn to_string_renders_plain_text() {
        assert_eq!(call("ToString", &[Value::Int64(5)]).unwrap(), s("5"));
        assert_eq!(call("ToString", &[s("x")]).unwrap(), s("x"));
        assert_eq!(call("ToString", &[Value::double(1.5)]).unwrap(), s("1.5"));
        let dt = NaiveDateTime::parse_from_str("2024-02-29 08:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(call("ToString", &[Value::DateTime(dt)]).unwrap(), s("2024-02-29 08:30:00"));
        assert_eq!(call("ToString", &[Value::List(vec![Value::Int32(1)])]).unwrap(), s("[1]"));
    }
}
