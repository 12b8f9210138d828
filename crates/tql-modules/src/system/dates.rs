//! Date and time functions over naive (zone-less) date times.

use chrono::{Datelike, Months, NaiveDate, Utc};
use tql_compiler::{BaseType, Characteristic, ModuleBuilder, NativeFunction};
use tql_core::{NaiveDateTime, RuntimeError, TimeDelta, Value};

use super::Args;

const MILLIS_PER_SECOND: f64 = 1_000.0;
const MILLIS_PER_MINUTE: f64 = 60.0 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: f64 = 60.0 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: f64 = 24.0 * MILLIS_PER_HOUR;

/// Fractional offsets, rounded to whole milliseconds.
const FRACTIONAL: &[(&str, f64)] = &[
    ("AddDays", MILLIS_PER_DAY),
    ("AddHours", MILLIS_PER_HOUR),
    ("AddMinutes", MILLIS_PER_MINUTE),
    ("AddSeconds", MILLIS_PER_SECOND),
];

pub(super) fn register(builder: ModuleBuilder) -> ModuleBuilder {
    let builder = builder
        .enumeration(
            "Weekday",
            &["Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday"],
        )
        .native(
            NativeFunction::new("Now", vec![], BaseType::DATE_TIME, |_| Ok(Value::DateTime(Utc::now().naive_utc())))
                .with_characteristic(Characteristic::NON_DETERMINISTIC),
        )
        .function(
            "Date",
            vec![("year", BaseType::INT32), ("month", BaseType::INT32), ("day", BaseType::INT32)],
            BaseType::DATE_TIME,
            |values| {
                let args = Args::new("Date", values);
                let (year, month, day) = (args.int32(0)?, args.int32(1)?, args.int32(2)?);
                u32::try_from(month)
                    .ok()
                    .zip(u32::try_from(day).ok())
                    .and_then(|(month, day)| NaiveDate::from_ymd_opt(year, month, day))
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(Value::DateTime)
                    .ok_or_else(|| args.fail(format!("{year}-{month}-{day} is not a valid date")))
            },
        );

    let builder = [
        ("Year", year as fn(&NaiveDateTime) -> i32),
        ("Month", month),
        ("Day", day),
        ("DayOfWeek", day_of_week),
    ]
    .into_iter()
    .fold(builder, |builder, (name, part)| {
        builder.function(name, vec![("value", BaseType::DATE_TIME)], BaseType::INT32, move |values| {
            Ok(Value::Int32(part(&Args::new(name, values).date_time(0)?)))
        })
    });

    let builder = builder
        .function(
            "AddYears",
            vec![("value", BaseType::DATE_TIME), ("years", BaseType::INT32)],
            BaseType::DATE_TIME,
            |values| {
                let args = Args::new("AddYears", values);
                let months = args
                    .int32(1)?
                    .checked_mul(12)
                    .ok_or(RuntimeError::Overflow { operation: "AddYears" })?;
                add_months(&args, args.date_time(0)?, months)
            },
        )
        .function(
            "AddMonths",
            vec![("value", BaseType::DATE_TIME), ("months", BaseType::INT32)],
            BaseType::DATE_TIME,
            |values| {
                let args = Args::new("AddMonths", values);
                add_months(&args, args.date_time(0)?, args.int32(1)?)
            },
        )
        .function(
            "AddMilliseconds",
            vec![("value", BaseType::DATE_TIME), ("milliseconds", BaseType::INT64)],
            BaseType::DATE_TIME,
            |values| {
                let args = Args::new("AddMilliseconds", values);
                add_millis(&args, args.date_time(0)?, args.int64(1)?)
            },
        );

    FRACTIONAL.iter().fold(builder, |builder, &(name, scale)| {
        builder.function(
            name,
            vec![("value", BaseType::DATE_TIME), ("amount", BaseType::DOUBLE)],
            BaseType::DATE_TIME,
            move |values| {
                let args = Args::new(name, values);
                let millis = (args.double(1)? * scale).round();
                if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
                    return Err(RuntimeError::Overflow { operation: name });
                }
                add_millis(&args, args.date_time(0)?, millis as i64)
            },
        )
    })
}

fn year(value: &NaiveDateTime) -> i32 {
    value.year()
}

fn month(value: &NaiveDateTime) -> i32 {
    value.month() as i32
}

fn day(value: &NaiveDateTime) -> i32 {
    value.day() as i32
}

/// Sunday is 0, matching the `Weekday` ordinals.
fn day_of_week(value: &NaiveDateTime) -> i32 {
    value.weekday().num_days_from_sunday() as i32
}

/// Calendar month arithmetic; the day clamps to the end of shorter months.
fn add_months(args: &Args<'_>, value: NaiveDateTime, months: i32) -> Result<Value, RuntimeError> {
    let delta = Months::new(months.unsigned_abs());
    let shifted = if months >= 0 {
        value.checked_add_months(delta)
    } else {
        value.checked_sub_months(delta)
    };
    shifted
        .map(Value::DateTime)
        .ok_or_else(|| args.fail("result is outside the supported date range"))
}

fn add_millis(args: &Args<'_>, value: NaiveDateTime, millis: i64) -> Result<Value, RuntimeError> {
    TimeDelta::try_milliseconds(millis)
        .and_then(|delta| value.checked_add_signed(delta))
        .map(Value::DateTime)
        .ok_or_else(|| args.fail("result is outside the supported date range"))
}

#[cfg(test)]
mod tests {
    use super::super::testing::call;
    use super::*;

    fn at(text: &str) -> Value {
        Value::DateTime(NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").unwrap())
    }

    #[test]
    fn construct_and_inspect() {
        let date = call("Date", &[Value::Int32(2024), Value::Int32(2), Value::Int32(29)]).unwrap();
        assert_eq!(date, at("2024-02-29 00:00:00"));
        assert_eq!(call("Year", &[date.clone()]).unwrap(), Value::Int32(2024));
        assert_eq!(call("Month", &[date.clone()]).unwrap(), Value::Int32(2));
        assert_eq!(call("Day", &[date.clone()]).unwrap(), Value::Int32(29));
        // Thursday
        assert_eq!(call("DayOfWeek", &[date]).unwrap(), Value::Int32(4));
        assert!(call("Date", &[Value::Int32(2023), Value::Int32(2), Value::Int32(29)]).is_err());
        assert!(call("Date", &[Value::Int32(2023), Value::Int32(-1), Value::Int32(1)]).is_err());
    }

    #[test]
    fn calendar_arithmetic_clamps_days() {
        let leap = at("2024-02-29 12:00:00");
        assert_eq!(call("AddYears", &[leap.clone(), Value::Int32(1)]).unwrap(), at("2025-02-28 12:00:00"));
        assert_eq!(call("AddMonths", &[leap.clone(), Value::Int32(-1)]).unwrap(), at("2024-01-29 12:00:00"));
        assert_eq!(
            call("AddMonths", &[at("2024-01-31 00:00:00"), Value::Int32(1)]).unwrap(),
            at("2024-02-29 00:00:00")
        );
    }

    #[test]
    fn fractional_offsets() {
        let start = at("2024-01-01 00:00:00");
        assert_eq!(call("AddDays", &[start.clone(), Value::double(1.5)]).unwrap(), at("2024-01-02 12:00:00"));
        assert_eq!(call("AddHours", &[start.clone(), Value::double(-1.0)]).unwrap(), at("2023-12-31 23:00:00"));
        assert_eq!(call("AddMinutes", &[start.clone(), Value::double(90.0)]).unwrap(), at("2024-01-01 01:30:00"));
        assert_eq!(call("AddSeconds", &[start.clone(), Value::double(61.0)]).unwrap(), at("2024-01-01 00:01:01"));
        assert_eq!(call("AddMilliseconds", &[start.clone(), Value::Int64(2_000)]).unwrap(), at("2024-01-01 00:00:02"));
        assert!(call("AddDays", &[start, Value::double(f64::INFINITY)]).is_err());
    }

    #[test]
    fn now_is_not_constant() {
        let module = super::super::module().unwrap();
        let now = module.functions.iter().find(|f| f.name.to_string() == "Now").unwrap();
        assert_eq!(now.characteristic, Characteristic::NON_DETERMINISTIC);
        assert!(matches!(now.invoke(&[]).unwrap(), Value::DateTime(_)));
    }
}
