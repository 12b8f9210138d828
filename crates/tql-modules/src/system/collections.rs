//! List and set functions. All are generic over the element type `T`.

use std::collections::BTreeSet;

use tql_compiler::{BaseType, ModuleBuilder};
use tql_core::Value;

use super::{Args, to_int32};

fn t() -> BaseType {
    BaseType::generic("T")
}

pub(super) fn register(builder: ModuleBuilder) -> ModuleBuilder {
    let builder = builder
        // Conversion
        .generic_function("ToList", &["T"], vec![("items", BaseType::set(t()))], BaseType::list(t()), |values| {
            let items = Args::new("ToList", values).set(0)?;
            Ok(Value::List(items.iter().cloned().collect()))
        })
        .generic_function("ToSet", &["T"], vec![("items", BaseType::list(t()))], BaseType::set(t()), |values| {
            let items = Args::new("ToSet", values).list(0)?;
            Ok(Value::Set(items.iter().cloned().collect()))
        })
        // Lists
        .generic_function(
            "Append",
            &["T"],
            vec![("items", BaseType::list(t())), ("item", t())],
            BaseType::list(t()),
            |values| {
                let args = Args::new("Append", values);
                let mut items = args.list(0)?.to_vec();
                items.push(args.get(1)?.clone());
                Ok(Value::List(items))
            },
        )
        .generic_function(
            "Remove",
            &["T"],
            vec![("items", BaseType::list(t())), ("item", t())],
            BaseType::list(t()),
            |values| {
                // Removes the first occurrence only.
                let args = Args::new("Remove", values);
                let mut items = args.list(0)?.to_vec();
                let item = args.get(1)?;
                if let Some(position) = items.iter().position(|v| v == item) {
                    items.remove(position);
                }
                Ok(Value::List(items))
            },
        )
        .generic_function("Reverse", &["T"], vec![("items", BaseType::list(t()))], BaseType::list(t()), |values| {
            let mut items = Args::new("Reverse", values).list(0)?.to_vec();
            items.reverse();
            Ok(Value::List(items))
        })
        .generic_function("Count", &["T"], vec![("items", BaseType::list(t()))], BaseType::INT32, |values| {
            to_int32(Args::new("Count", values).list(0)?.len(), "Count")
        });

    // Sets
    [
        ("Union", set_union as fn(&BTreeSet<Value>, &BTreeSet<Value>) -> BTreeSet<Value>),
        ("Intersection", set_intersection),
        ("Difference", set_difference),
    ]
    .into_iter()
    .fold(builder, |builder, (name, op)| {
        builder.generic_function(
            name,
            &["T"],
            vec![("left", BaseType::set(t())), ("right", BaseType::set(t()))],
            BaseType::set(t()),
            move |values| {
                let args = Args::new(name, values);
                Ok(Value::Set(op(args.set(0)?, args.set(1)?)))
            },
        )
    })
}

fn set_union(left: &BTreeSet<Value>, right: &BTreeSet<Value>) -> BTreeSet<Value> {
    left.union(right).cloned().collect()
}

fn set_intersection(left: &BTreeSet<Value>, right: &BTreeSet<Value>) -> BTreeSet<Value> {
    left.intersection(right).cloned().collect()
}

fn set_difference(left: &BTreeSet<Value>, right: &BTreeSet<Value>) -> BTreeSet<Value> {
    left.difference(right).cloned().collect()
}
