//! End-to-end tests: scripts built with `AstBuilder`, compiled and run
//! through `Processor` against the standard modules and in-memory storage.

use std::collections::BTreeSet;
use std::sync::Arc;

use bumpalo::Bump;
use tql::{Arguments, AstBuilder, BaseType, Processor, ProcessorOptions, Value};
use tql_ast::{BinaryOp, Version};
use tql_core::{CompilerErrorKind, RuntimeError};
use tql_modules::MemoryRepositoryFactory;

fn options_with(storage: &Arc<MemoryRepositoryFactory>) -> ProcessorOptions {
    ProcessorOptions::with_default_modules()
        .unwrap()
        .with_storage(storage.clone())
}

fn strings(values: &[&str]) -> Value {
    Value::List(values.iter().map(|s| Value::from(*s)).collect())
}

#[test]
fn module_storage_persists_across_prepared_runs() {
    let storage = Arc::new(MemoryRepositoryFactory::new());
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);

    let shop = b.module(
        "Shop",
        Some(Version {
            major: 2,
            minor: 0,
            revision: 1,
        }),
        vec![b.var_member("Seen", b.set_type(b.named_type("Int32")))],
    );
    let record = b.assign(
        b.id("Shop.Seen"),
        b.call(b.id("System.Union"), vec![b.id("Shop.Seen"), b.set(vec![b.id("n")])]),
    );
    let count = b.call(b.id("System.Count"), vec![b.call(b.id("System.ToList"), vec![b.id("Shop.Seen")])]);
    let script = b.script(
        vec![],
        vec![shop],
        vec![b.var("n", Some(b.named_type("Int32")), None)],
        vec![record],
        Some(b.claused(vec![], vec![], None, count)),
    );

    let processor = Processor::new();
    let id = processor.prepare(script, &options_with(&storage)).unwrap();
    assert_eq!(processor.result_type(id).unwrap(), BaseType::INT32);

    let run = |n: i32| processor.evaluate_prepared(id, &Arguments::new().with("n", n)).unwrap();
    assert_eq!(run(1), Value::Int32(1));
    assert_eq!(run(2), Value::Int32(2));
    assert_eq!(run(1), Value::Int32(2));

    let expected: BTreeSet<Value> = [Value::Int32(1), Value::Int32(2)].into_iter().collect();
    assert_eq!(storage.value("Shop", "Seen"), Some(Value::Set(expected)));

    let declarations = storage.declarations();
    assert_eq!(declarations.len(), 1);
    assert_eq!(declarations[0].name.to_string(), "Shop");
    assert_eq!(declarations[0].version.as_deref(), Some("2.0.1"));
}

#[test]
fn comprehension_filters_tuples() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let person = |name: &str, age: i32| b.tuple(vec![(Some("name"), b.string(name)), (Some("age"), b.int(age))]);
    let people = b.list(vec![person("ann", 31), person("bob", 17), person("cyd", 45)]);

    let adults = b.claused(
        vec![("p", b.id("people"))],
        vec![("label", b.call(b.id("System.Uppercase"), vec![b.id("p.name")]))],
        Some(b.binary(b.id("p.age"), BinaryOp::GreaterOrEqual, b.int(18))),
        b.id("label"),
    );
    let script = b.script(vec![], vec![], vec![b.var("people", None, Some(people))], vec![], Some(adults));

    let options = ProcessorOptions::with_default_modules().unwrap();
    let processor = Processor::new();
    let output = processor.compile(script, &options).unwrap();
    assert_eq!(output.result_type, BaseType::list(BaseType::STRING));
    assert_eq!(
        processor.evaluate(script, &Arguments::new(), &options).unwrap(),
        strings(&["ANN", "CYD"])
    );
}

#[test]
fn module_constants_need_no_storage() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let limits = b.module(
        "Limits",
        None,
        vec![
            b.const_member("Base", b.int(10)),
            b.const_member("Twice", b.binary(b.id("Base"), BinaryOp::Multiply, b.int(2))),
        ],
    );
    let script = b.script(
        vec![],
        vec![limits],
        vec![],
        vec![],
        Some(b.claused(vec![], vec![], None, b.id("Limits.Twice"))),
    );
    let value = Processor::new()
        .evaluate(script, &Arguments::new(), &ProcessorOptions::new())
        .unwrap();
    assert_eq!(value, Value::Int32(20));
}

#[test]
fn runtime_errors_carry_the_statement_line() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let vars = vec![b.var("d", None, Some(b.int(0))), b.var("x", None, Some(b.int(1)))];
    b.at_line(3);
    let divide = b.assign(b.id("x"), b.binary(b.int(10), BinaryOp::Divide, b.id("d")));
    let script = b.script(vec![], vec![], vars, vec![divide], Some(b.claused(vec![], vec![], None, b.id("x"))));

    let mut options = ProcessorOptions::new();
    options.compiler = options.compiler.with_debug_info(true);
    let err = Processor::new()
        .evaluate(script, &Arguments::new(), &options)
        .unwrap_err();
    let runtime = err.runtime().unwrap();
    assert!(matches!(runtime, RuntimeError::AtLine { line: 3, .. }));
    assert_eq!(runtime.root(), &RuntimeError::DivisionByZero);
}

#[test]
fn unbounded_recursion_overflows() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let forever = b.function(
        vec![("n", b.named_type("Int32"))],
        Some(b.named_type("Int32")),
        b.call(b.id("self"), vec![b.binary(b.id("n"), BinaryOp::Add, b.int(1))]),
    );
    let script = b.script(
        vec![],
        vec![],
        vec![b.var("forever", None, Some(forever))],
        vec![],
        Some(b.claused(vec![], vec![], None, b.call(b.id("forever"), vec![b.int(0)]))),
    );
    let err = Processor::new()
        .evaluate(script, &Arguments::new(), &ProcessorOptions::new())
        .unwrap_err();
    assert!(matches!(err.runtime().map(RuntimeError::root), Some(RuntimeError::StackOverflow { .. })));
}

#[test]
fn module_variables_fail_without_storage() {
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let module = b.module("Shop", None, vec![b.var_member("Count", b.named_type("Int32"))]);
    let script = b.script(
        vec![],
        vec![module],
        vec![],
        vec![],
        Some(b.claused(vec![], vec![], None, b.id("Shop.Count"))),
    );
    let err = Processor::new()
        .execute(script, &Arguments::new(), &ProcessorOptions::new())
        .unwrap_err();
    assert!(matches!(err.runtime().map(RuntimeError::root), Some(RuntimeError::Repository { .. })));
}

#[test]
fn compile_errors_abort_before_running() {
    let storage = Arc::new(MemoryRepositoryFactory::new());
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let module = b.module("Shop", None, vec![b.var_member("Count", b.named_type("Int32"))]);
    let bad = b.assign(b.id("Shop.Count"), b.string("many"));
    let script = b.script(vec![], vec![module], vec![], vec![bad], None);

    let err = Processor::new()
        .prepare(script, &options_with(&storage))
        .unwrap_err();
    assert_eq!(err.compiler_kind(), Some(CompilerErrorKind::IncorrectType));
    assert!(storage.declarations().is_empty());
}

#[test]
fn stored_rows_match_rows_built_by_another_script() {
    let storage = Arc::new(MemoryRepositoryFactory::new());
    let options = options_with(&storage);
    let processor = Processor::new();

    let writer_arena = Bump::new();
    let w = AstBuilder::new(&writer_arena);
    let pairs = w.set_type(w.tuple_type(
        vec![("b", w.named_type("Int32")), ("a", w.named_type("Int32"))],
        vec![],
        vec![],
    ));
    let shop = w.module("Shop", None, vec![w.var_member("Pairs", pairs)]);
    let row = w.tuple(vec![(Some("a"), w.int(1)), (Some("b"), w.int(2))]);
    let store = w.assign(w.id("Shop.Pairs"), w.set(vec![row]));
    let writer = w.script(vec![], vec![shop], vec![], vec![store], None);
    processor.execute(writer, &Arguments::new(), &options).unwrap();

    let reader_arena = Bump::new();
    let r = AstBuilder::new(&reader_arena);
    let pairs = r.set_type(r.tuple_type(
        vec![("a", r.named_type("Int32")), ("b", r.named_type("Int32"))],
        vec![],
        vec![],
    ));
    let shop = r.module("Shop", None, vec![r.var_member("Pairs", pairs)]);
    let row = r.tuple(vec![(Some("b"), r.int(2)), (Some("a"), r.int(1))]);
    let contains = r.binary(row, BinaryOp::In, r.id("Shop.Pairs"));
    let reader = r.script(vec![], vec![shop], vec![], vec![], Some(r.claused(vec![], vec![], None, contains)));
    assert_eq!(
        processor.evaluate(reader, &Arguments::new(), &options).unwrap(),
        Value::Boolean(true)
    );
}
