//! End-to-end flows through the public API: declare a signature, run
//! argv through the dispatcher, observe what the handler received.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use argonize::{
    Argonize, Command, FunctionInfo, Parameter, Run, RunError, TypeSpec, Value,
};

fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

type Captured = Rc<RefCell<Vec<(Vec<Value>, Vec<(String, Value)>)>>>;

fn capturing(info: FunctionInfo) -> (Command, Captured) {
    let calls: Captured = Rc::new(RefCell::new(Vec::new()));
    let sink = calls.clone();
    let command = Command::sync(info, move |args| {
        sink.borrow_mut().push((args.positional, args.keyword));
        Ok(())
    });
    (command, calls)
}

fn typed_signature() -> FunctionInfo {
    FunctionInfo::builder("compute")
        .doc("Computes a thing.\n\n:param a: the operand\n:param b: a label")
        .param(Parameter::positional_only("a").annotation(TypeSpec::Int))
        .param(
            Parameter::positional_or_keyword("b")
                .annotation(TypeSpec::Str)
                .default("x"),
        )
        .build()
        .unwrap()
}

#[test]
fn defaults_flow_into_the_call() {
    let (command, calls) = capturing(typed_signature());
    let app = Argonize::new(command).prog("compute").width(80);

    assert_eq!(app.try_run_from(&argv(&["5"])).unwrap(), Run::Completed);
    let recorded = calls.borrow();
    let (positional, keyword) = &recorded[0];
    assert_eq!(
        positional.as_slice(),
        [Value::Int(5), Value::Str("x".into())]
    );
    assert!(keyword.is_empty());
}

#[test]
fn supplied_options_override_defaults() {
    let (command, calls) = capturing(typed_signature());
    let app = Argonize::new(command).prog("compute").width(80);

    app.try_run_from(&argv(&["5", "--b", "y"])).unwrap();
    let recorded = calls.borrow();
    assert_eq!(
        recorded[0].0.as_slice(),
        [Value::Int(5), Value::Str("y".into())]
    );
}

#[test]
fn coercion_failure_stops_before_the_handler() {
    let (command, calls) = capturing(typed_signature());
    let app = Argonize::new(command).prog("compute").width(80);

    let err = app.try_run_from(&argv(&["notanumber"])).unwrap_err();
    match err {
        RunError::Usage(usage) => {
            assert!(usage.message.contains("invalid int value"), "{}", usage.message);
            assert!(usage.usage.contains("usage"), "{}", usage.usage);
        }
        other => panic!("unexpected: {other}"),
    }
    assert!(calls.borrow().is_empty());
}

#[test]
fn subcommands_dispatch_to_the_selected_handler_only() {
    let sig = |name: &str| {
        FunctionInfo::builder(name)
            .param(Parameter::positional_only("x").annotation(TypeSpec::Int))
            .param(Parameter::positional_only("y").annotation(TypeSpec::Int))
            .build()
            .unwrap()
    };
    let (add, add_calls) = capturing(sig("add"));
    let (sub, sub_calls) = capturing(sig("sub"));
    let app = Argonize::commands(vec![add, sub]).prog("calc").width(80);

    assert_eq!(
        app.try_run_from(&argv(&["sub", "9", "4"])).unwrap(),
        Run::Completed
    );
    assert!(add_calls.borrow().is_empty());
    assert_eq!(
        sub_calls.borrow()[0].0.as_slice(),
        [Value::Int(9), Value::Int(4)]
    );
}

#[test]
fn help_request_completes_without_running_a_handler() {
    let (command, calls) = capturing(typed_signature());
    let app = Argonize::new(command).prog("compute").width(80);
    assert_eq!(app.try_run_from(&argv(&["--help"])).unwrap(), Run::HelpShown);
    assert!(calls.borrow().is_empty());
}

#[test]
fn doc_strings_surface_in_help() {
    let info = typed_signature();
    let command = Command::sync(info, |_| Ok(()));
    let app = Argonize::new(command).prog("compute").width(80);
    // The description and parameter help come from the doc string; the
    // parser renders them, so a bad parse of the doc would show up here.
    let err = app.try_run_from(&argv(&["5", "extra", "tokens"])).unwrap_err();
    match err {
        RunError::Usage(usage) => {
            assert!(usage.message.contains("unrecognized arguments"));
        }
        other => panic!("unexpected: {other}"),
    }
}

#[test]
fn argfiles_expand_through_the_dispatcher() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("args.txt");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "5\n--b\nfromfile").unwrap();

    let (command, calls) = capturing(typed_signature());
    let app = Argonize::new(command)
        .prog("compute")
        .width(80)
        .fromfile_prefix('@');
    app.try_run_from(&argv(&[&format!("@{}", path.display())]))
        .unwrap();
    assert_eq!(
        calls.borrow()[0].0.as_slice(),
        [Value::Int(5), Value::Str("fromfile".into())]
    );
}

#[test]
fn union_annotations_coerce_per_token() {
    let info = FunctionInfo::builder("mixed")
        .param(
            Parameter::variadic_positional("items").annotation(TypeSpec::List(Box::new(
                TypeSpec::Union(vec![TypeSpec::Int, TypeSpec::Float, TypeSpec::Str]),
            ))),
        )
        .build()
        .unwrap();
    let (command, calls) = capturing(info);
    let app = Argonize::new(command).prog("mixed").width(80);

    app.try_run_from(&argv(&["1", "2.5", "three"])).unwrap();
    assert_eq!(
        calls.borrow()[0].0.as_slice(),
        [
            Value::Int(1),
            Value::Float(2.5),
            Value::Str("three".into())
        ]
    );
}
