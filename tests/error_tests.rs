//! Diagnostics reported by the whole pipeline.

use kspc::{CompileError, CompileOptions, ErrorCategory, KspError, LineMap};

fn compile_error(source: &str) -> CompileError {
    match kspc::compile(source, &CompileOptions::default()) {
        Err(KspError::Compile(err)) => err,
        Err(other) => panic!("expected a compile error, got {other}"),
        Ok(compiled) => panic!("expected a compile error, got:\n{}", compiled.code),
    }
}

#[test]
fn undeclared_variable() {
    let err = compile_error("on init\nend on\non note\n  x := 1\nend on");
    assert!(matches!(&err, CompileError::UndeclaredName { name, .. } if name == "x"));
    assert_eq!(err.category(), ErrorCategory::Resolution);
    assert_eq!(err.location().map(|loc| loc.line()), Some(4));
}

#[test]
fn ambiguous_type() {
    let err = compile_error("on init\n  declare $x\n  declare %x[2]\n  x := 1\nend on");
    assert!(matches!(&err, CompileError::AmbiguousType { name, .. } if name == "x"));
    assert_eq!(err.category(), ErrorCategory::Resolution);
}

#[test]
fn sigil_conflict() {
    let err = compile_error("on init\n  declare $x\n  %x[0] := 1\nend on");
    assert!(matches!(err, CompileError::SigilConflict { .. }));
}

#[test]
fn missing_return_value() {
    let err = compile_error(
        "on init\n  declare $x\nend on\non note\n  x := f(1)\nend on\nfunction f(a)\n  message(a)\nend function",
    );
    assert!(matches!(&err, CompileError::NoReturnValue { function, .. } if function == "f"));
    assert_eq!(err.category(), ErrorCategory::Contract);
}

#[test]
fn explicit_call_in_init() {
    let err = compile_error("on init\n  call setup\nend on\nfunction setup\nend function");
    assert!(matches!(err, CompileError::CallInInit { .. }));
    assert_eq!(err.category(), ErrorCategory::Contract);
}

#[test]
fn recursion_while_inlining() {
    let err = compile_error(
        "on init\nend on\non note\n  ping\nend on\n\
         function ping\n  pong\nend function\n\
         function pong\n  ping\nend function",
    );
    assert!(matches!(&err, CompileError::RecursiveCall { chain, .. } if chain == "ping -> pong -> ping"));
    assert_eq!(err.category(), ErrorCategory::Graph);
}

#[test]
fn recursion_between_explicit_calls() {
    let err = compile_error(
        "on init\nend on\non note\n  call ping\nend on\n\
         function ping\n  call pong\nend function\n\
         function pong\n  call ping\nend function",
    );
    assert!(matches!(err, CompileError::RecursionDetected { .. }));
    assert_eq!(err.category(), ErrorCategory::Graph);
    assert!(err.location().is_none());
}

#[test]
fn duplicate_function() {
    let err = compile_error("on init\nend on\nfunction f\nend function\nfunction f\nend function");
    assert!(matches!(&err, CompileError::DuplicateFunction { name, .. } if name == "f"));
}

#[test]
fn parse_errors_name_the_file() {
    let options = CompileOptions::default().with_file_name("main.ksp");
    let err = kspc::compile("on init\n  declare\nend on", &options).unwrap_err();
    let KspError::Parse(errors) = &err else {
        panic!("expected a parse error, got {err}");
    };
    let first = errors.first().expect("at least one error");
    assert_eq!(first.loc.file.as_deref(), Some("main.ksp"));
    assert!(err.to_string().contains("main.ksp"), "{err}");
}

#[test]
fn errors_in_imported_lines_name_the_import() {
    let source = "on init\nend on\non note\n  lib.reset\nend on\nfunction reset\n  missing := 0\nend function";
    let mut lines = LineMap::new();
    lines
        .push_lines(5, Some("main.ksp"), &[])
        .push_lines(3, Some("lib.ksp"), &["lib".to_string()]);
    let err = kspc::compile_with_lines(source, &lines, &CompileOptions::default()).unwrap_err();
    let err = err.as_compile().expect("compile error");
    assert_eq!(err.category(), ErrorCategory::Resolution);
    let loc = err.location().expect("located");
    assert_eq!(loc.file.as_deref(), Some("lib.ksp"));
    assert_eq!(loc.line(), 7);
}
