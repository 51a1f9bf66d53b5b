//! Emitted code parses back to a tree that prints identically.

mod test_harness;

use kspc::{Builtins, CompileOptions, Emitter, LineMap, Parser};
use test_harness::TestHarness;

const SCRIPTS: &[&str] = &["velocity.ksp", "library.ksp", "sequencer.ksp"];

fn reemit(code: &str, options: &CompileOptions) -> String {
    let module = Parser::parse(code, &LineMap::single(None))
        .unwrap_or_else(|e| panic!("emitted code does not parse: {e}\n\n{code}"));
    Emitter::new(&Builtins::standard(), options).emit_module(&module)
}

fn assert_stable(options: CompileOptions) {
    for script in SCRIPTS {
        let result = TestHarness::new().with_options(options.clone()).compile(script);
        let code = result.code();
        assert_eq!(reemit(code, &options), code, "{script} is not stable");
    }
}

#[test]
fn compact_output_is_stable() {
    assert_stable(CompileOptions::default());
}

#[test]
fn indented_output_is_stable() {
    assert_stable(CompileOptions::default().with_remove_whitespace(false).with_indent_width(4));
}

#[test]
fn compacted_output_is_stable() {
    assert_stable(CompileOptions::default().with_compact_variables(true));
}

#[test]
fn recompiling_the_output_changes_nothing() {
    let result = TestHarness::new().compile("velocity.ksp");
    let code = result.code();
    let again = kspc::compile(code, &CompileOptions::default()).expect("output compiles");
    assert_eq!(again.code, code);
}

#[test]
fn unary_operands_survive_a_round_trip() {
    let source = "on init\n  declare $a\n  declare $b\n  declare $c\n  declare $x\nend on\n\
                  on note\n  x := (.not. a) + 1\n  if (not (b = 1) and c = 2)\n    x := a * (.not. b)\n  end if\nend on";
    let options = CompileOptions::default();
    let compiled = kspc::compile(source, &options).expect("compiles");
    assert!(compiled.code.contains("$x := (.not. $a)+1"), "{}", compiled.code);
    assert_eq!(reemit(&compiled.code, &options), compiled.code);
}
