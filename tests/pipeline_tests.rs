//! End-to-end compilation of the scripts under `test_scripts/`.

mod test_harness;

use kspc::{CompileOptions, LineMap};
use test_harness::TestHarness;

#[test]
fn velocity_script_resolves_every_name() {
    let result = TestHarness::new().compile("velocity.ksp");
    result.assert_contains("on init\ndeclare ui_knob $Volume(0, 100, 1)\ndeclare const $LIMIT := 100\n");
    result.assert_contains("declare %velocities[128]\nmessage(\"ready\")\nend on\n");
    result.assert_contains("$count := $count+1\n");
    result.assert_contains("%velocities[$EVENT_NOTE] := $EVENT_VELOCITY\n");
    result.assert_contains("if ($EVENT_VELOCITY>$LIMIT)\nignore_event($EVENT_ID)\nelse\n");
    result.assert_contains("set_control_par(get_ui_id($Volume), $CONTROL_PAR_VALUE, $EVENT_VELOCITY)\n");
    result.assert_contains("on ui_control($Volume)\nmessage($Volume)\nend on\n");
}

#[test]
fn comments_are_not_emitted() {
    TestHarness::new().compile("velocity.ksp").assert_lacks("Tracks incoming");
}

#[test]
fn indentation_is_kept_when_whitespace_is_not_removed() {
    let result = TestHarness::new()
        .with_options(CompileOptions::default().with_remove_whitespace(false))
        .compile("velocity.ksp");
    result.assert_contains("on note\n  $count := $count+1\n");
    result.assert_contains("  if ($EVENT_VELOCITY>$LIMIT)\n    ignore_event($EVENT_ID)\n  else\n");
    result.assert_contains("end on\n\non ui_control");
}

#[test]
fn optimization_substitutes_constants() {
    let result = TestHarness::new()
        .with_options(CompileOptions::default().with_optimize_code(true))
        .compile("velocity.ksp");
    result.assert_contains("declare const $LIMIT := 100\n");
    result.assert_contains("if ($EVENT_VELOCITY>100)\n");
}

#[test]
fn library_script_flattens_families_and_properties() {
    let result = TestHarness::new().compile("library.ksp");
    result.assert_contains("declare $voice__gain := 50\n");
    result.assert_contains("declare %voice__notes[16]\n");
    result.assert_contains("%store[0] := 10\n");
    result.assert_lacks("voice.");
    result.assert_lacks("property");
    result.assert_lacks("family");
}

#[test]
fn library_script_inlines_helpers() {
    let result = TestHarness::new().compile("library.ksp");
    result.assert_contains("$last := $EVENT_NOTE\n");
    result.assert_contains("%voice__notes[$EVENT_NOTE mod 16] := $_previous\n");
    result.assert_contains("if ($EVENT_VELOCITY<10)\n$last := 10\n");
    result.assert_contains("$last := 120\n");
    result.assert_contains("$last := $last*$voice__gain/100+%store[0]\n");
    result.assert_contains("case 0 to 59\nchange_vol($EVENT_ID, -3000, 0)\n");
    result.assert_lacks("function clamp");
    result.assert_lacks("function scaled");
    result.assert_lacks("function remember");
}

#[test]
fn explicitly_called_functions_follow_init() {
    let result = TestHarness::new().compile("library.ksp");
    result.assert_contains("function reset_all\n");
    result.assert_contains("on release\ncall reset_all\nend on\n");
    assert!(result.position("end on\nfunction reset_all") < result.position("on note"));
    assert!(result.position("declare $_i") < result.position("end on\nfunction reset_all"));
}

#[test]
fn sequencer_script_uses_the_stack() {
    let result = TestHarness::new().compile("sequencer.ksp");
    result.assert_contains("function play_step\n");
    result.assert_contains("function arpeggiate\n");
    result.assert_contains("call arpeggiate\n");
    result.assert_contains("call play_step\n");
    result.assert_contains("wait(100000)\n");
    result.assert_contains("$fp := %p[$fp]\n");
    result.assert_lacks("taskfunc");
    assert!(result.position("function play_step") < result.position("function arpeggiate"));
}

#[test]
fn compaction_shortens_user_variables_only() {
    let result = TestHarness::new()
        .with_options(CompileOptions::default().with_compact_variables(true))
        .compile("velocity.ksp");
    let compiled = result.result.as_ref().expect("compiles");
    let map = compiled.compaction.as_ref().expect("compaction map");

    let count = map.short("$count").expect("$count is compacted");
    assert_eq!(count.len(), 6);
    result.assert_contains(&format!("{count} := {count}+1\n"));
    result.assert_contains("$EVENT_VELOCITY");
    result.assert_lacks("$count");
    assert_eq!(map.expand(&format!("{count} := 1")), "$count := 1");
}

#[test]
fn preserved_names_survive_compaction() {
    let result = TestHarness::new()
        .with_options(
            CompileOptions::default()
                .with_compact_variables(true)
                .with_preserve_names(["Volume", "velo*"]),
        )
        .compile("velocity.ksp");
    result.assert_contains("declare ui_knob $Volume(0, 100, 1)\n");
    result.assert_contains("declare %velocities[128]\n");
    result.assert_lacks("$count");
}

#[test]
fn combined_callbacks_run_in_source_order() {
    let source = "on init\n  declare $x\nend on\non note\n  x := 1\nend on\non note\n  x := 2\nend on";
    let options = CompileOptions::default().with_combine_callbacks(true);
    let compiled = kspc::compile(source, &options).expect("compiles");
    assert_eq!(
        compiled.code,
        "on init\ndeclare $x\nend on\non note\n$x := 1\n$x := 2\nend on\n"
    );
}

#[test]
fn imported_file_keeps_its_namespace() {
    let source = "on init\nend on\non note\n  lib.reset\nend on\n\
                  function reset\n  declare global level\n  level := 0\nend function";
    let mut lines = LineMap::new();
    lines
        .push_lines(5, Some("main.ksp"), &[])
        .push_lines(4, Some("lib.ksp"), &["lib".to_string()]);
    let compiled = kspc::compile_with_lines(source, &lines, &CompileOptions::default()).expect("compiles");
    assert_eq!(
        compiled.code,
        "on init\ndeclare $lib__level\nend on\non note\n$lib__level := 0\nend on\n"
    );
}

#[test]
fn pragmas_in_the_script_apply() {
    let source = format!(
        "{{ #pragma compile_without remove_whitespace }}\n{}",
        TestHarness::new().load("velocity.ksp")
    );
    let compiled = kspc::compile(&source, &CompileOptions::default()).expect("compiles");
    assert!(!compiled.options.remove_whitespace);
    assert!(compiled.code.contains("\n  $count := $count+1\n"), "{}", compiled.code);
}
