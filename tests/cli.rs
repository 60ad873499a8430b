use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;

/// Drop a script into a per-process temp directory and return its path.
fn write_script(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("loxide-cli-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");

    let path = dir.join(name);
    fs::write(&path, contents).expect("write script");
    path
}

fn loxide() -> Command {
    Command::cargo_bin("loxide").expect("binary builds")
}

#[test]
fn run_prints_program_output() {
    let script = write_script("hello.lox", r#"print "hello";"#);

    loxide().arg("run").arg(&script).assert().success().stdout("hello");
}

#[test]
fn exit_statement_sets_the_process_exit_code() {
    let script = write_script("exit2.lox", "exit 2;");

    loxide().arg("run").arg(&script).assert().code(2);
}

#[test]
fn exit_deep_in_the_call_stack_still_exits() {
    let script = write_script(
        "exit_deep.lox",
        r#"
        fn deep() { try { exit 7; } finally { print "cleanup"; } }
        deep();
        print "unreachable";
        "#,
    );

    let output = loxide().arg("run").arg(&script).output().expect("run");
    assert_eq!(output.status.code(), Some(7));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "cleanup");
}

#[test]
fn syntax_errors_exit_65() {
    let script = write_script("syntax.lox", "var ;");

    let output = loxide().arg("run").arg(&script).output().expect("run");
    assert_eq!(output.status.code(), Some(65));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error"));
}

#[test]
fn resolution_errors_exit_65() {
    let script = write_script("toplevel_return.lox", "return 1;");

    let output = loxide().arg("run").arg(&script).output().expect("run");
    assert_eq!(output.status.code(), Some(65));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Cannot return from top-level code"));
}

#[test]
fn runtime_faults_exit_70() {
    let script = write_script("fault.lox", "print missing;");

    let output = loxide().arg("run").arg(&script).output().expect("run");
    assert_eq!(output.status.code(), Some(70));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Undefined variable 'missing'"));
}

#[test]
fn warnings_report_but_never_fail_a_run() {
    let script = write_script(
        "warned.lox",
        r#"
        fn f() { var unused = 1; return 2; }
        print f();
        "#,
    );

    let output = loxide().arg("run").arg(&script).output().expect("run");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "2");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unused variable 'unused'"));
}

#[test]
fn tokenize_lists_tokens() {
    let script = write_script("tokens.lox", "var x = 1;");

    let output = loxide().arg("tokenize").arg(&script).output().expect("run");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("VAR var null"));
    assert!(stdout.contains("IDENTIFIER x null"));
    assert!(stdout.contains("NUMBER 1 1.0"));
    assert!(stdout.contains("EOF  null"));
}

#[test]
fn evaluate_prints_the_expression_value() {
    let script = write_script("expr.lox", "1 + 2 * 3");

    loxide()
        .arg("evaluate")
        .arg(&script)
        .assert()
        .success()
        .stdout("7\n");
}

#[test]
fn parse_prints_the_ast() {
    let script = write_script("ast.lox", "(1 + 2) * 3");

    loxide()
        .arg("parse")
        .arg(&script)
        .assert()
        .success()
        .stdout("(* (group (+ 1.0 2.0)) 3.0)\n");
}

#[test]
fn parse_json_emits_serialized_ast() {
    let script = write_script("ast_json.lox", "1 + 2");

    let output = loxide()
        .arg("parse")
        .arg(&script)
        .arg("--json")
        .output()
        .expect("run");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("\"Binary\""));
}

#[test]
fn include_splices_a_sibling_file() {
    write_script("shared.lox", r#"fn greet() { return "from lib"; }"#);
    let script = write_script("includes.lox", r#"include "shared"; print greet();"#);

    loxide()
        .arg("run")
        .arg(&script)
        .assert()
        .success()
        .stdout("from lib");
}

#[test]
fn import_exposes_classes_from_the_module() {
    write_script(
        "module.lox",
        r#"
        var hidden = 1;
        class Exposed { tag() { return "ok"; } }
        "#,
    );
    let script = write_script("imports.lox", r#"import "module"; print Exposed().tag();"#);

    loxide().arg("run").arg(&script).assert().success().stdout("ok");
}

#[test]
fn import_filters_out_non_class_declarations() {
    write_script(
        "module2.lox",
        r#"
        var hidden = 1;
        class Exposed {}
        "#,
    );
    let script = write_script("imports_hidden.lox", r#"import "module2"; print hidden;"#);

    let output = loxide().arg("run").arg(&script).output().expect("run");
    assert_eq!(output.status.code(), Some(70));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Undefined variable 'hidden'"));
}

#[test]
fn missing_include_is_a_syntax_error() {
    let script = write_script("missing_include.lox", r#"include "does_not_exist";"#);

    let output = loxide().arg("run").arg(&script).output().expect("run");
    assert_eq!(output.status.code(), Some(65));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Cannot find"));
}

#[test]
fn recursive_inclusion_is_reported() {
    write_script("cycle_a.lox", r#"include "cycle_b";"#);
    write_script("cycle_b.lox", r#"include "cycle_a";"#);
    let script = write_script("cycle_main.lox", r#"include "cycle_a";"#);

    let output = loxide().arg("run").arg(&script).output().expect("run");
    assert_eq!(output.status.code(), Some(65));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Recursive code inclusion"));
}
