//! End-to-end tests for the `bbcount` binary.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::NamedTempFile;

const HELLO: &str = "declare void @foo()

define void @main() {
entry:
  %x = alloca i64, align 8
  call void @foo()
  ret void
}
";

fn ir_file(source: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(source.as_bytes()).expect("write temp file");
    file
}

fn bbcount(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bbcount"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run bbcount")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_no_arguments_prints_usage() {
    let output = bbcount(&[]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output), "usage: bbcount <IR file>\n");
}

#[test]
fn test_two_inputs_prints_usage() {
    let output = bbcount(&["a.ll", "b.ll"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output), "usage: bbcount <IR file>\n");
}

#[test]
fn test_report_findings() {
    let file = ir_file(HELLO);
    let output = bbcount(&[path_arg(file.path())]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stdout(&output),
        "found function foo\n\
         found function main\n\
         found alloca inst:   %x = alloca i64, align 8\n\
         found callee: foo\n"
    );
}

#[test]
fn test_detailed_report() {
    let file = ir_file(HELLO);
    let output = bbcount(&[path_arg(file.path()), "--detailed"]);
    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("BasicBlock: entry\n"));
}

#[test]
fn test_parse_error_is_invalid_module() {
    let file = ir_file("define void @main() {\n  frobnicate\n}\n");
    let output = bbcount(&[path_arg(file.path())]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).ends_with("error: invalid module\n"));
}

#[test]
fn test_verify_error_is_invalid_module() {
    let file = ir_file("define i32 @main() {\n  ret void\n}\n");
    let output = bbcount(&[path_arg(file.path())]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).ends_with("error: invalid module\n"));
}

#[test]
fn test_broken_debug_info_continues() {
    let file = ir_file("define void @main() {\n  ret void, !dbg !9\n}\n");
    let output = bbcount(&[path_arg(file.path())]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stderr(&output).contains("caution: debug info is broken\n"));
    assert_eq!(stdout(&output), "found function main\n");
}

#[test]
fn test_missing_input_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let missing = dir.path().join("missing.ll");
    let output = bbcount(&[path_arg(&missing)]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("error: IO error"));
}

#[test]
fn test_instrument_to_stdout() {
    let file = ir_file(HELLO);
    let output = bbcount(&[path_arg(file.path()), "--instrument"]);
    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("@bbCounter = common global i64 0, align 8"));
    assert!(text.contains("declare void @setupAtExit()"));
    assert!(text.contains("%old.bb.count = load i64, ptr @bbCounter"));
    assert!(text.contains("store i64 %new.bb.count, ptr @bbCounter"));
    assert!(!text.contains("found function"));
}

#[test]
fn test_instrument_to_file_reparses() {
    let file = ir_file(HELLO);
    let dir = tempfile::tempdir().expect("create temp dir");
    let out = dir.path().join("out.ll");
    let output = bbcount(&[path_arg(file.path()), "-o", path_arg(&out)]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).is_empty());

    let report = bbcount(&[path_arg(&out)]);
    assert_eq!(report.status.code(), Some(0));
    assert!(stdout(&report).contains("found callee: setupAtExit\n"));

    let again = bbcount(&[path_arg(&out), "--instrument"]);
    assert_eq!(again.status.code(), Some(1));
    assert!(stderr(&again).contains("already instrumented"));

    let skipped = bbcount(&[path_arg(&out), "--instrument", "--on-existing", "skip"]);
    assert_eq!(skipped.status.code(), Some(0));
}

#[test]
fn test_instrument_without_main_fails() {
    let file = ir_file("define void @helper() {\n  ret void\n}\n");
    let output = bbcount(&[path_arg(file.path()), "--instrument"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error: count-bb requires a `main` function"));
}
