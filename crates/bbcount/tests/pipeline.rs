//! Library pipeline: load from disk, instrument, write, reload.

use std::fs;

use bbcount::{Error, InstrumentConfig, ReportOptions, instrument_module, load_module, report, write_module};

const LOOP: &str = r#"source_filename = "loop.c"

declare i32 @printf(ptr, ...)

define i32 @main() {
entry:
  %i = alloca i32, align 4
  store i32 0, ptr %i, align 4
  br label %cond

cond:
  %v = load i32, ptr %i, align 4
  %done = icmp sge i32 %v, 3
  br i1 %done, label %exit, label %body

body:
  %next = add nsw i32 %v, 1
  store i32 %next, ptr %i, align 4
  br label %cond

exit:
  %r = call i32 (ptr, ...) @printf(ptr null)
  ret i32 0
}
"#;

const ANNOTATED: &str = r#"source_filename = "helper.c"

$helper = comdat any

@table = internal unnamed_addr constant i32 7, align 4, !dbg !12

define internal i32 @helper(i32 noundef %a) #0 !dbg !8 {
entry:
  %r = add nsw i32 %a, 1, !dbg !10
  ret i32 %r, !dbg !10
}

define dso_local i32 @main() #0 !dbg !5 {
entry:
  %v = call i32 @helper(i32 noundef 1), !dbg !11
  %p = call i32 @puts(ptr @table), !dbg !11
  ret i32 %v, !dbg !11
}

declare noundef i32 @puts(ptr noundef) #1

attributes #0 = { noinline nounwind "frame-pointer"="all" }
attributes #1 = { nounwind }

!llvm.dbg.cu = !{!0}
!0 = distinct !DICompileUnit(language: DW_LANG_C11, file: !1, emissionKind: FullDebug)
!1 = !DIFile(filename: "helper.c", directory: "/tmp")
!5 = distinct !DISubprogram(name: "main", scope: !1, file: !1, line: 7, unit: !0)
!8 = distinct !DISubprogram(name: "helper", scope: !1, file: !1, line: 3, unit: !0)
!10 = !DILocation(line: 4, scope: !8)
!11 = !DILocation(line: 8, scope: !5)
!12 = !DIGlobalVariableExpression(var: !13, expr: !DIExpression())
!13 = distinct !DIGlobalVariable(name: "table", scope: !0, file: !1, line: 1, isLocal: true, isDefinition: true)
"#;

/// Lines the printer copies through without interpreting them.
fn preserved_lines(text: &str) -> Vec<&str> {
    text.lines()
        .filter(|line| {
            ["define ", "declare ", "attributes ", "$", "@", "!"]
                .iter()
                .any(|prefix| line.starts_with(prefix))
        })
        .filter(|line| !line.starts_with("@bbCounter") && !line.contains("@setupAtExit"))
        .collect()
}

#[test]
fn test_instrument_round_trip_through_disk() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let input = dir.path().join("loop.ll");
    let output = dir.path().join("loop.bb.ll");
    fs::write(&input, LOOP).expect("write input");

    let mut loaded = load_module(&input).expect("load input");
    assert_eq!(loaded.module.name(), "loop.ll");
    let blocks = loaded.module.block_count();
    let before = loaded.module.instruction_count();

    assert!(instrument_module(&mut loaded.module, &InstrumentConfig::default()).expect("instrument"));
    write_module(&loaded.module, &output).expect("write output");

    let reloaded = load_module(&output).expect("reload output");
    assert_eq!(reloaded.module.block_count(), blocks);
    assert_eq!(reloaded.module.instruction_count(), before + 3 * blocks + 1);
    assert!(reloaded.module.global_by_name("bbCounter").is_some());
}

#[test]
fn test_report_after_load() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let input = dir.path().join("loop.ll");
    fs::write(&input, LOOP).expect("write input");

    let loaded = load_module(&input).expect("load input");
    let lines: Vec<String> = report(&loaded.module, ReportOptions::default())
        .map(|f| f.to_string())
        .collect();
    assert_eq!(
        lines,
        [
            "found function printf",
            "found function main",
            "found alloca inst:   %i = alloca i32, align 4",
            "found callee: printf",
        ]
    );
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let err = load_module(dir.path().join("nope.ll")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_attributes_and_metadata_survive_instrumentation() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let input = dir.path().join("helper.ll");
    let output = dir.path().join("helper.bb.ll");
    fs::write(&input, ANNOTATED).expect("write input");

    let mut loaded = load_module(&input).expect("load input");
    assert!(!loaded.debug_info_broken());
    assert!(instrument_module(&mut loaded.module, &InstrumentConfig::default()).expect("instrument"));
    write_module(&loaded.module, &output).expect("write output");

    let written = fs::read_to_string(&output).expect("read output");
    let mut before = preserved_lines(ANNOTATED);
    let mut after = preserved_lines(&written);
    before.sort_unstable();
    after.sort_unstable();
    assert_eq!(after, before);
    assert!(written.contains("\ndeclare void @setupAtExit()\n"));

    let reloaded = load_module(&output).expect("reload output");
    assert!(!reloaded.debug_info_broken());
    let reprinted = reloaded.module.to_string();
    // The `; ModuleID` header names the file the module was read from.
    assert!(reprinted.lines().skip(1).eq(written.lines().skip(1)));
}
