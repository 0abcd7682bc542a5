//! CLI integration tests for vcbridge.
//!
//! These cover the subcommands that work without a Visual Studio
//! installation.

use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the vcbridge binary command.
fn vcbridge() -> Command {
    Command::cargo_bin("vcbridge").unwrap()
}

fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

// ============================================================================
// vcbridge --help
// ============================================================================

#[test]
fn test_help_lists_subcommands() {
    vcbridge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("env"))
        .stdout(predicate::str::contains("compile"))
        .stdout(predicate::str::contains("link"))
        .stdout(predicate::str::contains("quote"))
        .stdout(predicate::str::contains("deps"));
}

#[test]
fn test_unknown_subcommand_fails() {
    vcbridge().arg("install-driver").assert().failure();
}

// ============================================================================
// vcbridge quote
// ============================================================================

#[test]
fn test_quote_joins_arguments() {
    vcbridge()
        .args(["quote", "noSpaces", "a b", "C:\\dir\\file"])
        .assert()
        .success()
        .stdout("noSpaces \"a b\" C:\\dir\\file\n");
}

#[test]
fn test_quote_doubles_backslashes_before_closing_quote() {
    vcbridge()
        .args(["quote", "C:\\my dir\\"])
        .assert()
        .success()
        .stdout("\"C:\\my dir\\\\\"\n");
}

#[test]
fn test_quote_accepts_tool_flags() {
    vcbridge()
        .args(["quote", "/OUT:app.exe", "-DNAME=a b"])
        .assert()
        .success()
        .stdout("/OUT:app.exe \"-DNAME=a b\"\n");
}

#[test]
fn test_quote_split() {
    vcbridge()
        .args(["quote", "--split", "cl /c \"a b.cpp\" /Foout\\"])
        .assert()
        .success()
        .stdout("cl\n/c\na b.cpp\n/Foout\\\n");
}

// ============================================================================
// vcbridge deps
// ============================================================================

#[test]
fn test_deps_from_show_includes() {
    let tmp = temp_dir();
    let notes = tmp.path().join("app.rc.includes");
    fs::write(
        &notes,
        "Note: including file: C:\\VS\\2019\\Community\\VC\\include\\winres.h\r\n\
         app.rc\r\n\
         Note: including file:  C:\\Project\\Include\\Version.h\r\n",
    )
    .unwrap();

    vcbridge()
        .args(["deps"])
        .arg(&notes)
        .args(["--object", "build/app.res", "--source", "src/app.rc"])
        .args(["--exclude", "C:\\VS\\2019\\Community"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("build/app.res: \\\n  src/app.rc"))
        .stdout(predicate::str::contains("c:/project/include/version.h"))
        .stdout(predicate::str::contains("winres.h").not());
}

#[test]
fn test_deps_show_includes_requires_source() {
    let tmp = temp_dir();
    let notes = tmp.path().join("notes.txt");
    fs::write(&notes, "Note: including file: C:\\a.h\n").unwrap();

    vcbridge()
        .arg("deps")
        .arg(&notes)
        .args(["--object", "a.res"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--source is required"));
}

#[test]
fn test_deps_from_json_report_writes_file() {
    let tmp = temp_dir();
    let report = tmp.path().join("a.obj.d.json");
    fs::write(
        &report,
        r#"{
  "Version": "1.1",
  "Data": {
    "Source": "c:\\project\\src\\a.cpp",
    "ProvidedModule": "",
    "Includes": [
      "c:\\project\\include\\my header.h",
      "c:\\program files (x86)\\windows kits\\10\\include\\um\\windows.h"
    ],
    "ImportedModules": [],
    "ImportedHeaderUnits": []
  }
}"#,
    )
    .unwrap();
    let out = tmp.path().join("deps").join("a.obj.d");

    vcbridge()
        .arg("deps")
        .arg(&report)
        .args(["--object", "build/a.obj"])
        .args(["--exclude", "C:\\Program Files (x86)\\Windows Kits\\10"])
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("1 headers"));

    let contents = fs::read_to_string(&out).unwrap();
    assert!(contents.starts_with("build/a.obj: \\\n  c:/project/src/a.cpp"));
    assert!(contents.contains("c:/project/include/my\\ header.h"));
    assert!(!contents.contains("windows.h"));
}

#[test]
fn test_deps_rejects_malformed_report() {
    let tmp = temp_dir();
    let report = tmp.path().join("broken.json");
    fs::write(&report, "{ \"Version\": ").unwrap();

    vcbridge()
        .arg("deps")
        .arg(&report)
        .args(["--object", "a.obj"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed dependency report"));
}
