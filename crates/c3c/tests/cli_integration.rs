//! Integration tests for the c3c binary.
//!
//! These exercise the compiled executable end to end: stdout, stderr and
//! exit codes for the lex-only, parse-only, header and full-compile
//! surfaces. Each test runs in its own temporary directory.

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn c3c() -> Command {
    Command::cargo_bin("c3c").expect("c3c binary builds")
}

#[test]
fn no_files_is_a_fatal_config_error() {
    let temp = assert_fs::TempDir::new().unwrap();
    // A wildcard over an empty directory expands to nothing.
    c3c()
        .current_dir(temp.path())
        .arg("*")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No files to compile."));
}

#[test]
fn invalid_source_name_is_rejected() {
    let temp = assert_fs::TempDir::new().unwrap();
    c3c()
        .current_dir(temp.path())
        .arg("program.c")
        .assert()
        .failure()
        .stderr(predicate::str::contains("'program.c' is invalid"));
}

#[test]
fn lex_only_prints_token_names() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("a.c3");
    file.write_str("fn int main() { return 0; }\n").unwrap();

    let expected_path = file.path().canonicalize().unwrap();
    c3c()
        .current_dir(temp.path())
        .args(["--lex-only", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!(
            "# {}\n",
            expected_path.display()
        )))
        .stdout(predicate::str::contains(
            "FN INT IDENT LPAREN RPAREN LBRACE RETURN INTEGER SEMI RBRACE EOF",
        ));
}

#[test]
fn parse_only_dumps_ast_json() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("demo.c3");
    file.write_str("module demo;\npublic fn int answer() { return 42; }\n")
        .unwrap();

    c3c()
        .current_dir(temp.path())
        .args(["--parse-only", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"module\": \"demo\""))
        .stdout(predicate::str::contains("\"name\": \"answer\""));
}

#[test]
fn header_emission_produces_one_header_per_module() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("a.c3")
        .write_str("module one;\npublic fn void a() {}\n")
        .unwrap();
    temp.child("b.c3")
        .write_str("module two;\npublic fn void b() {}\n")
        .unwrap();
    temp.child("c.c3")
        .write_str("module three;\npublic fn void c() {}\n")
        .unwrap();

    c3c()
        .current_dir(temp.path())
        .args(["--output-headers", "a.c3", "b.c3", "c.c3"])
        .assert()
        .success();

    temp.child("one.h").assert(predicate::path::exists());
    temp.child("two.h").assert(predicate::path::exists());
    temp.child("three.h").assert(predicate::path::exists());
    // Header emission is terminal: no objects, no linked output.
    temp.child("one.o").assert(predicate::path::missing());
    temp.child("foo.out").assert(predicate::path::missing());
}

#[test]
fn full_compile_produces_objects_and_linked_output() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("a.c3")
        .write_str("module first;\npublic fn int start() { return 1; }\n")
        .unwrap();
    temp.child("b.c3")
        .write_str("module second;\nimport first;\nfn int go() { return start(); }\n")
        .unwrap();

    c3c()
        .current_dir(temp.path())
        .args(["a.c3", "b.c3", "--output", "prog.out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-- AST/EXPR INFO --"));

    temp.child("first.o").assert(predicate::path::exists());
    temp.child("second.o").assert(predicate::path::exists());
    temp.child("prog.out").assert(predicate::path::exists());
}

#[test]
fn test_output_compiles_without_linking() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("m.c3")
        .write_str("module m;\nfn int main() { return 0; }\n")
        .unwrap();

    c3c()
        .current_dir(temp.path())
        .args(["--test-output", "m.c3"])
        .assert()
        .success();

    temp.child("m.o").assert(predicate::path::exists());
    temp.child("foo.out").assert(predicate::path::missing());
}

#[test]
fn analysis_errors_exit_nonzero_with_diagnostics() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("bad.c3")
        .write_str("module bad;\nfn int f() { return missing; }\n")
        .unwrap();

    c3c()
        .current_dir(temp.path())
        .arg("bad.c3")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown symbol 'missing'"));
}

#[test]
fn duplicate_public_symbols_are_ambiguous_at_use_sites() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("a.c3")
        .write_str("module mod.a;\npublic fn int foo() { return 1; }\n")
        .unwrap();
    temp.child("b.c3")
        .write_str("module mod.b;\npublic fn int foo() { return 2; }\n")
        .unwrap();
    temp.child("c.c3")
        .write_str("module mod.c;\nfn int call() { return foo(); }\n")
        .unwrap();

    c3c()
        .current_dir(temp.path())
        .args(["a.c3", "b.c3", "c.c3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ambiguous"));
}

#[test]
fn recursive_wildcard_compiles_nested_sources() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("src/a.c3")
        .write_str("module a;\nfn int main() { return 0; }\n")
        .unwrap();
    temp.child("src/nested/b.c3")
        .write_str("module b;\npublic fn int helper() { return 1; }\n")
        .unwrap();

    c3c()
        .current_dir(temp.path())
        .args(["--test-output", "src/**"])
        .assert()
        .success();

    temp.child("a.o").assert(predicate::path::exists());
    temp.child("b.o").assert(predicate::path::exists());
}
