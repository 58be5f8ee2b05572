#![allow(clippy::tests_outside_test_module)]

use std::{fs, process};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const MODEL: &str = r#"{
    "platform": "jvm",
    "declarations": [{ "name": "demo", "kind": "package", "children": [
        { "name": "Greeter", "kind": "class", "doc": "Says hello.",
          "children": [{ "name": "greet", "kind": "function",
                         "parameters": [{ "name": "who", "type": "kotlin.String" }] }] }
    ] }]
}"#;

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("jvm.json"), MODEL).unwrap();
    fs::write(
        dir.path().join("apiweave.json"),
        r#"{ "module_name": "demo", "passes": [{ "platform": "jvm", "model": "jvm.json" }] }"#,
    )
    .unwrap();
    dir
}

fn apiweave() -> Command {
    let mut cmd = Command::from(process::Command::new(env!("CARGO_BIN_EXE_apiweave")));
    cmd.env_remove("APIWEAVE_CONFIG").env_remove("APIWEAVE_LOG");
    cmd
}

#[test]
fn lists_formats() {
    apiweave()
        .arg("--list-formats")
        .assert()
        .success()
        .stdout(predicate::str::contains("html").and(predicate::str::contains("json")));
}

#[test]
fn missing_config_fails() {
    let dir = TempDir::new().unwrap();
    apiweave()
        .arg("--config")
        .arg(dir.path().join("nope.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading configuration"));
}

#[test]
fn writes_html_pages() {
    let dir = project();
    apiweave()
        .arg("--config")
        .arg(dir.path().join("apiweave.json"))
        .arg("--offline")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 pages written"));
    let class = fs::read_to_string(dir.path().join("apidocs/demo/Greeter.html")).unwrap();
    assert!(class.contains("Says hello."));
    assert!(class.contains("id=\"greet-kotlin.String-\""));
    assert!(dir.path().join("apidocs/index.html").exists());
}

#[test]
fn format_and_output_can_be_overridden() {
    let dir = project();
    let out = dir.path().join("json-out");
    apiweave()
        .arg("--config")
        .arg(dir.path().join("apiweave.json"))
        .args(["--format", "json", "--quiet", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert!(out.join("demo/Greeter.json").exists());
}

#[test]
fn unknown_format_fails() {
    let dir = project();
    apiweave()
        .arg("--config")
        .arg(dir.path().join("apiweave.json"))
        .args(["--format", "pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no 'pdf' registered"));
}
