#![allow(clippy::tests_outside_test_module)]

mod utils;

use libapiweave::{Config, Diagnostic, ExternalLinkConfig};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use utils::*;

const ORACLE: &str = "https://docs.oracle.com/javase/8/docs/api/";

const JAVADOC_MODEL: &str = r#"{
    "platform": "jvm",
    "declarations": [{ "name": "javadoc", "kind": "package", "children": [
        { "name": "Test", "kind": "class",
          "doc": "A test class.",
          "supertypes": ["java.io.Serializable", "java.lang.Cloneable"],
          "children": [
            { "name": "test", "kind": "function" },
            { "name": "test2", "kind": "function",
              "parameters": [{ "name": "s", "type": "kotlin.String" }] },
            { "name": "test3", "kind": "function", "type_parameters": ["T"],
              "parameters": [{ "name": "t", "type": "T" }] }
          ] }
    ] }]
}"#;

fn oracle_link(dir: &TempDir) -> ExternalLinkConfig {
    let list = write_file(dir.path(), "package-list", "java.io\njava.lang\njava.util\n");
    ExternalLinkConfig::new(ORACLE).with_package_list(list)
}

#[tokio::test]
async fn javadoc_members_get_anchored_links() {
    let lists = TempDir::new().unwrap();
    let config = Config::new("javadoc").with_external_link(oracle_link(&lists));
    let (out, report) = run(config, vec![model(JAVADOC_MODEL)]).await;
    assert_eq!(report.pages, 3);

    let test = page(&out, "javadoc/Test.html");
    assert!(test.contains("<a href=\"Test.html#test--\">test</a>"));
    assert!(test.contains("<a href=\"Test.html#test2-kotlin.String-\">test2</a>"));
    assert!(test.contains("<a href=\"Test.html#test3-T-\">test3</a>"));
    assert!(test.contains(
        "<a href=\"https://docs.oracle.com/javase/8/docs/api/java/lang/Cloneable.html\">java.lang.Cloneable</a>"
    ));
    assert!(test.contains(
        "<a href=\"https://docs.oracle.com/javase/8/docs/api/java/io/Serializable.html\">java.io.Serializable</a>"
    ));
    assert!(test.contains("<a id=\"test2-kotlin.String-\"></a>"));

    let package = page(&out, "javadoc.html");
    assert!(package.contains("<a href=\"javadoc/Test.html\">Test</a>"));
    let index = page(&out, "index.html");
    assert!(index.contains("<a href=\"javadoc.html\">javadoc</a>"));
}

#[tokio::test]
async fn types_without_an_index_degrade_to_text() {
    let lists = TempDir::new().unwrap();
    let config = Config::new("javadoc").with_external_link(oracle_link(&lists));
    let (out, report) = run(config, vec![model(JAVADOC_MODEL)]).await;

    // kotlin.String has no page and no external index.
    let test = page(&out, "javadoc/Test.html");
    assert!(test.contains("kotlin.String"));
    assert!(!test.contains("\">kotlin.String</a>"));
    let unresolved: Vec<_> = report
        .diagnostics
        .iter()
        .filter_map(|d| match d {
            Diagnostic::UnresolvedReference { target, page } => Some((target.to_string(), page.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(unresolved, vec![("kotlin.String".to_string(), "javadoc/Test")]);
}

#[tokio::test]
async fn offline_runs_skip_remote_indexes() {
    let config = Config::new("javadoc")
        .with_offline(true)
        .with_external_link(ExternalLinkConfig::new(ORACLE));
    let (out, report) = run(config, vec![model(JAVADOC_MODEL)]).await;

    let test = page(&out, "javadoc/Test.html");
    assert!(!test.contains("docs.oracle.com"));
    assert!(report.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::ExternalIndexFetchFailure { url, reason } if url == ORACLE && reason.contains("offline")
    )));
}
