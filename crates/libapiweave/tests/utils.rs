// Dead code detection breaks here, because the integration test crates all use a disjoint set of
// the pub items.
#![allow(dead_code)]

use std::{fs, path::Path};

use libapiweave::{
    Config, ExtensionRegistry, Pipeline, RunReport, SemanticModel, SemanticModelProvider,
    semantic::StaticModelProvider,
};
use tempfile::TempDir;

/// Parse a semantic model, panicking on bad fixtures.
pub fn model(json: &str) -> SemanticModel {
    SemanticModel::from_json(json).unwrap()
}

/// Boxed static providers for a set of models.
pub fn providers(models: Vec<SemanticModel>) -> Vec<Box<dyn SemanticModelProvider>> {
    models
        .into_iter()
        .map(|m| Box::new(StaticModelProvider(m)) as Box<dyn SemanticModelProvider>)
        .collect()
}

/// Run a full pipeline over `models`, writing into a fresh temporary directory.
pub async fn run(config: Config, models: Vec<SemanticModel>) -> (TempDir, RunReport) {
    let out = TempDir::new().unwrap();
    let registry = ExtensionRegistry::builtin().unwrap();
    let config = config.with_output_dir(out.path().join("docs"));
    let report = Pipeline::new(&registry, config)
        .unwrap()
        .run_with(&providers(models))
        .await
        .unwrap();
    (out, report)
}

/// Read a rendered page relative to the output directory of [`run`].
pub fn page(out: &TempDir, path: &str) -> String {
    fs::read_to_string(out.path().join("docs").join(path))
        .unwrap_or_else(|e| panic!("missing page {path}: {e}"))
}

/// Write `text` to `name` inside `dir` and return its path as a string.
pub fn write_file(dir: &Path, name: &str, text: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path.to_string_lossy().into_owned()
}
