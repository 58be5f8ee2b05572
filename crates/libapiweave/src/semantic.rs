//! Input contract for the semantic model produced by a language front end.
//!
//! The front end runs once per platform pass and hands us a tree of declarations. We read it as
//! JSON:
//!
//! ```json
//! {
//!   "platform": "jvm",
//!   "declarations": [
//!     { "name": "javadoc", "kind": "package", "children": [
//!       { "name": "Test", "kind": "class", "supertypes": ["java.lang.Cloneable"],
//!         "children": [
//!           { "name": "test2", "kind": "function",
//!             "parameters": [{ "name": "s", "type": "kotlin.String" }] }
//!         ] }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Type references are strings: a dotted path with optional generic arguments
//! (`kotlin.collections.List<T>`), where bare names matching an enclosing type parameter denote
//! that parameter.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    error::{ApiweaveError, Result},
    identity::DeclarationId,
    model::{DeclKind, TypeRef},
};

/// One platform pass worth of declarations.
#[derive(Debug, Clone, Deserialize)]
pub struct SemanticModel {
    /// Platform this pass was analysed for.
    pub platform: String,
    /// Top-level declarations, normally packages.
    #[serde(default)]
    pub declarations: Vec<SemanticDeclaration>,
}

/// A declaration as reported by the front end.
#[derive(Debug, Clone, Deserialize)]
pub struct SemanticDeclaration {
    /// Simple name; dotted for packages.
    pub name: String,
    /// Declaration kind.
    pub kind: DeclKind,
    /// Explicit platform annotations. Empty means "the pass platform".
    #[serde(default)]
    pub platforms: Vec<String>,
    /// Modifier keywords.
    #[serde(default)]
    pub modifiers: Vec<String>,
    /// Raw doc comment text.
    #[serde(default)]
    pub doc: Option<String>,
    /// Source file the declaration came from.
    #[serde(default)]
    pub source: Option<PathBuf>,
    /// Generic type parameter names.
    #[serde(default)]
    pub type_parameters: Vec<String>,
    /// Parameters of callables.
    #[serde(default)]
    pub parameters: Vec<SemanticParameter>,
    /// Return type of callables or type of properties.
    #[serde(default)]
    pub return_type: Option<String>,
    /// Direct supertypes.
    #[serde(default)]
    pub supertypes: Vec<String>,
    /// Identities (text form) of members this member overrides.
    #[serde(default)]
    pub overrides: Vec<String>,
    /// Nested declarations.
    #[serde(default)]
    pub children: Vec<Self>,
}

/// A parameter as reported by the front end.
#[derive(Debug, Clone, Deserialize)]
pub struct SemanticParameter {
    /// Parameter name.
    pub name: String,
    /// Parameter type reference.
    #[serde(rename = "type")]
    pub ty: String,
}

impl SemanticModel {
    /// Parse a model from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Keep only declarations from files under one of `roots`. Declarations without a recorded
    /// source file are kept, and so are their children subject to the same rule.
    pub fn retain_sources(&mut self, roots: &[PathBuf]) {
        if roots.is_empty() {
            return;
        }
        retain_in(&mut self.declarations, roots);
    }
}

/// Recursive worker for [`SemanticModel::retain_sources`].
fn retain_in(declarations: &mut Vec<SemanticDeclaration>, roots: &[PathBuf]) {
    declarations.retain(|decl| {
        decl.source
            .as_deref()
            .is_none_or(|source| roots.iter().any(|root| source.starts_with(root)))
    });
    for decl in declarations {
        retain_in(&mut decl.children, roots);
    }
}

/// Supplies the semantic model of one platform pass.
pub trait SemanticModelProvider: Send + Sync {
    /// Platform name of the pass.
    fn platform(&self) -> &str;

    /// Produce the model. Called once per run.
    fn load(&self) -> Result<SemanticModel>;
}

/// Reads a pass's model from a JSON file written by the front end.
#[derive(Debug, Clone)]
pub struct JsonModelProvider {
    /// Platform name of the pass.
    platform: String,
    /// Model JSON file.
    path: PathBuf,
    /// Roots a declaration's source must be under to be kept. Empty keeps all.
    source_roots: Vec<PathBuf>,
}

impl JsonModelProvider {
    /// Provider for `platform` reading from `path`.
    pub fn new(platform: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            platform: platform.into(),
            path: path.into(),
            source_roots: Vec::new(),
        }
    }

    /// Restrict the model to declarations from these source roots.
    pub fn with_source_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.source_roots = roots;
        self
    }

    /// Path of the model file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SemanticModelProvider for JsonModelProvider {
    fn platform(&self) -> &str {
        &self.platform
    }

    fn load(&self) -> Result<SemanticModel> {
        let json = fs::read_to_string(&self.path).map_err(|source| ApiweaveError::FileRead {
            path: self.path.clone(),
            source,
        })?;
        let mut model = SemanticModel::from_json(&json)?;
        // The configured pass name wins over whatever the front end wrote.
        model.platform.clone_from(&self.platform);
        model.retain_sources(&self.source_roots);
        Ok(model)
    }
}

/// An in-memory model, for embedding and tests.
#[derive(Debug, Clone)]
pub struct StaticModelProvider(pub SemanticModel);

impl SemanticModelProvider for StaticModelProvider {
    fn platform(&self) -> &str {
        &self.0.platform
    }

    fn load(&self) -> Result<SemanticModel> {
        Ok(self.0.clone())
    }
}

/// Parse a type reference string. Bare names listed in `type_params` are generic parameters.
pub fn parse_type(text: &str, type_params: &[String]) -> TypeRef {
    let text = text.trim().trim_end_matches('?');
    let (head, args) = match text.find('<') {
        Some(open) if text.ends_with('>') => (&text[..open], &text[open + 1..text.len() - 1]),
        _ => (text, ""),
    };
    let head = head.trim();
    if args.is_empty() && type_params.iter().any(|p| p == head) {
        return TypeRef::parameter(head);
    }
    let arguments = split_top_level(args)
        .into_iter()
        .map(|arg| parse_type(arg, type_params))
        .collect();
    TypeRef::Named {
        id: DeclarationId::new(head),
        arguments,
    }
}

/// Split generic arguments on commas that are not nested inside angle brackets.
fn split_top_level(args: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, c) in args.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(args[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    let last = args[start..].trim();
    if !last.is_empty() {
        out.push(last);
    }
    out
}
