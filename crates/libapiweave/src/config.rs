//! Run configuration.
//!
//! A configuration file is JSON:
//!
//! ```json
//! {
//!   "module_name": "demo",
//!   "format": "html",
//!   "output_dir": "build/docs",
//!   "implied_platforms": ["jvm"],
//!   "external_links": [{ "url": "https://docs.oracle.com/javase/8/docs/api/" }],
//!   "passes": [
//!     { "platform": "jvm", "model": "build/jvm-model.json", "source_roots": ["src/jvmMain"] }
//!   ]
//! }
//! ```
//!
//! Relative paths in a file are resolved against the directory containing it.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiweaveError, Result},
    semantic::{JsonModelProvider, SemanticModelProvider},
};

/// Format used when none is configured.
pub const DEFAULT_FORMAT: &str = "html";

/// Retries per external index when none are configured.
pub const DEFAULT_RETRIES: u32 = 2;

/// Per-request timeout for external indexes, in milliseconds, when none is configured.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Serde default for [`Config::format`].
fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

/// Serde default for [`Config::output_dir`].
fn default_output_dir() -> PathBuf {
    PathBuf::from("apidocs")
}

/// Serde default for [`ExternalLinkConfig::retries`].
fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

/// Serde default for [`ExternalLinkConfig::timeout_ms`].
fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Configuration of a whole documentation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Display name of the documented module.
    pub module_name: String,
    /// Name of the output format.
    #[serde(default = "default_format")]
    pub format: String,
    /// Directory rendered pages are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Platform passes, one semantic model each.
    #[serde(default)]
    pub passes: Vec<PassConfig>,
    /// External documentation linked from every pass.
    #[serde(default)]
    pub external_links: Vec<ExternalLinkConfig>,
    /// Platforms assumed for declarations without explicit platform annotations. Not labelled
    /// in output.
    #[serde(default)]
    pub implied_platforms: Vec<String>,
    /// Skip fetching remote external indexes.
    #[serde(default)]
    pub offline: bool,
}

/// One platform pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassConfig {
    /// Platform name, used as the source set id.
    pub platform: String,
    /// Semantic model JSON produced for this platform.
    pub model: PathBuf,
    /// Only declarations from these roots are documented. Empty means all.
    #[serde(default)]
    pub source_roots: Vec<PathBuf>,
    /// External documentation linked from this pass.
    #[serde(default)]
    pub external_links: Vec<ExternalLinkConfig>,
}

/// An external documentation site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLinkConfig {
    /// Base URL of the site. `file://` URLs and plain paths are read from disk.
    pub url: String,
    /// Explicit index location, for sites that do not publish one under the base URL.
    #[serde(default)]
    pub package_list: Option<String>,
    /// Extra attempts after a failed fetch.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Time allowed for each fetch attempt, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ExternalLinkConfig {
    /// A link to the site at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            package_list: None,
            retries: DEFAULT_RETRIES,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Read the index from `url` instead of the base URL.
    pub fn with_package_list(mut self, url: impl Into<String>) -> Self {
        self.package_list = Some(url.into());
        self
    }

    /// Set the retry count.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the time allowed for each fetch attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Time allowed for each fetch attempt.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The base URL without trailing slashes, used to deduplicate links.
    fn key(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

impl PassConfig {
    /// A pass for `platform` reading the model at `model`.
    pub fn new(platform: impl Into<String>, model: impl Into<PathBuf>) -> Self {
        Self {
            platform: platform.into(),
            model: model.into(),
            source_roots: Vec::new(),
            external_links: Vec::new(),
        }
    }

    /// Restrict the pass to these source roots.
    pub fn with_source_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.source_roots = roots;
        self
    }

    /// Link external documentation from this pass.
    pub fn with_external_link(mut self, link: ExternalLinkConfig) -> Self {
        self.external_links.push(link);
        self
    }

    /// The semantic model provider for this pass.
    pub fn provider(&self) -> JsonModelProvider {
        JsonModelProvider::new(&self.platform, &self.model).with_source_roots(self.source_roots.clone())
    }
}

impl Config {
    /// A configuration with defaults and no passes.
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            format: default_format(),
            output_dir: default_output_dir(),
            passes: Vec::new(),
            external_links: Vec::new(),
            implied_platforms: Vec::new(),
            offline: false,
        }
    }

    /// Parse a configuration from JSON text. Paths are kept as written.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, resolving relative paths against its directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|source| ApiweaveError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json(&json)?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Resolve relative paths against `base`.
    fn rebase(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.output_dir);
        for pass in &mut self.passes {
            resolve(&mut pass.model);
            pass.source_roots.iter_mut().for_each(resolve);
        }
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.module_name.trim().is_empty() {
            return Err(ApiweaveError::config("module_name must not be empty"));
        }
        if self.format.trim().is_empty() {
            return Err(ApiweaveError::config("format must not be empty"));
        }
        let mut seen = HashSet::new();
        for pass in &self.passes {
            if !seen.insert(pass.platform.as_str()) {
                return Err(ApiweaveError::config(format!(
                    "platform '{}' is configured by more than one pass",
                    pass.platform
                )));
            }
        }
        Ok(())
    }

    /// Set the output format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Add a platform pass.
    pub fn with_pass(mut self, pass: PassConfig) -> Self {
        self.passes.push(pass);
        self
    }

    /// Link external documentation from every pass.
    pub fn with_external_link(mut self, link: ExternalLinkConfig) -> Self {
        self.external_links.push(link);
        self
    }

    /// Set the implied platforms.
    pub fn with_implied_platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.implied_platforms = platforms.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable offline mode.
    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Global and per-pass external links, first occurrence of each base URL wins.
    pub fn all_external_links(&self) -> Vec<ExternalLinkConfig> {
        let mut seen = HashSet::new();
        self.external_links
            .iter()
            .chain(self.passes.iter().flat_map(|p| &p.external_links))
            .filter(|link| seen.insert(link.key().to_string()))
            .cloned()
            .collect()
    }

    /// One semantic model provider per pass.
    pub fn providers(&self) -> Vec<Box<dyn SemanticModelProvider>> {
        self.passes
            .iter()
            .map(|p| Box::new(p.provider()) as Box<dyn SemanticModelProvider>)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn defaults_apply() {
        let config = Config::from_json(r#"{ "module_name": "demo" }"#).unwrap();
        assert_eq!(config, Config::new("demo"));
        assert_eq!(config.format, "html");
        assert!(!config.offline);
    }

    #[test]
    fn link_timeouts_default_and_override() {
        let config = Config::from_json(
            r#"{ "module_name": "demo", "external_links": [
                { "url": "https://a.example" },
                { "url": "https://b.example", "timeout_ms": 500 }
            ] }"#,
        )
        .unwrap();
        let timeouts: Vec<_> = config.external_links.iter().map(ExternalLinkConfig::timeout).collect();
        assert_eq!(
            timeouts,
            vec![Duration::from_millis(DEFAULT_TIMEOUT_MS), Duration::from_millis(500)]
        );
    }

    #[test]
    fn external_links_are_merged_and_deduplicated() {
        let config = Config::new("demo")
            .with_external_link(ExternalLinkConfig::new("https://a.example/"))
            .with_pass(
                PassConfig::new("jvm", "jvm.json")
                    .with_external_link(ExternalLinkConfig::new("https://a.example"))
                    .with_external_link(ExternalLinkConfig::new("https://b.example").with_retries(0)),
            );
        let urls: Vec<_> = config
            .all_external_links()
            .into_iter()
            .map(|l| (l.url, l.retries))
            .collect();
        assert_eq!(
            urls,
            vec![
                ("https://a.example/".to_string(), DEFAULT_RETRIES),
                ("https://b.example".to_string(), 0),
            ]
        );
    }

    #[test]
    fn duplicate_platforms_are_rejected() {
        let err = Config::from_json(
            r#"{ "module_name": "demo", "passes": [
                { "platform": "jvm", "model": "a.json" },
                { "platform": "jvm", "model": "b.json" }
            ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ApiweaveError::Configuration(_)));
    }

    #[test]
    fn file_paths_are_relative_to_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("apiweave.json");
        fs::write(
            &path,
            r#"{
                "module_name": "demo",
                "format": "json",
                "output_dir": "out",
                "offline": true,
                "passes": [{ "platform": "jvm", "model": "models/jvm.json", "source_roots": ["src"] }]
            }"#,
        )
        .unwrap();
        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.format, "json");
        assert!(config.offline);
        assert_eq!(config.output_dir, dir.path().join("out"));
        assert_eq!(config.passes[0].model, dir.path().join("models/jvm.json"));
        assert_eq!(config.passes[0].source_roots, vec![dir.path().join("src")]);
        assert_eq!(config.providers().len(), 1);
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let err = Config::from_path(Path::new("/no/such/apiweave.json")).unwrap_err();
        assert!(err.to_string().contains("/no/such/apiweave.json"));
    }
}
