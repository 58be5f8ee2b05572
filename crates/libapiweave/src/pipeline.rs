//! The run driver.
//!
//! A run moves through its stages strictly in order:
//!
//! ```text
//! Uninitialized -> ModelBuilt -> ModelTransformed -> PageTreeBuilt -> LocationsResolved -> Rendered
//! ```
//!
//! Each stage method checks the current state and fails with [`ApiweaveError::StageOrder`] when
//! called out of turn. [`Pipeline::run`] drives the whole sequence, fetching external link
//! indexes concurrently with the model and page stages.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    builder::ModelBuilder,
    config::Config,
    content::LinkTarget,
    diagnostics::{Diagnostic, Diagnostics},
    error::{ApiweaveError, Result},
    location::{ExternalLinkIndex, fetch::fetch_all},
    model::DocumentationModel,
    pages::PageNode,
    registry::{
        DOC_COMMENT_PARSER, ExtensionRegistry, INDEX_FETCHER, LOCATION_PROVIDER_FACTORY,
        MODEL_TRANSFORMS, OUTPUT_FORMATS,
    },
    render::OutputFormat,
    semantic::{SemanticModel, SemanticModelProvider},
};

/// Progress of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Nothing has run yet.
    Uninitialized,
    /// The merged documentation model exists.
    ModelBuilt,
    /// Every registered transform has run.
    ModelTransformed,
    /// The page tree exists; links are unresolved.
    PageTreeBuilt,
    /// Every link has been resolved or degraded to text.
    LocationsResolved,
    /// Every page has been rendered.
    Rendered,
}

/// One rendered output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Path relative to the output directory.
    pub path: String,
    /// File contents.
    pub content: String,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Directory the pages were written to.
    pub output_dir: PathBuf,
    /// Number of pages written.
    pub pages: usize,
    /// Every recoverable problem reported during the run.
    pub diagnostics: Vec<Diagnostic>,
}

/// Drives a single documentation run.
#[derive(Debug)]
pub struct Pipeline<'r> {
    /// Read-only extension registry.
    registry: &'r ExtensionRegistry,
    /// Run configuration.
    config: Config,
    /// Selected output format.
    format: Arc<dyn OutputFormat>,
    /// Diagnostics of this run, shared with the fetch task.
    diagnostics: Arc<Diagnostics>,
    /// Current stage.
    state: RunState,
    /// Documentation model, once built.
    model: Option<DocumentationModel>,
    /// Page tree, once built.
    pages: Option<PageNode>,
    /// Rendered pages, once rendered.
    rendered: Vec<RenderedPage>,
}

impl<'r> Pipeline<'r> {
    /// Prepare a run. Fails if the configuration is invalid or names an unknown format.
    pub fn new(registry: &'r ExtensionRegistry, config: Config) -> Result<Self> {
        config.validate()?;
        let format = registry.query_named(&OUTPUT_FORMATS, &config.format)?;
        Ok(Self {
            registry,
            config,
            format,
            diagnostics: Arc::new(Diagnostics::new()),
            state: RunState::Uninitialized,
            model: None,
            pages: None,
            rendered: Vec::new(),
        })
    }

    /// Current stage.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// The run configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Diagnostics reported so far.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// The documentation model, after [`Self::build_model`].
    pub fn model(&self) -> Option<&DocumentationModel> {
        self.model.as_ref()
    }

    /// The page tree, after [`Self::build_pages`].
    pub fn pages(&self) -> Option<&PageNode> {
        self.pages.as_ref()
    }

    /// Rendered pages, after [`Self::render`].
    pub fn rendered(&self) -> &[RenderedPage] {
        &self.rendered
    }

    /// Fail unless the run is in `expected`.
    fn require(&self, stage: &'static str, expected: RunState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ApiweaveError::StageOrder {
                stage,
                expected,
                found: self.state,
            })
        }
    }

    /// Load every pass's semantic model.
    pub fn load_models(providers: &[Box<dyn SemanticModelProvider>]) -> Result<Vec<SemanticModel>> {
        providers
            .par_iter()
            .map(|provider| {
                debug!(platform = provider.platform(), "loading semantic model");
                provider.load()
            })
            .collect()
    }

    /// Stage 1: build the merged documentation model.
    pub fn build_model(&mut self, models: &[SemanticModel]) -> Result<()> {
        self.require("build_model", RunState::Uninitialized)?;
        let parser = self.registry.query_single(&DOC_COMMENT_PARSER)?;
        let model = ModelBuilder::new(parser, &self.diagnostics)
            .with_implied_platforms(self.config.implied_platforms.iter().cloned())
            .build(&self.config.module_name, models)?;
        debug!(packages = model.packages.len(), "model built");
        self.model = Some(model);
        self.state = RunState::ModelBuilt;
        Ok(())
    }

    /// Stage 2: run every registered model transform, in registration order.
    pub fn transform(&mut self) -> Result<()> {
        self.require("transform", RunState::ModelBuilt)?;
        let model = self.model.as_mut().ok_or_else(|| missing("model"))?;
        for transform in self.registry.query(&MODEL_TRANSFORMS) {
            debug!(transform = transform.name(), "running model transform");
            transform.transform(model)?;
        }
        self.state = RunState::ModelTransformed;
        Ok(())
    }

    /// Stage 3: lay out pages with the format's translator.
    pub fn build_pages(&mut self) -> Result<()> {
        self.require("build_pages", RunState::ModelTransformed)?;
        let model = self.model.as_ref().ok_or_else(|| missing("model"))?;
        let pages = self.format.translator().translate(model)?;
        debug!(pages = pages.count(), format = self.format.name(), "page tree built");
        self.pages = Some(pages);
        self.state = RunState::PageTreeBuilt;
        Ok(())
    }

    /// Stage 4: resolve every link against the page tree and `external` indexes.
    ///
    /// Links to declarations nobody documents are reported and degrade to plain text.
    pub fn resolve_links(&mut self, external: Vec<ExternalLinkIndex>) -> Result<()> {
        self.require("resolve_links", RunState::PageTreeBuilt)?;
        let factory = self.registry.query_single(&LOCATION_PROVIDER_FACTORY)?;
        let pages = self.pages.as_mut().ok_or_else(|| missing("page tree"))?;
        let provider = factory.create(pages, external, self.format.extension());
        let diagnostics = &self.diagnostics;
        pages.visit_pages_mut(&mut |path, page| {
            let mut resolve = |target: &LinkTarget| {
                let href = provider.resolve_target(target, path);
                if let (None, LinkTarget::Declaration(id) | LinkTarget::Reference { name: id, .. }) =
                    (&href, target)
                {
                    diagnostics.report(Diagnostic::UnresolvedReference {
                        target: id.clone(),
                        page: path.to_string(),
                    });
                }
                href
            };
            for node in &mut page.content {
                node.resolve_links(&mut resolve);
            }
        });
        self.state = RunState::LocationsResolved;
        Ok(())
    }

    /// Stage 5: render every page, in parallel.
    pub fn render(&mut self) -> Result<()> {
        self.require("render", RunState::LocationsResolved)?;
        let pages = self.pages.as_ref().ok_or_else(|| missing("page tree"))?;
        let renderer = self.format.renderer();
        let extension = self.format.extension();
        let listed = pages.pages();
        let mut seen = HashSet::new();
        if let Some((path, page)) = listed
            .iter()
            .find(|(path, _)| !seen.insert(path.with_extension(extension)))
        {
            return Err(ApiweaveError::Render {
                page: path.to_string(),
                reason: format!("'{}' would overwrite another page's output file", page.title),
            });
        }
        self.rendered = listed
            .par_iter()
            .map(|(path, page)| -> Result<RenderedPage> {
                Ok(RenderedPage {
                    path: path.with_extension(extension),
                    content: renderer.render_page(page, path)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.state = RunState::Rendered;
        Ok(())
    }

    /// Write rendered pages under `dir`, creating directories as needed.
    pub fn write_output(&self, dir: &Path) -> Result<usize> {
        self.require("write_output", RunState::Rendered)?;
        for page in &self.rendered {
            let file = dir.join(&page.path);
            if let Some(parent) = file.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&file, &page.content)?;
        }
        Ok(self.rendered.len())
    }

    /// Stages 1 to 3, starting from the raw models.
    fn prepare(&mut self, providers: &[Box<dyn SemanticModelProvider>]) -> Result<()> {
        let models = Self::load_models(providers)?;
        self.build_model(&models)?;
        self.transform()?;
        self.build_pages()
    }

    /// Run every stage with the configured passes and write the output.
    pub async fn run(self) -> Result<RunReport> {
        let providers = self.config.providers();
        self.run_with(&providers).await
    }

    /// Run every stage with the given model providers and write the output.
    pub async fn run_with(mut self, providers: &[Box<dyn SemanticModelProvider>]) -> Result<RunReport> {
        let fetcher = self.registry.query_single(&INDEX_FETCHER)?;
        let links = self.config.all_external_links();
        let offline = self.config.offline;
        let diagnostics = Arc::clone(&self.diagnostics);
        let fetch = tokio::spawn(async move { fetch_all(fetcher, &links, offline, &diagnostics).await });

        if let Err(e) = self.prepare(providers) {
            fetch.abort();
            return Err(e);
        }

        let external = fetch.await.map_err(|e| ApiweaveError::Fetch {
            url: "external link indexes".to_string(),
            reason: e.to_string(),
        })?;
        self.resolve_links(external)?;
        self.render()?;

        let output_dir = self.config.output_dir.clone();
        let pages = self.write_output(&output_dir)?;
        info!(pages, dir = %output_dir.display(), "documentation written");
        Ok(RunReport {
            output_dir,
            pages,
            diagnostics: self.diagnostics.entries(),
        })
    }
}

/// Internal error for a stage whose input is missing despite the state saying otherwise.
fn missing(what: &str) -> ApiweaveError {
    ApiweaveError::config(format!("{what} is missing for the current stage"))
}
