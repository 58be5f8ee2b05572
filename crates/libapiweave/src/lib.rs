//! Apiweave turns per-platform declaration models into one cross-linked set of API reference
//! pages.
//!
//! A run reads one [`SemanticModel`] per platform pass, merges them into a single
//! [`DocumentationModel`] keyed by [`DeclarationId`], applies the registered model transforms,
//! lays the result out as a tree of pages, resolves every link to a concrete location (another
//! page, an anchor on a page, or an external documentation site) and renders each page.
//!
//! All pluggable services are looked up in an [`ExtensionRegistry`] populated from plugins; the
//! [`Pipeline`] drives the stages in order.
//!
//! ```no_run
//! # async fn run() -> libapiweave::Result<()> {
//! use libapiweave::{Config, ExtensionRegistry, Pipeline};
//!
//! let registry = ExtensionRegistry::builtin()?;
//! let config = Config::from_path("apiweave.json".as_ref())?;
//! let report = Pipeline::new(&registry, config)?.run().await?;
//! println!("{} pages written to {}", report.pages, report.output_dir.display());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod content;
pub mod diagnostics;
pub mod doccomment;
/// Error types.
mod error;
pub mod graph;
pub mod identity;
pub mod location;
pub mod merge;
pub mod model;
pub mod pages;
pub mod pipeline;
pub mod plugins;
pub mod registry;
pub mod render;
pub mod semantic;
pub mod transform;
pub mod translator;

pub use crate::{
    config::{Config, ExternalLinkConfig, PassConfig},
    content::{ContentNode, LinkTarget},
    diagnostics::{Diagnostic, Diagnostics},
    error::{ApiweaveError, Result},
    identity::DeclarationId,
    model::{DocNode, DocumentationModel},
    pages::{PageNode, PagePath},
    pipeline::{Pipeline, RenderedPage, RunReport, RunState},
    registry::{ExtensionRegistry, Plugin},
    semantic::{SemanticModel, SemanticModelProvider},
};
