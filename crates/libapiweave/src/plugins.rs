//! Bundled plugins.

use std::sync::Arc;

use crate::{
    doccomment::MarkdownDocParser,
    error::Result,
    location::{DefaultLocationProviderFactory, fetch::HttpFetcher},
    registry::{
        DOC_COMMENT_PARSER, ExtensionRegistry, INDEX_FETCHER, LOCATION_PROVIDER_FACTORY,
        MODEL_TRANSFORMS, OUTPUT_FORMATS, Plugin,
    },
    render::{HtmlRenderer, JsonRenderer, StandardFormat},
    transform::{InheritDocs, SortMembers},
    translator::DefaultTranslator,
};

/// The core services every run needs: doc comment parsing, link resolution, index fetching and
/// the standard model transforms.
#[derive(Debug, Default, Clone, Copy)]
pub struct CorePlugin;

impl Plugin for CorePlugin {
    fn name(&self) -> &str {
        "core"
    }

    fn install(&self, registry: &mut ExtensionRegistry) -> Result<()> {
        registry.register(&DOC_COMMENT_PARSER, "markdown", Arc::new(MarkdownDocParser))?;
        registry.register(
            &LOCATION_PROVIDER_FACTORY,
            "default",
            Arc::new(DefaultLocationProviderFactory),
        )?;
        registry.register(&INDEX_FETCHER, "http", Arc::new(HttpFetcher::new()?))?;
        // Inherit before sorting so inherited members sort with the rest.
        registry.register(&MODEL_TRANSFORMS, "inherit-docs", Arc::new(InheritDocs))?;
        registry.register(&MODEL_TRANSFORMS, "sort-members", Arc::new(SortMembers))?;
        Ok(())
    }
}

/// The `html` output format.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlPlugin;

impl Plugin for HtmlPlugin {
    fn name(&self) -> &str {
        "html"
    }

    fn install(&self, registry: &mut ExtensionRegistry) -> Result<()> {
        registry.register(
            &OUTPUT_FORMATS,
            "html",
            Arc::new(StandardFormat::new(
                "html",
                "html",
                Arc::new(DefaultTranslator),
                Arc::new(HtmlRenderer),
            )),
        )
    }
}

/// The `json` output format.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPlugin;

impl Plugin for JsonPlugin {
    fn name(&self) -> &str {
        "json"
    }

    fn install(&self, registry: &mut ExtensionRegistry) -> Result<()> {
        registry.register(
            &OUTPUT_FORMATS,
            "json",
            Arc::new(StandardFormat::new(
                "json",
                "json",
                Arc::new(DefaultTranslator),
                Arc::new(JsonRenderer),
            )),
        )
    }
}

/// The static plugin list installed by [`ExtensionRegistry::builtin`].
pub fn builtin_plugins() -> Vec<Box<dyn Plugin>> {
    vec![Box::new(CorePlugin), Box::new(HtmlPlugin), Box::new(JsonPlugin)]
}
