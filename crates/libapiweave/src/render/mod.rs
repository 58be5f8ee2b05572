//! Output formats and their renderers.

pub mod html;
pub mod json;

use std::{fmt, sync::Arc};

use crate::{
    error::{ApiweaveError, Result},
    pages::{PageNode, PagePath},
    translator::PageTranslator,
};

pub use html::HtmlRenderer;
pub use json::JsonRenderer;

/// Serializes one fully resolved page.
pub trait Renderer: Send + Sync {
    /// Render `page`, located at `path`, to the text of its output file. Child pages are rendered
    /// separately.
    fn render_page(&self, page: &PageNode, path: &PagePath) -> Result<String>;
}

/// A named output format: the translator that lays out its pages and the renderer that writes
/// them.
pub trait OutputFormat: Send + Sync {
    /// Name the format is selected by.
    fn name(&self) -> &str;

    /// File extension of rendered pages, without the dot.
    fn extension(&self) -> &str;

    /// Page tree builder for the format.
    fn translator(&self) -> Arc<dyn PageTranslator>;

    /// Page serializer for the format.
    fn renderer(&self) -> Arc<dyn Renderer>;
}

impl fmt::Debug for dyn OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputFormat({})", self.name())
    }
}

/// An output format assembled from parts.
pub struct StandardFormat {
    /// Format name.
    name: String,
    /// Page file extension.
    extension: String,
    /// Page tree builder.
    translator: Arc<dyn PageTranslator>,
    /// Page serializer.
    renderer: Arc<dyn Renderer>,
}

impl StandardFormat {
    /// Combine a translator and a renderer under `name`.
    pub fn new(
        name: impl Into<String>,
        extension: impl Into<String>,
        translator: Arc<dyn PageTranslator>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            translator,
            renderer,
        }
    }
}

impl fmt::Debug for StandardFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardFormat")
            .field("name", &self.name)
            .field("extension", &self.extension)
            .finish()
    }
}

impl OutputFormat for StandardFormat {
    fn name(&self) -> &str {
        &self.name
    }

    fn extension(&self) -> &str {
        &self.extension
    }

    fn translator(&self) -> Arc<dyn PageTranslator> {
        Arc::clone(&self.translator)
    }

    fn renderer(&self) -> Arc<dyn Renderer> {
        Arc::clone(&self.renderer)
    }
}

/// Fail if `page` still holds unresolved links; renderers only accept resolved pages.
fn ensure_resolved(page: &PageNode, path: &PagePath) -> Result<()> {
    if page.content.iter().any(|c| c.has_unresolved_links()) {
        return Err(ApiweaveError::Render {
            page: path.to_string(),
            reason: "page contains unresolved links".to_string(),
        });
    }
    Ok(())
}
