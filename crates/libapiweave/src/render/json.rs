//! Machine-readable page output.

use serde::Serialize;

use crate::{
    content::ContentNode,
    error::Result,
    identity::DeclarationId,
    pages::{PageKind, PageNode, PagePath},
    render::{Renderer, ensure_resolved},
};

/// Renders each page as a pretty-printed JSON document.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

/// Serialized shape of one page.
#[derive(Serialize)]
struct PageDocument<'a> {
    /// Page path without extension.
    path: String,
    /// Page kind.
    kind: PageKind,
    /// Page title.
    title: &'a str,
    /// Declarations documented at page level.
    documents: &'a [DeclarationId],
    /// Declarations embedded under anchors.
    embeds: &'a [DeclarationId],
    /// Names of child pages.
    children: Vec<&'a str>,
    /// Resolved content.
    content: &'a [ContentNode],
}

impl Renderer for JsonRenderer {
    fn render_page(&self, page: &PageNode, path: &PagePath) -> Result<String> {
        ensure_resolved(page, path)?;
        let document = PageDocument {
            path: path.to_string(),
            kind: page.kind,
            title: &page.title,
            documents: &page.documented,
            embeds: &page.embedded,
            children: page.children.iter().map(|c| c.name.as_str()).collect(),
            content: &page.content,
        };
        let mut json = serde_json::to_string_pretty(&document)?;
        json.push('\n');
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    #[test]
    fn renders_page_metadata_and_content() {
        let mut page = PageNode::new("Test", PageKind::Classlike, "Class Test");
        page.documented.push(DeclarationId::new("javadoc.Test"));
        page.embedded
            .push(DeclarationId::callable("javadoc.Test.test2", ["kotlin.String"]));
        page.content.push(ContentNode::Resolved {
            href: "Test.html#test2-kotlin.String-".into(),
            children: vec![ContentNode::text("test2")],
        });
        let text = JsonRenderer
            .render_page(&page, &PagePath::new(vec!["javadoc".into()], "Test"))
            .unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({
                "path": "javadoc/Test",
                "kind": "classlike",
                "title": "Class Test",
                "documents": ["javadoc.Test"],
                "embeds": ["javadoc.Test.test2(kotlin.String)"],
                "children": [],
                "content": [{
                    "type": "resolved",
                    "href": "Test.html#test2-kotlin.String-",
                    "children": [{ "type": "text", "text": "test2" }]
                }]
            })
        );
    }

    #[test]
    fn refuses_unresolved_pages() {
        let mut page = PageNode::new("Test", PageKind::Classlike, "Class Test");
        page.content
            .push(ContentNode::link(DeclarationId::new("a.B"), "B"));
        assert!(JsonRenderer.render_page(&page, &PagePath::root()).is_err());
    }
}
