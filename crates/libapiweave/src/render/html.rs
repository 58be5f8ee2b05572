//! HTML rendering.

use crate::{
    content::ContentNode,
    error::{ApiweaveError, Result},
    pages::{PageNode, PagePath},
    render::{Renderer, ensure_resolved},
};

/// Renders pages as standalone HTML documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    /// HTML for a single resolved content node.
    pub fn html_for_content(&self, node: &ContentNode) -> Result<String> {
        let mut out = String::new();
        write_node(&mut out, node, "<fragment>")?;
        Ok(out)
    }
}

impl Renderer for HtmlRenderer {
    fn render_page(&self, page: &PageNode, path: &PagePath) -> Result<String> {
        ensure_resolved(page, path)?;
        let page_name = path.to_string();
        let mut body = String::new();
        for node in &page.content {
            write_node(&mut body, node, &page_name)?;
        }
        Ok(format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
            escape(&page.title)
        ))
    }
}

/// Append the HTML for `node` to `out`.
fn write_node(out: &mut String, node: &ContentNode, page: &str) -> Result<()> {
    match node {
        ContentNode::Text { text } => out.push_str(&escape(text)),
        ContentNode::Code { code } => {
            out.push_str(&format!("<code>{}</code>", escape(code)));
        }
        ContentNode::Anchor { name } => {
            out.push_str(&format!("<a id=\"{}\"></a>", escape(name)));
        }
        ContentNode::CodeBlock { language, code } => {
            match language {
                Some(lang) => {
                    out.push_str(&format!("<pre><code class=\"language-{}\">", escape(lang)));
                }
                None => out.push_str("<pre><code>"),
            }
            out.push_str(&escape(code));
            out.push_str("</code></pre>\n");
        }
        ContentNode::Signature { children } => {
            out.push_str("<div class=\"signature\"><code>");
            write_all(out, children, page)?;
            out.push_str("</code></div>\n");
        }
        ContentNode::Link { target, .. } => {
            return Err(ApiweaveError::Render {
                page: page.to_string(),
                reason: format!("unresolved link to {target:?}"),
            });
        }
        ContentNode::Resolved { href, children } => {
            out.push_str(&format!("<a href=\"{}\">", escape(href)));
            write_all(out, children, page)?;
            out.push_str("</a>");
        }
        ContentNode::Table { header, rows } => {
            out.push_str("<table>\n");
            if !header.is_empty() {
                out.push_str("<thead><tr>");
                for cell in header {
                    out.push_str("<th>");
                    write_node(out, cell, page)?;
                    out.push_str("</th>");
                }
                out.push_str("</tr></thead>\n");
            }
            out.push_str("<tbody>\n");
            for row in rows {
                out.push_str("<tr>");
                for cell in row {
                    out.push_str("<td>");
                    write_node(out, cell, page)?;
                    out.push_str("</td>");
                }
                out.push_str("</tr>\n");
            }
            out.push_str("</tbody>\n</table>\n");
        }
        ContentNode::List { ordered, items } => {
            let tag = if *ordered { "ol" } else { "ul" };
            out.push_str(&format!("<{tag}>\n"));
            for item in items {
                out.push_str("<li>");
                write_node(out, item, page)?;
                out.push_str("</li>\n");
            }
            out.push_str(&format!("</{tag}>\n"));
        }
        ContentNode::Header { level, children } => {
            let level = (*level).clamp(1, 6);
            out.push_str(&format!("<h{level}>"));
            write_all(out, children, page)?;
            out.push_str(&format!("</h{level}>\n"));
        }
        ContentNode::Paragraph { children } => {
            out.push_str("<p>");
            write_all(out, children, page)?;
            out.push_str("</p>\n");
        }
        ContentNode::Platforms {
            platforms,
            children,
        } => {
            out.push_str("<div class=\"platform-specific\">");
            for platform in platforms {
                out.push_str(&format!("<span class=\"platform\">{}</span>", escape(platform)));
            }
            write_all(out, children, page)?;
            out.push_str("</div>\n");
        }
        ContentNode::Group { children } => write_all(out, children, page)?,
        ContentNode::Break => out.push_str("<br>\n"),
    }
    Ok(())
}

/// Append the HTML for each node in order.
fn write_all(out: &mut String, nodes: &[ContentNode], page: &str) -> Result<()> {
    for node in nodes {
        write_node(out, node, page)?;
    }
    Ok(())
}

/// Escape text for element content and quoted attribute values.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
