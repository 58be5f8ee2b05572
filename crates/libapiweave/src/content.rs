//! Format-agnostic content trees shared by documentation and pages.

use std::mem;

use serde::Serialize;

use crate::identity::DeclarationId;

/// Target of a link that has not been resolved yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LinkTarget {
    /// A declaration, local or external, resolved through the location provider.
    Declaration(DeclarationId),
    /// An absolute URL written directly in documentation.
    Url(String),
    /// A declaration named in documentation, looked up from the scope of the documented
    /// declaration outwards.
    Reference {
        /// The name as written, `#` separators already turned into dots.
        name: DeclarationId,
        /// The documented declaration.
        scope: DeclarationId,
    },
}

/// A structured fragment of documentation or page content.
///
/// `Link` is the unresolved placeholder produced while building documentation and pages. The
/// link resolution pass rewrites every `Link` into either `Resolved` or, when the target cannot
/// be located, into a `Group` holding the link's children as plain content. Renderers never see a
/// `Link`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentNode {
    /// A run of plain text.
    Text {
        /// The text.
        text: String,
    },
    /// An inline code span.
    Code {
        /// The code.
        code: String,
    },
    /// An in-page link target.
    Anchor {
        /// Anchor name, unique within the page.
        name: String,
    },
    /// A fenced block of code.
    CodeBlock {
        /// Optional language tag.
        language: Option<String>,
        /// The code.
        code: String,
    },
    /// A declaration signature rendered as code.
    Signature {
        /// Signature pieces: text, links.
        children: Vec<Self>,
    },
    /// An unresolved link.
    Link {
        /// Link target.
        target: LinkTarget,
        /// Link label.
        children: Vec<Self>,
    },
    /// A link whose target has been resolved to a concrete href.
    Resolved {
        /// Concrete href, relative for internal targets.
        href: String,
        /// Link label.
        children: Vec<Self>,
    },
    /// A table of cells.
    Table {
        /// Header cells, may be empty.
        header: Vec<Self>,
        /// Body rows.
        rows: Vec<Vec<Self>>,
    },
    /// An ordered or unordered list.
    List {
        /// Whether items are numbered.
        ordered: bool,
        /// List items.
        items: Vec<Self>,
    },
    /// A section header.
    Header {
        /// Header level, 1 to 6.
        level: u8,
        /// Header label.
        children: Vec<Self>,
    },
    /// A paragraph of inline content.
    Paragraph {
        /// Paragraph content.
        children: Vec<Self>,
    },
    /// Content that only applies to a subset of platforms.
    Platforms {
        /// Platform names the content applies to.
        platforms: Vec<String>,
        /// The platform-specific content.
        children: Vec<Self>,
    },
    /// An unstyled grouping of content.
    Group {
        /// Grouped content.
        children: Vec<Self>,
    },
    /// A line break.
    Break,
}

impl ContentNode {
    /// Plain text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Inline code node.
    pub fn code(code: impl Into<String>) -> Self {
        Self::Code { code: code.into() }
    }

    /// Unresolved link to a declaration, labelled with `label`.
    pub fn link(target: DeclarationId, label: impl Into<String>) -> Self {
        Self::Link {
            target: LinkTarget::Declaration(target),
            children: vec![Self::text(label)],
        }
    }

    /// Unresolved link to an absolute URL.
    pub fn url(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self::Link {
            target: LinkTarget::Url(url.into()),
            children: vec![Self::text(label)],
        }
    }

    /// Unresolved link to a name written in the documentation of `scope`.
    pub fn reference(name: DeclarationId, scope: DeclarationId, children: Vec<Self>) -> Self {
        Self::Link {
            target: LinkTarget::Reference { name, scope },
            children,
        }
    }

    /// Group of nodes.
    pub fn group(children: Vec<Self>) -> Self {
        Self::Group { children }
    }

    /// Header of the given level with a text label.
    pub fn header(level: u8, label: impl Into<String>) -> Self {
        Self::Header {
            level,
            children: vec![Self::text(label)],
        }
    }

    /// Child nodes of this node, in order. Table cells are visited header first, then row by row.
    pub fn children(&self) -> Vec<&Self> {
        match self {
            Self::Text { .. }
            | Self::Code { .. }
            | Self::Anchor { .. }
            | Self::Break
            | Self::CodeBlock { .. } => Vec::new(),
            Self::Signature { children }
            | Self::Link { children, .. }
            | Self::Resolved { children, .. }
            | Self::Header { children, .. }
            | Self::Paragraph { children }
            | Self::Platforms { children, .. }
            | Self::Group { children } => children.iter().collect(),
            Self::List { items, .. } => items.iter().collect(),
            Self::Table { header, rows } => header.iter().chain(rows.iter().flatten()).collect(),
        }
    }

    /// Mutable access to the child nodes.
    fn children_mut(&mut self) -> Vec<&mut Self> {
        match self {
            Self::Text { .. }
            | Self::Code { .. }
            | Self::Anchor { .. }
            | Self::Break
            | Self::CodeBlock { .. } => Vec::new(),
            Self::Signature { children }
            | Self::Link { children, .. }
            | Self::Resolved { children, .. }
            | Self::Header { children, .. }
            | Self::Paragraph { children }
            | Self::Platforms { children, .. }
            | Self::Group { children } => children.iter_mut().collect(),
            Self::List { items, .. } => items.iter_mut().collect(),
            Self::Table { header, rows } => header
                .iter_mut()
                .chain(rows.iter_mut().flatten())
                .collect(),
        }
    }

    /// Concatenated text of this node and all descendants, without markup.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    /// Append the text of this subtree to `out`.
    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text { text } => out.push_str(text),
            Self::Code { code } | Self::CodeBlock { code, .. } => out.push_str(code),
            _ => {
                for child in self.children() {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Whether the subtree still contains unresolved `Link` placeholders.
    pub fn has_unresolved_links(&self) -> bool {
        matches!(self, Self::Link { .. }) || self.children().into_iter().any(Self::has_unresolved_links)
    }

    /// Every unresolved link target in the subtree, in document order.
    pub fn link_targets(&self) -> Vec<&LinkTarget> {
        let mut out = Vec::new();
        self.collect_targets(&mut out);
        out
    }

    /// Append unresolved link targets of this subtree to `out`.
    fn collect_targets<'a>(&'a self, out: &mut Vec<&'a LinkTarget>) {
        if let Self::Link { target, .. } = self {
            out.push(target);
        }
        for child in self.children() {
            child.collect_targets(out);
        }
    }

    /// Rewrite every `Link` in the subtree.
    ///
    /// `resolve` returns the concrete href for a target, or `None` when the target is
    /// unresolvable, in which case the link degrades to its plain children.
    pub fn resolve_links<F>(&mut self, resolve: &mut F)
    where
        F: FnMut(&LinkTarget) -> Option<String>,
    {
        if let Self::Link { target, children } = self {
            let href = resolve(target);
            let children = mem::take(children);
            *self = match href {
                Some(href) => Self::Resolved { href, children },
                None => Self::Group { children },
            };
        }
        for child in self.children_mut() {
            child.resolve_links(resolve);
        }
    }
}
