//! Turns raw doc comment text into structured content.
//!
//! The body is CommonMark, parsed with `pulldown-cmark`. KDoc and Javadoc conventions are layered
//! on top: block tags (`@param`, `@return`, ...) are lifted out before parsing, `{@link}` and
//! `{@code}` are rewritten into their markdown equivalents, and bracketed names with no link
//! definition (`[f]`, `[A.f]`, `[the list][java.util.List]`) become declaration references.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use pulldown_cmark::{BrokenLink, CodeBlockKind, CowStr, Event, Options, Parser, Tag};
use regex::{Captures, Regex};

use crate::{
    content::{ContentNode, LinkTarget},
    identity::DeclarationId,
};

/// Converts the raw doc comment attached to a declaration into content nodes.
///
/// Registered through the `DOC_COMMENT_PARSER` extension point so every platform pass is parsed
/// the same way.
pub trait DocCommentParser: Send + Sync {
    /// Parse `raw`, the comment of the declaration identified by `context`.
    fn parse(&self, raw: &str, context: &DeclarationId) -> Vec<ContentNode>;
}

/// Javadoc inline tags: `{@link target label}`, `{@linkplain target}` and `{@code text}`.
static JAVADOC_INLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\{@(?:link|linkplain)\s+(?P<target>[^\s}(]+(?:\([^)]*\))?)(?:\s+(?P<label>[^}]+))?\}|\{@code\s+(?P<code>[^}]*)\}",
    )
    .expect("javadoc inline tag pattern")
});

/// Block tags: `@param name text`, `@return text`, `@throws Type text`, `@see target`.
static BLOCK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@(?P<tag>param|return|returns|throws|exception|see|since)\b\s*(?P<rest>.*)$")
        .expect("block tag pattern")
});

/// A declaration name as written in a link: dotted identifiers and an optional signature.
static WRITTEN_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*(?:\([^)]*\))?$")
        .expect("written name pattern")
});

/// Line break tags in inline HTML.
static BR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^<br\s*/?>$").expect("line break pattern"));

/// Any HTML tag.
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("html tag pattern"));

/// Link destination marking a declaration reference produced by the broken link callback.
const REFERENCE_SCHEME: &str = "apiweave-ref:";

/// KDoc/Javadoc flavoured markdown parser.
///
/// Link names are recorded as written together with the documented declaration, so the location
/// provider can look them up from that scope outwards.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownDocParser;

/// Accumulated block tags.
#[derive(Default)]
struct Tags {
    /// `@param` names and descriptions, in order.
    params: Vec<(String, String)>,
    /// The `@return` description.
    returns: Option<String>,
    /// `@throws` types and descriptions, in order.
    throws: Vec<(String, String)>,
    /// `@see` entries.
    see: Vec<String>,
    /// The `@since` version.
    since: Option<String>,
}

impl DocCommentParser for MarkdownDocParser {
    fn parse(&self, raw: &str, context: &DeclarationId) -> Vec<ContentNode> {
        let (body, tags) = split_block_tags(raw);
        let mut out = parse_markdown(&body, context);
        emit_tags(&mut out, tags, context);
        out
    }
}

/// Separate block tags from the markdown body.
///
/// A tag runs until a blank line or the next tag. Fenced code is never scanned for tags, and
/// Javadoc inline tags are rewritten everywhere else.
fn split_block_tags(raw: &str) -> (String, Tags) {
    let mut body = String::new();
    let mut entries: Vec<(String, String)> = Vec::new();
    let mut fenced = false;
    let mut in_tag = false;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            fenced = !fenced;
            in_tag = false;
        } else if !fenced {
            if let Some(caps) = BLOCK_TAG.captures(trimmed) {
                entries.push((caps["tag"].to_string(), caps["rest"].trim().to_string()));
                in_tag = true;
                continue;
            }
            if trimmed.is_empty() {
                in_tag = false;
            } else if in_tag && let Some((_, text)) = entries.last_mut() {
                text.push(' ');
                text.push_str(trimmed);
                continue;
            }
            body.push_str(&rewrite_javadoc(line));
            body.push('\n');
            continue;
        }
        body.push_str(line);
        body.push('\n');
    }

    let mut tags = Tags::default();
    for (tag, rest) in entries {
        record_tag(&mut tags, &tag, &rest);
    }
    (body, tags)
}

/// Rewrite Javadoc inline tags into markdown links and code spans.
fn rewrite_javadoc(line: &str) -> Cow<'_, str> {
    JAVADOC_INLINE.replace_all(line, |caps: &Captures<'_>| {
        if let Some(code) = caps.name("code") {
            return format!("`{}`", code.as_str().trim());
        }
        let target = caps.name("target").map_or("", |m| m.as_str());
        let label = caps.name("label").map_or_else(
            || target.trim_start_matches('#').replace('#', "."),
            |label| label.as_str().trim().to_string(),
        );
        format!("[{label}][{target}]")
    })
}

/// The declaration a link text names, if it looks like one.
///
/// `Class#member` and `#member` are Javadoc spellings of `Class.member` and `member`.
fn written_reference(text: &str) -> Option<DeclarationId> {
    let text = text.trim().trim_matches('`').replace('#', ".");
    let text = text.trim_start_matches('.');
    if !WRITTEN_NAME.is_match(text) {
        return None;
    }
    text.parse().ok()
}

/// Target of a markdown link destination.
fn link_target(dest: &str, context: &DeclarationId) -> LinkTarget {
    match dest
        .strip_prefix(REFERENCE_SCHEME)
        .and_then(|name| name.parse().ok())
    {
        Some(name) => LinkTarget::Reference {
            name,
            scope: context.clone(),
        },
        None => LinkTarget::Url(dest.to_string()),
    }
}

/// Parse a markdown fragment into block content.
fn parse_markdown(text: &str, context: &DeclarationId) -> Vec<ContentNode> {
    let callback = |link: BrokenLink<'_>| {
        written_reference(&link.reference).map(|name| {
            (
                CowStr::from(format!("{REFERENCE_SCHEME}{name}")),
                CowStr::Borrowed(""),
            )
        })
    };
    let parser = Parser::new_with_broken_link_callback(text, Options::empty(), Some(callback));

    let mut builder = Builder::default();
    for event in parser {
        builder.event(event, context);
    }
    builder.root
}

/// Parse a one-line fragment, such as a tag description, into inline content.
fn parse_inline(text: &str, context: &DeclarationId) -> Vec<ContentNode> {
    let text = rewrite_javadoc(text);
    parse_markdown(&text, context)
        .into_iter()
        .flat_map(|node| match node {
            ContentNode::Paragraph { children } => children,
            other => vec![other],
        })
        .collect()
}

/// What an open container turns into once closed.
enum Frame {
    /// A paragraph.
    Paragraph,
    /// A header of the given level.
    Header(u8),
    /// A code block with an optional language.
    Code(Option<String>),
    /// A list, ordered or not.
    List(bool),
    /// A list item.
    Item,
    /// A link.
    Link(LinkTarget),
    /// Styling with no content node of its own.
    Group,
}

/// Folds a pulldown-cmark event stream into content nodes.
#[derive(Default)]
struct Builder {
    /// Finished top-level nodes.
    root: Vec<ContentNode>,
    /// Open containers with their children so far.
    stack: Vec<(Frame, Vec<ContentNode>)>,
    /// Whether the last inline was an explicit line break.
    after_break: bool,
}

impl Builder {
    /// Children of the innermost open container.
    fn current(&mut self) -> &mut Vec<ContentNode> {
        match self.stack.last_mut() {
            Some((_, children)) => children,
            None => &mut self.root,
        }
    }

    /// Append text, merging with a preceding text node.
    fn text(&mut self, text: &str) {
        self.after_break = false;
        if text.is_empty() {
            return;
        }
        let children = self.current();
        if let Some(ContentNode::Text { text: last }) = children.last_mut() {
            last.push_str(text);
        } else {
            children.push(ContentNode::text(text));
        }
    }

    /// Append an explicit line break.
    fn line_break(&mut self) {
        self.current().push(ContentNode::Break);
        self.after_break = true;
    }

    /// Handle one event.
    fn event(&mut self, event: Event<'_>, context: &DeclarationId) {
        match event {
            Event::Start(tag) => {
                let frame = open(tag, context);
                self.stack.push((frame, Vec::new()));
            }
            Event::End(_) => {
                if let Some((frame, children)) = self.stack.pop()
                    && let Some(node) = close(frame, children)
                {
                    self.current().push(node);
                }
                self.after_break = false;
            }
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                self.current().push(ContentNode::code(code.to_string()));
                self.after_break = false;
            }
            Event::SoftBreak => {
                if !self.after_break {
                    self.text(" ");
                }
            }
            Event::HardBreak => self.line_break(),
            Event::Html(html) | Event::InlineHtml(html) => {
                if BR.is_match(html.trim()) {
                    self.line_break();
                } else {
                    // Raw HTML keeps only its text.
                    let stripped = HTML_TAG.replace_all(&html, "");
                    if !stripped.trim().is_empty() {
                        self.text(stripped.trim_end_matches('\n'));
                    }
                }
            }
            _ => {}
        }
    }
}

/// The container a start tag opens.
fn open(tag: Tag<'_>, context: &DeclarationId) -> Frame {
    match tag {
        Tag::Paragraph | Tag::HtmlBlock => Frame::Paragraph,
        Tag::Heading { level, .. } => Frame::Header(level as u8),
        Tag::CodeBlock(CodeBlockKind::Fenced(info)) => Frame::Code(
            info.split_whitespace()
                .next()
                .map(ToString::to_string),
        ),
        Tag::CodeBlock(_) => Frame::Code(None),
        Tag::List(start) => Frame::List(start.is_some()),
        Tag::Item => Frame::Item,
        Tag::Link { dest_url, .. } => Frame::Link(link_target(&dest_url, context)),
        _ => Frame::Group,
    }
}

/// The node a closed container becomes, if any.
fn close(frame: Frame, children: Vec<ContentNode>) -> Option<ContentNode> {
    let blank = children
        .iter()
        .all(|c| matches!(c, ContentNode::Text { text } if text.trim().is_empty()));
    match frame {
        Frame::Paragraph | Frame::Group if blank => None,
        Frame::Paragraph => Some(ContentNode::Paragraph { children }),
        Frame::Header(level) => Some(ContentNode::Header { level, children }),
        Frame::Code(language) => {
            let code = ContentNode::group(children).plain_text();
            Some(ContentNode::CodeBlock {
                language,
                code: code.trim_end_matches('\n').to_string(),
            })
        }
        Frame::List(ordered) => Some(ContentNode::List {
            ordered,
            items: children,
        }),
        Frame::Item => Some(item(children)),
        Frame::Link(target) => Some(ContentNode::Link { target, children }),
        Frame::Group => Some(ContentNode::group(children)),
    }
}

/// A list item: its single paragraph, or its blocks grouped.
fn item(mut children: Vec<ContentNode>) -> ContentNode {
    let block = |c: &ContentNode| {
        matches!(
            c,
            ContentNode::Paragraph { .. }
                | ContentNode::List { .. }
                | ContentNode::CodeBlock { .. }
                | ContentNode::Header { .. }
        )
    };
    if children.len() == 1 && matches!(children[0], ContentNode::Paragraph { .. }) {
        return children.remove(0);
    }
    if children.iter().any(block) {
        return ContentNode::group(children);
    }
    ContentNode::Paragraph { children }
}

/// Store one block tag.
fn record_tag(tags: &mut Tags, tag: &str, rest: &str) {
    match tag {
        "param" => {
            let (name, text) = split_word(rest);
            tags.params.push((name, text));
        }
        "return" | "returns" => tags.returns = Some(rest.to_string()),
        "throws" | "exception" => {
            let (ty, text) = split_word(rest);
            tags.throws.push((ty, text));
        }
        "see" => tags.see.push(rest.to_string()),
        "since" => tags.since = Some(rest.to_string()),
        _ => {}
    }
}

/// Split off the first whitespace-delimited word.
fn split_word(text: &str) -> (String, String) {
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word.to_string(), rest.trim().to_string()),
        None => (text.to_string(), String::new()),
    }
}

/// A link to a written name, or plain code when it does not look like a declaration.
fn name_link(name: &str, context: &DeclarationId) -> ContentNode {
    let label = name.trim_start_matches('#').replace('#', ".");
    match written_reference(name) {
        Some(id) => ContentNode::reference(id, context.clone(), vec![ContentNode::text(label)]),
        None => ContentNode::code(label),
    }
}

/// Emit block tag sections in a fixed order.
fn emit_tags(out: &mut Vec<ContentNode>, tags: Tags, context: &DeclarationId) {
    if !tags.params.is_empty() {
        out.push(ContentNode::header(4, "Parameters"));
        out.push(ContentNode::Table {
            header: Vec::new(),
            rows: tags
                .params
                .into_iter()
                .map(|(name, text)| {
                    vec![
                        ContentNode::code(name),
                        ContentNode::group(parse_inline(&text, context)),
                    ]
                })
                .collect(),
        });
    }
    if let Some(returns) = tags.returns {
        out.push(ContentNode::header(4, "Returns"));
        out.push(ContentNode::Paragraph {
            children: parse_inline(&returns, context),
        });
    }
    if !tags.throws.is_empty() {
        out.push(ContentNode::header(4, "Throws"));
        out.push(ContentNode::Table {
            header: Vec::new(),
            rows: tags
                .throws
                .into_iter()
                .map(|(ty, text)| {
                    vec![
                        name_link(&ty, context),
                        ContentNode::group(parse_inline(&text, context)),
                    ]
                })
                .collect(),
        });
    }
    if !tags.see.is_empty() {
        out.push(ContentNode::header(4, "See also"));
        out.push(ContentNode::List {
            ordered: false,
            items: tags
                .see
                .into_iter()
                .map(|target| see_item(&target, context))
                .collect(),
        });
    }
    if let Some(since) = tags.since {
        out.push(ContentNode::Paragraph {
            children: vec![ContentNode::text(format!("Since: {since}"))],
        });
    }
}

/// A `@see` entry: a URL, a declaration, or free text.
fn see_item(target: &str, context: &DeclarationId) -> ContentNode {
    if target.starts_with("http://") || target.starts_with("https://") {
        return ContentNode::url(target, target);
    }
    let (first, _) = split_word(target);
    if written_reference(&first).is_some() {
        return name_link(&first, context);
    }
    ContentNode::group(parse_inline(target, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn widget() -> DeclarationId {
        DeclarationId::new("pkg.Widget")
    }

    fn parse(raw: &str) -> Vec<ContentNode> {
        MarkdownDocParser.parse(raw, &widget())
    }

    fn reference(name: &str, label: &str) -> ContentNode {
        ContentNode::reference(name.parse().unwrap(), widget(), vec![ContentNode::text(label)])
    }

    #[test]
    fn paragraphs_and_inline_markup() {
        let nodes = parse("Creates a `Widget` from [kotlin.String].\n\nSee [Gadget] too.");
        assert_eq!(
            nodes,
            vec![
                ContentNode::Paragraph {
                    children: vec![
                        ContentNode::text("Creates a "),
                        ContentNode::code("Widget"),
                        ContentNode::text(" from "),
                        reference("kotlin.String", "kotlin.String"),
                        ContentNode::text("."),
                    ],
                },
                ContentNode::Paragraph {
                    children: vec![
                        ContentNode::text("See "),
                        reference("Gadget", "Gadget"),
                        ContentNode::text(" too."),
                    ],
                },
            ]
        );
    }

    #[test]
    fn javadoc_links_and_labels() {
        let nodes = parse("Uses {@link java.util.List the list} and [the map][java.util.Map].");
        let ContentNode::Paragraph { children } = &nodes[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(children[1], reference("java.util.List", "the list"));
        assert_eq!(children[3], reference("java.util.Map", "the map"));
    }

    #[test]
    fn member_references_keep_the_written_name() {
        let nodes = parse("Call [f], [A.f], [p.A.f] or {@link #f()} and {@link Widget#g(int) g}.");
        let ContentNode::Paragraph { children } = &nodes[0] else {
            panic!("expected paragraph");
        };
        let links: Vec<_> = children
            .iter()
            .filter_map(|c| match c {
                ContentNode::Link {
                    target: LinkTarget::Reference { name, scope },
                    children,
                } => {
                    assert_eq!(scope, &widget());
                    Some((name.to_string(), ContentNode::group(children.clone()).plain_text()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            links,
            vec![
                ("f".to_string(), "f".to_string()),
                ("A.f".to_string(), "A.f".to_string()),
                ("p.A.f".to_string(), "p.A.f".to_string()),
                ("f()".to_string(), "f()".to_string()),
                ("Widget.g(int)".to_string(), "g".to_string()),
            ]
        );
    }

    #[test]
    fn brackets_that_are_not_names_stay_text() {
        let nodes = parse("An array [1, 2] and a [real link](https://example.com).");
        let ContentNode::Paragraph { children } = &nodes[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(children[0], ContentNode::text("An array [1, 2] and a "));
        assert_eq!(children[1], ContentNode::url("https://example.com", "real link"));
    }

    #[test]
    fn block_tags_become_sections() {
        let nodes = parse("Sums.\n@param a first\n@param b second\n@return the sum\n@see Other");
        assert_eq!(nodes.len(), 7);
        assert_eq!(nodes[1], ContentNode::header(4, "Parameters"));
        let ContentNode::Table { rows, .. } = &nodes[2] else {
            panic!("expected table");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], ContentNode::code("a"));
        assert_eq!(nodes[3], ContentNode::header(4, "Returns"));
        assert_eq!(nodes[4].plain_text(), "the sum");
        assert!(nodes[5].plain_text().contains("See also"));
        let ContentNode::List { items, .. } = &nodes[6] else {
            panic!("expected list");
        };
        assert_eq!(items[0], reference("Other", "Other"));
    }

    #[test]
    fn tags_continue_until_a_blank_line() {
        let nodes = parse("Body.\n@param a the first\n  operand, see {@code b}\n\n@since 1.2");
        let ContentNode::Table { rows, .. } = &nodes[2] else {
            panic!("expected table");
        };
        assert_eq!(rows[0][1].plain_text(), "the first operand, see b");
        assert_eq!(nodes.last().unwrap().plain_text(), "Since: 1.2");
    }

    #[test]
    fn fenced_code_is_not_scanned_for_tags() {
        let nodes = parse("```\n@param x not a tag\n{@link Foo}\n```");
        assert_eq!(
            nodes,
            vec![ContentNode::CodeBlock {
                language: None,
                code: "@param x not a tag\n{@link Foo}".into(),
            }]
        );
    }

    #[test]
    fn code_blocks_and_lists() {
        let nodes = parse("Example:\n```kotlin\nval w = Widget()\n```\n- one\n- two");
        assert_eq!(
            nodes[1],
            ContentNode::CodeBlock {
                language: Some("kotlin".into()),
                code: "val w = Widget()".into(),
            }
        );
        let ContentNode::List { items, ordered } = &nodes[2] else {
            panic!("expected list");
        };
        assert!(!ordered);
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0],
            ContentNode::Paragraph {
                children: vec![ContentNode::text("one")],
            }
        );
    }

    #[test]
    fn headings_and_ordered_lists() {
        let nodes = parse("## Usage\n\n1. first\n2. second");
        assert_eq!(nodes[0], ContentNode::header(2, "Usage"));
        let ContentNode::List { items, ordered } = &nodes[1] else {
            panic!("expected list");
        };
        assert!(ordered);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn trailing_markers_break_lines() {
        let nodes = parse("First line\\\nsecond line<br>\nthird\nstill third");
        assert_eq!(
            nodes,
            vec![ContentNode::Paragraph {
                children: vec![
                    ContentNode::text("First line"),
                    ContentNode::Break,
                    ContentNode::text("second line"),
                    ContentNode::Break,
                    ContentNode::text("third still third"),
                ],
            }]
        );
    }

    #[test]
    fn empty_comment_yields_nothing() {
        assert!(parse("").is_empty());
        assert!(parse("   \n  ").is_empty());
    }
}
