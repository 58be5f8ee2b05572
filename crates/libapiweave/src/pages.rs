//! The output page tree.

use std::fmt;

use serde::Serialize;

use crate::{content::ContentNode, identity::DeclarationId};

/// File stem of the root page. Children of the module root may not use it.
pub const ROOT_FILE: &str = "index";

/// What a page documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// The module root; lists packages.
    Module,
    /// A package; lists its types and embeds top-level members.
    Package,
    /// A class-like declaration; embeds its members.
    Classlike,
}

/// One output unit.
///
/// Built once per run from the frozen documentation model. Only the link resolution pass mutates
/// a page afterwards, and only its `Link` content nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageNode {
    /// Stable name used for path derivation. Unique among siblings.
    pub name: String,
    /// Page kind.
    pub kind: PageKind,
    /// Human-readable title.
    pub title: String,
    /// Page content.
    pub content: Vec<ContentNode>,
    /// Sub-pages, in order.
    pub children: Vec<Self>,
    /// Declarations whose page-level target is this page.
    pub documented: Vec<DeclarationId>,
    /// Declarations documented inline on this page, reachable through an anchor.
    pub embedded: Vec<DeclarationId>,
}

impl PageNode {
    /// A page with no content or children.
    pub fn new(name: impl Into<String>, kind: PageKind, title: impl Into<String>) -> Self {
        Self {
            name: sanitize(&name.into()),
            kind,
            title: title.into(),
            content: Vec::new(),
            children: Vec::new(),
            documented: Vec::new(),
            embedded: Vec::new(),
        }
    }

    /// Append a child page, renaming it if its name is already taken.
    pub fn push_child(&mut self, mut child: Self) {
        let base = child.name.clone();
        let mut n = 2;
        while self.name_taken(&child.name) {
            child.name = format!("{base}-{n}");
            n += 1;
        }
        self.children.push(child);
    }

    /// Whether a new child named `name` would share a path with an existing page.
    ///
    /// Children of the module root sit beside the root page, so they also may not use its name.
    fn name_taken(&self, name: &str) -> bool {
        (self.kind == PageKind::Module && name == ROOT_FILE)
            || self.children.iter().any(|c| c.name == name)
    }

    /// First direct child of the given kind.
    pub fn first_child_of_kind(&self, kind: PageKind) -> Option<&Self> {
        self.children.iter().find(|c| c.kind == kind)
    }

    /// Direct child with the given name.
    pub fn child_named(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Every page in the tree with its path, treating `self` as the root.
    pub fn pages(&self) -> Vec<(PagePath, &Self)> {
        let mut out = Vec::new();
        collect_pages(self, PagePath::root(), &PagePath::top(), &mut out);
        out
    }

    /// Apply `f` to every page in the tree with its path, treating `self` as the root.
    pub fn visit_pages_mut(&mut self, f: &mut impl FnMut(&PagePath, &mut Self)) {
        visit_pages_mut(self, &PagePath::root(), &PagePath::top(), f);
    }

    /// Total number of pages in the tree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Self::count).sum::<usize>()
    }

    /// Whether any page still holds an unresolved link.
    pub fn has_unresolved_links(&self) -> bool {
        self.content.iter().any(ContentNode::has_unresolved_links)
            || self.children.iter().any(Self::has_unresolved_links)
    }
}

/// Pre-order collection worker for [`PageNode::pages`]. Children of `page` live in `dir`.
fn collect_pages<'a>(
    page: &'a PageNode,
    path: PagePath,
    dir: &PagePath,
    out: &mut Vec<(PagePath, &'a PageNode)>,
) {
    out.push((path, page));
    for child in &page.children {
        collect_pages(child, dir.file(&child.name), &dir.subdir(&child.name), out);
    }
}

/// Pre-order mutation worker for [`PageNode::visit_pages_mut`]. Children of `page` live in `dir`.
fn visit_pages_mut(
    page: &mut PageNode,
    path: &PagePath,
    dir: &PagePath,
    f: &mut impl FnMut(&PagePath, &mut PageNode),
) {
    f(path, page);
    for child in &mut page.children {
        let child_path = dir.file(&child.name);
        visit_pages_mut(child, &child_path, &dir.subdir(&child.name), f);
    }
}

/// Replace characters that are unsafe in file names.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Location of a page in the output tree, without file extension.
///
/// The root page is `index` and its children sit beside it. Children of any other page sit in a
/// directory named after that page. A package `javadoc` is therefore `javadoc` and its class
/// `Test` is `javadoc/Test`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PagePath {
    /// Directory components from the output root.
    dirs: Vec<String>,
    /// File stem within the directory.
    file: String,
}

impl PagePath {
    /// Path of the root page.
    pub fn root() -> Self {
        Self {
            dirs: Vec::new(),
            file: ROOT_FILE.to_string(),
        }
    }

    /// The output root directory, where the root page and its children live.
    fn top() -> Self {
        Self::new(Vec::new(), "")
    }

    /// Build a path from directory components and a file stem.
    pub fn new(dirs: Vec<String>, file: impl Into<String>) -> Self {
        Self {
            dirs,
            file: file.into(),
        }
    }

    /// The directory `name` inside this path's directory.
    fn subdir(&self, name: &str) -> Self {
        let mut dirs = self.dirs.clone();
        dirs.push(name.to_string());
        Self::new(dirs, "")
    }

    /// A file named `name` in this path's directory.
    fn file(&self, name: &str) -> Self {
        Self {
            dirs: self.dirs.clone(),
            file: name.to_string(),
        }
    }

    /// Path relative to the output root, with extension.
    pub fn with_extension(&self, ext: &str) -> String {
        let mut out = String::new();
        for dir in &self.dirs {
            out.push_str(dir);
            out.push('/');
        }
        out.push_str(&self.file);
        out.push('.');
        out.push_str(ext);
        out
    }

    /// Path of `self` relative to the page at `from`, with extension.
    pub fn relative_to(&self, from: &Self, ext: &str) -> String {
        let common = self
            .dirs
            .iter()
            .zip(&from.dirs)
            .take_while(|(a, b)| a == b)
            .count();
        let mut out = "../".repeat(from.dirs.len() - common);
        for dir in &self.dirs[common..] {
            out.push_str(dir);
            out.push('/');
        }
        out.push_str(&self.file);
        out.push('.');
        out.push_str(ext);
        out
    }
}

impl fmt::Display for PagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for dir in &self.dirs {
            write!(f, "{dir}/")?;
        }
        f.write_str(&self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tree() -> PageNode {
        let mut root = PageNode::new("root", PageKind::Module, "root");
        let mut package = PageNode::new("javadoc", PageKind::Package, "javadoc");
        let mut class = PageNode::new("Test", PageKind::Classlike, "Test");
        class.push_child(PageNode::new("Nested", PageKind::Classlike, "Nested"));
        package.push_child(class);
        package.push_child(PageNode::new("Test", PageKind::Classlike, "test"));
        root.push_child(package);
        root.push_child(PageNode::new("other", PageKind::Package, "other"));
        root
    }

    #[test]
    fn paths_follow_the_tree() {
        let root = tree();
        let paths: Vec<String> = root.pages().iter().map(|(p, _)| p.with_extension("html")).collect();
        assert_eq!(
            paths,
            vec![
                "index.html",
                "javadoc.html",
                "javadoc/Test.html",
                "javadoc/Test/Nested.html",
                "javadoc/Test-2.html",
                "other.html",
            ]
        );
        assert_eq!(root.count(), 6);
    }

    #[test]
    fn root_children_never_share_the_root_file() {
        let mut root = PageNode::new(ROOT_FILE, PageKind::Module, "demo");
        let mut package = PageNode::new("index", PageKind::Package, "index");
        package.push_child(PageNode::new("A", PageKind::Classlike, "A"));
        root.push_child(package);
        root.push_child(PageNode::new("index-2", PageKind::Package, "index-2"));

        let paths: Vec<String> = root.pages().iter().map(|(p, _)| p.with_extension("html")).collect();
        assert_eq!(
            paths,
            vec!["index.html", "index-2.html", "index-2/A.html", "index-2-2.html"]
        );

        let mut visited = Vec::new();
        root.visit_pages_mut(&mut |path, _| visited.push(path.with_extension("html")));
        assert_eq!(visited, paths);
    }

    #[test]
    fn relative_paths() {
        let class = PagePath::new(vec!["javadoc".into()], "Test");
        let nested = PagePath::new(vec!["javadoc".into(), "Test".into()], "Nested");
        let other = PagePath::new(vec![], "other");
        assert_eq!(class.relative_to(&class, "html"), "Test.html");
        assert_eq!(nested.relative_to(&class, "html"), "Test/Nested.html");
        assert_eq!(class.relative_to(&nested, "html"), "../Test.html");
        assert_eq!(other.relative_to(&nested, "html"), "../../other.html");
        assert_eq!(class.relative_to(&PagePath::root(), "html"), "javadoc/Test.html");
    }

    #[test]
    fn names_are_sanitized() {
        assert_eq!(PageNode::new("a b/c", PageKind::Package, "").name, "a_b_c");
        assert_eq!(PageNode::new("..", PageKind::Package, "").name, "_");
    }
}
