//! Mapping declaration identities to links.
//!
//! Internal declarations resolve to the page that documents them, plus an anchor when they are
//! embedded in a larger page. Everything else is looked up in the external link indexes loaded for
//! the run. Resolution never fails: an identity nobody knows is [`Location::Unresolved`].

pub mod anchor;
pub mod external;
pub mod fetch;

use std::{collections::HashMap, fmt, iter, sync::Arc};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::{
    content::LinkTarget,
    identity::DeclarationId,
    pages::{PageNode, PagePath},
};

pub use anchor::anchor_for;
pub use external::{ExternalLinkIndex, LinkStyle};

/// Where a declaration lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A page of this run, as a path relative to the requesting page.
    Internal {
        /// Relative path with extension.
        path: String,
        /// In-page anchor for embedded declarations.
        anchor: Option<String>,
    },
    /// An absolute URL on an external documentation site.
    External(String),
    /// Not documented here or in any loaded index.
    Unresolved,
}

impl Location {
    /// The href to emit for this location, or `None` when unresolved.
    pub fn href(&self) -> Option<String> {
        match self {
            Self::Internal { path, anchor: None } => Some(path.clone()),
            Self::Internal {
                path,
                anchor: Some(anchor),
            } => Some(format!("{path}#{anchor}")),
            Self::External(url) => Some(url.clone()),
            Self::Unresolved => None,
        }
    }
}

/// Resolves declaration identities to locations.
pub trait LocationProvider: Send + Sync {
    /// Location of `id` as seen from the page at `from`. Never fails.
    fn get_location(&self, id: &DeclarationId, from: &PagePath) -> Location;

    /// Location of `name`, written in the documentation of `scope`.
    ///
    /// The name is tried inside `scope`, then inside each enclosing scope, then as written.
    fn resolve_reference(
        &self,
        name: &DeclarationId,
        scope: &DeclarationId,
        from: &PagePath,
    ) -> Location {
        reference_candidates(name, scope)
            .iter()
            .map(|candidate| self.get_location(candidate, from))
            .find(|location| *location != Location::Unresolved)
            .unwrap_or(Location::Unresolved)
    }

    /// Href for a link target as seen from the page at `from`.
    fn resolve_target(&self, target: &LinkTarget, from: &PagePath) -> Option<String> {
        match target {
            LinkTarget::Declaration(id) => self.get_location(id, from).href(),
            LinkTarget::Reference { name, scope } => {
                self.resolve_reference(name, scope, from).href()
            }
            LinkTarget::Url(url) => Some(url.clone()),
        }
    }
}

/// Identities `name` may denote when written in the documentation of `scope`, innermost first.
pub fn reference_candidates(name: &DeclarationId, scope: &DeclarationId) -> Vec<DeclarationId> {
    let mut out: Vec<_> = iter::once(scope.path())
        .chain(scope.enclosing_prefixes())
        .filter(|prefix| !prefix.is_empty())
        .map(|prefix| name.qualified(prefix))
        .collect();
    out.push(name.clone());
    out
}

/// Creates a location provider for a finished page tree.
pub trait LocationProviderFactory: Send + Sync {
    /// Provider for pages under `root`, rendered with file extension `extension`.
    fn create(
        &self,
        root: &PageNode,
        external: Vec<ExternalLinkIndex>,
        extension: &str,
    ) -> Arc<dyn LocationProvider>;
}

impl fmt::Debug for dyn LocationProviderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LocationProviderFactory")
    }
}

/// Page-level and embedded declarations of one page.
#[derive(Debug, Clone)]
struct PageTargets {
    /// Page path.
    path: PagePath,
    /// Declarations documented by the whole page.
    documented: Vec<DeclarationId>,
    /// Declarations embedded under an anchor.
    embedded: Vec<DeclarationId>,
}

/// An internal target: the page plus an optional anchor.
type InternalTarget = (PagePath, Option<String>);

/// Internal targets keyed two ways.
#[derive(Debug, Default)]
struct InternalIndex {
    /// Exact identity to target.
    by_id: HashMap<DeclarationId, InternalTarget>,
    /// Dotted path to the first identity with that path, so an unqualified name picks the first
    /// overload.
    by_path: HashMap<String, DeclarationId>,
}

impl InternalIndex {
    /// Register `id` unless an earlier page already claimed it.
    fn insert(&mut self, id: &DeclarationId, target: impl FnOnce() -> InternalTarget) {
        self.by_id.entry(id.clone()).or_insert_with(target);
        self.by_path
            .entry(id.path().to_string())
            .or_insert_with(|| id.clone());
    }

    /// Target of `id`. Names written without a signature also match any callable of that path.
    fn lookup(&self, id: &DeclarationId) -> Option<&InternalTarget> {
        self.by_id.get(id).or_else(|| {
            if id.is_callable() {
                return None;
            }
            self.by_path
                .get(id.path())
                .and_then(|first| self.by_id.get(first))
        })
    }
}

/// Resolves internal identities through the page tree and the rest through external indexes.
pub struct DefaultLocationProvider {
    /// Targets captured from the page tree.
    pages: Vec<PageTargets>,
    /// External indexes in configuration order.
    external: Vec<ExternalLinkIndex>,
    /// Page file extension.
    extension: String,
    /// Internal targets, built on first lookup.
    index: OnceCell<InternalIndex>,
}

impl DefaultLocationProvider {
    /// A provider for the pages under `root`.
    pub fn new(root: &PageNode, external: Vec<ExternalLinkIndex>, extension: &str) -> Self {
        let pages = root
            .pages()
            .into_iter()
            .map(|(path, page)| PageTargets {
                path,
                documented: page.documented.clone(),
                embedded: page.embedded.clone(),
            })
            .collect();
        Self {
            pages,
            external,
            extension: extension.to_string(),
            index: OnceCell::new(),
        }
    }

    /// The internal index, building it on first use.
    ///
    /// Page-level targets take precedence over anchors; among equals the first page in tree
    /// order wins.
    fn index(&self) -> &InternalIndex {
        self.index.get_or_init(|| {
            let mut index = InternalIndex::default();
            for page in &self.pages {
                for id in &page.documented {
                    index.insert(id, || (page.path.clone(), None));
                }
            }
            for page in &self.pages {
                for id in &page.embedded {
                    index.insert(id, || (page.path.clone(), Some(anchor_for(id))));
                }
            }
            debug!(
                entries = index.by_id.len(),
                paths = index.by_path.len(),
                "built internal location index"
            );
            index
        })
    }

    /// Location of an internal target as seen from `from`.
    fn internal(&self, (path, anchor): &InternalTarget, from: &PagePath) -> Location {
        Location::Internal {
            path: path.relative_to(from, &self.extension),
            anchor: anchor.clone(),
        }
    }

    /// Location of `id` in the first external index that knows it.
    fn external(&self, id: &DeclarationId) -> Location {
        self.external
            .iter()
            .find_map(|index| index.resolve(id))
            .map_or(Location::Unresolved, Location::External)
    }
}

impl fmt::Debug for DefaultLocationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultLocationProvider")
            .field("pages", &self.pages.len())
            .field("external", &self.external.len())
            .field("extension", &self.extension)
            .finish()
    }
}

impl LocationProvider for DefaultLocationProvider {
    fn get_location(&self, id: &DeclarationId, from: &PagePath) -> Location {
        match self.index().by_id.get(id) {
            Some(target) => self.internal(target, from),
            None => self.external(id),
        }
    }

    fn resolve_reference(
        &self,
        name: &DeclarationId,
        scope: &DeclarationId,
        from: &PagePath,
    ) -> Location {
        let index = self.index();
        reference_candidates(name, scope)
            .iter()
            .find_map(|candidate| index.lookup(candidate))
            .map_or_else(|| self.external(name), |target| self.internal(target, from))
    }
}

/// Builds [`DefaultLocationProvider`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultLocationProviderFactory;

impl LocationProviderFactory for DefaultLocationProviderFactory {
    fn create(
        &self,
        root: &PageNode,
        external: Vec<ExternalLinkIndex>,
        extension: &str,
    ) -> Arc<dyn LocationProvider> {
        Arc::new(DefaultLocationProvider::new(root, external, extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::PageKind;
    use pretty_assertions::assert_eq;

    fn tree() -> PageNode {
        let mut root = PageNode::new("root", PageKind::Module, "root");
        let mut package = PageNode::new("javadoc", PageKind::Package, "javadoc");
        package.documented.push(DeclarationId::new("javadoc"));
        let mut class = PageNode::new("Test", PageKind::Classlike, "Test");
        class.documented.push(DeclarationId::new("javadoc.Test"));
        class
            .embedded
            .push(DeclarationId::callable("javadoc.Test.test", Vec::<String>::new()));
        class
            .embedded
            .push(DeclarationId::callable("javadoc.Test.test2", ["kotlin.String"]));
        package.push_child(class);
        root.push_child(package);
        root
    }

    fn class_path() -> PagePath {
        PagePath::new(vec!["javadoc".into()], "Test")
    }

    #[test]
    fn internal_locations() {
        let provider = DefaultLocationProvider::new(&tree(), Vec::new(), "html");
        let from = class_path();
        assert_eq!(
            provider
                .get_location(&DeclarationId::callable("javadoc.Test.test", Vec::<String>::new()), &from)
                .href()
                .as_deref(),
            Some("Test.html#test--")
        );
        assert_eq!(
            provider
                .get_location(&DeclarationId::callable("javadoc.Test.test2", ["kotlin.String"]), &from)
                .href()
                .as_deref(),
            Some("Test.html#test2-kotlin.String-")
        );
        assert_eq!(
            provider
                .get_location(&DeclarationId::new("javadoc.Test"), &PagePath::root())
                .href()
                .as_deref(),
            Some("javadoc/Test.html")
        );
        assert_eq!(
            provider
                .get_location(&DeclarationId::new("javadoc"), &from)
                .href()
                .as_deref(),
            Some("../javadoc.html")
        );
    }

    #[test]
    fn resolution_is_total() {
        let oracle = ExternalLinkIndex::new("https://docs.oracle.com/javase/8/docs/api", LinkStyle::Javadoc)
            .with_package("java.lang");
        let provider = DefaultLocationProvider::new(&tree(), vec![oracle], "html");
        let from = class_path();
        assert_eq!(
            provider.get_location(&DeclarationId::new("java.lang.Cloneable"), &from),
            Location::External("https://docs.oracle.com/javase/8/docs/api/java/lang/Cloneable.html".into())
        );
        assert_eq!(
            provider.get_location(&DeclarationId::new("nowhere.Thing"), &from),
            Location::Unresolved
        );
        assert_eq!(
            provider.resolve_target(&LinkTarget::Url("https://example.com".into()), &from),
            Some("https://example.com".into())
        );
    }

    fn reference(name: &str, scope: &str) -> LinkTarget {
        LinkTarget::Reference {
            name: name.parse().unwrap(),
            scope: DeclarationId::new(scope),
        }
    }

    #[test]
    fn written_names_resolve_from_the_documented_scope_outwards() {
        let provider = DefaultLocationProvider::new(&tree(), Vec::new(), "html");
        let from = class_path();
        let href = |name: &str, scope: &str| provider.resolve_target(&reference(name, scope), &from);

        // Unqualified members pick the first overload.
        assert_eq!(href("test2", "javadoc.Test").as_deref(), Some("Test.html#test2-kotlin.String-"));
        assert_eq!(href("Test.test", "javadoc.Test").as_deref(), Some("Test.html#test--"));
        assert_eq!(href("javadoc.Test.test", "javadoc").as_deref(), Some("Test.html#test--"));
        assert_eq!(href("test()", "javadoc.Test.test2").as_deref(), Some("Test.html#test--"));
        assert_eq!(href("Test", "javadoc.Test.test").as_deref(), Some("Test.html"));

        // A written signature must match exactly.
        assert_eq!(href("test(kotlin.Int)", "javadoc.Test"), None);
        assert_eq!(href("Missing", "javadoc.Test"), None);
    }

    #[test]
    fn written_names_fall_back_to_external_indexes() {
        let oracle = ExternalLinkIndex::new("https://docs.oracle.com/javase/8/docs/api", LinkStyle::Javadoc)
            .with_package("java.lang");
        let provider = DefaultLocationProvider::new(&tree(), vec![oracle], "html");
        assert_eq!(
            provider
                .resolve_target(&reference("java.lang.Cloneable", "javadoc.Test"), &class_path())
                .as_deref(),
            Some("https://docs.oracle.com/javase/8/docs/api/java/lang/Cloneable.html")
        );
    }

    #[test]
    fn candidates_walk_outwards() {
        let candidates: Vec<_> = reference_candidates(&"A.f()".parse().unwrap(), &DeclarationId::new("p.A"))
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(candidates, vec!["p.A.A.f()", "p.A.f()", "A.f()"]);
    }
}
