//! The merged documentation model.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{content::ContentNode, graph::ReferenceGraph, identity::DeclarationId};

/// Name of one platform pass (for example `jvm` or `js`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceSetId(String);

impl SourceSetId {
    /// Wrap a platform name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The platform name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceSetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Kind of a documented declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    /// A package or namespace.
    Package,
    /// A class.
    Class,
    /// An interface.
    Interface,
    /// An enumeration.
    Enum,
    /// A singleton object.
    Object,
    /// A type alias.
    TypeAlias,
    /// A constructor.
    Constructor,
    /// A function or method.
    Function,
    /// A property or field.
    Property,
    /// A function parameter.
    Parameter,
}

impl DeclKind {
    /// Human-friendly label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Object => "object",
            Self::TypeAlias => "typealias",
            Self::Constructor => "constructor",
            Self::Function => "fun",
            Self::Property => "val",
            Self::Parameter => "parameter",
        }
    }

    /// Whether declarations of this kind get a page of their own.
    pub fn is_classlike(self) -> bool {
        matches!(
            self,
            Self::Class | Self::Interface | Self::Enum | Self::Object | Self::TypeAlias
        )
    }

    /// Whether declarations of this kind carry a parameter signature in their identity.
    pub fn is_callable(self) -> bool {
        matches!(self, Self::Function | Self::Constructor)
    }
}

bitflags! {
    /// Declaration modifiers reported by the semantic model.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        /// `public` visibility.
        const PUBLIC = 1 << 0;
        /// `protected` visibility.
        const PROTECTED = 1 << 1;
        /// `internal` visibility.
        const INTERNAL = 1 << 2;
        /// `private` visibility.
        const PRIVATE = 1 << 3;
        /// `abstract` member or class.
        const ABSTRACT = 1 << 4;
        /// `open` for extension.
        const OPEN = 1 << 5;
        /// `final`.
        const FINAL = 1 << 6;
        /// `static` member.
        const STATIC = 1 << 7;
        /// `override` of a supertype member.
        const OVERRIDE = 1 << 8;
        /// `suspend` function.
        const SUSPEND = 1 << 9;
        /// `inline` function.
        const INLINE = 1 << 10;
        /// `const` property.
        const CONST = 1 << 11;
        /// `data` class.
        const DATA = 1 << 12;
        /// `sealed` class.
        const SEALED = 1 << 13;
        /// `var` (mutable) property.
        const MUTABLE = 1 << 14;
    }
}

impl Modifiers {
    /// Parse a single modifier keyword. Unknown keywords yield an empty set.
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "public" => Self::PUBLIC,
            "protected" => Self::PROTECTED,
            "internal" => Self::INTERNAL,
            "private" => Self::PRIVATE,
            "abstract" => Self::ABSTRACT,
            "open" => Self::OPEN,
            "final" => Self::FINAL,
            "static" => Self::STATIC,
            "override" => Self::OVERRIDE,
            "suspend" => Self::SUSPEND,
            "inline" => Self::INLINE,
            "const" => Self::CONST,
            "data" => Self::DATA,
            "sealed" => Self::SEALED,
            "var" => Self::MUTABLE,
            _ => Self::empty(),
        }
    }

    /// Keywords to print in a signature, in conventional order. `public` and `var` are omitted.
    pub fn keywords(self) -> Vec<&'static str> {
        [
            (Self::PROTECTED, "protected"),
            (Self::INTERNAL, "internal"),
            (Self::PRIVATE, "private"),
            (Self::STATIC, "static"),
            (Self::ABSTRACT, "abstract"),
            (Self::OPEN, "open"),
            (Self::FINAL, "final"),
            (Self::SEALED, "sealed"),
            (Self::DATA, "data"),
            (Self::OVERRIDE, "override"),
            (Self::CONST, "const"),
            (Self::INLINE, "inline"),
            (Self::SUSPEND, "suspend"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, kw)| kw)
        .collect()
    }
}

impl Serialize for Modifiers {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.keywords())
    }
}

/// A reference to a type in a signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeRef {
    /// A declared type, local or external.
    Named {
        /// Identity of the referenced type.
        id: DeclarationId,
        /// Generic arguments.
        arguments: Vec<Self>,
    },
    /// A generic type parameter in scope.
    Parameter {
        /// Parameter name.
        name: String,
    },
}

impl TypeRef {
    /// A declared type without generic arguments.
    pub fn named(path: impl Into<String>) -> Self {
        Self::Named {
            id: DeclarationId::new(path),
            arguments: Vec::new(),
        }
    }

    /// A generic type parameter.
    pub fn parameter(name: impl Into<String>) -> Self {
        Self::Parameter { name: name.into() }
    }

    /// Id used in identities and anchors: the erased type path, or the parameter name.
    pub fn type_id(&self) -> &str {
        match self {
            Self::Named { id, .. } => id.path(),
            Self::Parameter { name } => name,
        }
    }

    /// Identity of the referenced declaration, if this is a declared type.
    pub fn declaration(&self) -> Option<&DeclarationId> {
        match self {
            Self::Named { id, .. } => Some(id),
            Self::Parameter { .. } => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { id, arguments } => {
                f.write_str(id.path())?;
                if !arguments.is_empty() {
                    let args: Vec<String> = arguments.iter().map(ToString::to_string).collect();
                    write!(f, "<{}>", args.join(", "))?;
                }
                Ok(())
            }
            Self::Parameter { name } => f.write_str(name),
        }
    }
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Parameter type.
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

/// Structured documentation, kept per source set.
///
/// Platforms that agree share one rendering; platforms that diverge keep labelled alternatives,
/// so no platform's documentation is ever dropped by merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Documentation {
    /// Content per source set.
    by_source_set: BTreeMap<SourceSetId, Vec<ContentNode>>,
}

impl Documentation {
    /// Documentation with identical content for each of `source_sets`.
    pub fn for_source_sets<'a>(
        source_sets: impl IntoIterator<Item = &'a SourceSetId>,
        content: &[ContentNode],
    ) -> Self {
        let mut docs = Self::default();
        if !content.is_empty() {
            for source_set in source_sets {
                docs.set(source_set.clone(), content.to_vec());
            }
        }
        docs
    }

    /// Set the content for one source set, replacing any previous content.
    pub fn set(&mut self, source_set: SourceSetId, content: Vec<ContentNode>) {
        self.by_source_set.insert(source_set, content);
    }

    /// Whether no source set carries documentation.
    pub fn is_empty(&self) -> bool {
        self.by_source_set.values().all(Vec::is_empty)
    }

    /// The content, if every documented source set carries the same content.
    pub fn shared(&self) -> Option<&[ContentNode]> {
        let mut values = self.by_source_set.values().filter(|v| !v.is_empty());
        let first = values.next()?;
        values.all(|v| v == first).then_some(first.as_slice())
    }

    /// Per source set alternatives, in source set order.
    pub fn alternatives(&self) -> impl Iterator<Item = (&SourceSetId, &[ContentNode])> {
        self.by_source_set
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k, v.as_slice()))
    }

    /// Content for a single source set.
    pub fn get(&self, source_set: &SourceSetId) -> Option<&[ContentNode]> {
        self.by_source_set.get(source_set).map(Vec::as_slice)
    }

    /// Merge another node's documentation: source sets missing here are added, existing ones
    /// are kept.
    pub fn merge(&mut self, other: Self) {
        for (source_set, content) in other.by_source_set {
            self.by_source_set.entry(source_set).or_insert(content);
        }
    }

    /// Mutable access to every content list, for transforms.
    pub fn content_mut(&mut self) -> impl Iterator<Item = &mut Vec<ContentNode>> {
        self.by_source_set.values_mut()
    }
}

/// One documented declaration, merged across platforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocNode {
    /// Stable identity.
    pub id: DeclarationId,
    /// Declaration kind.
    pub kind: DeclKind,
    /// Simple name as shown in output.
    pub name: String,
    /// Structured documentation.
    pub documentation: Documentation,
    /// Platforms contributing this node. Never empty.
    pub source_sets: BTreeSet<SourceSetId>,
    /// Modifiers, unioned across platforms.
    pub modifiers: Modifiers,
    /// Generic type parameter names, in declaration order.
    pub type_parameters: Vec<String>,
    /// Parameters of callables.
    pub parameters: Vec<Parameter>,
    /// Return type of callables, or the type of properties.
    pub return_type: Option<TypeRef>,
    /// Direct supertypes, by identity.
    pub supertypes: Vec<TypeRef>,
    /// Members this member overrides, by identity.
    pub overrides: Vec<DeclarationId>,
    /// Members, in declaration order.
    pub children: Vec<Self>,
}

impl DocNode {
    /// A bare node with no documentation, signature or children.
    pub fn new(
        id: DeclarationId,
        kind: DeclKind,
        source_sets: impl IntoIterator<Item = SourceSetId>,
    ) -> Self {
        let name = id.name().to_string();
        Self {
            id,
            kind,
            name,
            documentation: Documentation::default(),
            source_sets: source_sets.into_iter().collect(),
            modifiers: Modifiers::empty(),
            type_parameters: Vec::new(),
            parameters: Vec::new(),
            return_type: None,
            supertypes: Vec::new(),
            overrides: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Whether this node is documented by every platform in `all`.
    pub fn is_common(&self, all: &BTreeSet<SourceSetId>) -> bool {
        all.is_subset(&self.source_sets)
    }

    /// Direct child with the given identity.
    pub fn child(&self, id: &DeclarationId) -> Option<&Self> {
        self.children.iter().find(|c| &c.id == id)
    }

    /// This node and all descendants, depth-first, pre-order.
    pub fn walk(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Apply `f` to this node and every descendant, parents before children.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut Self)) {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }
}

/// The documentation model of a whole run: merged package trees plus the reference graph.
#[derive(Debug, Clone)]
pub struct DocumentationModel {
    /// Display name of the documented module.
    pub module_name: String,
    /// Package nodes, in first-seen order.
    pub packages: Vec<DocNode>,
    /// Every analysed platform.
    pub source_sets: BTreeSet<SourceSetId>,
    /// Platforms inferred for declarations without explicit platform annotations.
    pub implied_platforms: BTreeSet<SourceSetId>,
    /// Identity index and relations.
    pub graph: ReferenceGraph,
}

impl DocumentationModel {
    /// Every node in the model, depth-first, package by package.
    pub fn nodes(&self) -> Vec<&DocNode> {
        self.packages.iter().flat_map(DocNode::walk).collect()
    }

    /// Find a node by identity.
    pub fn find(&self, id: &DeclarationId) -> Option<&DocNode> {
        self.nodes().into_iter().find(|n| &n.id == id)
    }

    /// Apply `f` to every node in the model.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut DocNode)) {
        for package in &mut self.packages {
            package.visit_mut(f);
        }
    }

    /// Platforms that should be labelled in output: source sets of `node` that are not implied,
    /// or nothing when the node is common.
    pub fn platform_labels(&self, node: &DocNode) -> Vec<String> {
        if node.is_common(&self.source_sets) {
            return Vec::new();
        }
        node.source_sets
            .iter()
            .filter(|s| !self.implied_platforms.contains(*s))
            .map(ToString::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn documentation_shares_identical_content() {
        let jvm = SourceSetId::new("jvm");
        let js = SourceSetId::new("js");
        let mut docs = Documentation::for_source_sets([&jvm], &[ContentNode::text("hi")]);
        docs.merge(Documentation::for_source_sets([&js], &[ContentNode::text("hi")]));
        assert_eq!(docs.shared(), Some(&[ContentNode::text("hi")][..]));

        docs.set(js.clone(), vec![ContentNode::text("js only")]);
        assert_eq!(docs.shared(), None);
        assert_eq!(docs.alternatives().count(), 2);
        assert_eq!(docs.get(&js), Some(&[ContentNode::text("js only")][..]));
    }

    #[test]
    fn modifier_keywords_are_ordered() {
        let mods = Modifiers::from_keyword("override")
            | Modifiers::from_keyword("open")
            | Modifiers::from_keyword("public")
            | Modifiers::from_keyword("bogus");
        assert_eq!(mods.keywords(), vec!["open", "override"]);
    }

    #[test]
    fn walk_is_preorder() {
        let mut class = DocNode::new(
            DeclarationId::new("p.C"),
            DeclKind::Class,
            [SourceSetId::new("jvm")],
        );
        class.children.push(DocNode::new(
            DeclarationId::callable("p.C.f", Vec::<String>::new()),
            DeclKind::Function,
            [SourceSetId::new("jvm")],
        ));
        let mut package = DocNode::new(DeclarationId::new("p"), DeclKind::Package, [SourceSetId::new("jvm")]);
        package.children.push(class);
        let names: Vec<_> = package.walk().iter().map(|n| n.name.clone()).collect();
        assert_eq!(names, vec!["p", "C", "f"]);
    }
}
