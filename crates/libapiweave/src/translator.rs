//! Turns the frozen documentation model into a page tree.
//!
//! The default layout is one module root page listing packages, one page per package, and one
//! page per class-like declaration nested under its package (or under its enclosing class).
//! Functions and properties are embedded in the page of their owner under an anchor; top-level
//! functions and properties are embedded in their package page.

use std::fmt;

use crate::{
    content::ContentNode,
    error::Result,
    identity::DeclarationId,
    location::anchor_for,
    model::{DeclKind, DocNode, Documentation, DocumentationModel, Modifiers, TypeRef},
    pages::{PageKind, PageNode, ROOT_FILE},
};

/// Builds a format's page tree.
pub trait PageTranslator: Send + Sync {
    /// Translate the whole model. Every emitted `Link` is left unresolved.
    fn translate(&self, model: &DocumentationModel) -> Result<PageNode>;
}

impl fmt::Debug for dyn PageTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PageTranslator")
    }
}

/// Layout shared by the bundled formats.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTranslator;

impl PageTranslator for DefaultTranslator {
    fn translate(&self, model: &DocumentationModel) -> Result<PageNode> {
        let mut root = PageNode::new(ROOT_FILE, PageKind::Module, &model.module_name);
        root.content.push(ContentNode::header(1, &model.module_name));
        if !model.packages.is_empty() {
            root.content.push(ContentNode::header(2, "Packages"));
            root.content.push(ContentNode::Table {
                header: vec![ContentNode::text("Package"), ContentNode::text("Summary")],
                rows: model
                    .packages
                    .iter()
                    .map(|p| summary_row(model, p))
                    .collect(),
            });
        }
        for package in &model.packages {
            root.push_child(package_page(model, package));
        }
        Ok(root)
    }
}

/// Page for a package: its types, then its embedded top-level members.
fn package_page(model: &DocumentationModel, package: &DocNode) -> PageNode {
    let mut page = PageNode::new(&package.name, PageKind::Package, format!("Package {}", package.name));
    page.documented.push(package.id.clone());
    page.content.push(ContentNode::header(1, &page.title));
    page.content.extend(documentation(&package.documentation));
    push_type_table(model, package, &mut page);
    push_member_sections(model, package, &mut page);
    for child in package.children.iter().filter(|c| c.kind.is_classlike()) {
        page.push_child(classlike_page(model, child));
    }
    page
}

/// Page for a class-like declaration and, recursively, its nested class-likes.
fn classlike_page(model: &DocumentationModel, node: &DocNode) -> PageNode {
    let title = format!("{} {}", capitalize(node.kind.label()), node.name);
    let mut page = PageNode::new(&node.name, PageKind::Classlike, title);
    page.documented.push(node.id.clone());
    page.content.push(ContentNode::header(1, &page.title));
    page.content.push(with_platforms(
        model,
        node,
        vec![classlike_signature(node)],
    ));
    page.content.extend(documentation(&node.documentation));

    let inheritors = model.graph.inheritors(&node.id);
    if !inheritors.is_empty() {
        page.content.push(ContentNode::header(2, "Inheritors"));
        page.content.push(ContentNode::List {
            ordered: false,
            items: inheritors
                .into_iter()
                .map(|id| {
                    let label = id.path().to_string();
                    ContentNode::link(id, label)
                })
                .collect(),
        });
    }

    push_type_table(model, node, &mut page);
    push_member_sections(model, node, &mut page);
    for child in node.children.iter().filter(|c| c.kind.is_classlike()) {
        page.push_child(classlike_page(model, child));
    }
    page
}

/// Table linking to the class-like children of `owner`.
fn push_type_table(model: &DocumentationModel, owner: &DocNode, page: &mut PageNode) {
    let rows: Vec<Vec<ContentNode>> = owner
        .children
        .iter()
        .filter(|c| c.kind.is_classlike())
        .map(|c| summary_row(model, c))
        .collect();
    if rows.is_empty() {
        return;
    }
    page.content.push(ContentNode::header(2, "Types"));
    page.content.push(ContentNode::Table {
        header: vec![ContentNode::text("Name"), ContentNode::text("Summary")],
        rows,
    });
}

/// Embed the constructors, functions and properties of `owner` into `page`.
fn push_member_sections(model: &DocumentationModel, owner: &DocNode, page: &mut PageNode) {
    let sections = [
        ("Constructors", DeclKind::Constructor),
        ("Functions", DeclKind::Function),
        ("Properties", DeclKind::Property),
    ];
    for (heading, kind) in sections {
        let members: Vec<&DocNode> = owner.children.iter().filter(|c| c.kind == kind).collect();
        if members.is_empty() {
            continue;
        }
        page.content.push(ContentNode::header(2, heading));
        for member in members {
            let block = member_block(model, member, &mut page.embedded);
            page.content.push(block);
        }
    }
}

/// Anchored block documenting one member. Records every embedded identity in `embedded`.
fn member_block(
    model: &DocumentationModel,
    member: &DocNode,
    embedded: &mut Vec<DeclarationId>,
) -> ContentNode {
    embedded.push(member.id.clone());
    let mut children = vec![
        ContentNode::Anchor {
            name: anchor_for(&member.id),
        },
        ContentNode::header(3, &member.name),
        member_signature(member),
    ];
    children.extend(documentation(&member.documentation));

    let overridden: Vec<ContentNode> = model
        .graph
        .overrides(&member.id)
        .into_iter()
        .map(|id| {
            let label = id.to_string();
            ContentNode::link(id, label)
        })
        .collect();
    if !overridden.is_empty() {
        let mut line = vec![ContentNode::text("Overrides ")];
        line.extend(comma_separated(overridden));
        children.push(ContentNode::Paragraph { children: line });
    }

    // Property accessors are documented on the property itself.
    let accessors: Vec<&DocNode> = member
        .children
        .iter()
        .filter(|c| member.kind == DeclKind::Property && c.kind == DeclKind::Function)
        .collect();
    if !accessors.is_empty() {
        let items = accessors
            .into_iter()
            .map(|accessor| {
                embedded.push(accessor.id.clone());
                let mut item = vec![
                    ContentNode::Anchor {
                        name: anchor_for(&accessor.id),
                    },
                    member_signature(accessor),
                ];
                item.extend(documentation(&accessor.documentation));
                ContentNode::group(item)
            })
            .collect();
        children.push(ContentNode::header(4, "Accessors"));
        children.push(ContentNode::List {
            ordered: false,
            items,
        });
    }
    with_platforms(model, member, children)
}

/// Wrap content in a platform tag when `node` is not common to every platform.
fn with_platforms(model: &DocumentationModel, node: &DocNode, children: Vec<ContentNode>) -> ContentNode {
    let platforms = model.platform_labels(node);
    if platforms.is_empty() {
        ContentNode::group(children)
    } else {
        ContentNode::Platforms { platforms, children }
    }
}

/// `open class Test<T> : java.io.Serializable, java.lang.Cloneable`.
fn classlike_signature(node: &DocNode) -> ContentNode {
    let mut children = vec![ContentNode::text(prefix(node.modifiers, node.kind))];
    children.push(ContentNode::text(format!(
        "{}{}",
        node.name,
        type_parameters(&node.type_parameters)
    )));
    if node.kind == DeclKind::TypeAlias {
        if let Some(target) = &node.return_type {
            children.push(ContentNode::text(" = "));
            children.extend(type_content(target));
        }
    } else if !node.supertypes.is_empty() {
        children.push(ContentNode::text(" : "));
        children.push(supertypes(&node.supertypes));
    }
    ContentNode::Signature { children }
}

/// The supertype list of a class-like as linked, comma separated content.
pub fn supertypes(types: &[TypeRef]) -> ContentNode {
    ContentNode::group(comma_separated(
        types.iter().map(|t| ContentNode::group(type_content(t))),
    ))
}

/// `fun test2(s: kotlin.String): kotlin.Unit` with the member name linking to itself.
fn member_signature(member: &DocNode) -> ContentNode {
    let mut children = vec![ContentNode::text(prefix(member.modifiers, member.kind))];
    if !member.type_parameters.is_empty() {
        children.push(ContentNode::text(format!(
            "{} ",
            type_parameters(&member.type_parameters)
        )));
    }
    children.push(ContentNode::link(member.id.clone(), &member.name));
    if member.kind.is_callable() {
        children.push(ContentNode::text("("));
        let params = member.parameters.iter().map(|p| {
            let mut param = vec![ContentNode::text(format!("{}: ", p.name))];
            param.extend(type_content(&p.ty));
            ContentNode::group(param)
        });
        children.extend(comma_separated(params));
        children.push(ContentNode::text(")"));
    }
    if let Some(ty) = &member.return_type {
        children.push(ContentNode::text(": "));
        children.extend(type_content(ty));
    }
    ContentNode::Signature { children }
}

/// Modifier keywords followed by the declaration keyword.
fn prefix(modifiers: Modifiers, kind: DeclKind) -> String {
    let mut words = modifiers.keywords();
    let keyword = match kind {
        DeclKind::Property if modifiers.contains(Modifiers::MUTABLE) => "var",
        other => other.label(),
    };
    words.push(keyword);
    format!("{} ", words.join(" "))
}

/// `<T, R>`, or nothing.
fn type_parameters(params: &[String]) -> String {
    if params.is_empty() {
        String::new()
    } else {
        format!("<{}>", params.join(", "))
    }
}

/// A type reference with a link on every declared type. Type parameters stay plain text.
fn type_content(ty: &TypeRef) -> Vec<ContentNode> {
    match ty {
        TypeRef::Parameter { name } => vec![ContentNode::text(name)],
        TypeRef::Named { id, arguments } => {
            let mut out = vec![ContentNode::link(id.clone(), id.path())];
            if !arguments.is_empty() {
                out.push(ContentNode::text("<"));
                out.extend(comma_separated(
                    arguments.iter().map(|a| ContentNode::group(type_content(a))),
                ));
                out.push(ContentNode::text(">"));
            }
            out
        }
    }
}

/// Interleave `items` with `", "` separators.
fn comma_separated(items: impl IntoIterator<Item = ContentNode>) -> Vec<ContentNode> {
    let mut out = Vec::new();
    for (idx, item) in items.into_iter().enumerate() {
        if idx > 0 {
            out.push(ContentNode::text(", "));
        }
        out.push(item);
    }
    out
}

/// Documentation content: shared content as is, divergent content as labelled alternatives.
fn documentation(docs: &Documentation) -> Vec<ContentNode> {
    if docs.is_empty() {
        return Vec::new();
    }
    if let Some(shared) = docs.shared() {
        return shared.to_vec();
    }
    docs.alternatives()
        .map(|(source_set, content)| ContentNode::Platforms {
            platforms: vec![source_set.to_string()],
            children: content.to_vec(),
        })
        .collect()
}

/// `[link, first paragraph]` row for summary tables.
fn summary_row(model: &DocumentationModel, node: &DocNode) -> Vec<ContentNode> {
    let summary = node
        .documentation
        .shared()
        .or_else(|| node.documentation.alternatives().next().map(|(_, c)| c))
        .and_then(|content| {
            content.iter().find_map(|c| match c {
                ContentNode::Paragraph { children } => Some(ContentNode::group(children.clone())),
                _ => None,
            })
        })
        .unwrap_or_else(|| ContentNode::group(Vec::new()));
    vec![
        with_platforms(model, node, vec![ContentNode::link(node.id.clone(), &node.name)]),
        summary,
    ]
}

/// Uppercase the first letter.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        content::LinkTarget,
        graph::ReferenceGraph,
        model::{Parameter, SourceSetId},
    };
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn jvm() -> SourceSetId {
        SourceSetId::new("jvm")
    }

    fn model() -> DocumentationModel {
        let mut class = DocNode::new(DeclarationId::new("javadoc.Test"), DeclKind::Class, [jvm()]);
        class.supertypes = vec![TypeRef::named("java.lang.Cloneable")];
        class.children.push(DocNode::new(
            DeclarationId::callable("javadoc.Test.test", Vec::<String>::new()),
            DeclKind::Function,
            [jvm()],
        ));
        let mut test3 = DocNode::new(
            DeclarationId::callable("javadoc.Test.test3", ["T"]),
            DeclKind::Function,
            [jvm()],
        );
        test3.type_parameters = vec!["T".into()];
        test3.parameters = vec![Parameter {
            name: "t".into(),
            ty: TypeRef::parameter("T"),
        }];
        class.children.push(test3);

        let mut property = DocNode::new(DeclarationId::new("javadoc.Test.size"), DeclKind::Property, [jvm()]);
        property.modifiers = Modifiers::MUTABLE;
        property.return_type = Some(TypeRef::named("kotlin.Int"));
        property.children.push(DocNode::new(
            DeclarationId::callable("javadoc.Test.size.<get-size>", Vec::<String>::new()),
            DeclKind::Function,
            [jvm()],
        ));
        class.children.push(property);

        let mut package = DocNode::new(DeclarationId::new("javadoc"), DeclKind::Package, [jvm()]);
        package.children.push(class);
        package.children.push(DocNode::new(
            DeclarationId::callable("javadoc.topLevel", Vec::<String>::new()),
            DeclKind::Function,
            [jvm()],
        ));

        DocumentationModel {
            module_name: "demo".into(),
            packages: vec![package],
            source_sets: BTreeSet::from([jvm()]),
            implied_platforms: BTreeSet::new(),
            graph: ReferenceGraph::new(),
        }
    }

    #[test]
    fn default_layout() {
        let root = DefaultTranslator.translate(&model()).unwrap();
        assert_eq!(root.kind, PageKind::Module);
        let package = root.first_child_of_kind(PageKind::Package).unwrap();
        assert_eq!(package.name, "javadoc");
        assert_eq!(
            package.embedded,
            vec![DeclarationId::callable("javadoc.topLevel", Vec::<String>::new())]
        );
        let class = package.first_child_of_kind(PageKind::Classlike).unwrap();
        assert_eq!(class.title, "Class Test");
        assert_eq!(class.documented, vec![DeclarationId::new("javadoc.Test")]);
        assert_eq!(
            class.embedded,
            vec![
                DeclarationId::callable("javadoc.Test.test", Vec::<String>::new()),
                DeclarationId::callable("javadoc.Test.test3", ["T"]),
                DeclarationId::new("javadoc.Test.size"),
                DeclarationId::callable("javadoc.Test.size.<get-size>", Vec::<String>::new()),
            ]
        );
        assert!(root.has_unresolved_links());
    }

    #[test]
    fn signatures_link_types_but_not_type_parameters() {
        let model = model();
        let class = &model.packages[0].children[0];
        assert_eq!(
            classlike_signature(class).plain_text(),
            "class Test : java.lang.Cloneable"
        );
        let test3 = &class.children[1];
        let signature = member_signature(test3);
        assert_eq!(signature.plain_text(), "fun <T> test3(t: T)");
        let targets: Vec<_> = signature.link_targets().into_iter().cloned().collect();
        assert_eq!(targets, vec![LinkTarget::Declaration(test3.id.clone())]);
        assert_eq!(member_signature(&class.children[2]).plain_text(), "var size: kotlin.Int");
    }
}
