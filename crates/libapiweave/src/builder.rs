//! Builds the documentation model from per-platform semantic models.
//!
//! Each platform pass is converted independently (in parallel), the resulting trees are merged
//! by identity, and finally the reference graph is populated from the merged tree.

use std::{collections::BTreeSet, sync::Arc};

use rayon::prelude::*;
use tracing::debug;

use crate::{
    diagnostics::{Diagnostic, Diagnostics},
    doccomment::DocCommentParser,
    error::{ApiweaveError, Result},
    graph::{EdgeKind, ReferenceGraph},
    identity::DeclarationId,
    merge::merge_forests,
    model::{DeclKind, DocNode, Documentation, DocumentationModel, Modifiers, Parameter, SourceSetId},
    semantic::{SemanticDeclaration, SemanticModel, parse_type},
};

/// Converts semantic models into a merged [`DocumentationModel`].
pub struct ModelBuilder<'a> {
    /// Parser for raw doc comments.
    parser: Arc<dyn DocCommentParser>,
    /// Platforms assumed for declarations of passes without a platform.
    implied_platforms: BTreeSet<SourceSetId>,
    /// Sink for recoverable problems.
    diagnostics: &'a Diagnostics,
}

/// Per-pass conversion state.
struct PassContext<'a> {
    /// Platform of the pass.
    platform: &'a str,
    /// Every analysed platform.
    analysed: &'a BTreeSet<SourceSetId>,
    /// Platforms assumed for unannotated declarations.
    implied: &'a BTreeSet<SourceSetId>,
    /// Doc comment parser.
    parser: &'a dyn DocCommentParser,
    /// Diagnostics sink.
    diagnostics: &'a Diagnostics,
}

impl<'a> ModelBuilder<'a> {
    /// A builder using `parser` for doc comments and reporting to `diagnostics`.
    pub fn new(parser: Arc<dyn DocCommentParser>, diagnostics: &'a Diagnostics) -> Self {
        Self {
            parser,
            implied_platforms: BTreeSet::new(),
            diagnostics,
        }
    }

    /// Set the implied platforms.
    pub fn with_implied_platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.implied_platforms = platforms.into_iter().map(SourceSetId::new).collect();
        self
    }

    /// Build the merged model of `module_name` from one semantic model per platform pass.
    pub fn build(&self, module_name: &str, models: &[SemanticModel]) -> Result<DocumentationModel> {
        let analysed: BTreeSet<SourceSetId> = models
            .iter()
            .filter(|m| !m.platform.trim().is_empty())
            .map(|m| SourceSetId::new(m.platform.as_str()))
            .chain(self.implied_platforms.iter().cloned())
            .collect();
        if analysed.is_empty() && !models.is_empty() {
            return Err(ApiweaveError::config(
                "no platform is analysed: every pass is unnamed and no implied platforms are set",
            ));
        }

        let forests = models
            .par_iter()
            .map(|model| {
                let context = PassContext {
                    platform: model.platform.trim(),
                    analysed: &analysed,
                    implied: &self.implied_platforms,
                    parser: self.parser.as_ref(),
                    diagnostics: self.diagnostics,
                };
                let root = DeclarationId::new("");
                let mut forest = Vec::new();
                for decl in &model.declarations {
                    if let Some(node) = context.convert(decl, &root, &[])? {
                        forest.push(node);
                    }
                }
                debug!(platform = context.platform, roots = forest.len(), "converted pass");
                Ok(forest)
            })
            .collect::<Result<Vec<Vec<DocNode>>>>()?;

        let packages = merge_forests(forests)?;
        let graph = build_graph(&packages)?;
        for node in packages.iter().flat_map(DocNode::walk) {
            if node.kind.is_classlike() {
                graph.ancestors_reporting(&node.id, self.diagnostics);
            }
        }
        debug!(nodes = graph.len(), external = graph.external_ids().count(), "built model");

        Ok(DocumentationModel {
            module_name: module_name.to_string(),
            packages,
            source_sets: analysed,
            implied_platforms: self.implied_platforms.clone(),
            graph,
        })
    }
}

impl PassContext<'_> {
    /// Source sets of a declaration; empty when no analysable platform remains.
    fn source_sets(&self, decl: &SemanticDeclaration) -> BTreeSet<SourceSetId> {
        if !decl.platforms.is_empty() {
            return decl
                .platforms
                .iter()
                .map(|p| SourceSetId::new(p.as_str()))
                .filter(|p| self.analysed.contains(p))
                .collect();
        }
        if self.platform.is_empty() {
            self.implied.clone()
        } else {
            BTreeSet::from([SourceSetId::new(self.platform)])
        }
    }

    /// Convert one declaration and its children. Declarations without an analysable platform
    /// are dropped and reported.
    fn convert(
        &self,
        decl: &SemanticDeclaration,
        parent: &DeclarationId,
        scope: &[String],
    ) -> Result<Option<DocNode>> {
        let mut type_params: Vec<String> = scope.to_vec();
        type_params.extend(decl.type_parameters.iter().cloned());

        let parameters: Vec<Parameter> = decl
            .parameters
            .iter()
            .map(|p| Parameter {
                name: p.name.clone(),
                ty: parse_type(&p.ty, &type_params),
            })
            .collect();
        let id = if decl.kind.is_callable() {
            parent.callable_child(&decl.name, parameters.iter().map(|p| p.ty.type_id()))
        } else if decl.kind == DeclKind::Package {
            DeclarationId::new(decl.name.as_str())
        } else {
            parent.child(&decl.name)
        };

        let source_sets = self.source_sets(decl);
        if source_sets.is_empty() {
            self.diagnostics.report(Diagnostic::DroppedDeclaration {
                id,
                pass: self.platform.to_string(),
            });
            return Ok(None);
        }

        let mut node = DocNode::new(id, decl.kind, source_sets);
        node.name.clone_from(&decl.name);
        if let Some(raw) = decl.doc.as_deref().filter(|d| !d.trim().is_empty()) {
            let content = self.parser.parse(raw, &node.id);
            node.documentation = Documentation::for_source_sets(&node.source_sets, &content);
        }
        node.modifiers = decl
            .modifiers
            .iter()
            .fold(Modifiers::empty(), |acc, m| acc | Modifiers::from_keyword(m));
        node.type_parameters.clone_from(&decl.type_parameters);
        node.parameters = parameters;
        node.return_type = decl.return_type.as_deref().map(|t| parse_type(t, &type_params));
        node.supertypes = decl
            .supertypes
            .iter()
            .map(|t| parse_type(t, &type_params))
            .collect();
        node.overrides = decl
            .overrides
            .iter()
            .map(|o| {
                o.parse::<DeclarationId>().map_err(|e| {
                    ApiweaveError::inconsistent(&node.id, format!("bad override '{o}': {e}"))
                })
            })
            .collect::<Result<_>>()?;

        for child in &decl.children {
            if let Some(child) = self.convert(child, &node.id, &type_params)? {
                node.children.push(child);
            }
        }
        Ok(Some(node))
    }
}

/// Populate the reference graph from the merged tree.
///
/// Supertype edges are `Implements` when the target is a known interface and the source is not
/// itself an interface, otherwise `Extends`.
fn build_graph(packages: &[DocNode]) -> Result<ReferenceGraph> {
    let mut graph = ReferenceGraph::new();
    let nodes: Vec<&DocNode> = packages.iter().flat_map(DocNode::walk).collect();
    for node in &nodes {
        graph.add_node(node.id.clone(), node.kind)?;
    }
    for node in &nodes {
        for supertype in node.supertypes.iter().filter_map(|t| t.declaration()) {
            let target_is_interface = graph
                .node(supertype)
                .is_some_and(|n| n.kind == DeclKind::Interface);
            let kind = if target_is_interface && node.kind != DeclKind::Interface {
                EdgeKind::Implements
            } else {
                EdgeKind::Extends
            };
            graph.add_edge(&node.id, supertype.clone(), kind)?;
        }
        for overridden in &node.overrides {
            graph.add_edge(&node.id, overridden.clone(), EdgeKind::Overrides)?;
        }
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{content::ContentNode, doccomment::MarkdownDocParser};
    use pretty_assertions::assert_eq;

    fn model(json: &str) -> SemanticModel {
        SemanticModel::from_json(json).unwrap()
    }

    fn builder(diagnostics: &Diagnostics) -> ModelBuilder<'_> {
        ModelBuilder::new(Arc::new(MarkdownDocParser), diagnostics)
    }

    const JVM: &str = r#"{
        "platform": "jvm",
        "declarations": [{ "name": "javadoc", "kind": "package", "children": [
            { "name": "Base", "kind": "interface" },
            { "name": "Test", "kind": "class", "doc": "A test class.",
              "supertypes": ["javadoc.Base", "java.lang.Cloneable"],
              "children": [
                { "name": "test", "kind": "function" },
                { "name": "test2", "kind": "function",
                  "parameters": [{ "name": "s", "type": "kotlin.String" }] },
                { "name": "test3", "kind": "function", "type_parameters": ["T"],
                  "parameters": [{ "name": "t", "type": "T" }], "return_type": "kotlin.collections.List<T>" },
                { "name": "jsOnly", "kind": "function", "platforms": ["js"] }
              ] }
        ] }]
    }"#;

    const JS: &str = r#"{
        "platform": "js",
        "declarations": [{ "name": "javadoc", "kind": "package", "children": [
            { "name": "Test", "kind": "class", "doc": "A test class.", "children": [
                { "name": "test", "kind": "function" }
            ] }
        ] }]
    }"#;

    #[test]
    fn identities_encode_signatures() {
        let diagnostics = Diagnostics::new();
        let built = builder(&diagnostics).build("demo", &[model(JVM)]).unwrap();
        let ids: Vec<String> = built.nodes().iter().map(|n| n.id.to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "javadoc",
                "javadoc.Base",
                "javadoc.Test",
                "javadoc.Test.test()",
                "javadoc.Test.test2(kotlin.String)",
                "javadoc.Test.test3(T)",
            ]
        );
        let test3 = built
            .find(&DeclarationId::callable("javadoc.Test.test3", ["T"]))
            .unwrap();
        assert_eq!(
            test3.return_type.as_ref().map(ToString::to_string).as_deref(),
            Some("kotlin.collections.List<T>")
        );
        // js is not analysed in this run.
        assert_eq!(
            diagnostics.entries(),
            vec![Diagnostic::DroppedDeclaration {
                id: DeclarationId::callable("javadoc.Test.jsOnly", Vec::<String>::new()),
                pass: "jvm".into(),
            }]
        );
    }

    #[test]
    fn merges_platforms_and_builds_graph() {
        let diagnostics = Diagnostics::new();
        let built = builder(&diagnostics).build("demo", &[model(JVM), model(JS)]).unwrap();
        assert!(diagnostics.is_empty());

        let test = built.find(&DeclarationId::new("javadoc.Test")).unwrap();
        assert!(test.is_common(&built.source_sets));
        assert_eq!(
            test.documentation.shared(),
            Some(&[ContentNode::Paragraph {
                children: vec![ContentNode::text("A test class.")]
            }][..])
        );
        let js_only = built
            .find(&DeclarationId::callable("javadoc.Test.jsOnly", Vec::<String>::new()))
            .unwrap();
        assert_eq!(built.platform_labels(js_only), vec!["js".to_string()]);
        let test2 = built
            .find(&DeclarationId::callable("javadoc.Test.test2", ["kotlin.String"]))
            .unwrap();
        assert_eq!(built.platform_labels(test2), vec!["jvm".to_string()]);

        let test_id = DeclarationId::new("javadoc.Test");
        assert_eq!(
            built.graph.targets(&test_id, EdgeKind::Implements),
            vec![&DeclarationId::new("javadoc.Base")]
        );
        assert_eq!(
            built.graph.targets(&test_id, EdgeKind::Extends),
            vec![&DeclarationId::new("java.lang.Cloneable")]
        );
        assert!(built.graph.is_external(&DeclarationId::new("java.lang.Cloneable")));
    }

    #[test]
    fn implied_platforms_cover_unnamed_passes() {
        let diagnostics = Diagnostics::new();
        let unnamed = model(r#"{ "platform": "", "declarations": [{ "name": "p", "kind": "package" }] }"#);
        let built = builder(&diagnostics)
            .with_implied_platforms(["jvm"])
            .build("demo", &[unnamed])
            .unwrap();
        assert_eq!(built.packages[0].source_sets, BTreeSet::from([SourceSetId::new("jvm")]));
        assert!(built.platform_labels(&built.packages[0]).is_empty());
    }

    #[test]
    fn kind_disagreement_is_fatal() {
        let diagnostics = Diagnostics::new();
        let js = model(
            r#"{ "platform": "js", "declarations": [{ "name": "javadoc", "kind": "package",
                 "children": [{ "name": "Test", "kind": "object" }] }] }"#,
        );
        let err = builder(&diagnostics).build("demo", &[model(JVM), js]).unwrap_err();
        assert!(matches!(err, ApiweaveError::ModelInconsistency { .. }));
    }

    #[test]
    fn cycles_are_reported() {
        let diagnostics = Diagnostics::new();
        let cyclic = model(
            r#"{ "platform": "jvm", "declarations": [{ "name": "p", "kind": "package", "children": [
                { "name": "A", "kind": "class", "supertypes": ["p.B"] },
                { "name": "B", "kind": "class", "supertypes": ["p.A"] }
            ] }] }"#,
        );
        builder(&diagnostics).build("demo", &[cyclic]).unwrap();
        assert!(
            diagnostics
                .entries()
                .iter()
                .all(|d| matches!(d, Diagnostic::CyclicSupertype { .. }))
        );
        assert_eq!(diagnostics.len(), 2);
    }
}
