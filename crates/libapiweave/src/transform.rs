//! Model transforms applied between model building and page building.

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use crate::{
    error::Result,
    graph::EdgeKind,
    identity::DeclarationId,
    model::{DocNode, Documentation, DocumentationModel},
};

/// A pass over the merged documentation model.
///
/// Transforms may add, replace or reorder nodes and content. They must be idempotent: running a
/// transform on its own output leaves the model unchanged, since multi-pass formats may re-enter
/// the transform stage.
pub trait ModelTransform: Send + Sync {
    /// Name used in logs and registration.
    fn name(&self) -> &str;

    /// Apply the transform in place.
    fn transform(&self, model: &mut DocumentationModel) -> Result<()>;
}

impl fmt::Debug for dyn ModelTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelTransform({})", self.name())
    }
}

/// Orders packages by name and members by kind, then name, then signature.
#[derive(Debug, Default, Clone, Copy)]
pub struct SortMembers;

impl ModelTransform for SortMembers {
    fn name(&self) -> &str {
        "sort-members"
    }

    fn transform(&self, model: &mut DocumentationModel) -> Result<()> {
        model.packages.sort_by(|a, b| a.name.cmp(&b.name));
        model.visit_mut(&mut |node| {
            node.children.sort_by(|a, b| {
                a.kind
                    .cmp(&b.kind)
                    .then_with(|| a.name.cmp(&b.name))
                    .then_with(|| a.id.cmp(&b.id))
            });
        });
        Ok(())
    }
}

/// Gives undocumented overriding members the documentation of the member they override.
///
/// Override chains are followed until a documented member is found; chains that loop back on
/// themselves stop at the first repeat.
#[derive(Debug, Default, Clone, Copy)]
pub struct InheritDocs;

impl ModelTransform for InheritDocs {
    fn name(&self) -> &str {
        "inherit-docs"
    }

    fn transform(&self, model: &mut DocumentationModel) -> Result<()> {
        let documented: HashMap<DeclarationId, Documentation> = model
            .nodes()
            .into_iter()
            .filter(|n| !n.documentation.is_empty())
            .map(|n| (n.id.clone(), n.documentation.clone()))
            .collect();
        let graph = model.graph.clone();

        model.visit_mut(&mut |node: &mut DocNode| {
            if !node.documentation.is_empty() {
                return;
            }
            let mut seen = HashSet::from([node.id.clone()]);
            let mut frontier: Vec<DeclarationId> = graph
                .targets(&node.id, EdgeKind::Overrides)
                .into_iter()
                .cloned()
                .collect();
            while let Some(candidate) = frontier.pop() {
                if !seen.insert(candidate.clone()) {
                    continue;
                }
                if let Some(docs) = documented.get(&candidate) {
                    node.documentation = inherited(docs, node);
                    return;
                }
                frontier.extend(
                    graph
                        .targets(&candidate, EdgeKind::Overrides)
                        .into_iter()
                        .cloned(),
                );
            }
        });
        Ok(())
    }
}

/// Project the documentation of an overridden member onto the source sets of `node`.
fn inherited(source: &Documentation, node: &DocNode) -> Documentation {
    let mut docs = Documentation::default();
    for source_set in &node.source_sets {
        let content = source
            .get(source_set)
            .filter(|c| !c.is_empty())
            .or_else(|| source.shared());
        if let Some(content) = content {
            docs.set(source_set.clone(), content.to_vec());
        }
    }
    docs
}
