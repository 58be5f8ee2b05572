//! Combining the per-platform trees of the same declarations.
//!
//! Field rules when two nodes share an identity:
//!
//! | field | rule |
//! |---|---|
//! | `kind` | must match, otherwise the model is inconsistent |
//! | `source_sets`, `modifiers` | union |
//! | `documentation` | per source set; the earlier platform wins for a source set present in both |
//! | `supertypes`, `overrides` | union, first-seen order |
//! | `children` | merged recursively by identity, first-seen order |
//! | `parameters`, `type_parameters`, `return_type` | first non-empty value |

use crate::{
    error::{ApiweaveError, Result},
    model::DocNode,
};

/// Merge per-platform forests, in platform order, into one forest.
pub fn merge_forests(forests: impl IntoIterator<Item = Vec<DocNode>>) -> Result<Vec<DocNode>> {
    let mut merged = Vec::new();
    for forest in forests {
        merge_children(&mut merged, forest)?;
    }
    Ok(merged)
}

/// Fold `incoming` into `target`, matching nodes by identity.
fn merge_children(target: &mut Vec<DocNode>, incoming: Vec<DocNode>) -> Result<()> {
    for node in incoming {
        match target.iter_mut().find(|t| t.id == node.id) {
            Some(existing) => merge_node(existing, node)?,
            None => target.push(node),
        }
    }
    Ok(())
}

/// Merge `other` into `target`. Both must carry the same identity.
pub fn merge_node(target: &mut DocNode, other: DocNode) -> Result<()> {
    debug_assert_eq!(target.id, other.id);
    if target.kind != other.kind {
        return Err(ApiweaveError::inconsistent(
            &target.id,
            format!(
                "declared as {} on {} but as {} on {}",
                target.kind.label(),
                platform_list(target),
                other.kind.label(),
                platform_list(&other)
            ),
        ));
    }

    target.source_sets.extend(other.source_sets);
    target.modifiers |= other.modifiers;
    target.documentation.merge(other.documentation);
    for supertype in other.supertypes {
        if !target.supertypes.contains(&supertype) {
            target.supertypes.push(supertype);
        }
    }
    for overridden in other.overrides {
        if !target.overrides.contains(&overridden) {
            target.overrides.push(overridden);
        }
    }
    if target.parameters.is_empty() {
        target.parameters = other.parameters;
    }
    if target.type_parameters.is_empty() {
        target.type_parameters = other.type_parameters;
    }
    if target.return_type.is_none() {
        target.return_type = other.return_type;
    }
    merge_children(&mut target.children, other.children)
}

/// Comma separated source sets of a node, for messages.
fn platform_list(node: &DocNode) -> String {
    node.source_sets
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
