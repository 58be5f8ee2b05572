//! Identity-keyed index of declarations and the relations between them.
//!
//! Nodes are stored in an arena and looked up by [`DeclarationId`]; relations never hold
//! references to model nodes, so merged nodes from different platforms cannot alias.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::warn;

use crate::{
    diagnostics::{Diagnostic, Diagnostics},
    error::{ApiweaveError, Result},
    identity::DeclarationId,
    model::DeclKind,
};

/// Kind of a relation between two declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKind {
    /// Class-to-superclass.
    Extends,
    /// Type-to-interface.
    Implements,
    /// Member-to-overridden-member.
    Overrides,
}

impl EdgeKind {
    /// Whether the edge participates in ancestor traversal.
    pub fn is_supertype(self) -> bool {
        matches!(self, Self::Extends | Self::Implements)
    }
}

/// Summary of a node stored in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    /// Identity of the node.
    pub id: DeclarationId,
    /// Kind of the node.
    pub kind: DeclKind,
}

/// Index position of a node in the graph arena.
type NodeIdx = usize;

/// An outgoing edge.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edge {
    /// Target identity, which may be external.
    to: DeclarationId,
    /// Relation kind.
    kind: EdgeKind,
}

/// Mutable while the model is built, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    /// Nodes in insertion order, addressed by [`NodeIdx`].
    nodes: Vec<GraphNode>,
    /// Identity to node index.
    index: HashMap<DeclarationId, NodeIdx>,
    /// Outgoing edges per node.
    outgoing: HashMap<NodeIdx, Vec<Edge>>,
    /// Referenced identities with no node of their own.
    external: BTreeSet<DeclarationId>,
}

impl ReferenceGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Re-adding an existing identity with the same kind is a no-op; with a
    /// different kind it is a model inconsistency.
    pub fn add_node(&mut self, id: DeclarationId, kind: DeclKind) -> Result<()> {
        if let Some(&idx) = self.index.get(&id) {
            let existing = &self.nodes[idx];
            if existing.kind != kind {
                return Err(ApiweaveError::inconsistent(
                    &id,
                    format!(
                        "registered as {} and as {}",
                        existing.kind.label(),
                        kind.label()
                    ),
                ));
            }
            return Ok(());
        }
        self.external.remove(&id);
        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(GraphNode { id, kind });
        Ok(())
    }

    /// Add a relation. The source must be a known node; an unknown target is recorded as
    /// external and resolved through external link indexes later.
    pub fn add_edge(&mut self, from: &DeclarationId, to: DeclarationId, kind: EdgeKind) -> Result<()> {
        let Some(&from_idx) = self.index.get(from) else {
            return Err(ApiweaveError::inconsistent(
                from,
                format!("edge to {to} from a declaration missing from the graph"),
            ));
        };
        if !self.index.contains_key(&to) {
            self.external.insert(to.clone());
        }
        let edges = self.outgoing.entry(from_idx).or_default();
        if !edges.iter().any(|e| e.to == to && e.kind == kind) {
            edges.push(Edge { to, kind });
        }
        Ok(())
    }

    /// Look up a node by identity.
    pub fn node(&self, id: &DeclarationId) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    /// Whether the identity is known to the graph.
    pub fn contains(&self, id: &DeclarationId) -> bool {
        self.index.contains_key(id)
    }

    /// Whether the identity was referenced by an edge but is not a local node.
    pub fn is_external(&self, id: &DeclarationId) -> bool {
        self.external.contains(id)
    }

    /// Every external identity referenced by an edge.
    pub fn external_ids(&self) -> impl Iterator<Item = &DeclarationId> {
        self.external.iter()
    }

    /// Number of local nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Targets of edges of `kind` leaving `id`, in insertion order.
    pub fn targets(&self, id: &DeclarationId, kind: EdgeKind) -> Vec<&DeclarationId> {
        self.edges_from(id)
            .filter(|e| e.kind == kind)
            .map(|e| &e.to)
            .collect()
    }

    /// Outgoing edges of `id`.
    fn edges_from(&self, id: &DeclarationId) -> impl Iterator<Item = &Edge> {
        self.index
            .get(id)
            .and_then(|idx| self.outgoing.get(idx))
            .into_iter()
            .flatten()
    }

    /// Members that `id` overrides.
    pub fn overrides(&self, id: &DeclarationId) -> BTreeSet<DeclarationId> {
        self.targets(id, EdgeKind::Overrides)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Members that override `id`.
    pub fn overridden_by(&self, id: &DeclarationId) -> BTreeSet<DeclarationId> {
        self.sources_of(id, |k| k == EdgeKind::Overrides)
    }

    /// Types that directly extend or implement `id`.
    pub fn inheritors(&self, id: &DeclarationId) -> BTreeSet<DeclarationId> {
        self.sources_of(id, EdgeKind::is_supertype)
    }

    /// Sources of incoming edges whose kind satisfies `accept`.
    fn sources_of(&self, id: &DeclarationId, accept: impl Fn(EdgeKind) -> bool) -> BTreeSet<DeclarationId> {
        self.outgoing
            .iter()
            .filter(|(_, edges)| edges.iter().any(|e| &e.to == id && accept(e.kind)))
            .map(|(&idx, _)| self.nodes[idx].id.clone())
            .collect()
    }

    /// Lazy depth-first walk over the supertypes of `id`, excluding `id` itself.
    ///
    /// Each declaration is yielded at most once. Revisiting a declaration already on the walk's
    /// visited set stops that branch and records a cycle; see [`Ancestors::cycles`].
    pub fn ancestors_of(&self, id: &DeclarationId) -> Ancestors<'_> {
        let mut visited = HashSet::new();
        visited.insert(id.clone());
        Ancestors {
            graph: self,
            origin: id.clone(),
            stack: self.supertypes_of(id).into_iter().rev().collect(),
            visited,
            cycles: Vec::new(),
        }
    }

    /// Collect the ancestors of `id`, reporting any cycle to `diagnostics`.
    pub fn ancestors_reporting(&self, id: &DeclarationId, diagnostics: &Diagnostics) -> Vec<DeclarationId> {
        let mut walk = self.ancestors_of(id);
        let ancestors: Vec<DeclarationId> = walk.by_ref().collect();
        for repeated in walk.cycles() {
            diagnostics.report(Diagnostic::CyclicSupertype {
                origin: id.clone(),
                repeated: repeated.clone(),
            });
        }
        ancestors
    }

    /// Whether `to` is reachable from `from` over one or more supertype edges.
    fn reaches(&self, from: &DeclarationId, to: &DeclarationId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = self.supertypes_of(from);
        while let Some(next) = stack.pop() {
            if &next == to {
                return true;
            }
            if seen.insert(next.clone()) {
                stack.extend(self.supertypes_of(&next));
            }
        }
        false
    }

    /// Direct supertypes of `id`.
    fn supertypes_of(&self, id: &DeclarationId) -> Vec<DeclarationId> {
        self.edges_from(id)
            .filter(|e| e.kind.is_supertype())
            .map(|e| e.to.clone())
            .collect()
    }
}

/// Iterator returned by [`ReferenceGraph::ancestors_of`].
#[derive(Debug)]
pub struct Ancestors<'a> {
    /// The graph being walked.
    graph: &'a ReferenceGraph,
    /// Where the walk started.
    origin: DeclarationId,
    /// Declarations still to visit.
    stack: Vec<DeclarationId>,
    /// Declarations already reached.
    visited: HashSet<DeclarationId>,
    /// Declarations reached a second time.
    cycles: Vec<DeclarationId>,
}

impl Ancestors<'_> {
    /// Declarations that were reached a second time during the walk.
    pub fn cycles(&self) -> &[DeclarationId] {
        &self.cycles
    }

    /// Every declaration visited so far, including the origin.
    pub fn visited(&self) -> &HashSet<DeclarationId> {
        &self.visited
    }
}

impl Iterator for Ancestors<'_> {
    type Item = DeclarationId;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(next) = self.stack.pop() {
            if !self.visited.insert(next.clone()) {
                // Diamond inheritance also lands here; only a path back to the origin or to a
                // node that reaches itself is a cycle.
                if next == self.origin || self.graph.reaches(&next, &next) {
                    warn!(origin = %self.origin, repeated = %next, "cyclic supertype chain");
                    if !self.cycles.contains(&next) {
                        self.cycles.push(next);
                    }
                }
                continue;
            }
            let supers = self.graph.supertypes_of(&next);
            self.stack.extend(supers.into_iter().rev());
            return Some(next);
        }
        None
    }
}
