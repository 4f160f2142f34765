//! Total node-id resolution: direct hit, then migration, then root.

use serde::Serialize;

use super::graph::{Node, StoryGraph};
use super::migration::MigrationMap;

/// How an id was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedVia {
    Direct,
    Migrated,
    Fallback,
}

/// A node together with how it was found.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub node: &'a Node,
    pub via: ResolvedVia,
}

/// Read-only view pairing a graph with its migration map.
#[derive(Debug, Clone, Copy)]
pub struct NodeResolver<'a> {
    graph: &'a StoryGraph,
    migrations: &'a MigrationMap,
}

impl<'a> NodeResolver<'a> {
    /// Creates a resolver.
    #[must_use]
    pub fn new(graph: &'a StoryGraph, migrations: &'a MigrationMap) -> Self {
        Self { graph, migrations }
    }

    /// Direct or migrated lookup, without the root fallback.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<&'a Node> {
        self.graph.get(id).or_else(|| {
            self.migrations
                .canonical(id)
                .and_then(|canonical| self.graph.get(canonical))
        })
    }

    /// Resolves any id to a node, recording the path taken.
    #[must_use]
    pub fn resolve_with_trace(&self, id: &str) -> Resolved<'a> {
        if let Some(node) = self.graph.get(id) {
            return Resolved {
                node,
                via: ResolvedVia::Direct,
            };
        }
        if let Some(node) = self
            .migrations
            .canonical(id)
            .and_then(|canonical| self.graph.get(canonical))
        {
            return Resolved {
                node,
                via: ResolvedVia::Migrated,
            };
        }
        Resolved {
            node: self.graph.root(),
            via: ResolvedVia::Fallback,
        }
    }

    /// Resolves any id to a node. Never fails.
    #[must_use]
    pub fn resolve(&self, id: &str) -> &'a Node {
        self.resolve_with_trace(id).node
    }

    /// The canonical id `id` resolves to.
    #[must_use]
    pub fn canonical_id(&self, id: &str) -> &'a str {
        &self.resolve(id).id
    }
}
