//! Reachability expansion from start nodes.
//!
//! Breadth-first over outgoing references, with an optional class filter on
//! the objects that may be entered:
//!
//! ```text
//! depth None   one hop
//! depth 0      start nodes only
//! depth N      up to N hops
//! depth < 0    until the frontier empties
//! ```
//!
//! Every visited object gets two trace paths from its start node: one built
//! from `name` attributes and one from preferred identifiers.

use crate::base::{ObjectHandle, TracePath};
use crate::graph::{ObjectGraph, ObjectInfo};
use crate::interchange::ModelAccess;
use crate::query::{Predicate, PredicateContext};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::debug;

/// Counters reported by [`expand_from`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExpansionMetrics {
    pub start_nodes: usize,
    pub nodes_seen: usize,
    pub edges_traversed: usize,
    /// Edges whose target had already been visited.
    pub loops_detected: usize,
    /// Hops actually executed.
    pub max_depth: usize,
}

/// Result of [`expand_from`].
#[derive(Debug, Clone, Default)]
pub struct Expansion<'g> {
    /// Visited graph nodes in graph order.
    pub nodes: Vec<&'g ObjectInfo>,
    pub metrics: ExpansionMetrics,
    pub label_paths: FxHashMap<ObjectHandle, TracePath>,
    pub id_paths: FxHashMap<ObjectHandle, TracePath>,
}

/// Hop limit for a requested depth.
pub fn depth_limit(depth: Option<i64>) -> usize {
    match depth {
        None => 1,
        Some(d) if d < 0 => usize::MAX,
        Some(d) => d as usize,
    }
}

/// Expand from the members of `nodes` matching `start`.
///
/// When `allowed` is given, start nodes and entered targets must have one of
/// those class names; a rejected target still counts as a traversed edge but
/// is neither visited nor explored.
pub fn expand_from<'g, M: ModelAccess + ?Sized>(
    model: &M,
    graph: &'g ObjectGraph,
    nodes: &[&'g ObjectInfo],
    start: &Predicate,
    depth: Option<i64>,
    allowed: Option<&FxHashSet<String>>,
) -> Expansion<'g> {
    let class_allowed =
        |handle: ObjectHandle| allowed.is_none_or(|set| set.contains(model.class_name(handle)));
    let id_of = |handle: ObjectHandle| -> String {
        match graph.get(handle) {
            Some(info) => info.preferred_id.clone(),
            None => model.document_id(handle).unwrap_or_default().to_string(),
        }
    };

    let mut seen: FxHashSet<ObjectHandle> = FxHashSet::default();
    let mut label_paths = FxHashMap::default();
    let mut id_paths = FxHashMap::default();
    let mut frontier: Vec<ObjectHandle> = Vec::new();
    for info in nodes {
        if !class_allowed(info.handle) || !start.matches(&PredicateContext::new(model, info)) {
            continue;
        }
        if seen.insert(info.handle) {
            label_paths.insert(info.handle, TracePath::start(&model.display_name(info.handle)));
            id_paths.insert(info.handle, TracePath::start(&info.preferred_id));
            frontier.push(info.handle);
        }
    }

    let mut metrics = ExpansionMetrics {
        start_nodes: frontier.len(),
        ..ExpansionMetrics::default()
    };
    if frontier.is_empty() {
        debug!("Expansion: no start node matched `{}`", start.source());
        return Expansion {
            metrics,
            ..Expansion::default()
        };
    }

    let limit = depth_limit(depth);
    while !frontier.is_empty() && metrics.max_depth < limit {
        metrics.max_depth += 1;
        let mut next = Vec::new();
        for handle in frontier {
            for slot in model.reference_slots(handle) {
                for target in slot.targets.iter().flatten().copied() {
                    metrics.edges_traversed += 1;
                    if seen.contains(&target) {
                        metrics.loops_detected += 1;
                        continue;
                    }
                    if !class_allowed(target) {
                        continue;
                    }
                    seen.insert(target);
                    let label = label_paths
                        .get(&handle)
                        .map(|p: &TracePath| p.extend(&model.display_name(target)));
                    let id = id_paths.get(&handle).map(|p: &TracePath| p.extend(&id_of(target)));
                    if let (Some(label), Some(id)) = (label, id) {
                        label_paths.insert(target, label);
                        id_paths.insert(target, id);
                    }
                    next.push(target);
                }
            }
        }
        frontier = next;
    }
    metrics.nodes_seen = seen.len();

    let visited: Vec<&ObjectInfo> = graph
        .nodes()
        .iter()
        .filter(|info| seen.contains(&info.handle))
        .collect();
    label_paths.retain(|handle, _| graph.contains(*handle));
    id_paths.retain(|handle, _| graph.contains(*handle));
    debug!(
        "Expansion: start_nodes={} visited={} loops={}",
        metrics.start_nodes,
        visited.len(),
        metrics.loops_detected
    );

    Expansion {
        nodes: visited,
        metrics,
        label_paths,
        id_paths,
    }
}
