//! Seeded neighborhood expansion.

use crate::base::ObjectHandle;
use crate::graph::{ObjectGraph, ObjectInfo};
use crate::interchange::ModelAccess;
use crate::query::{Predicate, PredicateContext};
use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::debug;

/// Counters reported by [`neighbor_expand`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NeighborMetrics {
    pub seed_nodes: usize,
    pub nodes_seen: usize,
    pub edges_traversed: usize,
    /// Hops actually executed; less than requested when the frontier empties.
    pub max_hops: usize,
}

/// Grow the seed set by `hops` rounds of outgoing references.
///
/// Seeds are the members of `nodes` matching `seed`. Every reference slot of
/// every frontier object is followed, containments included. Targets outside
/// `graph` are walked through but never returned. The result keeps graph
/// order.
pub fn neighbor_expand<'g, M: ModelAccess + ?Sized>(
    model: &M,
    graph: &'g ObjectGraph,
    nodes: &[&'g ObjectInfo],
    seed: &Predicate,
    hops: usize,
) -> (Vec<&'g ObjectInfo>, NeighborMetrics) {
    let mut seen: FxHashSet<ObjectHandle> = FxHashSet::default();
    let mut frontier: Vec<ObjectHandle> = Vec::new();
    for info in nodes {
        if seed.matches(&PredicateContext::new(model, info)) && seen.insert(info.handle) {
            frontier.push(info.handle);
        }
    }

    let mut metrics = NeighborMetrics {
        seed_nodes: frontier.len(),
        ..NeighborMetrics::default()
    };
    if frontier.is_empty() {
        debug!("Neighbor expansion: no seed matched `{}`", seed.source());
        return (Vec::new(), metrics);
    }

    for _ in 0..hops {
        if frontier.is_empty() {
            break;
        }
        metrics.max_hops += 1;
        let mut next = Vec::new();
        for handle in frontier {
            for slot in model.reference_slots(handle) {
                for target in slot.targets.iter().flatten().copied() {
                    metrics.edges_traversed += 1;
                    if seen.insert(target) {
                        next.push(target);
                    }
                }
            }
        }
        frontier = next;
    }
    metrics.nodes_seen = seen.len();

    let result: Vec<&ObjectInfo> = graph
        .nodes()
        .iter()
        .filter(|info| seen.contains(&info.handle))
        .collect();
    debug!(
        "Neighbor expansion: seeds={} hops={} result={}",
        metrics.seed_nodes,
        metrics.max_hops,
        result.len()
    );
    (result, metrics)
}
