//! Filter and expansion engine.
//!
//! Three optional stages run in a fixed order over the graph's nodes:
//!
//! ```text
//! graph nodes ─▶ neighbor_expr/hops ─▶ expand_expr/depth/classes ─▶ filter_expr ─▶ outcome
//!                (seed + n hops)       (BFS from start nodes)        (keep matches)
//! ```
//!
//! Each stage sees only what the previous one kept. Every expression is
//! compiled before any stage runs, so a bad expression fails the whole call.

mod expand;
mod neighbors;

pub use expand::{Expansion, ExpansionMetrics, depth_limit, expand_from};
pub use neighbors::{NeighborMetrics, neighbor_expand};

use crate::base::{ObjectHandle, TracePath};
use crate::graph::{ObjectGraph, ObjectInfo};
use crate::interchange::ModelAccess;
use crate::query::{ExpressionError, PredicateContext, build_optional};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stage parameters. Every field is optional; an empty value skips its stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterOptions {
    pub filter_expr: Option<String>,
    pub expand_expr: Option<String>,
    pub expand_depth: Option<i64>,
    pub expand_classes: Option<Vec<String>>,
    pub neighbor_expr: Option<String>,
    pub neighbor_hops: Option<usize>,
}

impl FilterOptions {
    /// True if no stage will run.
    pub fn is_passthrough(&self) -> bool {
        let blank = |s: &Option<String>| s.as_deref().is_none_or(|s| s.trim().is_empty());
        blank(&self.filter_expr) && blank(&self.expand_expr) && blank(&self.neighbor_expr)
    }
}

/// Metrics of the stages that ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighbors: Option<NeighborMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expansion: Option<ExpansionMetrics>,
}

impl FilterMetrics {
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_none() && self.expansion.is_none()
    }
}

/// Surviving nodes in graph order, plus what the stages recorded.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome<'g> {
    pub nodes: Vec<&'g ObjectInfo>,
    pub metrics: FilterMetrics,
    /// Present only when the expansion stage ran.
    pub label_paths: Option<FxHashMap<ObjectHandle, TracePath>>,
    pub id_paths: Option<FxHashMap<ObjectHandle, TracePath>>,
}

impl<'g> FilterOutcome<'g> {
    /// Every graph node, no stage applied.
    pub fn all(graph: &'g ObjectGraph) -> Self {
        Self {
            nodes: graph.nodes().iter().collect(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn label_path(&self, handle: ObjectHandle) -> Option<&TracePath> {
        self.label_paths.as_ref()?.get(&handle)
    }

    pub fn id_path(&self, handle: ObjectHandle) -> Option<&TracePath> {
        self.id_paths.as_ref()?.get(&handle)
    }
}

/// Run the neighbor, expansion and filter stages over `graph`.
pub fn apply_filter<'g, M: ModelAccess + ?Sized>(
    model: &M,
    graph: &'g ObjectGraph,
    options: &FilterOptions,
) -> Result<FilterOutcome<'g>, ExpressionError> {
    let filter = build_optional(options.filter_expr.as_deref())?;
    let expand = build_optional(options.expand_expr.as_deref())?;
    let neighbor = build_optional(options.neighbor_expr.as_deref())?;

    let mut outcome = FilterOutcome::all(graph);

    if let Some(seed) = neighbor {
        let hops = options.neighbor_hops.unwrap_or(1);
        let (nodes, metrics) = neighbor_expand(model, graph, &outcome.nodes, &seed, hops);
        outcome.nodes = nodes;
        outcome.metrics.neighbors = Some(metrics);
    }

    if let Some(start) = expand {
        let classes: Option<FxHashSet<String>> = options.expand_classes.as_ref().map(|names| {
            names
                .iter()
                .map(|n| n.trim())
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect()
        });
        let expansion = expand_from(
            model,
            graph,
            &outcome.nodes,
            &start,
            options.expand_depth,
            classes.as_ref(),
        );
        outcome.nodes = expansion.nodes;
        outcome.metrics.expansion = Some(expansion.metrics);
        outcome.label_paths = Some(expansion.label_paths);
        outcome.id_paths = Some(expansion.id_paths);
    }

    if let Some(filter) = filter {
        outcome
            .nodes
            .retain(|info| filter.matches(&PredicateContext::new(model, info)));
        let kept: FxHashSet<ObjectHandle> = outcome.nodes.iter().map(|n| n.handle).collect();
        for paths in [&mut outcome.label_paths, &mut outcome.id_paths]
            .into_iter()
            .flatten()
        {
            paths.retain(|handle, _| kept.contains(handle));
        }
    }

    debug!("Filter: {} of {} nodes kept", outcome.nodes.len(), graph.len());
    Ok(outcome)
}
