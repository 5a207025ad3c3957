//! CSV edge list.

use super::{ExportError, ExportStats, subset_edges, write_atomic};
use crate::filter::FilterOutcome;
use crate::graph::{ObjectGraph, ObjectInfo};
use crate::interchange::ModelAccess;
use serde::Serialize;
use std::path::Path;

/// One CSV row; field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeRow<'a> {
    pub src_id: String,
    pub src_class: &'a str,
    pub feature: String,
    pub dst_id: String,
    pub dst_class: &'a str,
    pub containment: bool,
}

/// Containment rows first, then reference rows, both restricted to `nodes`.
pub fn edge_rows<'a, M: ModelAccess + ?Sized>(
    model: &'a M,
    graph: &ObjectGraph,
    nodes: &[&ObjectInfo],
) -> Vec<EdgeRow<'a>> {
    let local_id = |handle| {
        graph
            .get(handle)
            .map(|info| info.local_id.to_string())
            .unwrap_or_default()
    };
    subset_edges(model, graph, nodes)
        .into_iter()
        .map(|edge| EdgeRow {
            src_id: local_id(edge.source),
            src_class: model.class_name(edge.source),
            feature: edge.feature.to_string(),
            dst_id: local_id(edge.target),
            dst_class: model.class_name(edge.target),
            containment: edge.containment,
        })
        .collect()
}

pub fn render_edges(rows: &[EdgeRow<'_>]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(["src_id", "src_class", "feature", "dst_id", "dst_class", "containment"])?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(csv::Error::from(e.into_error())))
}

pub fn export_edges<M: ModelAccess + ?Sized>(
    model: &M,
    graph: &ObjectGraph,
    outcome: &FilterOutcome<'_>,
    path: &Path,
) -> Result<ExportStats, ExportError> {
    let rows = edge_rows(model, graph, &outcome.nodes);
    write_atomic(path, &render_edges(&rows)?)?;
    Ok(ExportStats {
        nodes: outcome.nodes.len(),
        edges: rows.len(),
        metrics: outcome.metrics,
    })
}
