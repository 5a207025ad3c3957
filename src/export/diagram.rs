//! Mermaid, PlantUML and GML renderings of a node subset.
//!
//! All three use local ids as node keys and share the edge order of
//! [`subset_edges`]: containment first, then references.

use super::{ExportError, ExportStats, node_label, subset_edges, write_atomic};
use crate::base::ObjectHandle;
use crate::filter::FilterOutcome;
use crate::graph::{Edge, ObjectGraph, ObjectInfo};
use crate::interchange::ModelAccess;
use std::fmt::Write as _;
use std::path::Path;

fn key(graph: &ObjectGraph, handle: ObjectHandle) -> String {
    graph
        .get(handle)
        .map(|info| info.local_id.to_string())
        .unwrap_or_default()
}

/// Rendered text plus its node and edge counts.
type Rendered = (String, usize, usize);

// ============================================================================
// MERMAID
// ============================================================================

/// `graph LR` flowchart; references are dotted arrows.
pub fn render_mermaid<M: ModelAccess + ?Sized>(
    model: &M,
    graph: &ObjectGraph,
    nodes: &[&ObjectInfo],
) -> Rendered {
    let edges = subset_edges(model, graph, nodes);
    let mut out = String::from("graph LR\n");
    for info in nodes {
        let label = node_label(model, info).replace('"', "#quot;");
        let _ = writeln!(out, "  {}[\"{label}\"]", info.local_id);
    }
    for edge in &edges {
        let arrow = if edge.containment { "-->" } else { "-.->" };
        let _ = writeln!(
            out,
            "  {} {arrow}|{}| {}",
            key(graph, edge.source),
            edge.feature,
            key(graph, edge.target)
        );
    }
    (out, nodes.len(), edges.len())
}

// ============================================================================
// PLANTUML
// ============================================================================

/// Object diagram; containment is composition (`*--`).
pub fn render_plantuml<M: ModelAccess + ?Sized>(
    model: &M,
    graph: &ObjectGraph,
    nodes: &[&ObjectInfo],
) -> Rendered {
    let edges = subset_edges(model, graph, nodes);
    let mut out = String::from("@startuml\n");
    for info in nodes {
        let label = node_label(model, info).replace('"', "'");
        let _ = writeln!(out, "object \"{label}\" as {}", info.local_id);
    }
    for edge in &edges {
        let arrow = if edge.containment { "*--" } else { "-->" };
        let _ = writeln!(
            out,
            "{} {arrow} {} : {}",
            key(graph, edge.source),
            key(graph, edge.target),
            edge.feature
        );
    }
    out.push_str("@enduml\n");
    (out, nodes.len(), edges.len())
}

// ============================================================================
// GML
// ============================================================================

fn gml_string(text: &str) -> String {
    text.replace('&', "&amp;").replace('"', "&quot;")
}

fn gml_id(graph: &ObjectGraph, edge_end: ObjectHandle) -> usize {
    graph
        .get(edge_end)
        .map(|info| info.local_id.ordinal())
        .unwrap_or_default()
}

fn write_gml_edge(out: &mut String, graph: &ObjectGraph, edge: &Edge) {
    let _ = write!(
        out,
        "  edge [\n    source {}\n    target {}\n    label \"{}\"\n    containment {}\n  ]\n",
        gml_id(graph, edge.source),
        gml_id(graph, edge.target),
        gml_string(&edge.feature),
        u8::from(edge.containment)
    );
}

/// Directed GML graph; node ids are local id ordinals.
pub fn render_gml<M: ModelAccess + ?Sized>(
    model: &M,
    graph: &ObjectGraph,
    nodes: &[&ObjectInfo],
) -> Rendered {
    let edges = subset_edges(model, graph, nodes);
    let mut out = String::from("graph [\n  directed 1\n");
    for info in nodes {
        let _ = write!(
            out,
            "  node [\n    id {}\n    label \"{}\"\n    class \"{}\"\n    path \"{}\"\n  ]\n",
            info.local_id.ordinal(),
            gml_string(&node_label(model, info)),
            gml_string(model.class_name(info.handle)),
            gml_string(info.path.as_str())
        );
    }
    for edge in &edges {
        write_gml_edge(&mut out, graph, edge);
    }
    out.push_str("]\n");
    (out, nodes.len(), edges.len())
}

// ============================================================================
// FILE EXPORT
// ============================================================================

fn export_with<M: ModelAccess + ?Sized>(
    render: fn(&M, &ObjectGraph, &[&ObjectInfo]) -> Rendered,
    model: &M,
    graph: &ObjectGraph,
    outcome: &FilterOutcome<'_>,
    path: &Path,
) -> Result<ExportStats, ExportError> {
    let (text, nodes, edges) = render(model, graph, &outcome.nodes);
    write_atomic(path, text.as_bytes())?;
    Ok(ExportStats {
        nodes,
        edges,
        metrics: outcome.metrics,
    })
}

pub fn export_mermaid<M: ModelAccess + ?Sized>(
    model: &M,
    graph: &ObjectGraph,
    outcome: &FilterOutcome<'_>,
    path: &Path,
) -> Result<ExportStats, ExportError> {
    export_with(render_mermaid::<M>, model, graph, outcome, path)
}

pub fn export_plantuml<M: ModelAccess + ?Sized>(
    model: &M,
    graph: &ObjectGraph,
    outcome: &FilterOutcome<'_>,
    path: &Path,
) -> Result<ExportStats, ExportError> {
    export_with(render_plantuml::<M>, model, graph, outcome, path)
}

pub fn export_gml<M: ModelAccess + ?Sized>(
    model: &M,
    graph: &ObjectGraph,
    outcome: &FilterOutcome<'_>,
    path: &Path,
) -> Result<ExportStats, ExportError> {
    export_with(render_gml::<M>, model, graph, outcome, path)
}
