//! Exporters over a filtered object set.
//!
//! Each format builds its rows or text from the graph and a
//! [`FilterOutcome`], then the `export_*` function persists it through
//! [`write_atomic`].
//!
//! ```text
//! ObjectGraph + FilterOutcome ─▶ json_entries / edge_rows / render_mermaid
//!                                render_plantuml / render_gml / path_lines
//!                              ─▶ write_atomic(path) ─▶ ExportStats
//! ```
//!
//! Pruned XMI re-serialization ([`export_filtered_instance`]) works on the
//! instance directly and selects by class instead of by predicate.

mod diagram;
mod edges;
mod instance;
mod json;
mod paths;

pub use diagram::{
    export_gml, export_mermaid, export_plantuml, render_gml, render_mermaid, render_plantuml,
};
pub use edges::{EdgeRow, edge_rows, export_edges, render_edges};
pub use instance::{InstanceExportStats, InstanceSelection, export_filtered_instance, render_filtered_instance};
pub use json::{
    ModelDump, dump_instances_by_class, export_json, json_entries, model_dump, summarize_model,
};
pub use paths::{export_path_ids, export_paths, path_id_rows, path_lines};
pub(crate) use json::write_json;

use crate::filter::FilterMetrics;
use crate::graph::{Edge, ObjectGraph, ObjectInfo, subset_table};
use crate::interchange::{LoadError, ModelAccess};
use crate::query::ExpressionError;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// ERRORS AND STATS
// ============================================================================

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid filter expression: {0}")]
    Expression(#[from] ExpressionError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{0} requires an expansion expression")]
    ExpansionRequired(&'static str),
}

impl ExportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Summary returned by the graph exporters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportStats {
    pub nodes: usize,
    pub edges: usize,
    pub metrics: FilterMetrics,
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Write `bytes` to `path` through a temporary file in the same directory.
///
/// The target is either fully replaced or left untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(|e| ExportError::io(dir, e))?;
    file.write_all(bytes).map_err(|e| ExportError::io(path, e))?;
    file.flush().map_err(|e| ExportError::io(path, e))?;
    file.persist(path).map_err(|e| ExportError::io(path, e.error))?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Containment edges inside `nodes`, then reference edges between them.
pub(crate) fn subset_edges<M: ModelAccess + ?Sized>(
    model: &M,
    graph: &ObjectGraph,
    nodes: &[&ObjectInfo],
) -> Vec<Edge> {
    let members = subset_table(nodes);
    let mut edges: Vec<Edge> = graph
        .containment_edges_within(&members)
        .into_iter()
        .cloned()
        .collect();
    edges.extend(graph.reference_edges(model, nodes));
    edges
}

/// `Class` or `Class: name` for diagram labels.
pub(crate) fn node_label<M: ModelAccess + ?Sized>(model: &M, info: &ObjectInfo) -> String {
    let class = model.class_name(info.handle);
    let name = model.display_name(info.handle);
    if name.is_empty() {
        class.to_string()
    } else {
        format!("{class}: {name}")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::base::ObjectHandle;
    use crate::interchange::{Instance, Metamodel};
    use std::sync::Arc;

    /// `Team` contains `Person`s; `Person.manager` is a plain reference.
    ///
    /// ```text
    /// Team "core"
    /// ├── members[0] Person "ann"   (id P1)
    /// └── members[1] Person "bob"   manager → ann
    /// ```
    pub(crate) fn team() -> (Instance, Vec<ObjectHandle>) {
        let mut b = Metamodel::builder();
        let pkg = b.package("org", Some("http://org"), Some("org"), None);
        let person = b.class(pkg, "Person");
        b.attribute(person, "name", "EString", false);
        b.attribute(person, "skills", "EString", true);
        b.reference(person, "manager", person, false, false);
        let team = b.class(pkg, "Team");
        b.attribute(team, "name", "EString", false);
        b.reference(team, "members", person, true, true);

        let mut inst = Instance::new(Arc::new(b.build()));
        let root = inst.create_named("Team").unwrap();
        inst.add_root(root);
        inst.set_attribute(root, "name", "core");
        let ann = inst.create_named("Person").unwrap();
        inst.set_attribute(ann, "name", "ann");
        inst.set_attribute(ann, "skills", vec!["rust", "xml"]);
        inst.set_document_id(ann, "P1");
        let bob = inst.create_named("Person").unwrap();
        inst.set_attribute(bob, "name", "bob");
        inst.add_child(root, "members", ann);
        inst.add_child(root, "members", bob);
        inst.add_reference(bob, "manager", Some(ann));
        (inst, vec![root])
    }

    #[test]
    fn test_write_atomic_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_atomic_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.txt");
        let err = write_atomic(&path, b"data").unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_subset_edges_order() {
        let (inst, roots) = team();
        let graph = crate::graph::build_object_graph(&inst, &roots);
        let nodes: Vec<_> = graph.nodes().iter().collect();
        let edges = subset_edges(&inst, &graph, &nodes);
        let kinds: Vec<_> = edges.iter().map(|e| (e.feature.as_str(), e.containment)).collect();
        assert_eq!(
            kinds,
            vec![("members", true), ("members", true), ("manager", false)]
        );
        assert_eq!(node_label(&inst, &graph.nodes()[0]), "Team: core");
    }
}
