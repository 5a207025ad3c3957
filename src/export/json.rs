//! JSON object export and model summaries.

use super::{ExportError, ExportStats, write_atomic};
use crate::filter::FilterOutcome;
use crate::graph::{ObjectGraph, ObjectInfo, subset_table};
use crate::interchange::{ModelAccess, Value};
use crate::query::{ExpressionError, PredicateContext, build_optional};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// One exported object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectEntry<'a> {
    pub id: String,
    #[serde(rename = "eClass")]
    pub e_class: &'a str,
    #[serde(rename = "nsURI")]
    pub ns_uri: Option<&'a str>,
    pub attributes: IndexMap<&'a str, Value>,
    /// Local ids of contained objects inside the exported set.
    pub containment: Vec<String>,
    /// Local ids of referenced objects inside the exported set, per feature.
    pub references: IndexMap<&'a str, Vec<String>>,
    pub path: &'a str,
}

/// Build one entry per node; links only point at other exported nodes.
pub fn json_entries<'a, M: ModelAccess + ?Sized>(
    model: &'a M,
    graph: &'a ObjectGraph,
    nodes: &[&'a ObjectInfo],
) -> Vec<ObjectEntry<'a>> {
    let members = subset_table(nodes);
    let local_id = |handle| graph.get(handle).map(|info| info.local_id.to_string());

    nodes
        .iter()
        .map(|&info| {
            let attributes = model
                .attribute_values(info.handle)
                .into_iter()
                .map(|(name, value)| (name, value.into_owned()))
                .collect();
            let mut containment = Vec::new();
            let mut references = IndexMap::new();
            for slot in model.reference_slots(info.handle) {
                let ids = slot
                    .targets
                    .iter()
                    .flatten()
                    .filter(|target| members.contains(**target))
                    .filter_map(|target| local_id(*target));
                if slot.containment {
                    containment.extend(ids);
                } else {
                    references.insert(slot.feature, ids.collect());
                }
            }
            ObjectEntry {
                id: info.local_id.to_string(),
                e_class: model.class_name(info.handle),
                ns_uri: model.ns_uri(info.handle),
                attributes,
                containment,
                references,
                path: info.path.as_str(),
            }
        })
        .collect()
}

/// Serialize `value` as indented JSON and write it atomically.
pub(crate) fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), ExportError> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}

pub fn export_json<M: ModelAccess + ?Sized>(
    model: &M,
    graph: &ObjectGraph,
    outcome: &FilterOutcome<'_>,
    path: &Path,
) -> Result<ExportStats, ExportError> {
    let entries = json_entries(model, graph, &outcome.nodes);
    let edges = entries
        .iter()
        .map(|e| e.containment.len() + e.references.values().map(Vec::len).sum::<usize>())
        .sum();
    write_json(&entries, path)?;
    Ok(ExportStats {
        nodes: entries.len(),
        edges,
        metrics: outcome.metrics,
    })
}

// ============================================================================
// DUMPS
// ============================================================================

/// One object in [`dump_instances_by_class`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceEntry<'a> {
    pub id: &'a str,
    pub local_id: String,
    pub path: &'a str,
    pub attributes: IndexMap<&'a str, Value>,
}

/// Objects grouped by class name in first-appearance order, optionally
/// restricted by a filter expression.
pub fn dump_instances_by_class<'a, M: ModelAccess + ?Sized>(
    model: &'a M,
    graph: &'a ObjectGraph,
    filter_expr: Option<&str>,
) -> Result<IndexMap<&'a str, Vec<InstanceEntry<'a>>>, ExpressionError> {
    let filter = build_optional(filter_expr)?;
    let mut out: IndexMap<&str, Vec<InstanceEntry>> = IndexMap::new();
    for info in graph.nodes() {
        if filter
            .as_ref()
            .is_some_and(|f| !f.matches(&PredicateContext::new(model, info)))
        {
            continue;
        }
        out.entry(model.class_name(info.handle))
            .or_default()
            .push(InstanceEntry {
                id: &info.preferred_id,
                local_id: info.local_id.to_string(),
                path: info.path.as_str(),
                attributes: model
                    .attribute_values(info.handle)
                    .into_iter()
                    .map(|(name, value)| (name, value.into_owned()))
                    .collect(),
            });
    }
    Ok(out)
}

/// Object counts of a whole graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDump {
    pub roots: usize,
    pub objects: usize,
    pub containment_edges: usize,
    /// Objects per class, sorted by class name.
    pub classes: IndexMap<String, usize>,
}

pub fn model_dump<M: ModelAccess + ?Sized>(model: &M, graph: &ObjectGraph) -> ModelDump {
    let mut classes: IndexMap<String, usize> = IndexMap::new();
    for info in graph.nodes() {
        *classes
            .entry(model.class_name(info.handle).to_string())
            .or_default() += 1;
    }
    classes.sort_keys();
    ModelDump {
        roots: graph.nodes().iter().filter(|n| n.path.depth() == 0).count(),
        objects: graph.len(),
        containment_edges: graph.edges().len(),
        classes,
    }
}

pub fn summarize_model<M: ModelAccess + ?Sized>(model: &M, graph: &ObjectGraph) -> String {
    let dump = model_dump(model, graph);
    let mut out = format!("Model objects: {} (roots={})", dump.objects, dump.roots);
    for (class, count) in &dump.classes {
        let _ = write!(out, "\n  {class}: {count}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::team;
    use crate::filter::{FilterOptions, apply_filter};
    use crate::graph::build_object_graph;

    #[test]
    fn test_entries_fields() {
        let (inst, roots) = team();
        let graph = build_object_graph(&inst, &roots);
        let nodes: Vec<_> = graph.nodes().iter().collect();
        let entries = json_entries(&inst, &graph, &nodes);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].e_class, "Team");
        assert_eq!(entries[0].ns_uri, Some("http://org"));
        assert_eq!(entries[0].containment, vec!["o2", "o3"]);
        assert_eq!(entries[1].attributes["skills"], Value::from(vec!["rust", "xml"]));
        assert_eq!(entries[2].references["manager"], vec!["o2"]);
        assert_eq!(entries[2].path, "/Team[0]/members[1]");

        let json = serde_json::to_value(&entries[2]).unwrap();
        assert_eq!(json["eClass"], "Person");
        assert_eq!(json["attributes"]["skills"], serde_json::json!([]));
    }

    #[test]
    fn test_links_restricted_to_exported_set() {
        let (inst, roots) = team();
        let graph = build_object_graph(&inst, &roots);
        let options = FilterOptions {
            filter_expr: Some("name == 'bob'".into()),
            ..FilterOptions::default()
        };
        let outcome = apply_filter(&inst, &graph, &options).unwrap();
        let entries = json_entries(&inst, &graph, &outcome.nodes);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].references["manager"].is_empty());
    }

    #[test]
    fn test_export_json_writes_array() {
        let (inst, roots) = team();
        let graph = build_object_graph(&inst, &roots);
        let outcome = FilterOutcome::all(&graph);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.json");

        let stats = export_json(&inst, &graph, &outcome, &path).unwrap();
        assert_eq!((stats.nodes, stats.edges), (3, 3));
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(3));
        assert_eq!(parsed[1]["id"], "o2");
    }

    #[test]
    fn test_dump_by_class_with_filter() {
        let (inst, roots) = team();
        let graph = build_object_graph(&inst, &roots);
        let all = dump_instances_by_class(&inst, &graph, None).unwrap();
        assert_eq!(all.keys().copied().collect::<Vec<_>>(), vec!["Team", "Person"]);
        assert_eq!(all["Person"].len(), 2);
        assert_eq!(all["Person"][0].id, "P1");

        let some = dump_instances_by_class(&inst, &graph, Some("eclass == 'Person'")).unwrap();
        assert_eq!(some.len(), 1);
        assert!(dump_instances_by_class(&inst, &graph, Some("eclass ==")).is_err());
    }

    #[test]
    fn test_model_summary() {
        let (inst, roots) = team();
        let graph = build_object_graph(&inst, &roots);
        assert_eq!(
            summarize_model(&inst, &graph),
            "Model objects: 3 (roots=1)\n  Person: 2\n  Team: 1"
        );
        assert_eq!(model_dump(&inst, &graph).containment_edges, 2);
    }
}
