use crate::helpers::{chain_xmi, load_network, network_ecore};
use emf_reader::export::{
    ExportError, InstanceSelection, export_edges, export_filtered_instance, export_json,
    export_path_ids, export_paths, render_gml, render_mermaid,
};
use emf_reader::{FilterOptions, FilterOutcome, Instance, Metamodel, ModelAccess, apply_filter};
use std::sync::Arc;

fn expanded() -> FilterOptions {
    FilterOptions {
        expand_expr: Some("name == 'A'".into()),
        expand_depth: Some(-1),
        ..FilterOptions::default()
    }
}

#[test]
fn test_json_export_lists_filtered_objects() {
    let (instance, graph) = load_network(&chain_xmi());
    let outcome = apply_filter(&instance, &graph, &expanded()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("objects.json");

    let stats = export_json(&instance, &graph, &outcome, &path).unwrap();
    assert_eq!(stats.nodes, 4);

    let value: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let entries = value.as_array().unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0]["eClass"], "Node");
    assert_eq!(entries[0]["attributes"]["name"], "A");
    assert_eq!(entries[2]["eClass"], "Router");
}

#[test]
fn test_edges_csv_has_header_and_rows() {
    let (instance, graph) = load_network(&chain_xmi());
    let outcome = FilterOutcome::all(&graph);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("edges.csv");

    let stats = export_edges(&instance, &graph, &outcome, &path).unwrap();
    // Four containment edges from the network plus three links.
    assert_eq!(stats.edges, 7);
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 8);
}

#[test]
fn test_paths_exports() {
    let (instance, graph) = load_network(&chain_xmi());
    let outcome = apply_filter(&instance, &graph, &expanded()).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let (lines, _) = export_paths(&outcome, &dir.path().join("paths.txt")).unwrap();
    assert_eq!(lines, vec!["A", "A/B", "A/B/C", "A/B/C/D"]);

    let (rows, stats) = export_path_ids(&outcome, &dir.path().join("ids.tsv")).unwrap();
    assert_eq!(rows[3], ("D".to_string(), "A/B/C/D".to_string()));
    assert_eq!(stats.metrics.expansion.map(|m| m.max_depth), Some(4));
}

#[test]
fn test_paths_without_expansion_write_nothing() {
    let (instance, graph) = load_network(&chain_xmi());
    let outcome = apply_filter(
        &instance,
        &graph,
        &FilterOptions {
            filter_expr: Some("true".into()),
            ..FilterOptions::default()
        },
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("paths.txt");

    let err = export_paths(&outcome, &path).unwrap_err();
    assert!(matches!(err, ExportError::ExpansionRequired(_)));
    assert!(!path.exists());
}

#[test]
fn test_diagrams_only_draw_subset_edges() {
    let (instance, graph) = load_network(&chain_xmi());
    let outcome = apply_filter(
        &instance,
        &graph,
        &FilterOptions {
            filter_expr: Some("name in ['A', 'B']".into()),
            ..FilterOptions::default()
        },
    )
    .unwrap();

    let (mermaid, nodes, edges) = render_mermaid(&instance, &graph, &outcome.nodes);
    assert_eq!((nodes, edges), (2, 1));
    assert!(mermaid.contains("o2 -.->|links| o3"));

    let (gml, _, _) = render_gml(&instance, &graph, &outcome.nodes);
    assert_eq!(gml.matches("  edge [").count(), 1);
}

#[test]
fn test_pruned_instance_reloads() {
    let (instance, _) = load_network(&chain_xmi());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pruned.xmi");
    let selection = InstanceSelection {
        exclude_classes: Some(["Network".to_string(), "Router".to_string()].into_iter().collect()),
        strip_references: true,
        ..InstanceSelection::default()
    };

    let stats = export_filtered_instance(&instance, &selection, &path).unwrap();
    assert_eq!((stats.selected, stats.roots), (3, 3));

    let metamodel = Arc::new(Metamodel::from_ecore_bytes(network_ecore().as_bytes()).unwrap());
    let reread = Instance::from_xmi_bytes(&std::fs::read(&path).unwrap(), metamodel).unwrap();
    assert_eq!(reread.roots().len(), 3);
    let b = reread.roots()[1];
    assert_eq!(reread.display_name(b), "B");
    assert!(reread.reference(b, "links").is_none_or(|slot| slot.targets.is_empty()));
}
