use crate::helpers::{chain_xmi, foo_ecore, foo_xmi, load, load_network};
use emf_reader::{ModelAccess, build_object_graph};
use rustc_hash::FxHashSet;

#[test]
fn test_foo_round_trip_paths() {
    let (instance, graph) = load(&foo_ecore(), &foo_xmi());

    assert_eq!(graph.len(), 3);
    assert_eq!(graph.edges().len(), 2);
    let paths: Vec<&str> = graph.nodes().iter().map(|n| n.path.as_str()).collect();
    assert_eq!(paths, vec!["/Foo[0]", "/Foo[0]/children[0]", "/Foo[0]/children[1]"]);

    let ids: Vec<&str> = graph.nodes().iter().map(|n| n.preferred_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert!(graph.edges().iter().all(|e| e.containment && e.feature == "children"));
    assert_eq!(instance.roots().len(), 1);
}

#[test]
fn test_every_contained_object_appears_once() {
    let (instance, graph) = load_network(&chain_xmi());

    let handles: FxHashSet<_> = graph.nodes().iter().map(|n| n.handle).collect();
    assert_eq!(handles.len(), graph.len());
    assert_eq!(graph.len(), instance.len());
    // Forest: one containment edge per non-root node.
    assert_eq!(graph.edges().len(), graph.len() - instance.roots().len());
}

#[test]
fn test_rebuild_is_identical() {
    let (instance, first) = load_network(&chain_xmi());
    let second = build_object_graph(&instance, instance.roots());

    let describe = |g: &emf_reader::ObjectGraph| -> Vec<(String, String)> {
        g.nodes()
            .iter()
            .map(|n| (n.local_id.to_string(), n.path.as_str().to_string()))
            .collect()
    };
    assert_eq!(describe(&first), describe(&second));
}

#[test]
fn test_reference_slots_resolve_ids() {
    let (instance, graph) = load_network(&chain_xmi());
    let a = graph.nodes()[1].handle;
    let b = graph.nodes()[2].handle;

    let links = instance.reference(a, "links").unwrap();
    assert!(!links.containment);
    assert_eq!(links.targets, &[Some(b)]);
    assert!(instance.is_kind_of(graph.nodes()[3].handle, "Node"));
    assert_eq!(instance.class_name(graph.nodes()[3].handle), "Router");
}
