use crate::helpers::{chain_xmi, cycle_xmi, load_network, names, star_xmi};
use emf_reader::{FilterOptions, apply_filter, build_predicate, expand_from, neighbor_expand};
use rstest::rstest;

#[rstest]
#[case(Some(0), &["A"])]
#[case(None, &["A", "B"])]
#[case(Some(1), &["A", "B"])]
#[case(Some(3), &["A", "B", "C", "D"])]
#[case(Some(-1), &["A", "B", "C", "D"])]
fn test_chain_depth(#[case] depth: Option<i64>, #[case] expected: &[&str]) {
    let (instance, graph) = load_network(&chain_xmi());
    let nodes: Vec<_> = graph.nodes().iter().collect();
    let start = build_predicate("name == 'A'").unwrap();

    let expansion = expand_from(&instance, &graph, &nodes, &start, depth, None);
    assert_eq!(names(&instance, &expansion.nodes), expected);
    assert_eq!(expansion.metrics.start_nodes, 1);
}

#[test]
fn test_unbounded_expansion_stops_on_cycle() {
    let (instance, graph) = load_network(&cycle_xmi());
    let nodes: Vec<_> = graph.nodes().iter().collect();
    let start = build_predicate("name == 'A'").unwrap();

    let expansion = expand_from(&instance, &graph, &nodes, &start, Some(-1), None);
    assert_eq!(names(&instance, &expansion.nodes), vec!["A", "B", "C"]);
    assert!(expansion.metrics.loops_detected >= 1);
    assert_eq!(expansion.metrics.nodes_seen, 3);
}

#[test]
fn test_neighbor_hops() {
    let (instance, graph) = load_network(&star_xmi());
    let nodes: Vec<_> = graph.nodes().iter().collect();
    let seed = build_predicate("name == 'S'").unwrap();

    let (one_hop, metrics) = neighbor_expand(&instance, &graph, &nodes, &seed, 1);
    assert_eq!(names(&instance, &one_hop), vec!["S", "N1", "N2"]);
    assert_eq!(metrics.nodes_seen, 3);
    assert_eq!(metrics.seed_nodes, 1);

    let (two_hops, _) = neighbor_expand(&instance, &graph, &nodes, &seed, 2);
    assert_eq!(names(&instance, &two_hops), vec!["S", "N1", "N2", "F"]);
}

#[rstest]
#[case(1, &[])]
#[case(2, &["C"])]
fn test_expansion_then_class_filter(#[case] depth: i64, #[case] expected: &[&str]) {
    let (instance, graph) = load_network(&chain_xmi());
    let options = FilterOptions {
        expand_expr: Some("name == 'A'".into()),
        expand_depth: Some(depth),
        filter_expr: Some("eclass == 'Router'".into()),
        ..FilterOptions::default()
    };
    let outcome = apply_filter(&instance, &graph, &options).unwrap();
    assert_eq!(names(&instance, &outcome.nodes), expected);
    assert_eq!(outcome.metrics.expansion.map(|m| m.start_nodes), Some(1));
}

#[test]
fn test_no_start_nodes_is_empty_not_error() {
    let (instance, graph) = load_network(&chain_xmi());
    let options = FilterOptions {
        expand_expr: Some("name == 'nobody'".into()),
        ..FilterOptions::default()
    };
    let outcome = apply_filter(&instance, &graph, &options).unwrap();
    assert!(outcome.is_empty());
    let metrics = outcome.metrics.expansion.unwrap();
    assert_eq!((metrics.start_nodes, metrics.nodes_seen, metrics.edges_traversed), (0, 0, 0));
}

#[test]
fn test_expansion_class_restriction() {
    let (instance, graph) = load_network(&chain_xmi());
    let options = FilterOptions {
        expand_expr: Some("name == 'A'".into()),
        expand_depth: Some(-1),
        expand_classes: Some(vec!["Node".into()]),
        ..FilterOptions::default()
    };
    let outcome = apply_filter(&instance, &graph, &options).unwrap();
    // The Router C blocks the walk to D.
    assert_eq!(names(&instance, &outcome.nodes), vec!["A", "B"]);
}

#[test]
fn test_bad_expression_is_reported() {
    let (instance, graph) = load_network(&chain_xmi());
    let options = FilterOptions {
        neighbor_expr: Some("name ==".into()),
        ..FilterOptions::default()
    };
    assert!(apply_filter(&instance, &graph, &options).is_err());
}
