use crate::helpers::load_network;
use emf_reader::{ExpressionError, ModelAccess, PredicateContext, build_predicate};
use rstest::rstest;

fn matching(expr: &str) -> Vec<String> {
    let (instance, graph) = load_network(&crate::helpers::chain_xmi());
    let predicate = build_predicate(expr).unwrap();
    graph
        .nodes()
        .iter()
        .filter(|n| predicate.matches(&PredicateContext::new(&instance, n)))
        .map(|n| instance.display_name(n.handle))
        .collect()
}

#[test]
fn test_exact_class_versus_kind() {
    assert_eq!(matching("eclass == 'Node'"), vec!["A", "B", "D"]);
    assert_eq!(matching("eclass == 'Router'"), vec!["C"]);
    assert_eq!(matching("is_kind_of('Node')"), vec!["A", "B", "C", "D"]);
    assert_eq!(matching("is_class('Network')"), vec!["lab"]);
}

#[rstest]
#[case("name in ['A', 'D']", &["A", "D"])]
#[case("weight == 1 and not (name == 'B')", &["A", "C", "D"])]
#[case("id == 'C' or path == '/Network[0]'", &["lab", "C"])]
#[case("attrs['name'] == 'B'", &["B"])]
#[case("name[0] == 'l'", &["lab"])]
fn test_expressions_over_loaded_model(#[case] expr: &str, #[case] expected: &[&str]) {
    assert_eq!(matching(expr), expected);
}

#[rstest]
#[case("__import__('os')")]
#[case("foo(1,2)")]
#[case("is_class('A', 'B')")]
#[case("name ==")]
#[case("open('x').read()")]
fn test_disallowed_expressions(#[case] expr: &str) {
    let err: ExpressionError = build_predicate(expr).unwrap_err();
    assert!(!err.to_string().is_empty());
}
