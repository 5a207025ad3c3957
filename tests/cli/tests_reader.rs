use crate::helpers::{chain_xmi, network_ecore, write_file};
use clap::Parser;
use emf_reader::cli::{EXIT_FAILURE, EXIT_OK, ReaderArgs, reader};
use std::path::Path;

fn args(dir: &Path, extra: &[&str]) -> ReaderArgs {
    let ecore = write_file(dir, "net.ecore", &network_ecore());
    let xmi = write_file(dir, "lab.xmi", &chain_xmi());
    let mut argv = vec![
        "emf-reader".to_string(),
        "--ecore".to_string(),
        ecore.display().to_string(),
        "--instance".to_string(),
        xmi.display().to_string(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    ReaderArgs::try_parse_from(argv).unwrap()
}

#[test]
fn test_exports_in_one_run() {
    let dir = tempfile::tempdir().unwrap();
    let out = |name: &str| dir.path().join(name).display().to_string();
    let (json, paths, mermaid, model) = (out("o.json"), out("p.txt"), out("g.mmd"), out("m.json"));
    let args = args(
        dir.path(),
        &[
            "--expand-from",
            "name == 'B'",
            "--expand-depth",
            "-1",
            "--export-json",
            &json,
            "--export-paths",
            &paths,
            "--export-mermaid",
            &mermaid,
            "--dump-model-json",
            &model,
        ],
    );

    assert_eq!(reader::run(&args), EXIT_OK);
    assert_eq!(std::fs::read_to_string(&paths).unwrap(), "B\nB/C\nB/C/D\n");
    // Diagrams ignore the expansion and draw the whole graph.
    let diagram = std::fs::read_to_string(&mermaid).unwrap();
    assert_eq!(diagram.matches("[\"").count(), 5);
    let dump: serde_json::Value = serde_json::from_slice(&std::fs::read(&model).unwrap()).unwrap();
    assert_eq!(dump["objects"], 5);
    assert_eq!(dump["classes"]["Node"], 3);
}

#[test]
fn test_profile_supplies_expansion() {
    let dir = tempfile::tempdir().unwrap();
    let profile = write_file(
        dir.path(),
        "profile.yaml",
        "filter:\n  expand_expr: \"name == 'C'\"\n  expand_depth: 1\n",
    );
    let ids = dir.path().join("ids.tsv").display().to_string();
    let profile = profile.display().to_string();
    let args = args(dir.path(), &["--config", &profile, "--export-path-ids", &ids]);

    assert_eq!(reader::run(&args), EXIT_OK);
    assert_eq!(std::fs::read_to_string(&ids).unwrap(), "C\tC\nD\tC/D\n");
}

#[test]
fn test_paths_need_expansion() {
    let dir = tempfile::tempdir().unwrap();
    let paths = dir.path().join("p.txt").display().to_string();
    let args = args(dir.path(), &["--export-paths", &paths]);

    assert_eq!(reader::run(&args), EXIT_FAILURE);
    assert!(!Path::new(&paths).exists());
}

#[test]
fn test_invalid_expression_exits_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("o.json").display().to_string();
    let args = args(dir.path(), &["--filter-expr", "foo(1,2)", "--export-json", &json]);

    assert_eq!(reader::run(&args), EXIT_FAILURE);
    assert!(!Path::new(&json).exists());
}

#[test]
fn test_missing_instance_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut args = args(dir.path(), &["--dump-model"]);
    args.instance = Some(dir.path().join("absent.xmi"));
    assert_eq!(reader::run(&args), EXIT_FAILURE);
}
