//! `emf-reader`: inspect, filter and export an instance.

use super::{EXIT_FAILURE, EXIT_OK, log_parameters, parse_class_list};
use crate::config::ReaderProfile;
use crate::export::{
    ExportError, ExportStats, InstanceSelection, dump_instances_by_class, export_edges,
    export_filtered_instance, export_gml, export_json, export_mermaid, export_path_ids,
    export_paths, export_plantuml, model_dump, summarize_model, write_json,
};
use crate::filter::{FilterMetrics, FilterOptions, FilterOutcome, apply_filter};
use crate::graph::{ObjectGraph, build_object_graph};
use crate::interchange::stats::{
    count_metamodel_classes, instance_stats, metamodel_dump, metamodel_stats, summarize_instances,
    summarize_metamodel,
};
use crate::interchange::{INSTANCE_EXTENSIONS, Instance, load_instance, load_metamodel};
use crate::query::build_optional;
use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

const PREVIEW: usize = 10;

type DiagramExport =
    fn(&Instance, &ObjectGraph, &FilterOutcome<'_>, &Path) -> Result<ExportStats, ExportError>;

#[derive(Debug, Clone, Default, Parser, Serialize)]
#[command(name = "emf-reader")]
#[command(about = "Load an Ecore metamodel and XMI instance, then inspect, filter and export it")]
pub struct ReaderArgs {
    /// Path to the .ecore metamodel
    #[arg(long)]
    pub ecore: PathBuf,

    /// Path to the XMI instance
    #[arg(long)]
    pub instance: Option<PathBuf>,

    /// Print a summary of the metamodel
    #[arg(long)]
    pub dump_metamodel: bool,

    /// Write the metamodel structure as JSON
    #[arg(long, value_name = "PATH")]
    pub dump_metamodel_json: Option<PathBuf>,

    /// Print per-class object counts
    #[arg(long)]
    pub dump_model: bool,

    /// Write per-class object counts as JSON
    #[arg(long, value_name = "PATH")]
    pub dump_model_json: Option<PathBuf>,

    /// Print the instance roots
    #[arg(long)]
    pub dump_instances: bool,

    /// Write objects grouped by class as JSON
    #[arg(long, value_name = "PATH")]
    pub dump_instances_json: Option<PathBuf>,

    /// Expression restricting --dump-instances-json
    #[arg(long, value_name = "EXPR")]
    pub dump_instances_filter: Option<String>,

    /// Export filtered objects as JSON
    #[arg(long, value_name = "PATH")]
    pub export_json: Option<PathBuf>,

    /// Export filtered edges as CSV
    #[arg(long, value_name = "PATH")]
    pub export_edges: Option<PathBuf>,

    /// Export expansion label paths (requires --expand-from)
    #[arg(long, value_name = "PATH")]
    pub export_paths: Option<PathBuf>,

    /// Export expansion id paths (requires --expand-from)
    #[arg(long, value_name = "PATH")]
    pub export_path_ids: Option<PathBuf>,

    /// Export a Mermaid flowchart
    #[arg(long, value_name = "PATH")]
    pub export_mermaid: Option<PathBuf>,

    /// Export a PlantUML object diagram
    #[arg(long, value_name = "PATH")]
    pub export_plantuml: Option<PathBuf>,

    /// Export a GML graph
    #[arg(long, value_name = "PATH")]
    pub export_gml: Option<PathBuf>,

    /// Export a pruned XMI instance
    #[arg(long, value_name = "PATH")]
    pub export_instance: Option<PathBuf>,

    /// Comma-separated classes kept by --export-instance
    #[arg(long, value_name = "CLASSES")]
    pub include_classes: Option<String>,

    /// Comma-separated classes dropped by --export-instance
    #[arg(long, value_name = "CLASSES")]
    pub exclude_classes: Option<String>,

    /// Drop references to objects outside the --export-instance selection
    #[arg(long)]
    pub strip_references: bool,

    /// Seed expression for neighborhood expansion
    #[arg(long, value_name = "EXPR")]
    pub neighbors_from: Option<String>,

    /// Neighborhood hop count [default: 1]
    #[arg(long, value_name = "N")]
    pub neighbors: Option<usize>,

    /// Final filter expression
    #[arg(long, value_name = "EXPR")]
    pub filter_expr: Option<String>,

    /// Start expression for reachability expansion
    #[arg(long, value_name = "EXPR")]
    pub expand_from: Option<String>,

    /// Expansion depth; negative is unbounded [default: 1]
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub expand_depth: Option<i64>,

    /// Comma-separated classes the expansion may enter
    #[arg(long, value_name = "CLASSES")]
    pub expand_classes: Option<String>,

    /// YAML or JSON profile with option defaults
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl ReaderArgs {
    fn wants_instance(&self) -> bool {
        self.dump_model
            || self.dump_instances
            || self.dump_model_json.is_some()
            || self.dump_instances_json.is_some()
            || self.diagram_outputs()
            || self.export_instance.is_some()
            || self.full_outputs()
    }

    fn diagram_outputs(&self) -> bool {
        self.export_mermaid.is_some() || self.export_plantuml.is_some() || self.export_gml.is_some()
    }

    fn full_outputs(&self) -> bool {
        self.export_json.is_some()
            || self.export_edges.is_some()
            || self.export_paths.is_some()
            || self.export_path_ids.is_some()
    }
}

/// Options resolved from the profile and the command line.
struct Resolved {
    filter: FilterOptions,
    dump_filter: Option<String>,
    selection: InstanceSelection,
}

impl Resolved {
    fn new(args: &ReaderArgs, profile: ReaderProfile) -> Self {
        let from_flags = FilterOptions {
            filter_expr: args.filter_expr.clone(),
            expand_expr: args.expand_from.clone(),
            expand_depth: args.expand_depth,
            expand_classes: args.expand_classes.as_deref().map(parse_class_list),
            neighbor_expr: args.neighbors_from.clone(),
            neighbor_hops: args.neighbors,
        };
        let mut filter = profile.merge_filter(from_flags);
        // Depth only means something next to a start expression.
        if filter.expand_expr.is_none() {
            filter.expand_depth = None;
        }
        let classes = |flag: &Option<String>, file: &Option<Vec<String>>| {
            flag.as_deref()
                .map(parse_class_list)
                .or_else(|| file.clone())
                .map(|list| list.into_iter().collect::<FxHashSet<String>>())
        };
        let selection = InstanceSelection {
            include_classes: classes(&args.include_classes, &profile.include_classes),
            exclude_classes: classes(&args.exclude_classes, &profile.exclude_classes),
            strip_references: args.strip_references || profile.strip_references,
        };
        Self {
            filter,
            dump_filter: args.dump_instances_filter.clone().or(profile.dump_instances_filter),
            selection,
        }
    }

    /// Mermaid, PlantUML and GML see only the final filter and neighbors.
    fn diagram_filter(&self) -> FilterOptions {
        FilterOptions {
            filter_expr: self.filter.filter_expr.clone(),
            neighbor_expr: self.filter.neighbor_expr.clone(),
            neighbor_hops: self.filter.neighbor_hops,
            ..FilterOptions::default()
        }
    }

    fn validate(&self) -> Result<()> {
        let expressions = [
            &self.filter.filter_expr,
            &self.filter.expand_expr,
            &self.filter.neighbor_expr,
            &self.dump_filter,
        ];
        for expr in expressions {
            build_optional(expr.as_deref()).map_err(|e| anyhow!("Invalid filter expression: {e}"))?;
        }
        Ok(())
    }
}

fn log_metrics(metrics: &FilterMetrics) {
    if let Some(n) = metrics.neighbors {
        info!(
            "Neighbor metrics: seed_nodes={} nodes_seen={} edges_traversed={} max_hops={}",
            n.seed_nodes, n.nodes_seen, n.edges_traversed, n.max_hops
        );
    }
    if let Some(e) = metrics.expansion {
        info!(
            "Expansion metrics: start_nodes={} nodes_seen={} edges_traversed={} loops_detected={} max_depth={}",
            e.start_nodes, e.nodes_seen, e.edges_traversed, e.loops_detected, e.max_depth
        );
        if e.start_nodes == 0 {
            warn!("No expansion start nodes matched the expression");
        }
    }
}

fn warn_unusual_extension(path: &Path) {
    let known = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| INSTANCE_EXTENSIONS.iter().any(|k| k.eq_ignore_ascii_case(ext)));
    if !known {
        warn!("Unrecognised instance extension, reading {} as XMI", path.display());
    }
}

fn run_filter<'g>(
    instance: &Instance,
    graph: &'g ObjectGraph,
    options: &FilterOptions,
) -> Result<FilterOutcome<'g>> {
    apply_filter(instance, graph, options).map_err(|e| anyhow!("Invalid filter expression: {e}"))
}

fn execute(args: &ReaderArgs) -> Result<()> {
    let profile = match &args.config {
        Some(path) => ReaderProfile::load(path)?,
        None => ReaderProfile::default(),
    };
    let resolved = Resolved::new(args, profile);
    resolved.validate()?;

    let metamodel = Arc::new(load_metamodel(&args.ecore).context("Failed to load metamodel/instance")?);
    let stats = metamodel_stats(&metamodel);
    info!(
        "Metamodel stats: packages={} classes={} attributes={} references={}",
        stats.packages, stats.classes, stats.attributes, stats.references
    );

    if args.dump_metamodel {
        println!("{}", summarize_metamodel(&metamodel));
        info!("Metamodel classes: {}", count_metamodel_classes(&metamodel));
    }
    if let Some(path) = &args.dump_metamodel_json {
        write_json(&metamodel_dump(&metamodel), path)?;
        info!("Wrote metamodel JSON: {}", path.display());
    }

    let Some(instance_path) = &args.instance else {
        if args.wants_instance() {
            bail!("Instance file required for instance operations");
        }
        return Ok(());
    };
    warn_unusual_extension(instance_path);
    let instance = load_instance(instance_path, &metamodel).context("Failed to load metamodel/instance")?;
    info!("Instance stats: roots={}", instance_stats(&[&instance]).roots);

    let graph = build_object_graph(&instance, instance.roots());

    if args.dump_instances {
        println!("{}", summarize_instances(&[&instance]));
    }
    if args.dump_model {
        println!("{}", summarize_model(&instance, &graph));
    }
    if let Some(path) = &args.dump_model_json {
        write_json(&model_dump(&instance, &graph), path)?;
        info!("Wrote model JSON: {}", path.display());
    }
    if let Some(path) = &args.dump_instances_json {
        let grouped = dump_instances_by_class(&instance, &graph, resolved.dump_filter.as_deref())?;
        write_json(&grouped, path)?;
        info!("Wrote instances JSON: {}", path.display());
    }

    if args.diagram_outputs() {
        let outcome = run_filter(&instance, &graph, &resolved.diagram_filter())?;
        let diagrams: [(&str, &Option<PathBuf>, DiagramExport); 3] = [
            ("Mermaid", &args.export_mermaid, export_mermaid),
            ("PlantUML", &args.export_plantuml, export_plantuml),
            ("GML", &args.export_gml, export_gml),
        ];
        for (format, target, export) in diagrams {
            let Some(path) = target else {
                continue;
            };
            let stats = export(&instance, &graph, &outcome, path)?;
            info!(
                "Wrote {format}: {} (nodes={} edges={})",
                path.display(),
                stats.nodes,
                stats.edges
            );
            log_metrics(&stats.metrics);
        }
    }

    if let Some(path) = &args.export_instance {
        let stats = export_filtered_instance(&instance, &resolved.selection, path)?;
        info!(
            "Wrote instance XMI: {} (selected={} roots={})",
            path.display(),
            stats.selected,
            stats.roots
        );
    }

    if !args.full_outputs() {
        return Ok(());
    }
    let outcome = run_filter(&instance, &graph, &resolved.filter)?;

    if let Some(path) = &args.export_json {
        let stats = export_json(&instance, &graph, &outcome, path)?;
        info!("Wrote JSON: {} (objects={})", path.display(), stats.nodes);
        log_metrics(&stats.metrics);
    }
    if let Some(path) = &args.export_edges {
        let stats = export_edges(&instance, &graph, &outcome, path)?;
        info!("Wrote edges: {} (edges={})", path.display(), stats.edges);
        log_metrics(&stats.metrics);
    }
    if let Some(path) = &args.export_paths {
        if resolved.filter.expand_expr.is_none() {
            bail!("export-paths requires --expand-from");
        }
        let (lines, stats) = export_paths(&outcome, path)?;
        info!("Wrote paths: {} (paths={})", path.display(), lines.len());
        info!("Expansion paths preview (max {PREVIEW}): {:?}", &lines[..lines.len().min(PREVIEW)]);
        log_metrics(&stats.metrics);
    }
    if let Some(path) = &args.export_path_ids {
        if resolved.filter.expand_expr.is_none() {
            bail!("export-path-ids requires --expand-from");
        }
        let (rows, stats) = export_path_ids(&outcome, path)?;
        info!("Wrote path IDs: {} (rows={})", path.display(), rows.len());
        info!("Path IDs preview (max {PREVIEW}): {:?}", &rows[..rows.len().min(PREVIEW)]);
        log_metrics(&stats.metrics);
    }
    Ok(())
}

/// Run `emf-reader` and return its exit code.
pub fn run(args: &ReaderArgs) -> u8 {
    log_parameters(args);
    match execute(args) {
        Ok(()) => EXIT_OK,
        Err(e) => {
            error!("{e:#}");
            EXIT_FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> ReaderArgs {
        ReaderArgs::try_parse_from(std::iter::once("emf-reader").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_parse() {
        let args = parse(&[
            "--ecore",
            "m.ecore",
            "--expand-from",
            "name == 'A'",
            "--expand-depth",
            "-1",
            "--expand-classes",
            "A, B",
            "--strip-references",
        ]);
        assert_eq!(args.expand_depth, Some(-1));
        assert!(args.strip_references);
        assert!(!args.wants_instance());

        let resolved = Resolved::new(&args, ReaderProfile::default());
        assert_eq!(resolved.filter.expand_depth, Some(-1));
        assert_eq!(
            resolved.filter.expand_classes,
            Some(vec!["A".to_string(), "B".to_string()])
        );
        assert!(resolved.selection.strip_references);
    }

    #[test]
    fn test_depth_ignored_without_start() {
        let args = parse(&["--ecore", "m.ecore", "--expand-depth", "3"]);
        let resolved = Resolved::new(&args, ReaderProfile::default());
        assert_eq!(resolved.filter.expand_depth, None);
    }

    #[test]
    fn test_profile_fills_unset_flags() {
        let args = parse(&["--ecore", "m.ecore", "--filter-expr", "true", "--exclude-classes", "X"]);
        let profile = ReaderProfile {
            filter: FilterOptions {
                filter_expr: Some("false".into()),
                neighbor_expr: Some("name == 'A'".into()),
                ..FilterOptions::default()
            },
            include_classes: Some(vec!["A".into()]),
            exclude_classes: Some(vec!["Y".into()]),
            ..ReaderProfile::default()
        };
        let resolved = Resolved::new(&args, profile);
        assert_eq!(resolved.filter.filter_expr.as_deref(), Some("true"));
        assert_eq!(resolved.filter.neighbor_expr.as_deref(), Some("name == 'A'"));
        assert!(resolved.selection.include_classes.unwrap().contains("A"));
        let excluded = resolved.selection.exclude_classes.unwrap();
        assert!(excluded.contains("X") && !excluded.contains("Y"));
    }

    #[test]
    fn test_depth_flag_applies_to_profile_start() {
        let args = parse(&["--ecore", "m.ecore", "--expand-depth", "3"]);
        let profile = ReaderProfile {
            filter: FilterOptions {
                expand_expr: Some("name == 'A'".into()),
                expand_depth: Some(1),
                ..FilterOptions::default()
            },
            ..ReaderProfile::default()
        };
        let resolved = Resolved::new(&args, profile);
        assert_eq!(resolved.filter.expand_expr.as_deref(), Some("name == 'A'"));
        assert_eq!(resolved.filter.expand_depth, Some(3));

        let without_start = Resolved::new(&args, ReaderProfile::default());
        assert_eq!(without_start.filter.expand_depth, None);
    }

    #[test]
    fn test_diagram_filter_drops_expansion() {
        let args = parse(&["--ecore", "m.ecore", "--expand-from", "true", "--neighbors", "2"]);
        let resolved = Resolved::new(&args, ReaderProfile::default());
        let diagram = resolved.diagram_filter();
        assert!(diagram.expand_expr.is_none());
        assert_eq!(diagram.neighbor_hops, Some(2));
    }

    #[test]
    fn test_invalid_expression_rejected() {
        let args = parse(&["--ecore", "m.ecore", "--filter-expr", "__import__('os')"]);
        let resolved = Resolved::new(&args, ReaderProfile::default());
        let err = resolved.validate().unwrap_err();
        assert!(err.to_string().starts_with("Invalid filter expression"));
    }

    #[test]
    fn test_instance_required() {
        let dir = tempfile::tempdir().unwrap();
        let ecore = dir.path().join("m.ecore");
        std::fs::write(
            &ecore,
            r#"<ecore:EPackage xmlns:ecore="http://www.eclipse.org/emf/2002/Ecore" name="m" nsURI="http://m" nsPrefix="m"/>"#,
        )
        .unwrap();
        let mut args = parse(&["--ecore", ecore.to_str().unwrap(), "--dump-model"]);
        assert_eq!(run(&args), EXIT_FAILURE);
        args.dump_model = false;
        assert_eq!(run(&args), EXIT_OK);
    }
}
