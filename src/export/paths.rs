//! Expansion trace paths as plain text.

use super::{ExportError, ExportStats, write_atomic};
use crate::filter::FilterOutcome;
use std::path::Path;

/// Label paths of the surviving nodes, in node order.
pub fn path_lines(outcome: &FilterOutcome<'_>) -> Result<Vec<String>, ExportError> {
    if outcome.label_paths.is_none() {
        return Err(ExportError::ExpansionRequired("export-paths"));
    }
    Ok(outcome
        .nodes
        .iter()
        .filter_map(|info| outcome.label_path(info.handle))
        .map(|path| path.as_str().to_string())
        .collect())
}

/// `(preferred id, id path)` of the surviving nodes, in node order.
pub fn path_id_rows(outcome: &FilterOutcome<'_>) -> Result<Vec<(String, String)>, ExportError> {
    if outcome.id_paths.is_none() {
        return Err(ExportError::ExpansionRequired("export-path-ids"));
    }
    Ok(outcome
        .nodes
        .iter()
        .filter_map(|info| {
            outcome
                .id_path(info.handle)
                .map(|path| (info.preferred_id.clone(), path.as_str().to_string()))
        })
        .collect())
}

fn join_lines<I: IntoIterator<Item = String>>(lines: I) -> String {
    lines.into_iter().fold(String::new(), |mut out, line| {
        out.push_str(&line);
        out.push('\n');
        out
    })
}

/// One label path per line.
pub fn export_paths(
    outcome: &FilterOutcome<'_>,
    path: &Path,
) -> Result<(Vec<String>, ExportStats), ExportError> {
    let lines = path_lines(outcome)?;
    write_atomic(path, join_lines(lines.iter().cloned()).as_bytes())?;
    let stats = ExportStats {
        nodes: lines.len(),
        edges: 0,
        metrics: outcome.metrics,
    };
    Ok((lines, stats))
}

/// One `id<TAB>id path` row per line.
pub fn export_path_ids(
    outcome: &FilterOutcome<'_>,
    path: &Path,
) -> Result<(Vec<(String, String)>, ExportStats), ExportError> {
    let rows = path_id_rows(outcome)?;
    let text = join_lines(rows.iter().map(|(id, trail)| format!("{id}\t{trail}")));
    write_atomic(path, text.as_bytes())?;
    let stats = ExportStats {
        nodes: rows.len(),
        edges: 0,
        metrics: outcome.metrics,
    };
    Ok((rows, stats))
}
