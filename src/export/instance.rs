//! Pruned XMI re-serialization.
//!
//! Objects are selected by class name. A selected object whose container is
//! not selected is promoted to a root. With reference stripping, links to
//! unselected objects are hidden through a [`ReferenceOverlay`] so the source
//! instance is left as it was.

use super::{ExportError, write_atomic};
use crate::base::ObjectHandle;
use crate::graph::build_object_graph;
use crate::interchange::{Instance, ModelAccess, ReferenceOverlay, XmiWriter};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Class-based selection for [`export_filtered_instance`].
#[derive(Debug, Clone, Default)]
pub struct InstanceSelection {
    /// Keep only these classes; `None` keeps every class.
    pub include_classes: Option<FxHashSet<String>>,
    /// Drop these classes.
    pub exclude_classes: Option<FxHashSet<String>>,
    /// Remove references to objects outside the selection.
    pub strip_references: bool,
}

impl InstanceSelection {
    fn accepts(&self, class_name: &str) -> bool {
        self.include_classes
            .as_ref()
            .is_none_or(|set| set.contains(class_name))
            && !self
                .exclude_classes
                .as_ref()
                .is_some_and(|set| set.contains(class_name))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InstanceExportStats {
    pub selected: usize,
    pub roots: usize,
}

/// Serialize the selected part of `instance` to XMI bytes.
pub fn render_filtered_instance(
    instance: &Instance,
    selection: &InstanceSelection,
) -> Result<(Vec<u8>, InstanceExportStats), ExportError> {
    let graph = build_object_graph(instance, instance.roots());
    let selected: FxHashSet<ObjectHandle> = graph
        .nodes()
        .iter()
        .map(|info| info.handle)
        .filter(|handle| selection.accepts(instance.class_name(*handle)))
        .collect();

    let roots: Vec<ObjectHandle> = graph
        .nodes()
        .iter()
        .map(|info| info.handle)
        .filter(|handle| selected.contains(handle))
        .filter(|handle| {
            instance
                .container(*handle)
                .is_none_or(|parent| !selected.contains(&parent))
        })
        .collect();

    let mut overlay = ReferenceOverlay::new();
    if selection.strip_references {
        for handle in &selected {
            for slot in instance.reference_slots(*handle) {
                if slot.containment {
                    continue;
                }
                let kept: Vec<Option<ObjectHandle>> = slot
                    .targets
                    .iter()
                    .copied()
                    .filter(|target| target.is_some_and(|t| selected.contains(&t)))
                    .collect();
                if kept.len() != slot.targets.len() {
                    overlay.set(*handle, slot.feature, kept);
                }
            }
        }
        debug!("Stripped references in {} slots", overlay.len());
    }

    let bytes = XmiWriter::new(instance)
        .with_selection(&selected)
        .with_overlay(&overlay)
        .write(&roots)?;
    let stats = InstanceExportStats {
        selected: selected.len(),
        roots: roots.len(),
    };
    Ok((bytes, stats))
}

pub fn export_filtered_instance(
    instance: &Instance,
    selection: &InstanceSelection,
    path: &Path,
) -> Result<InstanceExportStats, ExportError> {
    let (bytes, stats) = render_filtered_instance(instance, selection)?;
    write_atomic(path, &bytes)?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::team;
    use std::sync::Arc;

    fn classes(names: &[&str]) -> Option<FxHashSet<String>> {
        Some(names.iter().map(|n| n.to_string()).collect())
    }

    #[test]
    fn test_unselected_container_promotes_roots() {
        let (inst, _) = team();
        let selection = InstanceSelection {
            include_classes: classes(&["Person"]),
            ..InstanceSelection::default()
        };
        let (bytes, stats) = render_filtered_instance(&inst, &selection).unwrap();
        assert_eq!(stats, InstanceExportStats { selected: 2, roots: 2 });

        let reread = Instance::from_xmi_bytes(&bytes, Arc::clone(inst.metamodel_arc())).unwrap();
        assert_eq!(reread.roots().len(), 2);
        let bob = reread.roots()[1];
        assert_eq!(reread.display_name(bob), "bob");
        let manager = reread.reference(bob, "manager").unwrap();
        assert_eq!(manager.targets, &[Some(reread.roots()[0])]);
    }

    /// Box → A, B, C (a `Leaf` with id "C1"), D; refs A → B → C → D.
    fn chain_with_id() -> (Instance, ObjectHandle, ObjectHandle) {
        let (mut inst, roots) = crate::filter::tests::chain();
        let nodes = inst.object(roots[0]).references["nodes"].clone();
        let (b, c) = (nodes[1].unwrap(), nodes[2].unwrap());
        inst.set_document_id(c, "C1");
        (inst, b, c)
    }

    #[test]
    fn test_dangling_reference_kept_without_strip() {
        let (inst, _, _) = chain_with_id();
        let selection = InstanceSelection {
            include_classes: classes(&["Node"]),
            ..InstanceSelection::default()
        };
        let (bytes, stats) = render_filtered_instance(&inst, &selection).unwrap();
        assert_eq!(stats, InstanceExportStats { selected: 3, roots: 3 });
        assert!(String::from_utf8(bytes).unwrap().contains("refs=\"C1\""));
    }

    #[test]
    fn test_strip_hides_unselected_targets() {
        let (inst, b, c) = chain_with_id();
        let selection = InstanceSelection {
            exclude_classes: classes(&["Leaf", "Box"]),
            strip_references: true,
            ..InstanceSelection::default()
        };
        let (bytes, stats) = render_filtered_instance(&inst, &selection).unwrap();
        assert_eq!(stats.selected, 3);
        assert!(!String::from_utf8(bytes).unwrap().contains("C1"));
        assert_eq!(inst.reference(b, "refs").unwrap().targets, &[Some(c)]);
    }

    #[test]
    fn test_export_writes_file() {
        let (inst, _) = team();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pruned.xmi");
        let stats =
            export_filtered_instance(&inst, &InstanceSelection::default(), &path).unwrap();
        assert_eq!(stats, InstanceExportStats { selected: 3, roots: 1 });
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("org:Team"));
    }
}
