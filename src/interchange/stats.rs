//! Metamodel and instance summaries for the `--dump-*` reports.
//!
//! Counts cover the top-level packages' own classes; only
//! [`metamodel_dump`] descends into subpackages.

use super::ModelAccess;
use super::metamodel::{EPackage, Metamodel};
use super::model::Instance;
use serde::Serialize;
use std::fmt::Write;

/// Totals over the top-level packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetamodelStats {
    pub packages: usize,
    pub classes: usize,
    /// Sum of `eAllAttributes` sizes.
    pub attributes: usize,
    /// Sum of `eAllReferences` sizes.
    pub references: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct InstanceStats {
    pub roots: usize,
}

pub fn metamodel_stats(metamodel: &Metamodel) -> MetamodelStats {
    let mut stats = MetamodelStats::default();
    for pkg in metamodel.root_packages() {
        stats.packages += 1;
        for class in &pkg.classes {
            stats.classes += 1;
            stats.attributes += metamodel.all_attributes(*class).count();
            stats.references += metamodel.all_references(*class).count();
        }
    }
    stats
}

pub fn count_metamodel_classes(metamodel: &Metamodel) -> usize {
    metamodel.root_packages().map(|pkg| pkg.classes.len()).sum()
}

/// Human-readable listing of packages and their classes' features.
pub fn summarize_metamodel(metamodel: &Metamodel) -> String {
    let mut out = String::new();
    let mut total = 0;
    for pkg in metamodel.root_packages() {
        let _ = writeln!(
            out,
            "Package: {} nsURI={}",
            pkg.name,
            pkg.ns_uri.as_deref().unwrap_or("None")
        );
        for class in &pkg.classes {
            total += 1;
            let attrs: Vec<&str> = metamodel
                .all_attributes(*class)
                .map(|a| a.name.as_str())
                .collect();
            let refs: Vec<&str> = metamodel
                .all_references(*class)
                .map(|r| r.name.as_str())
                .collect();
            let _ = writeln!(
                out,
                "  Class: {} attrs={} refs={}",
                metamodel.class(*class).name,
                attrs.len(),
                refs.len()
            );
            if !attrs.is_empty() {
                let _ = writeln!(out, "    Attributes: {}", attrs.join(", "));
            }
            if !refs.is_empty() {
                let _ = writeln!(out, "    References: {}", refs.join(", "));
            }
        }
    }
    let _ = write!(out, "Total classes: {total}");
    out
}

// ============================================================================
// JSON DUMP
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MetamodelDump {
    pub packages: Vec<PackageDump>,
    pub total_classes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageDump {
    pub name: String,
    #[serde(rename = "nsURI")]
    pub ns_uri: Option<String>,
    pub classes: Vec<ClassDump>,
    pub subpackages: Vec<PackageDump>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassDump {
    pub name: String,
    pub attributes: Vec<AttributeDump>,
    pub references: Vec<ReferenceDump>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttributeDump {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub many: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceDump {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub many: bool,
    pub containment: bool,
}

/// Structured dump of every package, subpackages nested.
pub fn metamodel_dump(metamodel: &Metamodel) -> MetamodelDump {
    let packages: Vec<PackageDump> = metamodel
        .root_packages()
        .map(|pkg| dump_package(metamodel, pkg))
        .collect();
    MetamodelDump {
        total_classes: metamodel.class_count(),
        packages,
    }
}

fn dump_package(metamodel: &Metamodel, pkg: &EPackage) -> PackageDump {
    PackageDump {
        name: pkg.name.to_string(),
        ns_uri: pkg.ns_uri.clone(),
        classes: pkg
            .classes
            .iter()
            .map(|id| ClassDump {
                name: metamodel.class(*id).name.to_string(),
                attributes: metamodel
                    .all_attributes(*id)
                    .map(|a| AttributeDump {
                        name: a.name.to_string(),
                        type_name: a.type_name.to_string(),
                        many: a.many,
                    })
                    .collect(),
                references: metamodel
                    .all_references(*id)
                    .map(|r| ReferenceDump {
                        name: r.name.to_string(),
                        type_name: r.type_name.to_string(),
                        many: r.many,
                        containment: r.containment,
                    })
                    .collect(),
            })
            .collect(),
        subpackages: pkg
            .subpackages
            .iter()
            .map(|sub| dump_package(metamodel, metamodel.package(*sub)))
            .collect(),
    }
}

// ============================================================================
// INSTANCES
// ============================================================================

pub fn instance_stats(instances: &[&Instance]) -> InstanceStats {
    InstanceStats {
        roots: instances.iter().map(|i| i.roots().len()).sum(),
    }
}

/// Root count followed by one `[index] Class` line per root.
pub fn summarize_instances(instances: &[&Instance]) -> String {
    let roots: Vec<(&Instance, _)> = instances
        .iter()
        .flat_map(|inst| inst.roots().iter().map(move |r| (*inst, *r)))
        .collect();
    let mut out = format!("Root objects: {}", roots.len());
    for (index, (inst, root)) in roots.iter().enumerate() {
        let _ = write!(out, "\n  [{index}] {}", inst.class_name(*root));
    }
    out
}
