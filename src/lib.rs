//! # emf-reader
//!
//! Loads EMF metamodels (`.ecore`) and XMI instances, derives the containment
//! object graph, and filters, expands and exports it.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! cli         → clap front ends (feature `cli`)
//!   ↓
//! export, xsd → JSON/CSV/Mermaid/PlantUML/GML/XMI writers, XSD enrichment
//!   ↓
//! filter      → neighborhood + reachability expansion, final predicate filter
//!   ↓
//! query       → filter expression lexer, parser, evaluator
//!   ↓
//! graph       → containment walk: ObjectInfo nodes + edges
//!   ↓
//! interchange → Ecore metamodel, XMI instances, ModelAccess capability trait
//!   ↓
//! base        → ObjectHandle, LocalId, canonical/trace paths
//! ```

// ============================================================================
// MODULES (dependency order: base → interchange → graph → query → filter → export)
// ============================================================================

/// Foundation types: handles, session-local ids, paths
pub mod base;

/// Model access layer: metamodel registry, instance arena, XMI codec
pub mod interchange;

/// Object graph construction over containment references
pub mod graph;

/// Filter expression language
pub mod query;

/// Neighborhood/reachability expansion and predicate filtering
pub mod filter;

/// Export formats consuming a filtered object set
pub mod export;

/// XSD annotation with model identifiers
pub mod xsd;

/// Configuration files (filter profiles, XSD kind preferences)
pub mod config;

/// Command-line front ends
#[cfg(feature = "cli")]
pub mod cli;

pub use base::{CanonicalPath, IdTable, LocalId, ObjectHandle, TracePath};
pub use filter::{
    ExpansionMetrics, FilterMetrics, FilterOptions, FilterOutcome, NeighborMetrics, apply_filter,
    expand_from, neighbor_expand,
};
pub use graph::{Edge, ObjectGraph, ObjectInfo, build_object_graph};
pub use interchange::{Instance, LoadError, Metamodel, ModelAccess, Value, load_instance, load_metamodel};
pub use query::{ExpressionError, Predicate, PredicateContext, build_predicate};
