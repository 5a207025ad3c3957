//! Foundation types for the emf-reader toolchain.
//!
//! This module provides the identity and addressing primitives every other
//! module builds on:
//! - [`ObjectHandle`] - Arena index of a model object inside an instance
//! - [`LocalId`] - Session-local identifier (`o<N>`) assigned in first-visit order
//! - [`CanonicalPath`] - Containment-derived address (`/Root[0]/feature[2]`)
//! - [`TracePath`] - Slash-joined label/identifier trail built during expansion
//! - [`IdTable`] - Side table from handle to graph node position
//!
//! This module has NO dependencies on other emf-reader modules.

mod ids;
mod path;

pub use ids::{IdTable, LocalId, ObjectHandle};
pub use path::{CanonicalPath, TracePath};
