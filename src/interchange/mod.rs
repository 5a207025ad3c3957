//! Model access layer: Ecore metamodels and XMI instances.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  .ecore file │                    │  .xmi file   │
//! └──────┬───────┘                    └──────┬───────┘
//!        │ read_ecore                        │ read_xmi (against the registry)
//!        ▼                                   ▼
//! ┌──────────────────────┐  Arc   ┌─────────────────────────┐
//! │ Metamodel (registry) │◄───────│ Instance (object arena) │
//! └──────────────────────┘        └────────────┬────────────┘
//!                                              │ impl ModelAccess
//!                                              ▼
//!                               graph / query / filter / export / xsd
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use emf_reader::interchange::{load_instance, load_metamodel};
//! use std::sync::Arc;
//!
//! let metamodel = Arc::new(load_metamodel("model.ecore")?);
//! let instance = load_instance("data.xmi", &metamodel)?;
//! println!("{} roots", instance.roots().len());
//! ```

mod access;
pub mod ecore;
mod error;
pub mod metamodel;
pub mod model;
pub mod stats;
mod value;
pub mod xmi;

pub use access::{ModelAccess, ReferenceSlot};
pub use error::LoadError;
pub use metamodel::{ClassId, DataKind, EAttribute, EClass, EPackage, EReference, Metamodel, PackageId};
pub use model::{EObject, Instance};
pub use value::Value;
pub use xmi::{ReferenceOverlay, XmiWriter};

use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Instance file extensions recognised without a flag; anything else is
/// still read as XMI.
pub const INSTANCE_EXTENSIONS: &[&str] = &["xmi", "xml", "iso20022"];

impl Metamodel {
    /// Parse `.ecore` bytes.
    pub fn from_ecore_bytes(input: &[u8]) -> Result<Self, LoadError> {
        ecore::read_ecore(input, "<memory>")
    }
}

/// Load a metamodel and register its packages by namespace URI.
pub fn load_metamodel(path: impl AsRef<Path>) -> Result<Metamodel, LoadError> {
    let path = path.as_ref();
    info!("Loading metamodel: {}", path.display());
    let bytes = std::fs::read(path).map_err(|e| LoadError::io(path, e))?;
    ecore::read_ecore(&bytes, &path.display().to_string())
}

/// Load an instance document against a loaded metamodel.
pub fn load_instance(path: impl AsRef<Path>, metamodel: &Arc<Metamodel>) -> Result<Instance, LoadError> {
    let path = path.as_ref();
    info!("Loading instance: {}", path.display());
    let bytes = std::fs::read(path).map_err(|e| LoadError::io(path, e))?;
    xmi::read_xmi(&bytes, Arc::clone(metamodel))
}
