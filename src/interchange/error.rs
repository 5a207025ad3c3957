//! Error types for metamodel and instance loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or writing models.
#[derive(Debug, Error)]
pub enum LoadError {
    /// IO error while reading a source document.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// XML parsing or serialization error.
    #[error("XML error: {0}")]
    Xml(String),

    /// The metamodel document has no top-level EPackage.
    #[error("No EPackage found in metamodel: {0}")]
    NoPackage(String),

    /// An instance element names a class the metamodel does not define.
    #[error("Unknown class {name} (namespace {ns_uri})")]
    UnknownClass { ns_uri: String, name: String },

    /// Missing required element or attribute.
    #[error("Missing required {kind}: {name}")]
    Missing { kind: &'static str, name: String },

    /// Invalid element type or structure.
    #[error("Invalid {kind}: {message}")]
    Invalid { kind: &'static str, message: String },
}

impl LoadError {
    /// Create an XML error.
    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml(message.into())
    }

    /// Create an IO error bound to a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a missing attribute error.
    pub fn missing_attribute(name: impl Into<String>) -> Self {
        Self::Missing {
            kind: "attribute",
            name: name.into(),
        }
    }

    /// Create an invalid element error.
    pub fn invalid_element(message: impl Into<String>) -> Self {
        Self::Invalid {
            kind: "element",
            message: message.into(),
        }
    }

    /// Create an invalid feature error.
    pub fn invalid_feature(message: impl Into<String>) -> Self {
        Self::Invalid {
            kind: "feature",
            message: message.into(),
        }
    }
}
