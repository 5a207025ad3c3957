//! Configuration files.
//!
//! Files are YAML when the extension is `.yaml`/`.yml` and JSON otherwise.
//! A reader profile supplies defaults for the `emf-reader` options; flags
//! given on the command line win over the file.
//!
//! ```yaml
//! filter:
//!   filter_expr: "eclass != 'Comment'"
//!   expand_expr: "name == 'Root'"
//!   expand_depth: -1
//!   expand_classes: [Package, Class]
//! exclude_classes: [Comment]
//! strip_references: true
//! ```

use crate::filter::FilterOptions;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

/// Deserialize a JSON or YAML file, chosen by extension.
pub fn load_config_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loading config: {}", path.display());
    if is_yaml(path) {
        serde_yaml::from_slice(&bytes).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Defaults for an `emf-reader` run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderProfile {
    pub filter: FilterOptions,
    pub include_classes: Option<Vec<String>>,
    pub exclude_classes: Option<Vec<String>>,
    pub strip_references: bool,
    pub dump_instances_filter: Option<String>,
}

impl ReaderProfile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_config_file(path)
    }

    /// Overlay `overrides` on this profile: any option set there wins.
    pub fn merge_filter(&self, overrides: FilterOptions) -> FilterOptions {
        let base = self.filter.clone();
        FilterOptions {
            filter_expr: overrides.filter_expr.or(base.filter_expr),
            expand_expr: overrides.expand_expr.or(base.expand_expr),
            expand_depth: overrides.expand_depth.or(base.expand_depth),
            expand_classes: overrides.expand_classes.or(base.expand_classes),
            neighbor_expr: overrides.neighbor_expr.or(base.neighbor_expr),
            neighbor_hops: overrides.neighbor_hops.or(base.neighbor_hops),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_yaml_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "profile.yml",
            "filter:\n  expand_expr: \"name == 'A'\"\n  expand_depth: -1\nexclude_classes: [Leaf]\nstrip_references: true\n",
        );
        let profile = ReaderProfile::load(&path).unwrap();
        assert_eq!(profile.filter.expand_expr.as_deref(), Some("name == 'A'"));
        assert_eq!(profile.filter.expand_depth, Some(-1));
        assert_eq!(profile.exclude_classes, Some(vec!["Leaf".to_string()]));
        assert!(profile.strip_references);
        assert!(profile.include_classes.is_none());
    }

    #[test]
    fn test_json_kind_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "map.json", r#"{"element": ["MessageElement"]}"#);
        let map: IndexMap<String, Vec<String>> = load_config_file(&path).unwrap();
        assert_eq!(map["element"], vec!["MessageElement"]);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bad.json", r#"{"filtr": {}}"#);
        let err = ReaderProfile::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = ReaderProfile::load(Path::new("/nonexistent/profile.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_command_line_overrides_profile() {
        let profile = ReaderProfile {
            filter: FilterOptions {
                filter_expr: Some("true".into()),
                expand_depth: Some(3),
                ..FilterOptions::default()
            },
            ..ReaderProfile::default()
        };
        let merged = profile.merge_filter(FilterOptions {
            expand_depth: Some(1),
            neighbor_hops: Some(2),
            ..FilterOptions::default()
        });
        assert_eq!(merged.filter_expr.as_deref(), Some("true"));
        assert_eq!(merged.expand_depth, Some(1));
        assert_eq!(merged.neighbor_hops, Some(2));
    }
}
