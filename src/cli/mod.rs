//! Command-line front ends.
//!
//! ```text
//! emf-reader      ─▶ reader::run  ─▶ interchange + filter + export
//! emf-xsd-enrich  ─▶ enrich::run  ─▶ xsd::enrich_xsd
//! ```
//!
//! Both return a process exit code: [`EXIT_OK`] or [`EXIT_FAILURE`].

pub mod enrich;
pub mod reader;

pub use enrich::EnrichArgs;
pub use reader::ReaderArgs;

use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILURE: u8 = 2;

/// Install the fmt subscriber on stderr. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Split a comma-separated class list, dropping blanks.
pub fn parse_class_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Log every argument as `  name: value`.
fn log_parameters<T: Serialize>(args: &T) {
    info!("Parameters:");
    if let Ok(serde_json::Value::Object(map)) = serde_json::to_value(args) {
        for (name, value) in map {
            info!("  {name}: {value}");
        }
    }
}
