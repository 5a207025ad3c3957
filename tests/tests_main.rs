#[path = "helpers/mod.rs"]
mod helpers;

#[path = "graph/mod.rs"]
mod graph;

#[path = "filter/mod.rs"]
mod filter;

#[path = "export/mod.rs"]
mod export;

#[path = "xsd/mod.rs"]
mod xsd;

#[cfg(feature = "cli")]
#[path = "cli/mod.rs"]
mod cli;
