use clap::Parser;
use emf_reader::cli::{EnrichArgs, enrich, init_tracing};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = EnrichArgs::parse();
    init_tracing(args.verbose);
    ExitCode::from(enrich::run(&args))
}
