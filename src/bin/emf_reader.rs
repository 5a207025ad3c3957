use clap::Parser;
use emf_reader::cli::{ReaderArgs, init_tracing, reader};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = ReaderArgs::parse();
    init_tracing(args.verbose);
    ExitCode::from(reader::run(&args))
}
