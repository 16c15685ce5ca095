use std::process::ExitCode;

use clap::Parser;
use ngbuild::cli::{Arguments, run_cli};

fn main() -> ExitCode {
    let args = Arguments::parse();

    match run_cli(args) {
        Ok(status) => status.into(),
        Err(err) => {
            eprintln!("Error: {}", err);
            ngbuild::cli::ExitStatus::Error.into()
        }
    }
}
