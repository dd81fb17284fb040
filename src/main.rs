use clap::Parser;
use std::process::ExitCode;
use tagfold::cli::{Cli, run};
use tagfold::output::{ConsoleLogger, OutputFormatter};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = ConsoleLogger::init(cli.verbose) {
        eprintln!("Warning: could not install logger: {}", e);
    }

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            OutputFormatter::error(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}
