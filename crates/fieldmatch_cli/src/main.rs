use clap::Parser;
use fieldmatch_cli::{run, setup_logging, Cli, Outcome};
use fieldmatch_settings::FieldmatchConfig;
use fieldmatch_types::fieldmatch_version;
use std::process::ExitCode;
use tracing::debug;

const EXIT_ERROR: u8 = 1;
const EXIT_GATE_FAILED: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match FieldmatchConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if let Err(e) = setup_logging(&config.log) {
        eprintln!("Error: {e:?}");
        return ExitCode::from(EXIT_ERROR);
    }
    debug!("fieldmatch {}", fieldmatch_version());

    match run(&cli, &config) {
        Ok(Outcome::Passed) => ExitCode::SUCCESS,
        Ok(Outcome::Failed) => ExitCode::from(EXIT_GATE_FAILED),
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
