pub mod cli;
pub mod commands;
pub mod loader;
pub mod logging;

pub use cli::{Cli, Commands};
pub use commands::Outcome;
pub use loader::{load_records, LoadError};
pub use logging::setup_logging;

use fieldmatch_settings::FieldmatchConfig;

/// Dispatches a parsed command line
pub fn run(cli: &Cli, config: &FieldmatchConfig) -> Result<Outcome, anyhow::Error> {
    match &cli.command {
        Commands::Evaluate(args) => commands::evaluate(args, config),
        Commands::Compare(args) => commands::compare(args),
        Commands::Schema(args) => commands::schema(args),
    }
}
