use crate::cli::ComparatorCli;
use clap::Parser;

/// Initialise the CLI and logging for the comparator runner.
pub fn init() -> ComparatorCli {
    env_logger::init();

    ComparatorCli::parse()
}
