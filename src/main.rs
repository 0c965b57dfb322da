use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

use clipwatch::commands::{self, Cli, Commands};
use clipwatch::Config;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    commands::init_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate(args) => commands::generate::run(args, config),
        Commands::Status(args) => commands::status::run(args, config),
    }
}
