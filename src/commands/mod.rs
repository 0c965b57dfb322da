use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::warn;
use std::io::{self, BufRead, StdoutLock, Write};
use std::path::PathBuf;

use crate::config::Config;
use crate::utils::{install_ctrl_c_handler, render, ClipsError, StopSignal};

pub mod generate;
pub mod status;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate clips from a video and follow the job live
    Generate(generate::GenerateArgs),
    /// Check an existing job until it completes or fails
    Status(status::StatusArgs),
}

pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Write to stdout; a failed write is logged rather than aborting the command
pub(crate) fn emit(f: impl FnOnce(&mut StdoutLock<'static>) -> io::Result<()>) {
    let mut out = io::stdout().lock();
    if let Err(e) = f(&mut out).and_then(|_| out.flush()) {
        warn!("Failed to write to stdout: {}", e);
    }
}

/// Ask a question and return the trimmed answer (empty on end of input)
pub(crate) fn ask(question: &str, input: &mut impl BufRead, out: &mut impl Write) -> Result<String> {
    write!(out, "\n{}", question)?;
    out.flush()?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read from stdin")?;
    Ok(answer.trim().to_string())
}

/// Use `given` when present, otherwise prompt for it on stdin
pub(crate) fn value_or_prompt(given: Option<String>, question: &str) -> Result<String> {
    match given {
        Some(value) => Ok(value.trim().to_string()),
        None => ask(question, &mut io::stdin().lock(), &mut io::stdout()),
    }
}

/// Fetch the API key, explaining how to set it when it is missing
pub(crate) fn api_key_or_explain(config: &Config) -> Option<String> {
    match config.api_key() {
        Ok(key) => Some(key),
        Err(ClipsError::AuthenticationMissing { var }) => {
            emit(|out| {
                writeln!(out, "Error: {} environment variable is not set.", var)?;
                writeln!(out, "Please set it with: export {}=your_api_key", var)
            });
            None
        }
        Err(e) => {
            emit(|out| writeln!(out, "Error: {}", e));
            None
        }
    }
}

pub(crate) fn finish() {
    emit(|out| {
        render::light_rule(out)?;
        writeln!(out, "Done!")
    });
}

pub(crate) fn stopped_by_user() {
    emit(|out| writeln!(out, "\n\nStopped by user."));
}

/// Raise `stop` on Ctrl+C, closing the output from the listener if the
/// command is stuck waiting on the network
pub(crate) fn stop_on_ctrl_c(stop: &StopSignal) -> Result<()> {
    install_ctrl_c_handler(stop.clone(), || {
        stopped_by_user();
        finish();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_ask_trims_answer() -> Result<()> {
        let mut input = Cursor::new("  job-123 \n");
        let mut out = Vec::new();

        let answer = ask("Enter the Job ID: ", &mut input, &mut out)?;
        assert_eq!(answer, "job-123");
        assert_eq!(String::from_utf8(out)?, "\nEnter the Job ID: ");

        Ok(())
    }

    #[test]
    fn test_ask_end_of_input_is_empty() -> Result<()> {
        let answer = ask("Enter the Job ID: ", &mut Cursor::new(""), &mut Vec::new())?;
        assert!(answer.is_empty());
        Ok(())
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::parse_from(["clipwatch", "status", "job-1", "--interval", "5", "-v"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Status(args) => {
                assert_eq!(args.job_id.as_deref(), Some("job-1"));
                assert_eq!(args.interval, Some(5));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::parse_from(["clipwatch", "--config", "clips.toml", "generate"]);
        assert_eq!(cli.config, Some(PathBuf::from("clips.toml")));
        assert!(matches!(cli.command, Commands::Generate(ref args) if args.video_url.is_none()));
    }
}
