use anyhow::Result;
use clap::Parser;
use log::debug;
use std::io::Write;
use std::process::ExitCode;

use super::{
    api_key_or_explain, emit, finish, stop_on_ctrl_c, stopped_by_user, value_or_prompt,
};
use crate::config::Config;
use crate::utils::{
    render, ClipsClient, ClipsError, PollEvent, Poller, StopSignal, ThreadSleeper,
};

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Job ID printed by `generate` (prompted for when omitted)
    pub job_id: Option<String>,

    /// Seconds between status checks
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Give up after this many consecutive connection failures
    #[arg(long)]
    pub max_retries: Option<u32>,
}

impl StatusArgs {
    /// Merge command line overrides into the loaded configuration
    fn apply(&self, config: &mut Config) {
        if let Some(interval) = self.interval {
            config.polling.interval_seconds = interval;
        }
        if let Some(max) = self.max_retries {
            config.polling.max_retries = Some(max);
        }
    }
}

pub fn run(args: StatusArgs, mut config: Config) -> Result<ExitCode> {
    args.apply(&mut config);
    config.validate()?;

    emit(|out| render::banner(out, "Reka Job Status Checker"));

    let Some(api_key) = api_key_or_explain(&config) else {
        return Ok(ExitCode::FAILURE);
    };

    let job_id = value_or_prompt(args.job_id, "Enter the Job ID: ")?;
    if job_id.is_empty() {
        emit(|out| writeln!(out, "Error: No Job ID provided."));
        return Ok(ExitCode::FAILURE);
    }

    emit(|out| {
        writeln!(out)?;
        render::light_rule(out)?;
        writeln!(out, "Press Ctrl+C to stop checking")?;
        render::light_rule(out)
    });

    let stop = StopSignal::new();
    stop_on_ctrl_c(&stop)?;

    let client = ClipsClient::new(config.api_config(api_key));
    let mut poller = Poller::new(
        client,
        ThreadSleeper::new(stop.clone()),
        config.poll_settings(),
        stop.clone(),
    );

    let result = poller.run(&job_id, |event| emit(|out| show_event(out, &event)));
    stop.hold_shutdown();

    match result {
        Ok(snapshot) => emit(|out| render::outcome(out, &snapshot)),
        Err(ClipsError::Cancelled) => stopped_by_user(),
        Err(e @ ClipsError::RetriesExhausted { .. }) => emit(|out| writeln!(out, "Error: {}", e)),
        Err(e) => emit(|out| writeln!(out, "API Error: {}", e)),
    }

    finish();
    Ok(ExitCode::SUCCESS)
}

fn show_event(out: &mut impl Write, event: &PollEvent<'_>) -> std::io::Result<()> {
    match event {
        PollEvent::Checking { attempt } => {
            writeln!(out, "\nCheck #{} - Fetching status...", attempt)
        }
        PollEvent::Status(snapshot) => render::status_line(out, snapshot),
        PollEvent::Waiting(delay) => writeln!(
            out,
            "Waiting {} seconds before next check...",
            delay.as_secs()
        ),
        PollEvent::Retrying { error, delay } => {
            debug!("Status check failed: {}", error);
            writeln!(out, "Connection error. Retrying in {} seconds...", delay.as_secs())
        }
    }
}
