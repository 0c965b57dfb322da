use anyhow::Result;
use clap::Parser;
use log::debug;
use std::io::Write;
use std::process::ExitCode;

use super::{
    api_key_or_explain, emit, finish, stop_on_ctrl_c, stopped_by_user, value_or_prompt,
};
use crate::config::Config;
use crate::utils::{follow, render, ClipsClient, ClipsError, StopSignal, StreamEvent};

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// URL of the video to clip (prompted for when omitted)
    pub video_url: Option<String>,

    /// Instructions for the clip generator
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Generation template (e.g. moments)
    #[arg(short, long)]
    pub template: Option<String>,

    /// Number of clips to generate
    #[arg(short, long)]
    pub num_generations: Option<u32>,

    /// Maximum clip length in seconds
    #[arg(long)]
    pub max_duration: Option<u32>,

    /// Output aspect ratio (e.g. 9:16)
    #[arg(short, long)]
    pub aspect_ratio: Option<String>,

    /// Don't burn subtitles into the clips
    #[arg(long)]
    pub no_subtitles: bool,
}

impl GenerateArgs {
    /// Merge command line overrides into the loaded configuration
    fn apply(&self, config: &mut Config) {
        if let Some(prompt) = &self.prompt {
            config.generation.prompt = prompt.clone();
        }
        if let Some(template) = &self.template {
            config.generation.template = template.clone();
        }
        if let Some(n) = self.num_generations {
            config.generation.num_generations = n;
        }
        if let Some(max) = self.max_duration {
            config.generation.max_duration_seconds = max;
        }
        if let Some(ratio) = &self.aspect_ratio {
            config.rendering.aspect_ratio = ratio.clone();
        }
        if self.no_subtitles {
            config.rendering.subtitles = false;
        }
    }
}

pub fn run(args: GenerateArgs, mut config: Config) -> Result<ExitCode> {
    args.apply(&mut config);
    config.validate()?;

    emit(|out| render::banner(out, "Reka Clip Generator"));

    let Some(api_key) = api_key_or_explain(&config) else {
        return Ok(ExitCode::FAILURE);
    };

    let video_url = value_or_prompt(args.video_url, "Enter the YouTube video URL: ")?;
    if video_url.is_empty() {
        emit(|out| writeln!(out, "Error: No URL provided."));
        return Ok(ExitCode::FAILURE);
    }

    let stop = StopSignal::new();
    stop_on_ctrl_c(&stop)?;

    let client = ClipsClient::new(config.api_config(api_key));
    let request = config.generation_request(&video_url);

    emit(|out| {
        writeln!(out, "\nStarting clip generation...")?;
        render::light_rule(out)
    });

    let mut job_id = None;
    let result = client
        .submit(&request)
        .and_then(|stream| follow(stream, &stop, |event| show_event(event, &mut job_id)));

    stop.hold_shutdown();

    match result {
        Ok(Some(_)) => {}
        Ok(None) => {
            debug!("Event stream closed before the job finished");
            if let Some(id) = &job_id {
                emit(|out| {
                    writeln!(out, "Stream ended before the job finished.")?;
                    writeln!(out, "Keep checking with: clipwatch status {}", id)
                });
            }
        }
        Err(ClipsError::Cancelled) => stopped_by_user(),
        Err(e) => emit(|out| report_error(out, &e)),
    }

    finish();
    Ok(ExitCode::SUCCESS)
}

fn show_event(event: &StreamEvent, job_id: &mut Option<String>) {
    match event {
        StreamEvent::JobId(id) => {
            *job_id = Some(id.clone());
            emit(|out| render::job_id(out, id));
        }
        StreamEvent::Snapshot(snapshot) => emit(|out| {
            render::status_line(out, snapshot)?;
            render::outcome(out, snapshot)
        }),
    }
}

fn report_error(out: &mut impl Write, error: &ClipsError) -> std::io::Result<()> {
    match error {
        ClipsError::RequestRejected { .. } => writeln!(out, "API Error: {}", error),
        ClipsError::Timeout => writeln!(out, "Error: Request timed out."),
        e if e.is_transient() => writeln!(
            out,
            "Error: Could not connect to the API. Check your internet connection."
        ),
        e => writeln!(out, "Error: {}", e),
    }
}
