use std::io::{self, Write};

use super::job::{Clip, JobSnapshot, JobStatus};

const RULE_WIDTH: usize = 40;

/// Fallback for clip fields the API left out
const MISSING: &str = "N/A";

pub fn heavy_rule(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))
}

pub fn light_rule(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))
}

/// Title banner printed when a command starts
pub fn banner(out: &mut impl Write, title: &str) -> io::Result<()> {
    heavy_rule(out)?;
    writeln!(out, "  {}", title)?;
    heavy_rule(out)
}

pub fn status_line(out: &mut impl Write, snapshot: &JobSnapshot) -> io::Result<()> {
    writeln!(out, "Status: {}", snapshot.status)
}

/// Announce the job id so an interrupted run can be resumed with `status`
pub fn job_id(out: &mut impl Write, id: &str) -> io::Result<()> {
    writeln!(out, "Job ID: {}", id)?;
    writeln!(out, "(Save this ID to retrieve results if interrupted)")?;
    light_rule(out)
}

pub fn failure(out: &mut impl Write, snapshot: &JobSnapshot) -> io::Result<()> {
    let reason = snapshot.error_message.as_deref().unwrap_or("Unknown error");
    writeln!(out, "Job failed: {}", reason)
}

/// Render every clip of a completed job
pub fn clips(out: &mut impl Write, snapshot: &JobSnapshot) -> io::Result<()> {
    writeln!(out)?;
    banner(out, "CLIP(S) READY!")?;

    let clips = snapshot.clips();
    if clips.is_empty() {
        return writeln!(out, "No clips in output.");
    }

    for (i, clip) in clips.iter().enumerate() {
        clip_details(out, i + 1, clip)?;
    }
    Ok(())
}

fn clip_details(out: &mut impl Write, number: usize, clip: &Clip) -> io::Result<()> {
    writeln!(out, "\n--- Clip {} ---", number)?;
    writeln!(out, "Title: {}", clip.title.as_deref().unwrap_or(MISSING))?;
    writeln!(out, "URL: {}", clip.video_url.as_deref().unwrap_or(MISSING))?;
    writeln!(out, "Caption: {}", clip.caption.as_deref().unwrap_or(MISSING))?;
    if !clip.hashtags.is_empty() {
        writeln!(out, "Hashtags: {}", clip.hashtags.join(" "))?;
    }
    Ok(())
}

/// Render the outcome of a job that reached a terminal status
pub fn outcome(out: &mut impl Write, snapshot: &JobSnapshot) -> io::Result<()> {
    match snapshot.status {
        JobStatus::Completed => clips(out, snapshot),
        JobStatus::Failed => failure(out, snapshot),
        JobStatus::InProgress(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn completed(output: Vec<Clip>) -> JobSnapshot {
        JobSnapshot {
            id: Some("job-1".to_string()),
            status: JobStatus::Completed,
            error_message: None,
            output: Some(output),
        }
    }

    #[test]
    fn test_clip_fields() {
        let snapshot = completed(vec![Clip {
            title: Some("T1".to_string()),
            video_url: Some("u1".to_string()),
            caption: Some("c1".to_string()),
            hashtags: vec!["#a".to_string(), "#b".to_string()],
        }]);

        let text = render(|out| clips(out, &snapshot));
        assert!(text.contains("CLIP(S) READY!"));
        assert!(text.contains("--- Clip 1 ---\nTitle: T1\nURL: u1\nCaption: c1\nHashtags: #a #b\n"));
        assert!(!text.contains("No clips in output."));
    }

    #[test]
    fn test_no_clips_notice() {
        let text = render(|out| clips(out, &completed(vec![])));
        assert!(text.contains("No clips in output."));
        assert!(!text.contains("--- Clip"));
        assert!(!text.contains("Title:"));
    }

    #[test]
    fn test_missing_fields_and_hashtags() {
        let snapshot = completed(vec![Clip::default(), Clip {
            title: Some("Second".to_string()),
            ..Default::default()
        }]);

        let text = render(|out| clips(out, &snapshot));
        assert!(text.contains("--- Clip 1 ---\nTitle: N/A\nURL: N/A\nCaption: N/A\n"));
        assert!(text.contains("--- Clip 2 ---\nTitle: Second\n"));
        assert!(!text.contains("Hashtags:"));
    }

    #[test]
    fn test_failure_message() {
        let snapshot = JobSnapshot {
            status: JobStatus::Failed,
            error_message: Some("Video is private".to_string()),
            ..Default::default()
        };
        assert_eq!(
            render(|out| outcome(out, &snapshot)),
            "Job failed: Video is private\n"
        );

        let bare = JobSnapshot {
            status: JobStatus::Failed,
            ..Default::default()
        };
        assert_eq!(render(|out| failure(out, &bare)), "Job failed: Unknown error\n");
    }

    #[test]
    fn test_job_id_hint() {
        let text = render(|out| job_id(out, "job-42"));
        assert!(text.starts_with("Job ID: job-42\n(Save this ID"));
    }
}
