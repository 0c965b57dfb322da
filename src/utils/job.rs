use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Lifecycle status of a clip generation job
///
/// The server vocabulary is open-ended; only `completed` and `failed` are
/// terminal, everything else is treated as still in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum JobStatus {
    Completed,
    Failed,
    InProgress(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::InProgress(raw) => raw,
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::InProgress("unknown".to_string())
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::InProgress(raw),
        }
    }
}

// A null status reads as "unknown", like a missing one
impl From<Option<String>> for JobStatus {
    fn from(raw: Option<String>) -> Self {
        match raw {
            Some(raw) => JobStatus::from(raw),
            None => JobStatus::default(),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generated short-form clip
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct Clip {
    /// Generated title
    #[serde(default)]
    pub title: Option<String>,
    /// Where the rendered clip can be downloaded
    #[serde(default)]
    pub video_url: Option<String>,
    /// Suggested social caption
    #[serde(default)]
    pub caption: Option<String>,
    /// Suggested hashtags, in server order
    #[serde(default, deserialize_with = "null_as_empty")]
    pub hashtags: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// The observable state of a job at one instant
///
/// Poll responses and streamed events share this shape.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct JobSnapshot {
    /// Server-assigned job identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub status: JobStatus,
    /// Present when the job failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Present when the job completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<Clip>>,
}

impl JobSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Clips produced by the job, empty unless it completed
    pub fn clips(&self) -> &[Clip] {
        match (&self.status, &self.output) {
            (JobStatus::Completed, Some(output)) => output,
            _ => &[],
        }
    }
}
