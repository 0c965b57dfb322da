pub mod commands;
pub mod config;
pub mod utils;

// Re-export commonly used types at the crate root for convenience
pub use config::Config;
pub use utils::{ClipsClient, ClipsError, JobSnapshot, JobStatus, Poller, SnapshotStream};
