mod api;
mod error;
mod interrupt;
mod job;
mod poller;
pub mod render;
mod stream;

pub use api::{
    ApiConfig, ClipsClient, GenerationOptions, GenerationRequest, RenderingOptions,
    SubmissionStream, DEFAULT_BASE_URL,
};
pub use error::ClipsError;
pub use interrupt::{install_ctrl_c_handler, StopSignal};
pub use job::{Clip, JobSnapshot, JobStatus};
pub use poller::{JobSource, PollEvent, PollSettings, Poller, Sleeper, ThreadSleeper};
pub use stream::{decode_data_line, follow, SnapshotStream, StreamEvent};
