use log::{debug, info};
use std::time::Duration;

use super::error::ClipsError;
use super::interrupt::StopSignal;
use super::job::JobSnapshot;

/// Default pause between two status checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

// Lets the polling loop run against a fake API in tests
pub trait JobSource {
    fn fetch(&mut self, job_id: &str) -> Result<JobSnapshot, ClipsError>;
}

// Lets the polling loop run against a fake clock in tests
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Blocking sleep that wakes early when the user interrupts
pub struct ThreadSleeper {
    stop: StopSignal,
}

impl ThreadSleeper {
    pub fn new(stop: StopSignal) -> Self {
        Self { stop }
    }
}

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        if !self.stop.sleep(duration) {
            debug!("Sleep interrupted");
        }
    }
}

/// Knobs for the polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Fixed pause between checks and before retrying a failed connection
    pub interval: Duration,
    /// Give up after this many consecutive connection failures (`None` retries forever)
    pub max_retries: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_retries: None,
        }
    }
}

/// Progress reported while polling
#[derive(Debug)]
pub enum PollEvent<'a> {
    /// About to issue check number `attempt` (1-based)
    Checking { attempt: u32 },
    /// The status returned by a successful check
    Status(&'a JobSnapshot),
    /// The job is still running; next check after `delay`
    Waiting(Duration),
    /// The API could not be reached; retrying after `delay`
    Retrying { error: &'a ClipsError, delay: Duration },
}

/// Polls one job until it completes, fails, or the user gives up
pub struct Poller<S, Z> {
    source: S,
    sleeper: Z,
    settings: PollSettings,
    stop: StopSignal,
}

impl<S: JobSource, Z: Sleeper> Poller<S, Z> {
    pub fn new(source: S, sleeper: Z, settings: PollSettings, stop: StopSignal) -> Self {
        Self {
            source,
            sleeper,
            settings,
            stop,
        }
    }

    /// Check `job_id` until it reaches a terminal status
    ///
    /// Returns the terminal snapshot, whether the job completed or failed.
    /// Rejected requests end the loop at once, connection failures are retried
    /// after the same fixed interval used between checks.
    pub fn run(
        &mut self,
        job_id: &str,
        mut on_event: impl FnMut(PollEvent<'_>),
    ) -> Result<JobSnapshot, ClipsError> {
        let interval = self.settings.interval;
        let mut attempt = 0u32;
        let mut consecutive_failures = 0u32;

        loop {
            if self.stop.is_raised() {
                return Err(ClipsError::Cancelled);
            }

            attempt += 1;
            on_event(PollEvent::Checking { attempt });

            match self.source.fetch(job_id) {
                Ok(snapshot) => {
                    consecutive_failures = 0;
                    on_event(PollEvent::Status(&snapshot));
                    if snapshot.is_terminal() {
                        info!("Job {} finished with status {}", job_id, snapshot.status);
                        return Ok(snapshot);
                    }
                    on_event(PollEvent::Waiting(interval));
                }
                Err(error) if error.is_transient() => {
                    consecutive_failures += 1;
                    debug!(
                        "Check #{} failed ({} in a row): {}",
                        attempt, consecutive_failures, error
                    );
                    if let Some(max) = self.settings.max_retries {
                        if consecutive_failures > max {
                            return Err(ClipsError::RetriesExhausted {
                                attempts: consecutive_failures,
                                last: error.to_string(),
                            });
                        }
                    }
                    on_event(PollEvent::Retrying {
                        error: &error,
                        delay: interval,
                    });
                }
                Err(error) => return Err(error),
            }

            self.sleeper.sleep(interval);
        }
    }
}
