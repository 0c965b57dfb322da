use anyhow::{Context, Result};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How often a sleeping poller checks for an interrupt
const SLEEP_SLICE: Duration = Duration::from_millis(200);

/// How long the main thread gets to notice an interrupt on its own
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Shared flag raised when the user asks to stop
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    raised: Arc<AtomicBool>,
    claimed: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, waking early if the signal is raised
    ///
    /// Returns `false` when the sleep was cut short.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_raised() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }

    /// Become the one thread that prints the closing output
    ///
    /// Succeeds exactly once across all clones.
    pub fn claim_shutdown(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Claim the closing output for the calling thread
    ///
    /// If the Ctrl+C listener already claimed it, the process is about to
    /// exit from that thread and this call never returns.
    pub fn hold_shutdown(&self) {
        if self.claim_shutdown() {
            return;
        }
        debug!("Shutdown already owned by the signal listener");
        loop {
            thread::park();
        }
    }
}

/// Run `on_forced_stop` unless the main thread already owns the shutdown
fn force_stop(stop: &StopSignal, on_forced_stop: impl FnOnce()) -> bool {
    if !stop.claim_shutdown() {
        debug!("Main thread is already shutting down");
        return false;
    }
    on_forced_stop();
    true
}

/// Route Ctrl+C into `stop`
///
/// The first interrupt raises the signal so the current command can unwind.
/// A command blocked on a quiet connection never looks at it, so if nothing
/// has claimed the shutdown after a short grace period (or on a second
/// interrupt) the listener runs `on_forced_stop` itself and exits with 0.
pub fn install_ctrl_c_handler<F>(stop: StopSignal, on_forced_stop: F) -> Result<()>
where
    F: FnOnce() + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start signal listener")?;

    thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                    return;
                }
                debug!("Received Ctrl+C, stopping");
                stop.raise();

                tokio::select! {
                    _ = tokio::signal::ctrl_c() => debug!("Received second Ctrl+C"),
                    _ = tokio::time::sleep(SHUTDOWN_GRACE) => {
                        debug!("No response to Ctrl+C after {:?}", SHUTDOWN_GRACE)
                    }
                }

                if force_stop(&stop, on_forced_stop) {
                    std::process::exit(0);
                }
            });
        })
        .context("Failed to spawn signal listener thread")?;

    Ok(())
}
