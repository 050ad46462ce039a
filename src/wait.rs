//! Poll-until-complete waiter.
//!
//! [`wait_for_completion`] asks a [`StatusSource`] for a resource's status
//! every poll interval until the status is anything other than
//! [`IN_PROGRESS`], the timeout runs out, or a fetch fails.
//!
//! ```text
//!              status != inProgress
//!   Polling ───────────────────────────▶ Succeeded
//!     │  ▲
//!     │  └─ status == inProgress, sleep
//!     │
//!     ├── fetch error ─────────────────▶ Failed
//!     └── elapsed >= timeout ──────────▶ TimedOut
//! ```
//!
//! The elapsed time is checked before every fetch, so a zero or negative
//! timeout returns [`PollOutcome::TimedOut`] without contacting the server.
//! Fetch errors are never retried; only "not finished yet" is.

use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use crate::api::{StatusSource, TfsClient};

/// Status value meaning the resource has not reached a terminal state.
pub const IN_PROGRESS: &str = "inProgress";

pub const DEFAULT_TIMEOUT_MINUTES: i64 = 5;
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 5;

/// A zero interval would spin; anything shorter is raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Timing parameters for one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::from_minutes_and_seconds(DEFAULT_TIMEOUT_MINUTES, DEFAULT_POLL_INTERVAL_SECONDS)
    }
}

impl WaitOptions {
    /// Builds options from explicit durations.
    ///
    /// Intervals below [`MIN_POLL_INTERVAL`] are clamped up to it.
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        let poll_interval = if poll_interval < MIN_POLL_INTERVAL {
            warn!(
                requested_ms = poll_interval.as_millis() as u64,
                "Poll interval below one second, using one second"
            );
            MIN_POLL_INTERVAL
        } else {
            poll_interval
        };
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Builds options from the script-facing units.
    ///
    /// A zero or negative `timeout_minutes` becomes a zero timeout.
    pub fn from_minutes_and_seconds(timeout_minutes: i64, poll_interval_seconds: u64) -> Self {
        let timeout_secs = u64::try_from(timeout_minutes)
            .unwrap_or(0)
            .saturating_mul(60);
        Self::new(
            Duration::from_secs(timeout_secs),
            Duration::from_secs(poll_interval_seconds),
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// Why a wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The resource reported a status other than `inProgress`.
    Succeeded {
        /// The status that ended the wait (e.g. `completed`).
        status: String,
    },
    /// The timeout elapsed while the resource was still in progress.
    TimedOut,
    /// A status fetch failed. Only the message is kept; the kind is not
    /// exposed to callers.
    Failed {
        reason: String,
    },
}

impl PollOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Succeeded { .. })
    }

    /// Process exit code for scripts: 0 succeeded, 1 failed, 2 timed out.
    pub fn exit_code(&self) -> u8 {
        match self {
            PollOutcome::Succeeded { .. } => 0,
            PollOutcome::Failed { .. } => 1,
            PollOutcome::TimedOut => 2,
        }
    }
}

/// Outcome plus the bookkeeping of the wait that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSummary {
    pub outcome: PollOutcome,
    /// Number of status fetches issued.
    pub polls: u32,
    pub elapsed: Duration,
}

/// Observable progress of a wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitEvent<'a> {
    /// Emitted before each sleep.
    StillRunning {
        id: &'a str,
        status: &'a str,
        poll: u32,
        elapsed: Duration,
        next_check_in: Duration,
    },
    /// Emitted once when the wait ends.
    Finished {
        id: &'a str,
        summary: &'a WaitSummary,
    },
}

impl fmt::Display for WaitEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitEvent::StillRunning {
                id,
                status,
                poll,
                elapsed,
                next_check_in,
            } => write!(
                f,
                "Build {} is {} after {}s (check #{}), checking again in {}s",
                id,
                status,
                elapsed.as_secs(),
                poll,
                next_check_in.as_secs()
            ),
            WaitEvent::Finished { id, summary } => match &summary.outcome {
                PollOutcome::Succeeded { status } => write!(
                    f,
                    "Build {} finished with status {} after {}s",
                    id,
                    status,
                    summary.elapsed.as_secs()
                ),
                PollOutcome::TimedOut => write!(
                    f,
                    "Timed out after {}s waiting for build {}",
                    summary.elapsed.as_secs(),
                    id
                ),
                PollOutcome::Failed { reason } => {
                    write!(f, "Failed to check build {}: {}", id, reason)
                }
            },
        }
    }
}

/// Waits for `id` to leave the `inProgress` state.
///
/// `on_event` sees a [`WaitEvent::StillRunning`] before every sleep and one
/// [`WaitEvent::Finished`] at the end. It cannot influence the wait.
pub async fn wait_for_completion<S, F>(
    source: &S,
    id: &str,
    options: WaitOptions,
    mut on_event: F,
) -> WaitSummary
where
    S: StatusSource + ?Sized,
    F: FnMut(&WaitEvent<'_>),
{
    let start = Instant::now();
    let mut polls = 0u32;

    let outcome = if id.trim().is_empty() {
        PollOutcome::Failed {
            reason: "resource id must not be empty".to_string(),
        }
    } else {
        loop {
            if start.elapsed() >= options.timeout {
                break PollOutcome::TimedOut;
            }

            polls += 1;
            let status = match source.fetch_status(id).await {
                Ok(status) => status,
                Err(e) => {
                    error!(id, poll = polls, error = %e, "Status check failed");
                    break PollOutcome::Failed {
                        reason: e.to_string(),
                    };
                }
            };
            debug!(id, poll = polls, status = %status, "Fetched status");

            if status != IN_PROGRESS {
                break PollOutcome::Succeeded { status };
            }

            on_event(&WaitEvent::StillRunning {
                id,
                status: &status,
                poll: polls,
                elapsed: start.elapsed(),
                next_check_in: options.poll_interval,
            });
            sleep(options.poll_interval).await;
        }
    };

    let summary = WaitSummary {
        outcome,
        polls,
        elapsed: start.elapsed(),
    };
    info!(
        id,
        polls = summary.polls,
        elapsed_secs = summary.elapsed.as_secs(),
        outcome = ?summary.outcome,
        "Wait finished"
    );
    on_event(&WaitEvent::Finished {
        id,
        summary: &summary,
    });
    summary
}

/// Waits for a build using the client's build status endpoint.
pub async fn wait_for_build<F>(
    client: &TfsClient,
    build_id: &str,
    options: WaitOptions,
    on_event: F,
) -> WaitSummary
where
    F: FnMut(&WaitEvent<'_>),
{
    wait_for_completion(client, build_id, options, on_event).await
}
