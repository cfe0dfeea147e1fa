// SPDX-License-Identifier: AGPL-3.0-or-later

//! Process termination with graceful-then-forced escalation
//!
//! SIGTERM first, a bounded wait for exit, then SIGKILL. The two-phase order
//! is deliberate: well-behaved processes get a chance at clean shutdown, and
//! a misbehaving one is still guaranteed to either die or produce an explicit
//! failure report. Permission is probed up front so a denial never half
//! signals a process.

use crate::error::Result;
use log::{info, warn};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::{Duration, Instant};

/// Default bound on the graceful-exit wait
pub const DEFAULT_GRACEFUL_TIMEOUT: Duration = Duration::from_secs(3);

/// Interval between liveness polls during the graceful wait
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Terminal result of one termination attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationResult {
    /// Process exited within the graceful timeout
    Terminated,
    /// Process did not exist (or vanished before the first signal)
    NotFound,
    /// Caller may not signal this process; no escalation attempted
    PermissionDenied,
    /// Graceful signal ignored; forced signal delivered
    Escalated,
    /// Forced signal itself failed; cause attached for display
    EscalationFailed(String),
}

/// Outcome of `terminate` for one pid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationOutcome {
    pub pid: u32,
    pub result: TerminationResult,
}

impl std::fmt::Display for TerminationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.result {
            TerminationResult::Terminated => write!(f, "process {} terminated", self.pid),
            TerminationResult::NotFound => write!(f, "process {} not found", self.pid),
            TerminationResult::PermissionDenied => {
                write!(f, "permission denied for process {}", self.pid)
            }
            TerminationResult::Escalated => {
                write!(f, "process {} force-killed after timeout", self.pid)
            }
            TerminationResult::EscalationFailed(cause) => {
                write!(f, "failed to kill process {}: {}", self.pid, cause)
            }
        }
    }
}

/// Terminates processes by pid with bounded escalation.
#[derive(Debug, Clone, Copy)]
pub struct ProcessController {
    graceful_timeout: Duration,
}

impl Default for ProcessController {
    fn default() -> Self {
        Self::new(DEFAULT_GRACEFUL_TIMEOUT)
    }
}

impl ProcessController {
    pub fn new(graceful_timeout: Duration) -> Self {
        Self { graceful_timeout }
    }

    pub fn graceful_timeout(&self) -> Duration {
        self.graceful_timeout
    }

    /// Attempt to terminate `pid`, escalating to SIGKILL on timeout.
    ///
    /// Always returns an outcome; the `Result` wrapper exists so callers can
    /// `?` through plumbing, and is currently always `Ok`.
    pub fn terminate(&self, pid: u32) -> Result<TerminationOutcome> {
        let target = Pid::from_raw(pid as i32);

        // Probe existence and permission with the null signal before
        // touching the process. A denial here applies equally to SIGKILL,
        // so there is nothing to escalate to.
        match kill(target, None) {
            Err(Errno::ESRCH) => {
                return Ok(TerminationOutcome {
                    pid,
                    result: TerminationResult::NotFound,
                })
            }
            Err(Errno::EPERM) => {
                return Ok(TerminationOutcome {
                    pid,
                    result: TerminationResult::PermissionDenied,
                })
            }
            _ => {}
        }

        info!("sending SIGTERM to pid {}", pid);
        match kill(target, Signal::SIGTERM) {
            Ok(()) => {}
            Err(Errno::ESRCH) => {
                // Exited between the probe and the signal
                return Ok(TerminationOutcome {
                    pid,
                    result: TerminationResult::NotFound,
                });
            }
            Err(Errno::EPERM) => {
                return Ok(TerminationOutcome {
                    pid,
                    result: TerminationResult::PermissionDenied,
                });
            }
            Err(e) => {
                return Ok(TerminationOutcome {
                    pid,
                    result: TerminationResult::EscalationFailed(e.to_string()),
                });
            }
        }

        if self.wait_for_exit(target) {
            info!("pid {} exited within graceful timeout", pid);
            return Ok(TerminationOutcome {
                pid,
                result: TerminationResult::Terminated,
            });
        }

        warn!(
            "pid {} ignored SIGTERM for {:?}, sending SIGKILL",
            pid, self.graceful_timeout
        );
        let result = match kill(target, Signal::SIGKILL) {
            Ok(()) => TerminationResult::Escalated,
            // Includes the exit race where the process died right at the
            // deadline: surfaced with its cause rather than guessed at.
            Err(e) => TerminationResult::EscalationFailed(e.to_string()),
        };
        Ok(TerminationOutcome { pid, result })
    }

    /// Terminate several pids independently; one failure never aborts the rest.
    pub fn terminate_all(&self, pids: &[u32]) -> Vec<TerminationOutcome> {
        pids.iter()
            .map(|&pid| {
                self.terminate(pid).unwrap_or(TerminationOutcome {
                    pid,
                    result: TerminationResult::EscalationFailed(
                        "internal error".to_string(),
                    ),
                })
            })
            .collect()
    }

    /// Poll until the process exits or the graceful timeout elapses.
    fn wait_for_exit(&self, target: Pid) -> bool {
        let deadline = Instant::now() + self.graceful_timeout;
        loop {
            if !process_alive(target) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(WAIT_POLL_INTERVAL);
        }
    }
}

/// Whether the process still exists and is not a zombie.
///
/// A zombie has already terminated and cannot be signaled away by us (its
/// parent must reap it), so the wait treats it as exited.
fn process_alive(target: Pid) -> bool {
    match kill(target, None) {
        Err(Errno::ESRCH) => false,
        // EPERM means it exists but is not ours to signal; still alive.
        _ => !is_zombie(target),
    }
}

fn is_zombie(target: Pid) -> bool {
    let stat_path = format!("/proc/{}/stat", target.as_raw());
    match fs::read_to_string(stat_path) {
        Ok(content) => content
            .rfind(')')
            .and_then(|end| content[end + 1..].split_whitespace().next())
            .map(|state| state == "Z")
            .unwrap_or(false),
        Err(_) => false,
    }
}
