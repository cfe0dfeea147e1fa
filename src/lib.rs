//! taskmon — a terminal task manager for Linux
//!
//! Samples the process table and system memory on a fixed interval, shows a
//! CPU-ranked live view, and terminates a selected process with graceful
//! SIGTERM-then-SIGKILL escalation.
//!
//! The crate splits into a sampling/lifecycle core and a thin TUI consumer:
//!
//! - [`process::ProcessSampler`] — `/proc` enumeration into sorted snapshots,
//!   tolerant of processes vanishing mid-scan
//! - [`memory::MemorySampler`] — RAM utilization with a bounded FIFO history
//! - [`control::ProcessController`] — two-phase termination with a bounded
//!   graceful wait
//! - [`collector::Collector`] — the tick driver tying the samplers together
//!   on a background thread
//! - [`tui`] — the ratatui front end
//!
//! # Example
//!
//! ```no_run
//! use taskmon::process::ProcessSampler;
//!
//! # fn main() -> taskmon::error::Result<()> {
//! let mut sampler = ProcessSampler::new()?;
//! let snapshot = sampler.scan()?;
//! for record in snapshot.iter().take(5) {
//!     println!("{:>7}  {:<20} {:5.1}%", record.pid, record.name, record.cpu_percent);
//! }
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod control;
pub mod error;
pub mod memory;
pub mod process;
pub mod tui;

pub use collector::{Collector, CollectorEvent};
pub use config::Config;
pub use control::{ProcessController, TerminationOutcome, TerminationResult};
pub use error::{Result, TaskmonError};
pub use memory::{MemorySample, MemorySampler};
pub use process::{ProcessRecord, ProcessSampler, ProcessStatus, Snapshot};
