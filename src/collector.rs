// SPDX-License-Identifier: AGPL-3.0-or-later

//! Sampling driver
//!
//! A background worker ticks on a fixed interval, running one process scan
//! and one memory sample per tick, and hands results to the consumer over a
//! channel. The consumer drains the channel to the newest tick, so a stale
//! snapshot is never displayed over a fresh one. If a tick overruns the
//! interval, missed deadlines are skipped rather than run back to back.
//!
//! Terminations run on their own thread so the bounded graceful wait never
//! stalls the sampling cadence; each completed termination reports its
//! outcome and requests an immediate re-scan so the table reflects the
//! departure without waiting a full tick.

use crate::config::Config;
use crate::control::{ProcessController, TerminationOutcome};
use crate::error::{Result, TaskmonError};
use crate::memory::{MemorySample, MemorySampler};
use crate::process::{ProcessSampler, Snapshot};
use log::{debug, warn};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Event from the worker to the presentation layer
#[derive(Debug)]
pub enum CollectorEvent {
    /// A completed sampling tick
    Tick {
        snapshot: Snapshot,
        memory: Vec<MemorySample>,
    },
    /// The process table itself was unreachable this tick
    ScanError(String),
    /// A termination attempt finished
    TerminationDone(TerminationOutcome),
}

enum Command {
    Rescan,
    Terminate(u32),
    Shutdown,
}

/// Handle to the background sampling worker.
pub struct Collector {
    events: Receiver<CollectorEvent>,
    commands: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl Collector {
    /// Spawn the worker thread. Fails fast if the proc root is absent.
    pub fn spawn(config: &Config) -> Result<Self> {
        let process_sampler = ProcessSampler::with_proc_root(&config.proc_root)?;
        let memory_sampler = MemorySampler::with_proc_root(
            &config.proc_root,
            config.memory_history_capacity,
            config.tick_interval().as_secs_f64(),
        );
        let controller = ProcessController::new(config.graceful_timeout());
        let interval = config.tick_interval();

        let (event_tx, event_rx) = mpsc::channel();
        let (command_tx, command_rx) = mpsc::channel();
        let loopback = command_tx.clone();

        let handle = std::thread::Builder::new()
            .name("taskmon-collector".to_string())
            .spawn(move || {
                run_worker(
                    process_sampler,
                    memory_sampler,
                    controller,
                    interval,
                    event_tx,
                    command_rx,
                    loopback,
                );
            })
            .map_err(|e| TaskmonError::Config(format!("cannot spawn collector: {}", e)))?;

        Ok(Self {
            events: event_rx,
            commands: command_tx,
            handle: Some(handle),
        })
    }

    /// Event stream from the worker
    pub fn events(&self) -> &Receiver<CollectorEvent> {
        &self.events
    }

    /// Ask for an immediate out-of-cadence tick
    pub fn request_rescan(&self) {
        let _ = self.commands.send(Command::Rescan);
    }

    /// Start a termination attempt; the outcome arrives as an event
    pub fn request_terminate(&self, pid: u32) {
        let _ = self.commands.send(Command::Terminate(pid));
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_worker(
    mut process_sampler: ProcessSampler,
    mut memory_sampler: MemorySampler,
    controller: ProcessController,
    interval: Duration,
    events: Sender<CollectorEvent>,
    commands: Receiver<Command>,
    loopback: Sender<Command>,
) {
    // First tick fires immediately so the UI has data at startup
    let mut next_deadline = Instant::now();

    loop {
        let timeout = next_deadline.saturating_duration_since(Instant::now());
        match commands.recv_timeout(timeout) {
            Ok(Command::Rescan) => {
                if tick(&mut process_sampler, &mut memory_sampler, &events).is_err() {
                    return;
                }
                // The on-demand tick replaces the upcoming scheduled one
                next_deadline = Instant::now() + interval;
                continue;
            }
            Ok(Command::Terminate(pid)) => {
                spawn_termination(controller, pid, events.clone(), loopback.clone());
                continue;
            }
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if tick(&mut process_sampler, &mut memory_sampler, &events).is_err() {
            return;
        }

        next_deadline += interval;
        // Skip deadlines the tick overran; never run catch-up ticks
        let now = Instant::now();
        while next_deadline <= now {
            debug!("tick overran interval, skipping a deadline");
            next_deadline += interval;
        }
    }
}

/// One sampling pass. Returns Err only when the consumer is gone.
fn tick(
    process_sampler: &mut ProcessSampler,
    memory_sampler: &mut MemorySampler,
    events: &Sender<CollectorEvent>,
) -> std::result::Result<(), ()> {
    let snapshot = match process_sampler.scan() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("scan failed: {}", e);
            return events
                .send(CollectorEvent::ScanError(e.to_string()))
                .map_err(|_| ());
        }
    };

    // A failed memory read skips this tick's sample; the series stays valid
    if let Err(e) = memory_sampler.sample() {
        warn!("memory sample skipped: {}", e);
    }
    let memory = memory_sampler.series().iter().copied().collect();

    events
        .send(CollectorEvent::Tick { snapshot, memory })
        .map_err(|_| ())
}

fn spawn_termination(
    controller: ProcessController,
    pid: u32,
    events: Sender<CollectorEvent>,
    loopback: Sender<Command>,
) {
    let spawned = std::thread::Builder::new()
        .name(format!("taskmon-kill-{}", pid))
        .spawn(move || {
            if let Ok(outcome) = controller.terminate(pid) {
                let _ = events.send(CollectorEvent::TerminationDone(outcome));
            }
            // Refresh the table right away so the departure is visible
            let _ = loopback.send(Command::Rescan);
        });
    if let Err(e) = spawned {
        warn!("cannot spawn termination thread for pid {}: {}", pid, e);
    }
}
