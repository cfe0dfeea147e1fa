//! Application state management

use crate::collector::{Collector, CollectorEvent};
use crate::config::Config;
use crate::error::Result;
use crate::memory::MemorySample;
use crate::process::Snapshot;
use std::time::{Duration, Instant};

/// How long a transient status message stays on screen
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Application state
pub struct App {
    /// Currently selected tab
    pub selected_tab: usize,
    /// Tab names
    pub tabs: Vec<&'static str>,
    /// Latest process snapshot, CPU-descending
    pub snapshot: Snapshot,
    /// Memory history for the graph, oldest first
    pub memory: Vec<MemorySample>,
    /// Selected row in the process table
    pub selected: usize,
    /// Sticky scan failure banner; cleared by the next good scan
    pub scan_error: Option<String>,
    /// Status message to display (cleared after timeout)
    status_message: Option<(String, Instant)>,
    /// Background sampling worker
    collector: Collector,
    /// Tick interval, shown in the footer
    pub tick_interval: Duration,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let collector = Collector::spawn(config)?;
        Ok(Self {
            selected_tab: 0,
            tabs: vec!["Processes", "Memory"],
            snapshot: Vec::new(),
            memory: Vec::new(),
            selected: 0,
            scan_error: None,
            status_message: None,
            collector,
            tick_interval: config.tick_interval(),
        })
    }

    /// Apply all pending collector events.
    ///
    /// Ticks are drained to the newest one, so a backlog of stale snapshots
    /// collapses into the latest; outcomes and errors are applied in arrival
    /// order.
    pub fn drain_events(&mut self) {
        let mut latest_tick: Option<(Snapshot, Vec<MemorySample>)> = None;
        while let Ok(event) = self.collector.events().try_recv() {
            match event {
                CollectorEvent::Tick { snapshot, memory } => {
                    latest_tick = Some((snapshot, memory));
                }
                CollectorEvent::ScanError(reason) => {
                    self.scan_error = Some(reason);
                }
                CollectorEvent::TerminationDone(outcome) => {
                    self.set_status_message(outcome.to_string());
                }
            }
        }
        if let Some((snapshot, memory)) = latest_tick {
            self.snapshot = snapshot;
            self.memory = memory;
            self.scan_error = None;
            if self.selected >= self.snapshot.len() {
                self.selected = self.snapshot.len().saturating_sub(1);
            }
        }
    }

    /// Terminate the selected process; the outcome arrives as a later event
    pub fn end_selected_task(&mut self) {
        match self
            .snapshot
            .get(self.selected)
            .map(|record| (record.pid, record.name.clone()))
        {
            Some((pid, name)) => {
                self.set_status_message(format!("ending task {} ({})...", pid, name));
                self.collector.request_terminate(pid);
            }
            None => self.set_status_message("no process selected"),
        }
    }

    pub fn select_next(&mut self) {
        if !self.snapshot.is_empty() {
            self.selected = (self.selected + 1).min(self.snapshot.len() - 1);
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_page_down(&mut self, page: usize) {
        if !self.snapshot.is_empty() {
            self.selected = (self.selected + page).min(self.snapshot.len() - 1);
        }
    }

    pub fn select_page_up(&mut self, page: usize) {
        self.selected = self.selected.saturating_sub(page);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.snapshot.len().saturating_sub(1);
    }

    pub fn set_tab(&mut self, index: usize) {
        if index < self.tabs.len() {
            self.selected_tab = index;
        }
    }

    pub fn next_tab(&mut self) {
        self.selected_tab = (self.selected_tab + 1) % self.tabs.len();
    }

    pub fn previous_tab(&mut self) {
        if self.selected_tab > 0 {
            self.selected_tab -= 1;
        } else {
            self.selected_tab = self.tabs.len() - 1;
        }
    }

    /// Set a temporary status message
    pub fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Get the current status message if not expired
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, timestamp)) = &self.status_message {
            if timestamp.elapsed() < STATUS_TIMEOUT {
                return Some(msg.as_str());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn app_over_fake_proc() -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("meminfo"),
            "MemTotal: 1000 kB\nMemAvailable: 500 kB\n",
        )
        .unwrap();
        let config = Config {
            tick_interval_ms: 50,
            proc_root: dir.path().to_string_lossy().into_owned(),
            ..Config::default()
        };
        let app = App::new(&config).unwrap();
        (dir, app)
    }

    #[test]
    fn test_selection_clamps_on_empty_snapshot() {
        let (_dir, mut app) = app_over_fake_proc();
        app.select_next();
        assert_eq!(app.selected, 0);
        app.select_previous();
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_tab_cycling_wraps() {
        let (_dir, mut app) = app_over_fake_proc();
        assert_eq!(app.selected_tab, 0);
        app.next_tab();
        assert_eq!(app.selected_tab, 1);
        app.next_tab();
        assert_eq!(app.selected_tab, 0);
        app.previous_tab();
        assert_eq!(app.selected_tab, 1);
    }

    #[test]
    fn test_status_message_lifecycle() {
        let (_dir, mut app) = app_over_fake_proc();
        assert!(app.get_status_message().is_none());
        app.set_status_message("hello");
        assert_eq!(app.get_status_message(), Some("hello"));
    }

    #[test]
    fn test_end_task_without_selection_sets_status() {
        let (_dir, mut app) = app_over_fake_proc();
        app.end_selected_task();
        assert_eq!(app.get_status_message(), Some("no process selected"));
    }

    #[test]
    fn test_drain_applies_latest_tick() {
        let (_dir, mut app) = app_over_fake_proc();
        // Let the 50ms collector produce at least one tick
        std::thread::sleep(Duration::from_millis(400));
        app.drain_events();
        assert!(!app.memory.is_empty());
        assert!(app.scan_error.is_none());
    }
}
