//! System memory sampling
//!
//! Reads instantaneous RAM utilization from `/proc/meminfo` and keeps a
//! fixed-capacity FIFO history for the memory graph. A failed read skips
//! that tick's sample only; the caller retries on the next interval.

use crate::error::{Result, TaskmonError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;

/// Default number of samples kept in the rolling window
pub const DEFAULT_HISTORY_CAPACITY: usize = 60;

/// One memory utilization reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemorySample {
    /// Monotonic sequence number, never reset by eviction
    pub index: u64,
    /// Seconds since sampling started (index × tick interval)
    pub elapsed_secs: f64,
    /// Physical memory in use, [0,100]
    pub percent: f32,
}

/// Samples system memory and owns the bounded history ring.
pub struct MemorySampler {
    proc_root: PathBuf,
    interval_secs: f64,
    capacity: usize,
    series: VecDeque<MemorySample>,
    next_index: u64,
}

impl MemorySampler {
    /// Create a sampler over the live `/proc` filesystem
    pub fn new(capacity: usize, interval_secs: f64) -> Self {
        Self::with_proc_root("/proc", capacity, interval_secs)
    }

    /// Create a sampler over an alternate proc root (used by tests)
    pub fn with_proc_root(root: impl Into<PathBuf>, capacity: usize, interval_secs: f64) -> Self {
        Self {
            proc_root: root.into(),
            interval_secs,
            capacity: capacity.max(1),
            series: VecDeque::with_capacity(capacity.max(1)),
            next_index: 0,
        }
    }

    /// Read current RAM utilization and append it to the history.
    ///
    /// Evicts the oldest sample first when the ring is at capacity.
    pub fn sample(&mut self) -> Result<MemorySample> {
        let percent = self.read_memory_percent()?;
        let sample = MemorySample {
            index: self.next_index,
            elapsed_secs: self.next_index as f64 * self.interval_secs,
            percent,
        };
        self.next_index += 1;

        if self.series.len() >= self.capacity {
            self.series.pop_front();
        }
        self.series.push_back(sample);
        Ok(sample)
    }

    /// Read-only view of the current history, oldest first
    pub fn series(&self) -> &VecDeque<MemorySample> {
        &self.series
    }

    /// Configured ring capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn read_memory_percent(&self) -> Result<f32> {
        let content = fs::read_to_string(self.proc_root.join("meminfo"))
            .map_err(|e| TaskmonError::MemoryRead(e.to_string()))?;

        let mut total_kib: Option<u64> = None;
        let mut available_kib: Option<u64> = None;
        for line in content.lines() {
            if let Some(rest) = line.strip_prefix("MemTotal:") {
                total_kib = first_number(rest);
            } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
                available_kib = first_number(rest);
            }
            if total_kib.is_some() && available_kib.is_some() {
                break;
            }
        }

        let total = total_kib
            .ok_or_else(|| TaskmonError::MemoryRead("MemTotal missing".to_string()))?;
        let available = available_kib
            .ok_or_else(|| TaskmonError::MemoryRead("MemAvailable missing".to_string()))?;
        if total == 0 {
            return Err(TaskmonError::MemoryRead("MemTotal is zero".to_string()));
        }

        let used = total.saturating_sub(available);
        Ok((used as f64 / total as f64 * 100.0).clamp(0.0, 100.0) as f32)
    }
}

fn first_number(s: &str) -> Option<u64> {
    s.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_meminfo(total_kib: u64, available_kib: u64) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("meminfo"),
            format!(
                "MemTotal:       {} kB\nMemFree:        1024 kB\nMemAvailable:   {} kB\n",
                total_kib, available_kib
            ),
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_percent_from_meminfo() {
        let dir = fake_meminfo(1000, 250);
        let mut sampler = MemorySampler::with_proc_root(dir.path(), 60, 2.0);
        let sample = sampler.sample().unwrap();
        assert!((sample.percent - 75.0).abs() < 1e-4);
    }

    #[test]
    fn test_series_never_exceeds_capacity() {
        let dir = fake_meminfo(1000, 500);
        let mut sampler = MemorySampler::with_proc_root(dir.path(), 5, 1.0);
        for _ in 0..20 {
            sampler.sample().unwrap();
        }
        assert_eq!(sampler.series().len(), 5);
    }

    #[test]
    fn test_fifo_eviction() {
        let dir = fake_meminfo(1000, 500);
        let capacity = 4;
        let mut sampler = MemorySampler::with_proc_root(dir.path(), capacity, 1.0);
        for _ in 0..capacity + 1 {
            sampler.sample().unwrap();
        }
        let indices: Vec<u64> = sampler.series().iter().map(|s| s.index).collect();
        // Oldest original sample (index 0) evicted, newest present
        assert_eq!(indices, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_index_is_monotonic_across_eviction() {
        let dir = fake_meminfo(1000, 500);
        let mut sampler = MemorySampler::with_proc_root(dir.path(), 3, 2.0);
        let mut last = sampler.sample().unwrap();
        for _ in 0..10 {
            let s = sampler.sample().unwrap();
            assert_eq!(s.index, last.index + 1);
            assert!((s.elapsed_secs - s.index as f64 * 2.0).abs() < 1e-9);
            last = s;
        }
    }

    #[test]
    fn test_read_failure_is_recoverable() {
        let dir = TempDir::new().unwrap();
        let mut sampler = MemorySampler::with_proc_root(dir.path(), 60, 2.0);
        // No meminfo in the tree: the sample fails but the series is intact
        assert!(matches!(
            sampler.sample(),
            Err(TaskmonError::MemoryRead(_))
        ));
        assert!(sampler.series().is_empty());

        // Once meminfo appears, sampling resumes
        fs::write(dir.path().join("meminfo"), "MemTotal: 100 kB\nMemAvailable: 50 kB\n").unwrap();
        assert!(sampler.sample().is_ok());
        assert_eq!(sampler.series().len(), 1);
    }

    #[test]
    fn test_malformed_meminfo() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("meminfo"), "MemTotal: lots\n").unwrap();
        let mut sampler = MemorySampler::with_proc_root(dir.path(), 60, 2.0);
        assert!(sampler.sample().is_err());
    }
}
