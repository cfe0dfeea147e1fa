//! Process table sampling
//!
//! Enumerates `/proc` into an immutable, CPU-ranked [`Snapshot`] of
//! [`ProcessRecord`]s. The process table is inherently racy: processes exit
//! concurrently with enumeration, so any per-process read failure drops that
//! process from the snapshot instead of aborting the scan. Only the loss of
//! the proc filesystem itself is an error.
//!
//! CPU percentages are computed since the previous scan from utime+stime
//! deltas, so the first scan reports 0.0 for every process (accepted startup
//! transient, the same warm-up psutil-style samplers have).

use crate::error::{Result, TaskmonError};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One complete, internally consistent pass over the process table.
///
/// Sorted by `cpu_percent` descending; ties keep enumeration order. Replaced
/// wholesale each cycle, never patched.
pub type Snapshot = Vec<ProcessRecord>;

/// Process state as reported by the kernel in `/proc/<pid>/stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessStatus {
    Running,
    Sleeping,
    DiskSleep,
    Zombie,
    Stopped,
    TracingStop,
    Dead,
    Idle,
    Unknown,
}

impl ProcessStatus {
    /// Map the single-character state field from `stat`
    pub fn from_state_char(c: char) -> Self {
        match c {
            'R' => Self::Running,
            'S' => Self::Sleeping,
            'D' => Self::DiskSleep,
            'Z' => Self::Zombie,
            'T' => Self::Stopped,
            't' => Self::TracingStop,
            'X' | 'x' => Self::Dead,
            'I' => Self::Idle,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Sleeping => "sleeping",
            Self::DiskSleep => "disk-sleep",
            Self::Zombie => "zombie",
            Self::Stopped => "stopped",
            Self::TracingStop => "tracing-stop",
            Self::Dead => "dead",
            Self::Idle => "idle",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Immutable per-process sample, created fresh each scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    /// Process ID, unique within one snapshot
    pub pid: u32,
    /// Command name from the stat `comm` field (may be empty)
    pub name: String,
    /// Kernel process state
    pub status: ProcessStatus,
    /// CPU usage since the previous scan, percent of one CPU
    pub cpu_percent: f32,
    /// Resident set size as a percentage of total physical memory, [0,100]
    pub memory_percent: f32,
    /// Number of kernel threads
    pub thread_count: u32,
}

/// Fields parsed from `/proc/<pid>/stat`
struct StatFields {
    name: String,
    state: char,
    utime: u64,
    stime: u64,
    threads: u32,
}

/// Parse a `stat` line into the comm name and its remaining fields.
///
/// The comm field may itself contain spaces and parentheses (e.g.
/// `(tmux: server)`), so the split point is the last `)` in the line.
fn parse_stat(content: &str) -> Result<StatFields> {
    let start = content
        .find('(')
        .ok_or_else(|| TaskmonError::Parse("no opening parenthesis in stat".to_string()))?;
    let end = content
        .rfind(')')
        .ok_or_else(|| TaskmonError::Parse("no closing parenthesis in stat".to_string()))?;

    let name = content[start + 1..end].to_string();
    let fields: Vec<&str> = content[end + 1..].split_whitespace().collect();

    // Field numbering per proc(5), 0-indexed here from the state field:
    // 0 state, 11 utime, 12 stime, 17 num_threads
    if fields.len() < 18 {
        return Err(TaskmonError::Parse(format!(
            "stat has {} fields, expected at least 18",
            fields.len()
        )));
    }

    Ok(StatFields {
        name,
        state: fields[0].chars().next().unwrap_or('?'),
        utime: fields[11].parse().unwrap_or(0),
        stime: fields[12].parse().unwrap_or(0),
        threads: fields[17].parse().unwrap_or(0),
    })
}

/// Sort records by CPU usage descending.
///
/// `sort_by` is stable, so records with equal CPU keep their enumeration
/// order and an idle-heavy table does not jitter between cycles.
fn sort_by_cpu(records: &mut [ProcessRecord]) {
    records.sort_by(|a, b| {
        b.cpu_percent
            .partial_cmp(&a.cpu_percent)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn clock_ticks_per_sec() -> f64 {
    let v = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if v > 0 {
        v as f64
    } else {
        100.0
    }
}

fn page_size() -> u64 {
    let v = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if v > 0 {
        v as u64
    } else {
        4096
    }
}

/// Samples the process table into ranked snapshots.
///
/// Holds the per-pid CPU-time cache that turns cumulative kernel counters
/// into since-last-scan percentages.
#[derive(Debug)]
pub struct ProcessSampler {
    proc_root: PathBuf,
    /// MemTotal in bytes; 0 when meminfo was unreadable at construction
    mem_total_bytes: u64,
    /// Cumulative utime+stime (clock ticks) per pid from the previous scan
    cpu_cache: HashMap<u32, u64>,
    last_scan: Option<Instant>,
}

impl ProcessSampler {
    /// Create a sampler over the live `/proc` filesystem
    pub fn new() -> Result<Self> {
        Self::with_proc_root("/proc")
    }

    /// Create a sampler over an alternate proc root (used by tests)
    pub fn with_proc_root(root: impl Into<PathBuf>) -> Result<Self> {
        let proc_root = root.into();
        if !proc_root.exists() {
            return Err(TaskmonError::ScanUnavailable(format!(
                "{} does not exist",
                proc_root.display()
            )));
        }
        let mem_total_bytes = read_mem_total_bytes(&proc_root).unwrap_or(0);
        Ok(Self {
            proc_root,
            mem_total_bytes,
            cpu_cache: HashMap::new(),
            last_scan: None,
        })
    }

    /// Sample every process currently visible to the kernel.
    ///
    /// Never fails for individual processes; a process that vanishes or
    /// denies access mid-read contributes zero records. Fails only when the
    /// proc root itself cannot be enumerated.
    pub fn scan(&mut self) -> Result<Snapshot> {
        let entries = fs::read_dir(&self.proc_root)
            .map_err(|e| TaskmonError::ScanUnavailable(e.to_string()))?;

        let elapsed_secs = self
            .last_scan
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);

        let mut records = Vec::new();
        let mut next_cache: HashMap<u32, u64> = HashMap::new();

        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Ok(pid) = file_name.to_string_lossy().parse::<u32>() else {
                continue;
            };
            match self.read_record(pid, elapsed_secs, &mut next_cache) {
                Ok(record) => records.push(record),
                Err(e) => trace!("skipping pid {}: {}", pid, e),
            }
        }

        // Dropping exited pids from the cache keeps it bounded.
        self.cpu_cache = next_cache;
        self.last_scan = Some(Instant::now());

        sort_by_cpu(&mut records);
        Ok(records)
    }

    fn read_record(
        &self,
        pid: u32,
        elapsed_secs: f64,
        next_cache: &mut HashMap<u32, u64>,
    ) -> Result<ProcessRecord> {
        let base = self.proc_root.join(pid.to_string());

        let stat_content = fs::read_to_string(base.join("stat"))?;
        let stat = parse_stat(&stat_content)?;

        let ticks = stat.utime + stat.stime;
        next_cache.insert(pid, ticks);

        let cpu_percent = match self.cpu_cache.get(&pid) {
            Some(&prev) if elapsed_secs > 0.0 => {
                let delta = ticks.saturating_sub(prev) as f64 / clock_ticks_per_sec();
                ((delta / elapsed_secs) * 100.0) as f32
            }
            // First observation of this pid: no baseline yet
            _ => 0.0,
        };

        let statm_content = fs::read_to_string(base.join("statm"))?;
        let rss_pages: u64 = statm_content
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| TaskmonError::Parse("statm missing resident field".to_string()))?
            .parse()
            .unwrap_or(0);
        let memory_percent = if self.mem_total_bytes > 0 {
            let pct = (rss_pages * page_size()) as f64 / self.mem_total_bytes as f64 * 100.0;
            pct.clamp(0.0, 100.0) as f32
        } else {
            0.0
        };

        Ok(ProcessRecord {
            pid,
            name: stat.name,
            status: ProcessStatus::from_state_char(stat.state),
            cpu_percent: cpu_percent.max(0.0),
            memory_percent,
            thread_count: stat.threads,
        })
    }
}

/// Read MemTotal from `<root>/meminfo`, in bytes
fn read_mem_total_bytes(proc_root: &Path) -> Result<u64> {
    let content = fs::read_to_string(proc_root.join("meminfo"))?;
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            let kib: u64 = rest
                .split_whitespace()
                .next()
                .ok_or_else(|| TaskmonError::Parse("empty MemTotal line".to_string()))?
                .parse()
                .map_err(|e| TaskmonError::Parse(format!("bad MemTotal: {}", e)))?;
            return Ok(kib * 1024);
        }
    }
    Err(TaskmonError::Parse(
        "MemTotal not present in meminfo".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn record(pid: u32, cpu: f32) -> ProcessRecord {
        ProcessRecord {
            pid,
            name: format!("proc{}", pid),
            status: ProcessStatus::Sleeping,
            cpu_percent: cpu,
            memory_percent: 0.0,
            thread_count: 1,
        }
    }

    /// Write a minimal but well-formed fake proc tree
    fn fake_proc(pids: &[(u32, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("meminfo"),
            "MemTotal:        8388608 kB\nMemFree:         2097152 kB\nMemAvailable:    4194304 kB\n",
        )
        .unwrap();
        for (pid, name) in pids {
            let base = dir.path().join(pid.to_string());
            fs::create_dir(&base).unwrap();
            fs::write(
                base.join("stat"),
                format!(
                    "{pid} ({name}) S 1 {pid} {pid} 0 -1 4194304 100 0 0 0 \
                     50 25 0 0 20 0 3 0 1000 10000000 256 18446744073709551615 \
                     0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0"
                ),
            )
            .unwrap();
            // 256 resident pages
            fs::write(base.join("statm"), "1024 256 128 16 0 300 0").unwrap();
        }
        dir
    }

    #[test]
    fn test_parse_stat_plain_name() {
        let s = parse_stat(
            "123 (bash) S 1 123 123 0 -1 4194304 1 0 0 0 5 3 0 0 20 0 1 0 99 0 0 0",
        )
        .unwrap();
        assert_eq!(s.name, "bash");
        assert_eq!(s.state, 'S');
        assert_eq!(s.utime, 5);
        assert_eq!(s.stime, 3);
        assert_eq!(s.threads, 1);
    }

    #[test]
    fn test_parse_stat_name_with_spaces_and_parens() {
        let s = parse_stat(
            "42 (tmux: server (1)) R 1 42 42 0 -1 0 0 0 0 0 7 2 0 0 20 0 4 0 99 0 0 0",
        )
        .unwrap();
        assert_eq!(s.name, "tmux: server (1)");
        assert_eq!(s.state, 'R');
        assert_eq!(s.threads, 4);
    }

    #[test]
    fn test_parse_stat_truncated() {
        assert!(parse_stat("1 (init) S 0 1").is_err());
        assert!(parse_stat("garbage with no parens").is_err());
    }

    #[test]
    fn test_sort_is_stable_on_cpu_ties() {
        // Enumeration order 10, 11, 12 with cpu 5.0, 5.0, 9.0
        let mut records = vec![record(10, 5.0), record(11, 5.0), record(12, 9.0)];
        sort_by_cpu(&mut records);
        let pids: Vec<u32> = records.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![12, 10, 11]);
    }

    #[test]
    fn test_sort_all_idle_keeps_enumeration_order() {
        let mut records = vec![record(3, 0.0), record(1, 0.0), record(2, 0.0)];
        sort_by_cpu(&mut records);
        let pids: Vec<u32> = records.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![3, 1, 2]);
    }

    #[test]
    fn test_scan_reads_fixed_attribute_set() {
        let dir = fake_proc(&[(100, "alpha"), (200, "beta")]);
        let mut sampler = ProcessSampler::with_proc_root(dir.path()).unwrap();
        let snapshot = sampler.scan().unwrap();

        assert_eq!(snapshot.len(), 2);
        let alpha = snapshot.iter().find(|r| r.pid == 100).unwrap();
        assert_eq!(alpha.name, "alpha");
        assert_eq!(alpha.status, ProcessStatus::Sleeping);
        assert_eq!(alpha.thread_count, 3);
        // 256 pages of RSS against an 8 GiB MemTotal
        let expected = (256.0 * page_size() as f64) / (8388608.0 * 1024.0) * 100.0;
        assert!((alpha.memory_percent - expected as f32).abs() < 1e-4);
        // First scan has no CPU baseline
        assert_eq!(alpha.cpu_percent, 0.0);
    }

    #[test]
    fn test_scan_skips_vanished_process() {
        let dir = fake_proc(&[(100, "alpha"), (200, "beta"), (300, "gamma")]);
        // Simulate a process that exited after enumeration: directory
        // present, stat gone.
        fs::remove_file(dir.path().join("200").join("stat")).unwrap();

        let mut sampler = ProcessSampler::with_proc_root(dir.path()).unwrap();
        let snapshot = sampler.scan().unwrap();

        let pids: Vec<u32> = snapshot.iter().map(|r| r.pid).collect();
        assert!(!pids.contains(&200));
        assert!(pids.contains(&100));
        assert!(pids.contains(&300));
    }

    #[test]
    fn test_scan_skips_malformed_stat() {
        let dir = fake_proc(&[(100, "alpha")]);
        let base = dir.path().join("999");
        fs::create_dir(&base).unwrap();
        fs::write(base.join("stat"), "999 broken").unwrap();
        fs::write(base.join("statm"), "1 1 1 1 0 1 0").unwrap();

        let mut sampler = ProcessSampler::with_proc_root(dir.path()).unwrap();
        let snapshot = sampler.scan().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].pid, 100);
    }

    #[test]
    fn test_snapshot_has_no_duplicate_pids() {
        let dir = fake_proc(&[(1, "one"), (2, "two"), (3, "three")]);
        let mut sampler = ProcessSampler::with_proc_root(dir.path()).unwrap();
        let snapshot = sampler.scan().unwrap();

        let mut pids: Vec<u32> = snapshot.iter().map(|r| r.pid).collect();
        pids.sort_unstable();
        pids.dedup();
        assert_eq!(pids.len(), snapshot.len());
    }

    #[test]
    fn test_second_scan_with_unchanged_times_is_zero_cpu() {
        let dir = fake_proc(&[(100, "alpha")]);
        let mut sampler = ProcessSampler::with_proc_root(dir.path()).unwrap();
        let _ = sampler.scan().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        let snapshot = sampler.scan().unwrap();
        // utime/stime did not advance between scans
        assert_eq!(snapshot[0].cpu_percent, 0.0);
    }

    #[test]
    fn test_missing_proc_root_is_unavailable() {
        let err = ProcessSampler::with_proc_root("/definitely/not/a/proc/root").unwrap_err();
        assert!(matches!(err, TaskmonError::ScanUnavailable(_)));
    }

    #[test]
    fn test_status_char_mapping() {
        assert_eq!(ProcessStatus::from_state_char('R'), ProcessStatus::Running);
        assert_eq!(ProcessStatus::from_state_char('Z'), ProcessStatus::Zombie);
        assert_eq!(ProcessStatus::from_state_char('I'), ProcessStatus::Idle);
        assert_eq!(ProcessStatus::from_state_char('?'), ProcessStatus::Unknown);
        assert_eq!(ProcessStatus::Zombie.to_string(), "zombie");
    }

    #[test]
    fn test_live_proc_scan() {
        // Smoke test against the real /proc: our own pid must be present.
        let mut sampler = ProcessSampler::new().unwrap();
        let snapshot = sampler.scan().unwrap();
        let me = std::process::id();
        assert!(snapshot.iter().any(|r| r.pid == me));
    }
}
