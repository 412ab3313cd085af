//! Build context providing logging and per-step profiling
//!
//! Each manifold owns a context; construction steps record a timer span and
//! a debug line so tooling can inspect where a build spent its time.

use std::collections::HashMap;
use std::time::Duration;
use web_time::Instant;

/// Log level for context messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Debug level messages
    Debug = 0,
    /// Informational messages
    Info = 1,
    /// Warning messages
    Warning = 2,
    /// Error messages
    Error = 3,
}

/// Timer categories for build profiling
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerCategory {
    /// Whole build, clear to complete
    Total,
    /// Pole sampling over the corner grid
    PoleSampling,
    /// Partial-ring pairing per cell
    PartialRings,
    /// Boundary reconstruction probes
    Reconstruction,
    /// Directed-edge index pass
    EdgeConnection,
    /// Custom user-defined timer
    Custom(String),
}

/// Log entry containing message and metadata
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Timestamp when the entry was recorded
    pub timestamp: Instant,
    /// Log message
    pub message: String,
}

/// Accumulated timings for one category
#[derive(Debug, Clone)]
pub struct TimerEntry {
    /// Total accumulated duration
    pub duration: Duration,
    /// Number of recorded spans
    pub count: usize,
}

/// Context for manifold builds providing logging and profiling
#[derive(Debug)]
pub struct BuildContext {
    logs: Vec<LogEntry>,
    active_timers: HashMap<TimerCategory, Instant>,
    timers: HashMap<TimerCategory, TimerEntry>,
    min_log_level: LogLevel,
    max_log_entries: usize,
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildContext {
    /// Creates a new context with default settings
    pub fn new() -> Self {
        Self {
            logs: Vec::new(),
            active_timers: HashMap::new(),
            timers: HashMap::new(),
            min_log_level: LogLevel::Info,
            max_log_entries: 1000,
        }
    }

    /// Sets the minimum log level to record
    pub fn set_log_level(&mut self, level: LogLevel) {
        self.min_log_level = level;
    }

    /// Logs a debug message
    pub fn log_debug(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    /// Logs an info message
    pub fn log_info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    /// Logs a warning message
    pub fn log_warning(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    /// Logs an error message
    pub fn log_error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        if level < self.min_log_level {
            return;
        }
        self.logs.push(LogEntry {
            level,
            timestamp: Instant::now(),
            message: message.into(),
        });
        if self.logs.len() > self.max_log_entries {
            self.logs.remove(0);
        }
    }

    /// Starts a timer for the given category
    pub fn start_timer(&mut self, category: TimerCategory) {
        self.active_timers.insert(category, Instant::now());
    }

    /// Stops a timer and accumulates its duration into the category
    pub fn stop_timer(&mut self, category: TimerCategory) {
        if let Some(start) = self.active_timers.remove(&category) {
            let entry = self.timers.entry(category).or_insert(TimerEntry {
                duration: Duration::ZERO,
                count: 0,
            });
            entry.duration += start.elapsed();
            entry.count += 1;
        }
    }

    /// Gets the accumulated duration for a category
    pub fn timer_duration(&self, category: &TimerCategory) -> Option<Duration> {
        self.timers.get(category).map(|entry| entry.duration)
    }

    /// Gets the number of spans recorded for a category
    pub fn timer_count(&self, category: &TimerCategory) -> usize {
        self.timers.get(category).map(|entry| entry.count).unwrap_or(0)
    }

    /// Gets all log entries
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Gets log entries at exactly the given level
    pub fn logs_by_level(&self, level: LogLevel) -> Vec<&LogEntry> {
        self.logs.iter().filter(|entry| entry.level == level).collect()
    }

    /// Resets the context, clearing logs and timers
    pub fn reset(&mut self) {
        self.logs.clear();
        self.active_timers.clear();
        self.timers.clear();
    }

    /// Prints a summary of build timers, slowest first
    pub fn print_timer_summary(&self) {
        let mut sorted: Vec<_> = self.timers.iter().collect();
        sorted.sort_by(|a, b| b.1.duration.cmp(&a.1.duration));

        println!("=== Manifold Build Summary ===");
        for (category, entry) in sorted {
            println!(
                "{:20} {:8.2}ms ({} spans)",
                format!("{:?}", category),
                entry.duration.as_secs_f64() * 1000.0,
                entry.count,
            );
        }
    }
}
