//! Build context carrying log entries and per-stage timers
//!
//! Every pipeline stage receives a `&mut BuildContext`. Messages are recorded
//! locally (so a finished bake can be inspected) and forwarded to the `log`
//! facade under the `navgeom_recast` target.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use web_time::Instant;

/// Log level for context messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// Pipeline stages that are timed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum TimerCategory {
    /// Whole bake, from input validation to the query object
    Total,
    Rasterization,
    /// Slope clearing and the three span filters
    Filtering,
    CompactHeightfield,
    Erosion,
    DistanceField,
    Regions,
    Contours,
    PolyMesh,
    DetailMesh,
    /// Turning the polygon mesh into a queryable navigation graph
    Bake,
}

impl fmt::Display for TimerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Total => "total",
            Self::Rasterization => "rasterization",
            Self::Filtering => "filtering",
            Self::CompactHeightfield => "compact heightfield",
            Self::Erosion => "erosion",
            Self::DistanceField => "distance field",
            Self::Regions => "regions",
            Self::Contours => "contours",
            Self::PolyMesh => "poly mesh",
            Self::DetailMesh => "detail mesh",
            Self::Bake => "bake",
        };
        f.write_str(name)
    }
}

/// A recorded log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: Instant,
    pub message: String,
}

/// Accumulated time for one category
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimerEntry {
    pub total: Duration,
    /// Number of times the timer was stopped
    pub count: usize,
}

/// Logging and profiling state for a build
#[derive(Debug)]
pub struct BuildContext {
    logs: Vec<LogEntry>,
    active_timers: HashMap<TimerCategory, Instant>,
    timers: HashMap<TimerCategory, TimerEntry>,
    min_log_level: LogLevel,
    enable_timing: bool,
    max_log_entries: usize,
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildContext {
    pub fn new() -> Self {
        Self {
            logs: Vec::new(),
            active_timers: HashMap::new(),
            timers: HashMap::new(),
            min_log_level: LogLevel::Info,
            enable_timing: true,
            max_log_entries: 1000,
        }
    }

    /// Sets the minimum level recorded in the context.
    ///
    /// Forwarding to `log` is unaffected; the logger's own filter applies.
    pub fn set_log_level(&mut self, level: LogLevel) {
        self.min_log_level = level;
    }

    pub fn set_timing_enabled(&mut self, enabled: bool) {
        self.enable_timing = enabled;
    }

    pub fn set_max_log_entries(&mut self, max_entries: usize) {
        self.max_log_entries = max_entries;
    }

    pub fn log_debug(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn log_warning(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        let forwarded: log::Level = level.into();
        log::log!(target: "navgeom_recast", forwarded, "{}", message);

        if level < self.min_log_level || self.max_log_entries == 0 {
            return;
        }

        self.logs.push(LogEntry {
            level,
            timestamp: Instant::now(),
            message,
        });

        if self.logs.len() > self.max_log_entries {
            let excess = self.logs.len() - self.max_log_entries;
            self.logs.drain(..excess);
        }
    }

    pub fn start_timer(&mut self, category: TimerCategory) {
        if self.enable_timing {
            self.active_timers.insert(category, Instant::now());
        }
    }

    pub fn stop_timer(&mut self, category: TimerCategory) {
        if !self.enable_timing {
            return;
        }
        if let Some(start) = self.active_timers.remove(&category) {
            let entry = self.timers.entry(category).or_default();
            entry.total += start.elapsed();
            entry.count += 1;
        }
    }

    /// Runs `f` with the timer for `category` started around it
    pub fn timed<T>(&mut self, category: TimerCategory, f: impl FnOnce(&mut Self) -> T) -> T {
        self.start_timer(category);
        let result = f(self);
        self.stop_timer(category);
        result
    }

    pub fn timer_duration(&self, category: TimerCategory) -> Option<Duration> {
        self.timers.get(&category).map(|entry| entry.total)
    }

    pub fn timer_count(&self, category: TimerCategory) -> usize {
        self.timers.get(&category).map_or(0, |entry| entry.count)
    }

    /// Completed timers, ordered by category
    pub fn timer_summary(&self) -> Vec<(TimerCategory, Duration)> {
        let mut summary: Vec<_> = self
            .timers
            .iter()
            .map(|(category, entry)| (*category, entry.total))
            .collect();
        summary.sort_by_key(|(category, _)| *category);
        summary
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn logs_by_level(&self, level: LogLevel) -> impl Iterator<Item = &LogEntry> {
        self.logs.iter().filter(move |entry| entry.level == level)
    }

    /// Clears logs and timers
    pub fn reset(&mut self) {
        self.logs.clear();
        self.active_timers.clear();
        self.timers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_log_level_filtering() {
        let mut context = BuildContext::new();
        context.set_log_level(LogLevel::Warning);

        context.log_debug("debug");
        context.log_info("info");
        context.log_warning("warning");
        context.log_error("error");

        assert_eq!(context.logs().len(), 2);
        assert_eq!(context.logs()[0].level, LogLevel::Warning);
        assert_eq!(context.logs_by_level(LogLevel::Error).count(), 1);
    }

    #[test]
    fn test_timed_accumulates() {
        let mut context = BuildContext::new();

        for _ in 0..3 {
            context.timed(TimerCategory::Filtering, |_| {
                thread::sleep(Duration::from_millis(2));
            });
        }

        assert_eq!(context.timer_count(TimerCategory::Filtering), 3);
        assert!(context.timer_duration(TimerCategory::Filtering) >= Some(Duration::from_millis(6)));
        assert_eq!(context.timer_duration(TimerCategory::Regions), None);
    }

    #[test]
    fn test_timing_disabled() {
        let mut context = BuildContext::new();
        context.set_timing_enabled(false);
        let value = context.timed(TimerCategory::Total, |_| 7);

        assert_eq!(value, 7);
        assert!(context.timer_summary().is_empty());
    }

    #[test]
    fn test_summary_is_ordered() {
        let mut context = BuildContext::new();
        context.timed(TimerCategory::PolyMesh, |_| ());
        context.timed(TimerCategory::Rasterization, |_| ());
        context.timed(TimerCategory::Total, |_| ());

        let order: Vec<_> = context.timer_summary().into_iter().map(|(c, _)| c).collect();
        assert_eq!(
            order,
            vec![TimerCategory::Total, TimerCategory::Rasterization, TimerCategory::PolyMesh]
        );
    }

    #[test]
    fn test_max_log_entries() {
        let mut context = BuildContext::new();
        context.set_max_log_entries(3);

        for i in 0..5 {
            context.log_info(format!("message {}", i));
        }

        assert_eq!(context.logs().len(), 3);
        assert_eq!(context.logs()[2].message, "message 4");

        context.reset();
        assert!(context.logs().is_empty());
    }
}
