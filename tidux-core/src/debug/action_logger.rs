//! Broadcast logging with pattern-based filtering and in-memory storage
//!
//! [`ActionLogger`] is an ordinary listener. Attach it to a dispatcher and every
//! broadcast whose action name passes the glob filter is logged through
//! `tracing`, and optionally kept in an [`ActionLog`] ring buffer for display.
//!
//! # Example
//!
//! ```
//! use tidux_core::debug::{ActionLogConfig, ActionLogger};
//! use tidux_core::{Dispatcher, Marker};
//!
//! let dispatcher = Dispatcher::new();
//! let logger = ActionLogger::with_log(ActionLogConfig::default());
//! let log = logger.log().unwrap();
//! logger.attach(&dispatcher);
//!
//! dispatcher.dispatch(&Marker::<()>::new("Connect"), ());
//! dispatcher.dispatch(&Marker::<()>::new("Tick"), ());
//!
//! let log = log.lock().unwrap();
//! assert_eq!(log.len(), 1);
//! assert_eq!(log.recent(1).next().unwrap().name, "Connect");
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use serde::Deserialize;

use crate::action::ActionId;
use crate::dispatcher::Dispatcher;
use crate::registry::{ListenerParams, Subscription};

/// Glob filter over action names.
///
/// Patterns support:
/// - `*` matches any sequence of characters
/// - `?` matches any single character
/// - Literal text matches exactly
///
/// # Examples
///
/// - `Load*` matches LoadUser, LoadItems, etc.
/// - `*Failed` matches any action ending in "Failed"
/// - `Tick` matches only Tick
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActionLoggerConfig {
    /// If non-empty, only log actions matching these patterns
    pub include_patterns: Vec<String>,
    /// Exclude actions matching these patterns (applied after include)
    pub exclude_patterns: Vec<String>,
}

fn default_excludes() -> Vec<String> {
    vec!["Tick".to_string(), "Render".to_string()]
}

fn split_patterns(patterns: &str) -> Vec<String> {
    patterns
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

impl Default for ActionLoggerConfig {
    fn default() -> Self {
        Self {
            include_patterns: Vec::new(),
            exclude_patterns: default_excludes(),
        }
    }
}

impl ActionLoggerConfig {
    /// Create a config from comma-separated pattern strings
    ///
    /// `None` for `include` logs everything; `None` for `exclude` keeps the
    /// default excludes (`Tick`, `Render`).
    ///
    /// ```
    /// use tidux_core::debug::ActionLoggerConfig;
    ///
    /// let config = ActionLoggerConfig::new(Some("Load*,Connect"), Some("Tick"));
    /// assert!(config.should_log("LoadUser"));
    /// assert!(config.should_log("Connect"));
    /// assert!(!config.should_log("Tick"));
    /// ```
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include_patterns: include.map(split_patterns).unwrap_or_default(),
            exclude_patterns: exclude.map(split_patterns).unwrap_or_else(default_excludes),
        }
    }

    /// Create a config with specific pattern vectors
    pub fn with_patterns(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include_patterns: include,
            exclude_patterns: exclude,
        }
    }

    /// Check if an action name passes the include/exclude patterns
    pub fn should_log(&self, action_name: &str) -> bool {
        if !self.include_patterns.is_empty()
            && !self
                .include_patterns
                .iter()
                .any(|p| glob_match(p, action_name))
        {
            return false;
        }

        !self
            .exclude_patterns
            .iter()
            .any(|p| glob_match(p, action_name))
    }
}

/// One logged broadcast
#[derive(Debug, Clone)]
pub struct ActionLogEntry {
    /// Action name
    pub name: &'static str,
    /// Action identity
    pub action: ActionId,
    /// When the broadcast was logged
    pub timestamp: Instant,
    /// Sequence number for ordering
    pub sequence: u64,
    /// Whether the broadcast carried a result (markers never do)
    pub has_result: bool,
}

impl ActionLogEntry {
    fn from_params(params: &ListenerParams, sequence: u64) -> Self {
        Self {
            name: params.action().name(),
            action: params.action().id(),
            timestamp: Instant::now(),
            sequence,
            has_result: params.has_result(),
        }
    }

    /// Time since this entry was logged
    pub fn elapsed(&self) -> std::time::Duration {
        self.timestamp.elapsed()
    }

    /// Format the elapsed time for display (e.g., "2.3s", "150ms")
    pub fn elapsed_display(&self) -> String {
        let elapsed = self.elapsed();
        if elapsed.as_secs() >= 1 {
            format!("{:.1}s", elapsed.as_secs_f64())
        } else {
            format!("{}ms", elapsed.as_millis())
        }
    }
}

/// Configuration for the action log ring buffer
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActionLogConfig {
    /// Maximum number of entries to keep
    pub capacity: usize,
    /// Name filter
    pub filter: ActionLoggerConfig,
}

impl Default for ActionLogConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            filter: ActionLoggerConfig::default(),
        }
    }
}

impl ActionLogConfig {
    /// Create with custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Create with custom capacity and filter
    pub fn new(capacity: usize, filter: ActionLoggerConfig) -> Self {
        Self { capacity, filter }
    }
}

/// In-memory ring buffer of recent broadcasts
///
/// Older entries are discarded once capacity is reached.
#[derive(Debug, Clone)]
pub struct ActionLog {
    entries: VecDeque<ActionLogEntry>,
    config: ActionLogConfig,
    next_sequence: u64,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new(ActionLogConfig::default())
    }
}

impl ActionLog {
    /// Create a new action log with configuration
    pub fn new(config: ActionLogConfig) -> Self {
        Self {
            entries: VecDeque::with_capacity(config.capacity),
            config,
            next_sequence: 0,
        }
    }

    /// Record a broadcast if it passes the filter
    ///
    /// Returns the entry if it was logged, None if filtered out.
    pub fn log(&mut self, params: &ListenerParams) -> Option<&ActionLogEntry> {
        if self.config.capacity == 0 || !self.config.filter.should_log(params.action().name()) {
            return None;
        }

        let entry = ActionLogEntry::from_params(params, self.next_sequence);
        self.next_sequence += 1;

        if self.entries.len() >= self.config.capacity {
            self.entries.pop_front();
        }

        self.entries.push_back(entry);
        self.entries.back()
    }

    /// All entries (oldest first)
    pub fn entries(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter()
    }

    /// The most recent N entries (newest first)
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter().rev().take(count)
    }

    /// Number of entries currently stored
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Get configuration
    pub fn config(&self) -> &ActionLogConfig {
        &self.config
    }
}

/// Listener that logs broadcasts with configurable pattern filtering.
///
/// Supports two modes:
/// - **Tracing only** (default): logs via `tracing::debug!()`
/// - **With storage**: also keeps entries in a shared [`ActionLog`]
#[derive(Debug, Clone)]
pub struct ActionLogger {
    config: ActionLoggerConfig,
    log: Option<Arc<Mutex<ActionLog>>>,
    active: bool,
}

impl ActionLogger {
    /// Tracing only, no in-memory storage
    pub fn new(config: ActionLoggerConfig) -> Self {
        Self {
            config,
            log: None,
            active: true,
        }
    }

    /// Tracing plus in-memory storage
    pub fn with_log(config: ActionLogConfig) -> Self {
        Self {
            config: config.filter.clone(),
            log: Some(Arc::new(Mutex::new(ActionLog::new(config)))),
            active: true,
        }
    }

    /// Default filtering (excludes Tick and Render) with in-memory storage
    pub fn with_default_log() -> Self {
        Self::with_log(ActionLogConfig::default())
    }

    /// No filtering at all, tracing only
    pub fn log_all() -> Self {
        Self::new(ActionLoggerConfig::with_patterns(vec![], vec![]))
    }

    /// Set whether the logger records anything.
    ///
    /// An inactive logger is never subscribed by [`attach`](Self::attach).
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Check if the logger is active.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Shared handle to the action log (if storage is enabled)
    pub fn log(&self) -> Option<Arc<Mutex<ActionLog>>> {
        self.log.clone()
    }

    /// Get a reference to the config
    pub fn config(&self) -> &ActionLoggerConfig {
        &self.config
    }

    /// Record one broadcast.
    pub fn record(&self, params: &ListenerParams) {
        if !self.active {
            return;
        }

        let name = params.action().name();
        if self.config.should_log(name) {
            tracing::debug!(
                action = %name,
                id = %params.action().id(),
                has_result = params.has_result(),
                "broadcast"
            );
        }

        if let Some(log) = &self.log {
            log.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .log(params);
        }
    }

    /// Subscribe the logger to `dispatcher`.
    ///
    /// Returns `None` when the logger is inactive.
    pub fn attach(self, dispatcher: &Dispatcher) -> Option<Subscription> {
        if !self.active {
            return None;
        }
        Some(dispatcher.subscribe(move |params| self.record(params)))
    }
}

/// Simple glob pattern matching supporting `*` and `?`.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < text.len() {
        match pattern.get(pi) {
            Some('*') => {
                backtrack = Some((pi, ti));
                pi += 1;
            }
            Some(&c) if c == '?' || c == text[ti] => {
                pi += 1;
                ti += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    pi = star + 1;
                    ti = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, Marker, SyncAction};

    #[test]
    fn test_glob_match() {
        assert!(glob_match("Tick", "Tick"));
        assert!(!glob_match("Tick", "TickTock"));

        assert!(glob_match("Load*", "LoadUser"));
        assert!(glob_match("Load*", "Load"));
        assert!(!glob_match("Load*", "Reload"));
        assert!(glob_match("*load", "Reload"));
        assert!(glob_match("*Fail*", "DidFailConnect"));

        assert!(glob_match("Tick?", "Ticks"));
        assert!(!glob_match("Tick?", "Tick"));
        assert!(glob_match("Form*Add*", "FormFieldAddChar"));
    }

    #[test]
    fn test_config_include_and_exclude() {
        let config = ActionLoggerConfig::new(Some("Did*"), Some("DidFail*"));
        assert!(config.should_log("DidConnect"));
        assert!(!config.should_log("DidFailConnect"));
        assert!(!config.should_log("Search"));
    }

    #[test]
    fn test_config_default_excludes_noise() {
        let config = ActionLoggerConfig::default();
        assert!(!config.should_log("Tick"));
        assert!(!config.should_log("Render"));
        assert!(config.should_log("Connect"));

        let config = ActionLoggerConfig::new(None, None);
        assert!(!config.should_log("Tick"));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{ "capacity": 5, "filter": { "include_patterns": ["Load*"] } }"#;
        let config: ActionLogConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.capacity, 5);
        assert!(config.filter.should_log("LoadUser"));
        // Missing exclude list falls back to the defaults.
        assert!(!config.filter.should_log("Tick"));

        let config: ActionLogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.capacity, 100);
    }

    #[test]
    fn test_log_capacity_and_order() {
        let marker = Marker::<()>::new("Connect");
        let params = ListenerParams::new(marker.action_ref(), Arc::new(()), None);
        let mut log = ActionLog::new(ActionLogConfig::new(
            3,
            ActionLoggerConfig::with_patterns(vec![], vec![]),
        ));

        for _ in 0..5 {
            log.log(&params);
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.entries().next().unwrap().sequence, 2);

        let recent: Vec<u64> = log.recent(2).map(|e| e.sequence).collect();
        assert_eq!(recent, vec![4, 3]);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_logger_records_filtered_broadcasts() {
        let dispatcher = Dispatcher::new();
        let logger = ActionLogger::with_default_log();
        let log = logger.log().unwrap();
        let sub = logger.attach(&dispatcher).unwrap();

        let add = SyncAction::new("Add", |n: i32, _ctx| Ok(n + 1));
        dispatcher.dispatch(&add, 1).unwrap();
        dispatcher.dispatch(&Marker::<()>::new("Tick"), ());
        dispatcher.dispatch(&Marker::<()>::new("Ready"), ());

        {
            let log = log.lock().unwrap();
            let names: Vec<_> = log.entries().map(|e| (e.name, e.has_result)).collect();
            assert_eq!(names, vec![("Add", true), ("Ready", false)]);
            assert_eq!(log.entries().next().unwrap().action, add.id());
        }

        sub.unsubscribe();
        dispatcher.dispatch(&add, 2).unwrap();
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_inactive_logger_does_not_attach() {
        let dispatcher = Dispatcher::new();
        let logger = ActionLogger::log_all().active(false);
        assert!(!logger.is_active());
        assert!(logger.attach(&dispatcher).is_none());
        assert_eq!(dispatcher.listener_count(), 0);
    }

    #[test]
    fn test_entry_elapsed_display() {
        let marker = Marker::<()>::new("Connect");
        let params = ListenerParams::new(marker.action_ref(), Arc::new(()), None);
        let entry = ActionLogEntry::from_params(&params, 0);
        assert!(entry.elapsed_display().ends_with('s'));
    }
}
