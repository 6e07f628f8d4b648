//! Action logging with pattern-based filtering and in-memory storage
//!
//! Provides configurable action logging using glob patterns to include/exclude
//! specific action types from logs. Supports both tracing output and an
//! in-memory ring buffer for later inspection.
//!
//! # Example
//!
//! ```ignore
//! use promise_dispatch_core::debug::{ActionLogConfig, ActionLoggerConfig, ActionLoggerMiddleware};
//!
//! // Log only settlements (tracing only)
//! let config = ActionLoggerConfig::new(Some("*_RESOLVED,*_REJECTED"), None);
//! let middleware = ActionLoggerMiddleware::new(config);
//!
//! // Log with in-memory storage
//! let middleware = ActionLoggerMiddleware::with_log(ActionLogConfig::default());
//! let store = Store::builder(state, reducer).with(middleware.clone()).build();
//!
//! // The clone shares the log
//! if let Some(log) = middleware.snapshot() {
//!     for entry in log.recent(10) {
//!         println!("{}: {}", entry.elapsed_display(), entry.summary);
//!     }
//! }
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::action::{action_type, Action};
use crate::store::{DispatchContext, DispatchResult, Middleware, Next};
use crate::value::Value;

/// Configuration for action logging with glob pattern filtering.
///
/// Patterns support:
/// - `*` matches any sequence of characters
/// - `?` matches any single character
/// - Literal text matches exactly
///
/// # Examples
///
/// - `FETCH*` matches FETCH, FETCH_RESOLVED, FETCH_REJECTED
/// - `*_REJECTED` matches every rejected settlement
/// - `TICK` matches only TICK
#[derive(Debug, Clone)]
pub struct ActionLoggerConfig {
    /// If non-empty, only log actions matching these patterns
    pub include_patterns: Vec<String>,
    /// Exclude actions matching these patterns (applied after include)
    pub exclude_patterns: Vec<String>,
}

impl Default for ActionLoggerConfig {
    fn default() -> Self {
        Self {
            include_patterns: Vec::new(),
            // By default, exclude noisy high-frequency actions
            exclude_patterns: default_excludes(),
        }
    }
}

fn default_excludes() -> Vec<String> {
    vec!["TICK".to_string(), "RENDER".to_string()]
}

impl ActionLoggerConfig {
    /// Create a new config from comma-separated pattern strings
    ///
    /// # Arguments
    /// - `include`: comma-separated glob patterns (or None for all)
    /// - `exclude`: comma-separated glob patterns (or None for default excludes)
    ///
    /// # Example
    /// ```
    /// use promise_dispatch_core::debug::ActionLoggerConfig;
    ///
    /// let config = ActionLoggerConfig::new(Some("FETCH*,LOGIN"), Some("TICK"));
    /// assert!(config.should_log("FETCH_RESOLVED"));
    /// assert!(config.should_log("LOGIN"));
    /// assert!(!config.should_log("TICK"));
    /// ```
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        let include_patterns = include.map(split_patterns).unwrap_or_default();
        let exclude_patterns = exclude
            .map(split_patterns)
            .unwrap_or_else(default_excludes);

        Self {
            include_patterns,
            exclude_patterns,
        }
    }

    /// Create a config with specific pattern vectors
    pub fn with_patterns(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include_patterns: include,
            exclude_patterns: exclude,
        }
    }

    /// Check if an action type should be logged based on include/exclude patterns
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

fn split_patterns(patterns: &str) -> Vec<String> {
    patterns
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// In-Memory Action Log
// ============================================================================

/// An entry in the action log
#[derive(Debug, Clone)]
pub struct ActionLogEntry {
    /// Action type
    pub name: String,
    /// Type plus payload shape
    pub summary: String,
    /// Timestamp when the action was logged
    pub timestamp: Instant,
    /// Sequence number for ordering
    pub sequence: u64,
    /// Whether the store reported a state change (set after the pipeline returns)
    pub state_changed: Option<bool>,
}

impl ActionLogEntry {
    pub fn new(name: impl Into<String>, summary: String, sequence: u64) -> Self {
        Self {
            name: name.into(),
            summary,
            timestamp: Instant::now(),
            sequence,
            state_changed: None,
        }
    }

    /// Time since this action was logged
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
#[derive(Debug, Clone)]
pub struct ActionLogConfig {
    /// Maximum number of entries to keep
    pub capacity: usize,
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
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    pub fn new(capacity: usize, filter: ActionLoggerConfig) -> Self {
        Self { capacity, filter }
    }
}

/// In-memory ring buffer for storing recent actions
///
/// Older entries are discarded when capacity is reached.
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
    pub fn new(config: ActionLogConfig) -> Self {
        Self {
            entries: VecDeque::with_capacity(config.capacity),
            config,
            next_sequence: 0,
        }
    }

    /// Log an action (if it passes the filter)
    ///
    /// Returns the entry if it was logged, None if filtered out.
    pub fn log(&mut self, action: &Value) -> Option<&ActionLogEntry> {
        let name = action_type(action).unwrap_or("<untyped>");
        if !self.config.filter.should_log(name) {
            return None;
        }

        let summary = match Action::try_from(action.clone()) {
            Ok(action) => action.summary(),
            Err(_) => format!("{action:?}"),
        };
        let entry = ActionLogEntry::new(name, summary, self.next_sequence);
        self.next_sequence += 1;

        if self.entries.len() >= self.config.capacity {
            self.entries.pop_front();
        }

        self.entries.push_back(entry);
        self.entries.back()
    }

    /// Record the state change reported for a logged action.
    ///
    /// Entries already evicted are ignored.
    pub fn update_state_changed(&mut self, sequence: u64, changed: bool) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.sequence == sequence) {
            entry.state_changed = Some(changed);
        }
    }

    /// Get all entries (oldest first)
    pub fn entries(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter()
    }

    /// Get the most recent N entries (newest first)
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter().rev().take(count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn config(&self) -> &ActionLogConfig {
        &self.config
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Middleware that logs actions with configurable pattern filtering.
///
/// Supports two modes:
/// - **Tracing only** (default): logs via `tracing::debug!()`
/// - **With storage**: also stores entries in an [`ActionLog`] ring buffer
///
/// Clones share the same log, so keep a clone before handing the middleware
/// to a pipeline.
#[derive(Debug, Clone)]
pub struct ActionLoggerMiddleware {
    config: ActionLoggerConfig,
    log: Option<Arc<Mutex<ActionLog>>>,
    /// When false, the middleware only forwards.
    active: bool,
}

impl ActionLoggerMiddleware {
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

    pub fn with_default_log() -> Self {
        Self::with_log(ActionLogConfig::default())
    }

    /// Default filtering (excludes TICK and RENDER), tracing only
    pub fn default_filtering() -> Self {
        Self::new(ActionLoggerConfig::default())
    }

    /// No filtering, tracing only
    pub fn log_all() -> Self {
        Self::new(ActionLoggerConfig::with_patterns(vec![], vec![]))
    }

    /// Set whether the middleware is active.
    ///
    /// ```ignore
    /// let middleware = ActionLoggerMiddleware::default_filtering()
    ///     .active(args.debug);
    /// ```
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Copy of the current log (if storage is enabled)
    pub fn snapshot(&self) -> Option<ActionLog> {
        self.log.as_ref().map(|log| lock(log).clone())
    }

    pub fn config(&self) -> &ActionLoggerConfig {
        &self.config
    }
}

impl Middleware for ActionLoggerMiddleware {
    fn handle(&self, _ctx: &DispatchContext, next: Next<'_>, action: Value) -> DispatchResult {
        if !self.active {
            return next.run(action);
        }

        let name = action_type(&action).unwrap_or("<untyped>");
        if self.config.should_log(name) {
            tracing::debug!(action = %name, "action");
        }

        let sequence = self
            .log
            .as_ref()
            .and_then(|log| lock(log).log(&action).map(|entry| entry.sequence));

        let result = next.run(action);

        if let (Some(sequence), Some(log), Ok(Value::Bool(changed))) =
            (sequence, self.log.as_ref(), &result)
        {
            lock(log).update_state_changed(sequence, *changed);
        }
        result
    }
}

fn lock(log: &Mutex<ActionLog>) -> MutexGuard<'_, ActionLog> {
    log.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simple glob pattern matching supporting `*` and `?`.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_impl(&pattern, &text)
}

fn glob_match_impl(pattern: &[char], text: &[char]) -> bool {
    let mut pi = 0;
    let mut ti = 0;
    let mut star_pi = None;
    let mut star_ti = 0;

    while ti < text.len() {
        if pi < pattern.len() && (pattern[pi] == '?' || pattern[pi] == text[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < pattern.len() && pattern[pi] == '*' {
            star_pi = Some(pi);
            star_ti = ti;
            pi += 1;
        } else if let Some(spi) = star_pi {
            pi = spi + 1;
            star_ti += 1;
            ti = star_ti;
        } else {
            return false;
        }
    }

    while pi < pattern.len() && pattern[pi] == '*' {
        pi += 1;
    }

    pi == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHarness;
    use serde_json::json;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("TICK", "TICK"));
        assert!(!glob_match("TICK", "TICKS"));

        assert!(glob_match("FETCH*", "FETCH"));
        assert!(glob_match("FETCH*", "FETCH_RESOLVED"));
        assert!(!glob_match("FETCH*", "REFETCH"));
        assert!(glob_match("*_REJECTED", "LOGIN_REJECTED"));
        assert!(glob_match("*USER*", "FETCH_USER_RESOLVED"));

        assert!(glob_match("TICK?", "TICKS"));
        assert!(!glob_match("TICK?", "TICK"));
    }

    #[test]
    fn test_config_include_and_exclude() {
        let config = ActionLoggerConfig::new(Some("FETCH*"), Some("*_REJECTED"));
        assert!(config.should_log("FETCH"));
        assert!(config.should_log("FETCH_RESOLVED"));
        assert!(!config.should_log("FETCH_REJECTED"));
        assert!(!config.should_log("LOGIN"));
    }

    #[test]
    fn test_config_default_and_blank_patterns() {
        let config = ActionLoggerConfig::default();
        assert!(!config.should_log("TICK"));
        assert!(config.should_log("FETCH"));

        // Empty entries from trailing commas are ignored
        let config = ActionLoggerConfig::new(Some("LOGIN, "), Some(""));
        assert_eq!(config.include_patterns, vec!["LOGIN".to_string()]);
        assert!(config.exclude_patterns.is_empty());
    }

    #[test]
    fn test_action_log_capacity_and_recent() {
        let config = ActionLogConfig::new(3, ActionLoggerConfig::with_patterns(vec![], vec![]));
        let mut log = ActionLog::new(config);

        for _ in 0..4 {
            log.log(&Action::new("A").into());
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.entries().next().unwrap().sequence, 1);

        let recent: Vec<_> = log.recent(2).map(|e| e.sequence).collect();
        assert_eq!(recent, vec![3, 2]);
    }

    #[test]
    fn test_action_log_filters_and_summarizes() {
        let mut log = ActionLog::default();

        assert!(log.log(&Action::new("TICK").into()).is_none());
        let entry = log
            .log(&Action::new("FETCH").with_payload(json!({ "page": 2 })).into())
            .unwrap();
        assert_eq!(entry.name, "FETCH");
        assert_eq!(entry.summary, "FETCH { page }");
    }

    #[test]
    fn test_entry_elapsed_display() {
        let entry = ActionLogEntry::new("A", "A".to_string(), 0);
        assert!(entry.elapsed_display().ends_with("ms"));
    }

    #[test]
    fn test_middleware_records_state_changed() {
        let middleware = ActionLoggerMiddleware::with_default_log();
        let harness = TestHarness::builder()
            .with(middleware.clone())
            .with(crate::store::NoopMiddleware)
            .build();

        harness.dispatch(Action::new("FETCH")).unwrap();
        harness.dispatch(Action::new("TICK")).unwrap();

        let log = middleware.snapshot().unwrap();
        assert_eq!(log.len(), 1);
        // The harness sink returns the action, not a bool
        assert_eq!(log.entries().next().unwrap().state_changed, None);
    }

    #[test]
    fn test_store_reports_state_changed() {
        fn reducer(count: &mut u32, action: &Action) -> bool {
            if action.name() == "INC" {
                *count += 1;
                true
            } else {
                false
            }
        }

        let middleware = ActionLoggerMiddleware::with_default_log();
        let store = crate::store::Store::builder(0u32, reducer)
            .with(middleware.clone())
            .build();

        store.dispatch(Action::new("INC")).unwrap();
        store.dispatch(Action::new("OTHER")).unwrap();

        let log = middleware.snapshot().unwrap();
        let changed: Vec<_> = log.entries().map(|e| e.state_changed).collect();
        assert_eq!(changed, vec![Some(true), Some(false)]);
    }

    #[test]
    fn test_inactive_middleware_only_forwards() {
        let middleware = ActionLoggerMiddleware::with_default_log().active(false);
        let harness = TestHarness::with_middleware(middleware.clone());

        harness.dispatch(Action::new("FETCH")).unwrap();

        assert_eq!(harness.recorded_count(), 1);
        assert!(middleware.snapshot().unwrap().is_empty());
    }
}
