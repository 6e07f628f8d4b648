//! Debug and inspection utilities
//!
//! Use [`ActionLoggerMiddleware`] for pattern-based action filtering:
//!
//! ```
//! use promise_dispatch_core::debug::ActionLoggerConfig;
//!
//! // Log only FETCH* actions, including their settlements
//! let config = ActionLoggerConfig::new(Some("FETCH*"), None);
//! assert!(config.should_log("FETCH_REJECTED"));
//!
//! // Log everything except TICK and RENDER (default excludes)
//! let config = ActionLoggerConfig::default();
//! assert!(!config.should_log("TICK"));
//! ```

pub mod action_logger;

pub use action_logger::{
    glob_match, ActionLog, ActionLogConfig, ActionLogEntry, ActionLoggerConfig,
    ActionLoggerMiddleware,
};
