//! Debug and inspection utilities
//!
//! - **Action Logging**: a listener that logs broadcasts through `tracing` and
//!   keeps recent ones in a ring buffer, filtered by glob patterns on the
//!   action name
//!
//! ```
//! use tidux_core::debug::{ActionLogger, ActionLoggerConfig};
//! use tidux_core::Dispatcher;
//!
//! let dispatcher = Dispatcher::new();
//! ActionLogger::new(ActionLoggerConfig::new(Some("Load*"), None)).attach(&dispatcher);
//! assert_eq!(dispatcher.listener_count(), 1);
//! ```

pub mod action_logger;

pub use action_logger::{
    glob_match, ActionLog, ActionLogConfig, ActionLogEntry, ActionLogger, ActionLoggerConfig,
};
