//! # Utility Modules
//!
//! Supporting utilities for path handling, logging and metrics.
//!
//! ## Components
//! - **Paths**: device path joining, symlink target resolution, host name sanitisation
//! - **Logging**: `tracing-subscriber` setup from [`crate::config::LoggingConfig`]
//! - **Metrics**: per-client atomic counters

pub mod logging;
pub mod metrics;
pub mod paths;

pub use metrics::{Metrics, MetricsSnapshot};
