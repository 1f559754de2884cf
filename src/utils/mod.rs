//! # Utility Modules
//!
//! Supporting utilities for logging and observability.
//!
//! ## Components
//! - **Logging**: `tracing-subscriber` setup driven by [`LoggingConfig`]
//! - **Metrics**: Thread-safe counters for registry and connection churn
//!
//! [`LoggingConfig`]: crate::config::LoggingConfig

pub mod logging;
pub mod metrics;

pub use metrics::{MetricsSnapshot, RegistryMetrics};
