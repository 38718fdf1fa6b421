//! Telemetry: structured logging for Tensor services and tools.
//!
//! Decision and failure counters are emitted through the `metrics` facade at
//! the call sites; installing an exporter is left to the embedding process.

pub mod logging;

pub use logging::{build_filter, init_logging, LogFormat, LoggingConfig, SpanEvent};
