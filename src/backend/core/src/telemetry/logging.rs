//! Structured logging for the access services and the `tensor` CLI.
//!
//! Output goes to stderr so command results on stdout stay parseable. The
//! level comes from `level` (or `RUST_LOG`) with optional per-module
//! overrides such as `tensor_core::rbac = "debug"`.

use serde::Deserialize;
use std::collections::HashMap;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub module_levels: HashMap<String, String>,

    /// File and line of the call site
    #[serde(default = "enabled")]
    pub include_location: bool,

    #[serde(default)]
    pub include_thread: bool,

    /// Module path of the call site
    #[serde(default = "enabled")]
    pub include_target: bool,

    /// Span lifecycle events to log
    #[serde(default = "default_span_events")]
    pub span_events: Vec<SpanEvent>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            module_levels: HashMap::new(),
            include_location: true,
            include_thread: false,
            include_target: true,
            span_events: default_span_events(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    /// Single line per event, used by the CLI
    Compact,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpanEvent {
    New,
    Enter,
    Exit,
    Close,
}

impl SpanEvent {
    fn fmt_span(self) -> FmtSpan {
        match self {
            Self::New => FmtSpan::NEW,
            Self::Enter => FmtSpan::ENTER,
            Self::Exit => FmtSpan::EXIT,
            Self::Close => FmtSpan::CLOSE,
        }
    }
}

fn span_mask(events: &[SpanEvent]) -> FmtSpan {
    events
        .iter()
        .fold(FmtSpan::NONE, |mask, event| mask | event.fmt_span())
}

fn default_log_level() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
}

fn default_span_events() -> Vec<SpanEvent> {
    vec![SpanEvent::Close]
}

fn enabled() -> bool {
    true
}

/// Global level plus one directive per configured module.
pub fn build_filter(config: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    config
        .module_levels
        .iter()
        .try_fold(EnvFilter::try_new(&config.level)?, |filter, (module, level)| -> anyhow::Result<EnvFilter> {
            Ok(filter.add_directive(format!("{}={}", module, level).parse()?))
        })
}

/// Install the global subscriber. Fails on a bad filter or when one is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = build_filter(config)?;

    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(span_mask(&config.span_events))
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread)
        .with_thread_names(config.include_thread)
        .with_target(config.include_target);

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => base.json().with_filter(filter).boxed(),
        LogFormat::Pretty => base.pretty().with_filter(filter).boxed(),
        LogFormat::Compact => base.compact().with_filter(filter).boxed(),
    };

    tracing_subscriber::registry().with(layer).try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.include_location);
        assert_eq!(config.span_events, vec![SpanEvent::Close]);
    }

    #[test]
    fn test_span_mask() {
        assert_eq!(span_mask(&[]), FmtSpan::NONE);
        assert_eq!(span_mask(&[SpanEvent::New]), FmtSpan::NEW);
        assert_eq!(
            span_mask(&[SpanEvent::Enter, SpanEvent::Exit]),
            FmtSpan::ENTER | FmtSpan::EXIT
        );
    }

    #[test]
    fn test_build_filter_with_module_levels() {
        let mut config = LoggingConfig {
            level: "warn".to_string(),
            ..LoggingConfig::default()
        };
        config
            .module_levels
            .insert("tensor_core::rbac".to_string(), "debug".to_string());
        assert!(build_filter(&config).is_ok());

        config
            .module_levels
            .insert("tensor_core::db".to_string(), "loud".to_string());
        assert!(build_filter(&config).is_err());
    }

    #[test]
    fn test_deserialize_from_config_shape() {
        let config: LoggingConfig = serde_json::from_str(
            r#"{"format": "compact", "span_events": ["new", "close"]}"#,
        )
        .unwrap();
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(span_mask(&config.span_events), FmtSpan::NEW | FmtSpan::CLOSE);
        assert!(config.include_target);
    }
}
