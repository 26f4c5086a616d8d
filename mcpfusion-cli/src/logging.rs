//! Tracing setup driven by the loaded [`LoggingConfig`]. Mirrors
//! the config's declared targets and format rather than hardcoding a single
//! `EnvFilter`-only subscriber, so a config file actually controls what the
//! running gateway logs.

use anyhow::{Context, Result};
use mcpfusion_config::domains::logging::{LogFormat, LogLevel, LogTarget};
use mcpfusion_config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Keeps the non-blocking writer's flush thread alive for the process
/// lifetime; dropping it silently stops delivering buffered log lines.
#[must_use]
pub struct LoggingGuard(#[allow(dead_code)] Option<WorkerGuard>);

pub fn init(config: &LoggingConfig, debug: bool) -> Result<LoggingGuard> {
    let level = if debug { LogLevel::Debug } else { config.level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str(level)));

    let target = config.targets.first().cloned().unwrap_or(LogTarget::Console { level: None });

    let (layer, guard) = match target {
        LogTarget::Console { .. } => (boxed(fmt::layer(), config.format), None),
        LogTarget::File { path, .. } => {
            let path = std::path::Path::new(&path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
            let filename = path.file_name().context("log file target has no file name")?;
            let appender = tracing_appender::rolling::never(dir, filename);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (boxed(fmt::layer().with_writer(writer).with_ansi(false), config.format), Some(guard))
        }
        LogTarget::Syslog { facility, ident, .. } => {
            // No syslog transport is wired up; fall back to stderr and say so,
            // rather than silently dropping the configured target.
            tracing::warn!(facility, ident, "syslog log target is not implemented; logging to stderr instead");
            (boxed(fmt::layer().with_writer(std::io::stderr), config.format), None)
        }
    };

    Registry::default().with(filter).with(layer).init();
    Ok(LoggingGuard(guard))
}

fn boxed<W>(layer: fmt::Layer<Registry, fmt::format::DefaultFields, fmt::format::Format, W>, format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    match format {
        LogFormat::Compact => Box::new(layer.compact()),
        LogFormat::Pretty => Box::new(layer.pretty()),
        LogFormat::Json => Box::new(layer.json()),
        LogFormat::Text => Box::new(layer),
    }
}

fn level_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
