//! Tracing setup for the binary.

use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

const LOG_FILE_PREFIX: &str = "prisoners.log";

/// `RUST_LOG` wins over the configured level.
fn build_filter(level: &str, env_directives: Option<&str>) -> anyhow::Result<EnvFilter> {
    match env_directives {
        Some(directives) if !directives.trim().is_empty() => Ok(EnvFilter::try_new(directives)?),
        _ => Ok(EnvFilter::try_new(level)?),
    }
}

/// Install the global subscriber.
///
/// With `logging.dir` set, output goes to a daily rolling file through a
/// non-blocking writer; keep the returned guard alive until exit so the
/// buffer is flushed.
pub fn init_tracing(cfg: &LoggingConfig, json_override: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(&cfg.level, env.as_deref())?;
    let json = json_override || cfg.json;

    let (writer, guard) = match &cfg.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(cfg.dir.is_none() && !json)
        .with_writer(writer);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(guard)
}
