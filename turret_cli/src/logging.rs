//! Tracing subscriber setup: console layer plus an optional rolling file.

use std::path::Path;

use chrono::{DateTime, Local};
use eyre::WrapErr;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::cli::FILE_GUARD;

/// Console filter: `RUST_LOG` wins over `--log-level`, which wins over the config.
fn console_filter(cli_level: &str, cfg_level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cli_level))
        .or_else(|_| EnvFilter::try_new(cfg_level.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn rotation(name: Option<&str>) -> Rotation {
    match name {
        Some("daily") => Rotation::DAILY,
        Some("hourly") => Rotation::HOURLY,
        _ => Rotation::NEVER,
    }
}

/// Name prefix handed to the appender. Without rotation each run writes its
/// own stamped file so `max_files` still bounds the directory.
fn file_prefix(name: &str, rotation: &Rotation, started: &DateTime<Local>) -> String {
    if *rotation == Rotation::NEVER {
        format!("{name}.{}", started.format("%Y-%m-%d-%H%M%S%.3f"))
    } else {
        name.to_string()
    }
}

/// Install the global subscriber. Old log files beyond `logging.max_files`
/// are removed from the log directory first.
pub fn init(json: bool, cli_level: &str, cfg: &turret_config::Logging) -> eyre::Result<()> {
    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter(cli_level, cfg.level.as_deref()))
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter(cli_level, cfg.level.as_deref()))
            .boxed()
    };

    let file = match cfg.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {path:?}"))?;
            let name = name.to_string_lossy();
            let rotation = rotation(cfg.rotation.as_deref());
            // Every log file carries the configured name as a prefix. One slot
            // is left for the file this run opens.
            let removed = turret_core::retention::evict_oldest_with_prefix(
                dir,
                &name,
                cfg.max_files.saturating_sub(1),
            )
            .wrap_err_with(|| format!("prune log directory {dir:?}"))?;
            let appender = RollingFileAppender::builder()
                .filename_prefix(file_prefix(&name, &rotation, &Local::now()))
                .rotation(rotation)
                .build(dir)
                .wrap_err_with(|| format!("open log file in {dir:?}"))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            let level = cfg.level.as_deref().unwrap_or("info");
            Some((
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")))
                    .boxed(),
                removed.len(),
            ))
        }
        None => None,
    };

    let (file_layer, pruned) = match file {
        Some((layer, n)) => (Some(layer), n),
        None => (None, 0),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| eyre::eyre!("install tracing subscriber: {e}"))?;

    if pruned > 0 {
        tracing::debug!(count = pruned, "old log files removed");
    }
    Ok(())
}
