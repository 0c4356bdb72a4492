// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for Sight
//!
//! Console output always; with the `file-logging` feature, a daily rolling
//! `sight.log` inside a timestamped run folder:
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       └── sight.log
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LogOutput, LoggingConfig, ObservabilityConfig};

/// Most recent run folders kept regardless of age
pub const RETENTION_RUNS: usize = 10;

const RUN_PREFIX: &str = "run_";
const RUN_FORMAT: &str = "%Y%m%d_%H%M%S";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Keeps the file writers alive; logs are flushed when dropped
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
    installed: bool,
}

impl LoggingGuard {
    /// Run folder of this process, when file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    /// False when another global subscriber was already set
    pub fn is_installed(&self) -> bool {
        self.installed
    }
}

/// Initialize the global subscriber
///
/// A second call (or a subscriber installed elsewhere, as in tests) is not
/// an error: the returned guard reports `is_installed() == false`.
pub fn init_logging(
    debug_flags: &CrateDebugFlags,
    config: &ObservabilityConfig,
) -> Result<LoggingGuard> {
    let filter = debug_flags.to_filter_string(&config.logging.level);
    let env_filter = EnvFilter::try_new(&filter)
        .with_context(|| format!("Invalid log filter: {}", filter))?;

    let mut layers: Vec<BoxedLayer> = vec![console_layer(&config.logging, env_filter)];

    #[cfg(feature = "file-logging")]
    let mut file_guards = Vec::new();
    #[allow(unused_mut)]
    let mut log_dir = None;

    #[cfg(feature = "file-logging")]
    if let Some(file) = &config.logging.file {
        let run_folder = create_run_folder(&file.log_dir)?;
        cleanup_old_logs(&file.log_dir, file.retention_days, RETENTION_RUNS)?;

        let appender = tracing_appender::rolling::daily(&run_folder, "sight.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        file_guards.push(guard);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(EnvFilter::try_new(&filter)?)
            .boxed();
        layers.push(file_layer);
        log_dir = Some(run_folder);
    }

    #[cfg(not(feature = "file-logging"))]
    if config.logging.file.is_some() {
        eprintln!("Warning: file logging requested but the 'file-logging' feature is disabled");
    }

    let installed = Registry::default().with(layers).try_init().is_ok();

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
        log_dir,
        installed,
    })
}

/// Console output at `info`, honoring per-crate debug flags
pub fn init_logging_default(debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    init_logging(debug_flags, &ObservabilityConfig::default())
}

fn console_layer(config: &LoggingConfig, filter: EnvFilter) -> BoxedLayer {
    let writer = match config.output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
    };
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_names(true);

    match config.format {
        LogFormat::Full => layer.with_filter(filter).boxed(),
        LogFormat::Compact => layer.compact().with_filter(filter).boxed(),
        LogFormat::Pretty => layer.pretty().with_filter(filter).boxed(),
    }
}

/// Create `run_<timestamp>` under `base`
pub fn create_run_folder(base: &Path) -> Result<PathBuf> {
    let run_folder = base.join(format!("{}{}", RUN_PREFIX, Utc::now().format(RUN_FORMAT)));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;
    Ok(run_folder)
}

fn parse_run_time(dir_name: &str) -> Option<DateTime<Utc>> {
    let stamp = dir_name.strip_prefix(RUN_PREFIX)?;
    let naive = NaiveDateTime::parse_from_str(stamp, RUN_FORMAT).ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

/// Remove run folders older than `retention_days`, then all but the
/// `retention_runs` most recent ones. Returns the number removed.
pub fn cleanup_old_logs(
    base_log_dir: &Path,
    retention_days: u32,
    retention_runs: usize,
) -> Result<usize> {
    if !base_log_dir.exists() {
        return Ok(0);
    }

    let cutoff_date = Utc::now() - chrono::Duration::days(i64::from(retention_days));

    let mut runs: Vec<(PathBuf, DateTime<Utc>)> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(dt) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_run_time)
        {
            runs.push((path, dt));
        }
    }

    // Newest first
    runs.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (index, (path, dt)) in runs.iter().enumerate() {
        if *dt >= cutoff_date && index < retention_runs {
            continue;
        }
        match std::fs::remove_dir_all(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            ),
        }
    }

    Ok(removed)
}
