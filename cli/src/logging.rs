use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes logging for the command line tool.
///
/// Console output is compact and human readable, the file output is JSON in the data
/// directory's `logs/` folder, rotated daily. `RUST_LOG` overrides the default filter.
///
/// Returns a guard that must be kept alive for the duration of the program.
pub fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let log_dir = file_system::get_log_dir().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to create log directory: {}", e);
        PathBuf::from(".")
    });

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact();

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "uploader.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_file(true)
        .with_line_number(true);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,service=debug,database=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}
