//! Centralized logging setup (stderr, plus an optional log file)

use std::path::Path;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging to stderr, and to `log_file` as well when given
///
/// Both outputs use the level from the `RUST_LOG` environment variable,
/// defaulting to "info". Stdout stays free for command output.
///
/// The file writer's guard is forgotten to keep it alive for the program
/// lifetime.
pub fn init_logging(log_file: Option<&Path>) {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter());

    let Some(log_file) = log_file else {
        tracing_subscriber::registry().with(stderr_layer).init();
        return;
    };

    let dir = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .map_or_else(|| "fdfs.log".into(), |name| name.to_os_string());

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(env_filter()),
        )
        .init();

    // Keep guard alive for the program lifetime
    std::mem::forget(guard);
}
