//! Logging utilities for fcover.
//!
//! Structured `tracing` events for the scan and extraction steps so that runs
//! over large archives stay searchable.

use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::index::FileIndex;

/// Initialize the tracing subscriber with the given log level.
///
/// `RUST_LOG` takes precedence when set. Output goes to stderr so that
/// command output on stdout stays machine readable.
pub fn init_tracing(log_level: &str) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(val) => val,
        Err(_) => log_level.to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Log a start message for a significant operation
pub fn log_operation_start(operation: &str, details: Option<&str>) {
    if let Some(details) = details {
        info!(
            operation = operation,
            details = details,
            "Starting operation"
        );
    } else {
        info!(operation = operation, "Starting operation");
    }
}

/// Log the completion of a significant operation
pub fn log_operation_end(operation: &str, start_time: Instant, success: bool) {
    let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;

    if success {
        info!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed successfully"
        );
    } else {
        warn!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed with warnings"
        );
    }
}

/// Run `f` and log its duration under a fresh request id
pub fn log_timed_operation<F, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let request_id = generate_request_id();

    debug!(
        operation = operation,
        request_id = %request_id,
        "Starting operation"
    );

    let result = f();

    debug!(
        operation = operation,
        request_id = %request_id,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Operation completed"
    );

    result
}

/// Log what a directory scan produced
pub fn log_index_stats(root: &str, scanned: usize, index: &FileIndex) {
    let first = index.iter().next().map(|f| f.display_date());
    let last = index.iter().last().map(|f| f.display_date());

    info!(
        operation = "build_index",
        root = root,
        scanned_files = scanned,
        indexed_dates = index.len(),
        superseded = scanned.saturating_sub(index.len()),
        first_date = first.as_deref().unwrap_or("none"),
        last_date = last.as_deref().unwrap_or("none"),
        "Raster directory indexed"
    );
}

/// Log an error with context
pub fn log_error(error: &crate::error::FcoverError, context: &str) {
    error!(
        error = %error,
        context = context,
        recoverable = error.is_recoverable(),
        "Error occurred"
    );
}

/// Generate a unique request ID
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}
