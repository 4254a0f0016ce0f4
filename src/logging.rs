//! Logging setup for the provider process.
//!
//! All logs are written to **stderr**; stdout belongs to the plugin handshake.
//!
//! # Environment Variables
//!
//! Checked in order, first match wins:
//!
//! - `RUST_LOG`: full `EnvFilter` directives (e.g. `datarobot_provider=debug`)
//! - `TF_LOG_PROVIDER`: Terraform level for providers only
//! - `TF_LOG`: Terraform level for everything
//!
//! Terraform levels (`TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR`, `JSON`) map to
//! the matching `tracing` level; `JSON` maps to `trace`.
//!
//! ```bash
//! TF_LOG_PROVIDER=DEBUG terraform plan
//! RUST_LOG=datarobot_provider::files=trace terraform apply
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging at `info` unless the environment says otherwise.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize logging with a custom default level.
///
/// `default_level` applies only when none of the environment variables
/// above select a level.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    subscriber(default_level).init();
}

/// Try to initialize logging, returning false if already initialized.
pub fn try_init_logging() -> bool {
    subscriber("info").try_init().is_ok()
}

fn subscriber(default_level: &str) -> impl tracing::Subscriber + Send + Sync + 'static {
    let directives = filter_directives(default_level, |key| std::env::var(key).ok());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    )
}

/// Pick the filter directives from the environment.
pub fn filter_directives<F>(default_level: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(directives) = lookup("RUST_LOG").filter(|v| !v.trim().is_empty()) {
        return directives;
    }

    ["TF_LOG_PROVIDER", "TF_LOG"]
        .into_iter()
        .find_map(|key| lookup(key).and_then(|level| terraform_level(&level)))
        .unwrap_or(default_level)
        .to_string()
}

/// Map a Terraform log level name to a `tracing` level directive.
pub fn terraform_level(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "JSON" => Some("trace"),
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARN" => Some("warn"),
        "ERROR" => Some("error"),
        _ => None,
    }
}
