//! Logging setup.
//!
//! Every component logs through `tracing`. Two layers observe each event:
//! - JSON to stdout, filtered by `RUST_LOG`
//! - the audit log file, one `[timestamp][LEVEL] message` line per event,
//!   rotated to `<path>.old` past the configured size

pub mod audit;
pub mod format;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::Config;

pub use audit::AuditLog;
pub use format::{level_label, AuditFormat, FATAL_TARGET};

/// Install the global subscriber. Returns the audit log handle so callers
/// can report where it lives.
pub fn init(config: &Config) -> AuditLog {
    let audit_log = AuditLog::new(config.log_file.clone(), config.max_log_size);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .with(
            fmt::layer()
                .with_ansi(false)
                .event_format(AuditFormat)
                .with_writer(audit_log.clone()),
        )
        .init();

    audit_log
}
