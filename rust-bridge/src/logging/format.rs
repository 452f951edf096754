//! Line format for the audit log: `[timestamp][LEVEL] message key=value`.

use std::fmt;

use chrono::{Local, SecondsFormat};
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Target for events that report a caught panic. The audit log labels
/// them `FATAL` instead of `ERROR`.
pub const FATAL_TARGET: &str = "bounce_bridge::fatal";

/// Event formatter for the audit log file.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuditFormat;

impl<S, N> FormatEvent<S, N> for AuditFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
        write!(writer, "[{}][{}] ", timestamp, level_label(event.metadata()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Severity label written between the brackets.
pub fn level_label(metadata: &Metadata<'_>) -> &'static str {
    if metadata.target() == FATAL_TARGET {
        return "FATAL";
    }

    match *metadata.level() {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}
