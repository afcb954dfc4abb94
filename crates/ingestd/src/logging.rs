//! Log Output

use crate::error::InitError;
use crate::settings::LogFormat;
use std::fmt;
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

/// Renders events as `[LEVEL] message key=value`
pub struct BracketFormat;

impl<S, N> FormatEvent<S, N> for BracketFormat
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
        write!(writer, "[{}] ", event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Parse a level name such as `info` or `DEBUG`
pub fn parse_level(level: &str) -> Result<LevelFilter, InitError> {
    level
        .parse::<LevelFilter>()
        .map_err(|_| InitError::InvalidSettings(format!("unknown log level {:?}", level)))
}

/// Install the global subscriber. Logs go to stderr so that simulated
/// UART output on stdout stays clean.
pub fn init_logging(level: &str, format: LogFormat) -> Result<(), InitError> {
    let level = parse_level(level)?;
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Text => builder.event_format(BracketFormat).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| InitError::InvalidSettings(format!("logging: {}", e)))
}
