//! Logging setup
//!
//! Library code only emits `tracing` events; applications call
//! [`init_logging`] once to print them. Every line carries the configured
//! state code.
//!
//! Outside production lines are human readable:
//!
//! ```text
//! [INFO: 14:03:07.512044] FL: Processing a log item
//! ```
//!
//! In production each event is one JSON object with `timestamp`, `level`,
//! `message`, a `stac` block (`filename`, `line`, `function`, `message`),
//! `state`, and any extra event fields at the top level.

use crate::config::LoggingSettings;
use crate::error::{Result, StacError};
use serde_json::{json, Value};
use std::fmt;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{self, Format, Json};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Install the stage's formatter on stderr, filtered by `RUST_LOG`
///
/// `default_directive` (e.g. `"info"` or `"stac_utils=debug"`) applies when
/// `RUST_LOG` is unset or invalid. Fails if a global subscriber is already
/// installed.
pub fn init_logging(settings: &LoggingSettings, default_directive: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing::subscriber::set_global_default(build_subscriber(settings, filter, std::io::stderr))
        .map_err(|e| StacError::Config(format!("Failed to install logger: {}", e)))
}

/// Subscriber for the configured stage, writing to `writer`
pub fn build_subscriber<W>(
    settings: &LoggingSettings,
    filter: EnvFilter,
    writer: W,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let state = settings.state_label();

    if settings.is_production() {
        let inner = tracing_subscriber::fmt::format()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_file(true)
            .with_line_number(true)
            .with_target(true);

        Box::new(
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(writer)
                .event_format(JsonFormat { inner, state })
                .finish(),
        )
    } else {
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .event_format(HumanFormat { state })
                .finish(),
        )
    }
}

/// `[LEVEL: time] STATE: message`
struct HumanFormat {
    state: String,
}

impl<S, N> FormatEvent<S, N> for HumanFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "[{}: {}] {}: ",
            event.metadata().level(),
            chrono::Local::now().format("%H:%M:%S%.6f"),
            self.state
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Flattened JSON event reshaped into the stac layout
struct JsonFormat {
    inner: Format<Json>,
    state: String,
}

impl<S, N> FormatEvent<S, N> for JsonFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut line = String::new();
        self.inner
            .format_event(ctx, format::Writer::new(&mut line), event)?;

        let Ok(Value::Object(mut record)) = serde_json::from_str::<Value>(line.trim_end()) else {
            return write!(writer, "{}", line);
        };

        let message = record.get("message").cloned().unwrap_or(Value::Null);
        let stac = json!({
            "filename": record.remove("filename").unwrap_or(Value::Null),
            "line": record.remove("line_number").unwrap_or(Value::Null),
            "function": record.remove("target").unwrap_or(Value::Null),
            "message": message,
        });
        record.insert("stac".to_string(), stac);
        record.insert("state".to_string(), Value::String(self.state.clone()));

        writeln!(writer, "{}", Value::Object(record))
    }
}
