//! JSON-lines logging.
//!
//! Every event becomes one JSON object on stdout carrying `timestamp`,
//! `log_level`, `message`, `environment`, `application`, `module`, `process`,
//! `thread` and `host`, followed by the event's own fields. `environment` and
//! `application` are read from enclosing spans, so each invocation tags its
//! lines through its own span while the subscriber is installed once.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use batch_launcher_config::{LogLevel, UNSET_TEXT};
use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{span, Event, Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{reload, EnvFilter, Layer};

use crate::error::LauncherError;

static HOSTNAME: Lazy<String> = Lazy::new(|| {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
});

/// Type alias for the reload handle returned by tracing initialization.
pub type ReloadHandle = Arc<dyn Fn(EnvFilter) -> Result<(), String> + Send + Sync>;

/// Adjusts the active log level after the subscriber is installed.
#[derive(Clone)]
pub struct LogControl {
    reload: ReloadHandle,
}

impl fmt::Debug for LogControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogControl").finish_non_exhaustive()
    }
}

impl LogControl {
    pub fn new(reload: ReloadHandle) -> Self {
        Self { reload }
    }

    /// A control that accepts and discards level changes.
    pub fn detached() -> Self {
        Self::new(Arc::new(|_: EnvFilter| Ok::<(), String>(())))
    }

    /// Switch to `level`. `RUST_LOG`, when set, still wins.
    pub fn apply(&self, level: LogLevel) -> Result<(), LauncherError> {
        (self.reload)(filter_for(level)).map_err(LauncherError::Logging)
    }
}

fn filter_for(level: LogLevel) -> EnvFilter {
    let directives =
        std::env::var("RUST_LOG").unwrap_or_else(|_| level.as_directive().to_string());
    EnvFilter::new(directives)
}

/// Install the global JSON subscriber writing to stdout.
pub fn install_tracing(level: LogLevel) -> Result<LogControl, LauncherError> {
    let (filter, reload_handle) = reload::Layer::new(filter_for(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(JsonLineLayer::new(std::io::stdout))
        .try_init()
        .map_err(|e| LauncherError::Logging(e.to_string()))?;

    Ok(LogControl::new(Arc::new(move |filter: EnvFilter| {
        reload_handle
            .reload(filter)
            .map_err(|e| format!("reload failed: {e}"))
    })))
}

/// Layer writing one JSON object per event.
pub struct JsonLineLayer<W> {
    make_writer: W,
}

impl<W> JsonLineLayer<W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    pub fn new(make_writer: W) -> Self {
        Self { make_writer }
    }
}

/// Fields recorded on a span, kept in its extensions.
#[derive(Default)]
struct SpanFields(Map<String, Value>);

struct JsonVisitor<'a>(&'a mut Map<String, Value>);

impl Visit for JsonVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_owned(), Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_owned(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_owned(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_owned(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_owned(), Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.0
            .insert(field.name().to_owned(), Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0
            .insert(field.name().to_owned(), Value::from(format!("{:?}", value)));
    }
}

#[inline]
fn level_name(level: Level) -> &'static str {
    match level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

impl<S, W> Layer<S> for JsonLineLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = SpanFields::default();
        attrs.record(&mut JsonVisitor(&mut fields.0));
        span.extensions_mut().insert(fields);
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            values.record(&mut JsonVisitor(&mut fields.0));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut line = Map::new();
        line.insert(
            "timestamp".into(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        line.insert("log_level".into(), Value::from(level_name(*meta.level())));
        line.insert("message".into(), Value::from(""));
        line.insert("environment".into(), Value::from(UNSET_TEXT));
        line.insert("application".into(), Value::from(UNSET_TEXT));
        line.insert(
            "module".into(),
            Value::from(meta.module_path().unwrap_or_else(|| meta.target())),
        );
        line.insert("process".into(), Value::from(std::process::id().to_string()));
        line.insert(
            "thread".into(),
            Value::from(format!("[{:?}]", std::thread::current().id())),
        );
        line.insert("host".into(), Value::from(HOSTNAME.as_str()));

        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                let extensions = span.extensions();
                if let Some(fields) = extensions.get::<SpanFields>() {
                    for (key, value) in &fields.0 {
                        line.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        event.record(&mut JsonVisitor(&mut line));

        let Ok(mut buf) = serde_json::to_vec(&line) else {
            return;
        };
        buf.push(b'\n');
        let mut writer = self.make_writer.make_writer();
        let _ = writer.write_all(&buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tracing::{error, info, info_span};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for SharedBuffer {
        type Writer = SharedBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    impl SharedBuffer {
        fn lines(&self) -> Vec<Value> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(|l| serde_json::from_str(l).expect("json line"))
                .collect()
        }
    }

    fn capture(f: impl FnOnce()) -> Vec<Value> {
        let buffer = SharedBuffer::default();
        let subscriber = tracing_subscriber::registry().with(JsonLineLayer::new(buffer.clone()));
        tracing::subscriber::with_default(subscriber, f);
        buffer.lines()
    }

    #[test]
    fn event_carries_standard_keys() {
        let lines = capture(|| info!(job_id = "abc", attempts = 2u64, "Batch job submitted"));
        assert_eq!(lines.len(), 1);
        let line = &lines[0];

        assert_eq!(line["log_level"], "INFO");
        assert_eq!(line["message"], "Batch job submitted");
        assert_eq!(line["environment"], UNSET_TEXT);
        assert_eq!(line["application"], UNSET_TEXT);
        assert_eq!(line["process"], std::process::id().to_string());
        assert_eq!(line["job_id"], "abc");
        assert_eq!(line["attempts"], 2);
        assert!(line["timestamp"].as_str().unwrap().ends_with('Z'));
        assert!(line["thread"].as_str().unwrap().starts_with('['));
        assert!(line["module"].as_str().unwrap().contains("logging"));

        let keys: Vec<_> = line.as_object().unwrap().keys().take(9).cloned().collect();
        assert_eq!(
            keys,
            [
                "timestamp",
                "log_level",
                "message",
                "environment",
                "application",
                "module",
                "process",
                "thread",
                "host"
            ]
        );
    }

    #[test]
    fn span_fields_tag_events() {
        let lines = capture(|| {
            let span = info_span!(
                "invocation",
                environment = "production",
                application = "reconciliation"
            );
            let _guard = span.enter();
            error!(error_message = "boom", "Error occurred submitting batch job");
        });

        let line = &lines[0];
        assert_eq!(line["log_level"], "ERROR");
        assert_eq!(line["environment"], "production");
        assert_eq!(line["application"], "reconciliation");
        assert_eq!(line["error_message"], "boom");
    }

    #[test]
    fn embedded_json_stays_a_string() {
        let event = serde_json::json!({"test_key": "test_value"});
        let dumped = serde_json::to_string(&event).unwrap();
        let lines = capture(|| info!(sns_event = %dumped, "SNS Event"));

        let embedded = lines[0]["sns_event"].as_str().expect("string field");
        let decoded: Value = serde_json::from_str(embedded).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn detached_control_accepts_levels() {
        LogControl::detached().apply(LogLevel::Debug).expect("apply");
    }
}
