#![warn(missing_docs)]
#![forbid(unsafe_code)]
//! Shared helpers for the jsonutil test suites.
//!
//! - [`setup`] routes `tracing` output from the codec to the test writer,
//!   filtered by the `JSONUTIL_LOG` environment variable (for example
//!   `JSONUTIL_LOG=jsonutil=debug`).
//! - [`capture_logs`] records what the codec logs while a closure runs, for
//!   tests that check a setting was rejected rather than applied.
//! - [`render`] turns a diagnostic into plain text, labels and all.

use std::sync::{Arc, LazyLock, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// Log target prefix of the codec.
const TARGET: &str = "jsonutil";

static SUBSCRIBER_INIT: LazyLock<()> = LazyLock::new(|| {
    let filter = std::env::var("JSONUTIL_LOG")
        .ok()
        .and_then(|s| s.parse::<Targets>().ok())
        .unwrap_or_else(|| Targets::new().with_target(TARGET, Level::WARN));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_test_writer()
                .with_target(true)
                .without_time()
                .compact(),
        )
        .with(filter)
        .try_init()
        .ok();
});

/// Install the test subscriber. Safe to call from every test.
pub fn setup() {
    LazyLock::force(&SUBSCRIBER_INIT);
}

/// One event logged by the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedEvent {
    /// Event level
    pub level: Level,
    /// The event's message
    pub message: String,
    /// Every other field, as `name=value`
    pub fields: Vec<String>,
}

impl LoggedEvent {
    /// Returns true if a field named `name` was logged with `value`.
    pub fn has_field(&self, name: &str, value: &str) -> bool {
        let wanted = format!("{name}={value}");
        self.fields.iter().any(|f| *f == wanted)
    }
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: Vec<String>,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn core::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }
}

struct CaptureLayer {
    events: Arc<Mutex<Vec<LoggedEvent>>>,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with(TARGET) {
            return;
        }
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        if let Ok(mut events) = self.events.lock() {
            events.push(LoggedEvent {
                level: *metadata.level(),
                message: visitor.message,
                fields: visitor.fields,
            });
        }
    }
}

/// Run `f` on this thread and return its result along with every event the
/// codec logged meanwhile, at any level.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, Vec<LoggedEvent>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(CaptureLayer {
        events: Arc::clone(&events),
    });
    let result = tracing::subscriber::with_default(subscriber, f);
    let events = events.lock().map(|e| e.clone()).unwrap_or_default();
    (result, events)
}

/// Render a diagnostic as plain text: message, code, labelled source
/// snippet and help.
pub fn render(diagnostic: &dyn miette::Diagnostic) -> String {
    let mut out = String::new();
    if miette::NarratableReportHandler::new()
        .render_report(&mut out, diagnostic)
        .is_err()
    {
        out = diagnostic.to_string();
    }
    out
}
