#![forbid(unsafe_code)]

//! `tracing` output for hosts without a terminal.
//!
//! [`ConsoleLayer`] flattens every event into one line,
//! `target: message key=value ...`, and hands it to a [`ConsoleSink`]
//! together with its level. In the browser the sink is the developer
//! console; natively it is whatever a test captures into.

use std::fmt;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Receiver of formatted log lines.
pub trait ConsoleSink: Send + Sync + 'static {
    fn write(&self, level: Level, line: &str);
}

#[derive(Debug, Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl LineVisitor {
    fn finish(self, target: &str) -> String {
        format!("{target}: {}{}", self.message, self.fields)
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.fields.push_str(&format!(" {}={value}", field.name()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message.push_str(&format!("{value:?}"));
        } else {
            self.fields.push_str(&format!(" {}={value:?}", field.name()));
        }
    }
}

/// Layer writing each event to a [`ConsoleSink`].
#[derive(Debug)]
pub struct ConsoleLayer<W> {
    sink: W,
}

impl<W: ConsoleSink> ConsoleLayer<W> {
    #[must_use]
    pub fn new(sink: W) -> Self {
        Self { sink }
    }
}

impl<S, W> Layer<S> for ConsoleLayer<W>
where
    S: Subscriber,
    W: ConsoleSink,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut line = LineVisitor::default();
        event.record(&mut line);
        let meta = event.metadata();
        self.sink.write(*meta.level(), &line.finish(meta.target()));
    }
}

/// Install `sink` as the global subscriber, keeping events up to
/// `max_level`. Returns `false` when a global subscriber is already set.
pub fn install<W: ConsoleSink>(sink: W, max_level: LevelFilter) -> bool {
    let subscriber =
        tracing_subscriber::registry().with(ConsoleLayer::new(sink).with_filter(max_level));
    tracing::subscriber::set_global_default(subscriber).is_ok()
}
