//! Output multiplexer: tee the process logging channel into the journal.
//!
//! The harness never replaces the logging primitive: [`JournalLayer`] sits
//! next to the ordinary `fmt` layer, so every event still reaches stderr
//! unchanged. While the gate is armed (a module handle exists), each event
//! is additionally appended to the journal as one space-joined line.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::journal::{EntryKind, Journal};

/// Controls whether the journal layer captures events.
///
/// Armed while a module handle exists; events fired before module readiness
/// (or after teardown) are only emitted through the original channel.
#[derive(Debug, Clone, Default)]
pub struct CaptureGate {
    armed: Arc<AtomicBool>,
}

impl CaptureGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::Relaxed);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Relaxed);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Relaxed)
    }
}

/// Tracing layer that appends captured events to the journal.
#[derive(Debug)]
pub struct JournalLayer {
    journal: Journal,
    gate: CaptureGate,
}

impl JournalLayer {
    pub fn new(journal: Journal, gate: CaptureGate) -> Self {
        Self { journal, gate }
    }
}

impl<S: Subscriber> Layer<S> for JournalLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !self.gate.is_armed() {
            return;
        }
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let line = visitor.finish();
        if line.is_empty() {
            return;
        }
        let kind = if *event.metadata().level() <= Level::WARN {
            EntryKind::Error
        } else {
            EntryKind::Info
        };
        self.journal.append(kind, line);
    }
}

/// Joins an event's message and fields into a single text line.
#[derive(Default)]
struct LineVisitor {
    message: Option<String>,
    fields: Vec<String>,
}

impl LineVisitor {
    fn finish(self) -> String {
        let mut parts = Vec::with_capacity(1 + self.fields.len());
        if let Some(message) = self.message {
            parts.push(message);
        }
        parts.extend(self.fields);
        parts.join(" ")
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }
}
