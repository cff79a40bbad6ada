//! In-memory tracer for tests

use std::sync::{Arc, Mutex};

use axum::http::HeaderMap;

use super::{ActiveSpan, SpanGuard, Tracer};

/// A span as it looked when it ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSpan {
    pub name: &'static str,
    pub attributes: Vec<(&'static str, String)>,
    /// Set when the span was marked as failed
    pub error: Option<String>,
    /// `traceparent` header of the request that opened the span
    pub traceparent: Option<String>,
    /// Name of the enclosing span, for spans opened with `child`
    pub parent: Option<&'static str>,
}

impl RecordedSpan {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Keeps every finished span in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingTracer {
    finished: Arc<Mutex<Vec<RecordedSpan>>>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spans that have ended, in end order.
    pub fn finished(&self) -> Vec<RecordedSpan> {
        self.finished
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Most recently finished span called `name`.
    pub fn span(&self, name: &str) -> Option<RecordedSpan> {
        self.finished().into_iter().rev().find(|s| s.name == name)
    }
}

struct RecordingSpan {
    name: &'static str,
    span: Option<RecordedSpan>,
    sink: Arc<Mutex<Vec<RecordedSpan>>>,
}

impl RecordingSpan {
    fn open(
        name: &'static str,
        traceparent: Option<String>,
        parent: Option<&'static str>,
        sink: Arc<Mutex<Vec<RecordedSpan>>>,
    ) -> Self {
        Self {
            name,
            span: Some(RecordedSpan {
                name,
                attributes: Vec::new(),
                error: None,
                traceparent,
                parent,
            }),
            sink,
        }
    }
}

impl ActiveSpan for RecordingSpan {
    fn set_attribute(&mut self, key: &'static str, value: String) {
        if let Some(span) = self.span.as_mut() {
            span.attributes.push((key, value));
        }
    }

    fn record_error(&mut self, message: &str) {
        if let Some(span) = self.span.as_mut() {
            span.error = Some(message.to_string());
        }
    }

    fn child(&self, name: &'static str) -> Box<dyn ActiveSpan> {
        Box::new(RecordingSpan::open(
            name,
            None,
            Some(self.name),
            Arc::clone(&self.sink),
        ))
    }

    fn end(&mut self) {
        if let Some(span) = self.span.take() {
            self.sink
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(span);
        }
    }
}

impl Tracer for RecordingTracer {
    fn start(&self, name: &'static str, parent: &HeaderMap) -> SpanGuard {
        let traceparent = parent
            .get("traceparent")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let span = RecordingSpan::open(name, traceparent, None, Arc::clone(&self.finished));

        SpanGuard::new(name, Box::new(span))
    }
}
