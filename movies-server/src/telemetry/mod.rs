//! Request-scoped spans behind an injectable [`Tracer`]
//!
//! Handlers receive the tracer through [`crate::AppState`]; nothing here
//! reads a global provider. Spans are observation only and never change
//! control flow.
//!
//! Implementations:
//! - [`NoopTracer`] when telemetry is disabled
//! - [`RecordingTracer`] for tests
//! - `otel::OtelTracer` exporting over OTLP (feature `otel`)

use axum::http::HeaderMap;

#[cfg(feature = "otel")]
pub mod otel;
pub mod recording;

pub use recording::{RecordedSpan, RecordingTracer};

/// Opens spans for units of request work.
pub trait Tracer: Send + Sync + 'static {
    /// Start a span named `name`, parented to any trace context carried
    /// in `parent` (W3C `traceparent`).
    fn start(&self, name: &'static str, parent: &HeaderMap) -> SpanGuard;
}

/// A span that has been started but not ended.
pub trait ActiveSpan: Send {
    fn set_attribute(&mut self, key: &'static str, value: String);

    /// Mark the span as failed with `message`.
    fn record_error(&mut self, message: &str);

    /// Start a span nested under this one.
    fn child(&self, name: &'static str) -> Box<dyn ActiveSpan>;

    fn end(&mut self);
}

/// Ends the wrapped span when dropped, so every return path closes it.
pub struct SpanGuard {
    name: &'static str,
    inner: Box<dyn ActiveSpan>,
}

impl SpanGuard {
    pub fn new(name: &'static str, inner: Box<dyn ActiveSpan>) -> Self {
        Self { name, inner }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn set_attribute(&mut self, key: &'static str, value: impl Into<String>) {
        self.inner.set_attribute(key, value.into());
    }

    pub fn record_error(&mut self, message: &str) {
        tracing::debug!(span = self.name, error = message, "Span marked as failed");
        self.inner.record_error(message);
    }

    /// Open a nested span, e.g. around one datastore call.
    pub fn child(&self, name: &'static str) -> SpanGuard {
        SpanGuard::new(name, self.inner.child(name))
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        self.inner.end();
    }
}

/// Tracer that records nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

struct NoopSpan;

impl ActiveSpan for NoopSpan {
    fn set_attribute(&mut self, _key: &'static str, _value: String) {}
    fn record_error(&mut self, _message: &str) {}
    fn child(&self, _name: &'static str) -> Box<dyn ActiveSpan> {
        Box::new(NoopSpan)
    }
    fn end(&mut self) {}
}

impl Tracer for NoopTracer {
    fn start(&self, name: &'static str, _parent: &HeaderMap) -> SpanGuard {
        SpanGuard::new(name, Box::new(NoopSpan))
    }
}
