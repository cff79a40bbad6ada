//! OpenTelemetry span export
//!
//! The caller owns the [`TracerProvider`] returned by [`init_provider`]
//! and passes it to [`shutdown_provider`] once at exit so batched spans
//! are flushed.

use axum::http::HeaderMap;
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry::trace::{
    Span as _, SpanKind, Status, TraceContextExt, Tracer as _, TracerProvider as _,
};
use opentelemetry::{Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{self as sdktrace, TracerProvider};

use super::{ActiveSpan, SpanGuard, Tracer};

/// Instrumentation scope name for handler spans
pub const INSTRUMENTATION_NAME: &str = "movie-handlers";

/// Default service name reported in the resource
pub const DEFAULT_SERVICE_NAME: &str = "movie-service";

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to create OTLP exporter: {0}")]
    Exporter(String),
}

/// Build a tracer provider exporting to `endpoint` over OTLP/gRPC.
///
/// Spans are batched on the tokio runtime; must be called from within it.
pub fn init_provider(endpoint: &str, service_name: &str) -> Result<TracerProvider, TelemetryError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

    let resource = opentelemetry_sdk::Resource::new(vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ]);

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(resource)
        .build();

    tracing::info!(endpoint = %endpoint, service = %service_name, "OpenTelemetry tracer provider initialized");

    Ok(provider)
}

/// Flush pending spans and stop the exporter.
pub fn shutdown_provider(provider: TracerProvider) {
    if let Err(e) = provider.shutdown() {
        tracing::warn!(error = %e, "Failed to shut down tracer provider");
    }
}

/// [`Tracer`] backed by an OpenTelemetry SDK tracer
#[derive(Debug, Clone)]
pub struct OtelTracer {
    tracer: sdktrace::Tracer,
    propagator: TraceContextPropagator,
}

impl OtelTracer {
    pub fn new(provider: &TracerProvider) -> Self {
        Self {
            tracer: provider.tracer(INSTRUMENTATION_NAME),
            propagator: TraceContextPropagator::new(),
        }
    }
}

impl Tracer for OtelTracer {
    fn start(&self, name: &'static str, parent: &HeaderMap) -> SpanGuard {
        let parent_cx = self.propagator.extract(&HeaderExtractor(parent));
        let builder = self.tracer.span_builder(name).with_kind(SpanKind::Server);
        let span = self.tracer.build_with_context(builder, &parent_cx);

        SpanGuard::new(
            name,
            Box::new(OtelSpan {
                span,
                tracer: self.tracer.clone(),
            }),
        )
    }
}

struct OtelSpan {
    span: sdktrace::Span,
    tracer: sdktrace::Tracer,
}

impl ActiveSpan for OtelSpan {
    fn set_attribute(&mut self, key: &'static str, value: String) {
        self.span.set_attribute(KeyValue::new(key, value));
    }

    fn record_error(&mut self, message: &str) {
        self.span.add_event(
            "exception",
            vec![KeyValue::new("exception.message", message.to_string())],
        );
        self.span.set_status(Status::error(message.to_string()));
    }

    /// Children are client spans for outbound calls (the datastore).
    fn child(&self, name: &'static str) -> Box<dyn ActiveSpan> {
        let parent_cx = Context::new().with_remote_span_context(self.span.span_context().clone());
        let builder = self.tracer.span_builder(name).with_kind(SpanKind::Client);
        let span = self.tracer.build_with_context(builder, &parent_cx);

        Box::new(OtelSpan {
            span,
            tracer: self.tracer.clone(),
        })
    }

    fn end(&mut self) {
        self.span.end();
    }
}

/// Reads propagation fields from request headers
struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}
