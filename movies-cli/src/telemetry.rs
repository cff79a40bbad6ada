//! Tracer construction and provider lifecycle
//!
//! Environment variables:
//!   OTEL_EXPORTER_OTLP_ENDPOINT        # OTLP endpoint; setting it enables export
//!   OTEL_SERVICE_NAME                  # Service name (default: movie-service)

use std::sync::Arc;

use anyhow::Result;
use movies_server::telemetry::{NoopTracer, Tracer};

#[cfg(feature = "telemetry")]
const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

type Shutdown = Box<dyn FnOnce() + Send>;

/// The handler tracer plus whatever must run at exit to flush it
pub struct Telemetry {
    tracer: Arc<dyn Tracer>,
    shutdown: Option<Shutdown>,
}

impl Telemetry {
    pub fn disabled() -> Self {
        Self {
            tracer: Arc::new(NoopTracer),
            shutdown: None,
        }
    }

    /// Export spans over OTLP when `enabled` or when an endpoint is
    /// configured; otherwise spans are discarded.
    #[cfg(feature = "telemetry")]
    pub fn init(enabled: bool) -> Result<Self> {
        use anyhow::Context;
        use movies_server::telemetry::otel::{
            init_provider, shutdown_provider, OtelTracer, DEFAULT_SERVICE_NAME,
        };

        let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();
        if !enabled && endpoint.is_none() {
            tracing::info!("Span export disabled");
            return Ok(Self::disabled());
        }

        let endpoint = endpoint.unwrap_or_else(|| DEFAULT_OTLP_ENDPOINT.to_string());
        let service_name =
            std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());

        let provider = init_provider(&endpoint, &service_name)
            .context("Failed to initialize OpenTelemetry")?;
        let tracer = OtelTracer::new(&provider);

        Ok(Self {
            tracer: Arc::new(tracer),
            shutdown: Some(Box::new(move || shutdown_provider(provider))),
        })
    }

    #[cfg(not(feature = "telemetry"))]
    pub fn init(enabled: bool) -> Result<Self> {
        if enabled {
            tracing::warn!("Built without the telemetry feature; spans will not be exported");
        }
        Ok(Self::disabled())
    }

    pub fn tracer(&self) -> Arc<dyn Tracer> {
        Arc::clone(&self.tracer)
    }

    /// Flush pending spans. The provider blocks while flushing, so it
    /// runs off the async workers.
    pub async fn shutdown(self) {
        if let Some(shutdown) = self.shutdown {
            if let Err(e) = tokio::task::spawn_blocking(shutdown).await {
                tracing::warn!(error = %e, "Tracer shutdown task failed");
            }
        }
    }
}
