//! `OpenTelemetry` export for traces and queue counters.
//!
//! This module is only compiled when the `metrics` Cargo feature is enabled.
//! It sets up the OTLP exporter for both traces and metrics, bridges
//! `tracing` spans into the trace pipeline, and exposes the counters the
//! command engine records.

use std::sync::OnceLock;

use opentelemetry::metrics::Counter;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Errors that can occur during metrics / tracing pipeline initialisation.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to build an OTLP exporter.
    #[error("failed to build OTLP exporter: {0}")]
    ExporterBuild(#[from] opentelemetry_otlp::ExporterBuildError),

    /// Failed during `OTel` SDK shutdown or flush.
    #[error("OpenTelemetry SDK error: {0}")]
    Sdk(#[from] opentelemetry_sdk::error::OTelSdkError),
}

/// Opaque handle that keeps the `OpenTelemetry` providers alive.
///
/// When dropped, the providers are **not** shut down automatically -- call
/// [`MetricsGuard::shutdown`] for a graceful flush before exiting.
pub struct MetricsGuard {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl MetricsGuard {
    /// Gracefully shut down both providers, flushing any buffered telemetry.
    pub fn shutdown(self) -> Result<(), MetricsError> {
        self.tracer_provider.shutdown()?;
        self.meter_provider.shutdown()?;
        Ok(())
    }
}

/// Initialise the global tracing subscriber with an OTLP span bridge.
///
/// Same filter and formatting rules as
/// [`init_tracing`](crate::tracing_init::init_tracing), plus a
/// `tracing-opentelemetry` layer feeding the exporter at `endpoint`.
pub fn init_tracing_with_otlp(
    default_filter: &str,
    log_json: bool,
    endpoint: &str,
) -> Result<MetricsGuard, MetricsError> {
    let guard = init_metrics(endpoint)?;
    let tracer = guard.tracer_provider.tracer("mdmq");

    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    );
    tracing_subscriber::registry()
        .with(env_filter)
        .with(log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!log_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .init();

    Ok(guard)
}

/// Initialise the `OpenTelemetry` OTLP pipeline for traces **and** metrics.
///
/// * `endpoint` -- OTLP receiver URL, e.g. `"http://localhost:4317"` (gRPC).
///
/// Returns a [`MetricsGuard`] that **must** be kept alive for the lifetime of
/// the application.
pub fn init_metrics(endpoint: &str) -> Result<MetricsGuard, MetricsError> {
    // --- Traces ---
    let trace_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(trace_exporter)
        .build();

    global::set_tracer_provider(tracer_provider.clone());

    // --- Metrics ---
    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let meter_provider = SdkMeterProvider::builder()
        .with_periodic_exporter(metric_exporter)
        .build();

    global::set_meter_provider(meter_provider.clone());

    Ok(MetricsGuard {
        tracer_provider,
        meter_provider,
    })
}

/// Counters recorded by the command engine.
pub struct QueueMeters {
    enqueued: Counter<u64>,
    acknowledged: Counter<u64>,
    failed: Counter<u64>,
    requeued: Counter<u64>,
}

impl QueueMeters {
    fn new() -> Self {
        let meter = global::meter("mdmq");
        Self {
            enqueued: meter.u64_counter("mdmq.commands.enqueued").build(),
            acknowledged: meter.u64_counter("mdmq.commands.acknowledged").build(),
            failed: meter.u64_counter("mdmq.commands.failed").build(),
            requeued: meter.u64_counter("mdmq.commands.requeued").build(),
        }
    }

    pub fn enqueued(&self, request_type: &str) {
        self.enqueued
            .add(1, &[KeyValue::new("request_type", request_type.to_string())]);
    }

    pub fn acknowledged(&self, request_type: &str) {
        self.acknowledged
            .add(1, &[KeyValue::new("request_type", request_type.to_string())]);
    }

    pub fn failed(&self) {
        self.failed.add(1, &[]);
    }

    pub fn requeued(&self) {
        self.requeued.add(1, &[]);
    }
}

/// Process-wide queue counters, bound to the global meter provider on first use.
pub fn queue_meters() -> &'static QueueMeters {
    static METERS: OnceLock<QueueMeters> = OnceLock::new();
    METERS.get_or_init(QueueMeters::new)
}
