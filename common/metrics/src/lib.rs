//! Thin wrapper around `prometheus`, registering everything against a single global registry.
//!
//! Components throughout the node call `try_create_int_counter`/`try_create_int_gauge` once at
//! `static`-init time (see the `LazyLock` pattern used in `logging` and `network`) and then hold
//! onto the handle; a failed registration (e.g. a duplicate name) is logged once and treated as
//! absent rather than panicking, since metrics are diagnostic, never load-bearing.

pub use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Result,
};
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::LazyLock;

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub fn try_create_int_counter(name: &str, help: &str) -> Result<IntCounter> {
    let counter = IntCounter::new(name, help)?;
    REGISTRY.register(Box::new(counter.clone()))?;
    Ok(counter)
}

pub fn try_create_int_gauge(name: &str, help: &str) -> Result<IntGauge> {
    let gauge = IntGauge::new(name, help)?;
    REGISTRY.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

pub fn try_create_int_gauge_vec(
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<IntGaugeVec> {
    let gauge = IntGaugeVec::new(Opts::new(name, help), label_names)?;
    REGISTRY.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

pub fn try_create_histogram(name: &str, help: &str) -> Result<Histogram> {
    let histogram = Histogram::with_opts(HistogramOpts::new(name, help))?;
    REGISTRY.register(Box::new(histogram.clone()))?;
    Ok(histogram)
}

pub fn inc_counter(counter: &Result<IntCounter>) {
    if let Ok(counter) = counter {
        counter.inc();
    }
}

pub fn set_gauge(gauge: &Result<IntGauge>, value: i64) {
    if let Ok(gauge) = gauge {
        gauge.set(value);
    }
}

/// Renders the registry in the Prometheus text exposition format, as served by `/metrics` on the
/// http_metrics listener.
pub fn gather_metrics() -> std::result::Result<String, prometheus::Error> {
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
