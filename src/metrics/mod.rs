//! Prometheus metrics for the incident classifier.
//!
//! Covers the classification outcomes returned to callers and the behaviour
//! of the upstream chat-completion provider.
//!
//! # Example
//! ```no_run
//! use incident_classifier::metrics::{init_metrics, gather_metrics, CLASSIFICATIONS_TOTAL};
//!
//! init_metrics().unwrap();
//! CLASSIFICATIONS_TOTAL.with_label_values(&["parsed_json"]).inc();
//! println!("{}", gather_metrics());
//! ```

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Histogram, HistogramOpts, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Classifications returned to callers
    ///
    /// Labels: outcome (parsed_json, parsed_text, unstructured, not_configured, degraded)
    pub static ref CLASSIFICATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("classifications_total", "Total number of image classifications")
            .namespace("incident_classifier"),
        &["outcome"]
    ).expect("Failed to create CLASSIFICATIONS_TOTAL metric");

    /// Classifications by final report type
    ///
    /// Labels: report_type
    pub static ref REPORT_TYPES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("report_types_total", "Classifications by report type")
            .namespace("incident_classifier"),
        &["report_type"]
    ).expect("Failed to create REPORT_TYPES_TOTAL metric");

    /// Model-supplied report types that had to be coerced to Other
    pub static ref REPORT_TYPE_COERCIONS_TOTAL: Counter = Counter::with_opts(
        Opts::new("report_type_coercions_total", "Report types coerced to Other")
            .namespace("incident_classifier")
    ).expect("Failed to create REPORT_TYPE_COERCIONS_TOTAL metric");

    /// Upstream provider attempts
    ///
    /// Labels: status (success, or the error kind)
    pub static ref PROVIDER_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("provider_requests_total", "Total number of upstream provider attempts")
            .namespace("incident_classifier"),
        &["status"]
    ).expect("Failed to create PROVIDER_REQUESTS_TOTAL metric");

    /// Upstream provider attempt duration in seconds
    pub static ref PROVIDER_REQUEST_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "provider_request_duration_seconds",
            "Upstream provider request duration in seconds"
        )
        .namespace("incident_classifier")
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0])
    ).expect("Failed to create PROVIDER_REQUEST_DURATION_SECONDS metric");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    register(Box::new(CLASSIFICATIONS_TOTAL.clone()))?;
    register(Box::new(REPORT_TYPES_TOTAL.clone()))?;
    register(Box::new(REPORT_TYPE_COERCIONS_TOTAL.clone()))?;
    register(Box::new(PROVIDER_REQUESTS_TOTAL.clone()))?;
    register(Box::new(PROVIDER_REQUEST_DURATION_SECONDS.clone()))?;
    Ok(())
}

fn register(collector: Box<dyn prometheus::core::Collector>) -> Result<(), prometheus::Error> {
    match PROMETHEUS_REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Export all registered metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
    }

    #[test]
    fn test_gather_includes_classification_metrics() {
        init_metrics().unwrap();
        CLASSIFICATIONS_TOTAL.with_label_values(&["degraded"]).inc();
        PROVIDER_REQUESTS_TOTAL.with_label_values(&["success"]).inc();

        let output = gather_metrics();
        assert!(output.contains("incident_classifier_classifications_total"));
        assert!(output.contains("incident_classifier_provider_requests_total"));
    }
}
