//! Observability hooks for the classifier.
//!
//! The service reports what happens through a [`ClassificationObserver`]
//! instead of logging directly, so tests can capture events and deployments
//! can swap the sink.

use crate::classification::error::ClassificationError;
use crate::classification::models::ClassificationResult;
use crate::classification::parser::ReplySource;
use crate::metrics::{
    CLASSIFICATIONS_TOTAL, PROVIDER_REQUESTS_TOTAL, PROVIDER_REQUEST_DURATION_SECONDS,
    REPORT_TYPES_TOTAL, REPORT_TYPE_COERCIONS_TOTAL,
};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-request identity carried through every observer call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: Uuid,
    /// Length of the submitted image string
    pub input_len: usize,
    /// Short digest of the extracted payload, once known
    pub fingerprint: Option<String>,
}

impl RequestContext {
    pub fn new(input_len: usize) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            input_len,
            fingerprint: None,
        }
    }
}

/// Receives classification lifecycle events
pub trait ClassificationObserver: Send + Sync + 'static {
    /// No credential; the call was skipped
    fn on_not_configured(&self, ctx: &RequestContext);

    /// Payload failed the plausibility check but was forwarded anyway
    fn on_input_tolerated(&self, ctx: &RequestContext, error: &ClassificationError);

    /// One provider attempt finished
    fn on_provider_attempt(
        &self,
        ctx: &RequestContext,
        attempt: u32,
        elapsed: Duration,
        outcome: Result<(), &ClassificationError>,
    );

    /// A failed attempt will be retried after `delay`
    fn on_retry(&self, ctx: &RequestContext, attempt: u32, delay: Duration, error: &ClassificationError);

    /// Reply carried nothing recognisable; generic fields were used
    fn on_parse_failure(&self, ctx: &RequestContext, error: &ClassificationError);

    /// A record was produced from the model reply
    fn on_classified(&self, ctx: &RequestContext, result: &ClassificationResult, source: ReplySource);

    /// The request degraded to the fallback record
    fn on_degraded(&self, ctx: &RequestContext, error: &ClassificationError);
}

/// Default observer: structured `tracing` events plus Prometheus metrics
#[derive(Debug, Clone, Default)]
pub struct TracingObserver;

impl ClassificationObserver for TracingObserver {
    fn on_not_configured(&self, ctx: &RequestContext) {
        warn!(
            request_id = %ctx.request_id,
            "Provider API key not configured, returning fallback response"
        );
        CLASSIFICATIONS_TOTAL.with_label_values(&["not_configured"]).inc();
    }

    fn on_input_tolerated(&self, ctx: &RequestContext, error: &ClassificationError) {
        warn!(
            request_id = %ctx.request_id,
            fingerprint = ctx.fingerprint.as_deref().unwrap_or("-"),
            error = %error,
            "Forwarding implausible image payload"
        );
    }

    fn on_provider_attempt(
        &self,
        ctx: &RequestContext,
        attempt: u32,
        elapsed: Duration,
        outcome: Result<(), &ClassificationError>,
    ) {
        PROVIDER_REQUEST_DURATION_SECONDS.observe(elapsed.as_secs_f64());
        match outcome {
            Ok(()) => {
                PROVIDER_REQUESTS_TOTAL.with_label_values(&["success"]).inc();
                debug!(
                    request_id = %ctx.request_id,
                    attempt,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Provider request succeeded"
                );
            }
            Err(error) => {
                PROVIDER_REQUESTS_TOTAL.with_label_values(&[error.kind()]).inc();
                warn!(
                    request_id = %ctx.request_id,
                    attempt,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %error,
                    "Provider request failed"
                );
            }
        }
    }

    fn on_retry(&self, ctx: &RequestContext, attempt: u32, delay: Duration, error: &ClassificationError) {
        info!(
            request_id = %ctx.request_id,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            error_kind = error.kind(),
            "Retrying provider request"
        );
    }

    fn on_parse_failure(&self, ctx: &RequestContext, error: &ClassificationError) {
        warn!(
            request_id = %ctx.request_id,
            error = %error,
            "Model reply had no recognisable fields"
        );
    }

    fn on_classified(&self, ctx: &RequestContext, result: &ClassificationResult, source: ReplySource) {
        CLASSIFICATIONS_TOTAL.with_label_values(&[source.as_str()]).inc();
        REPORT_TYPES_TOTAL
            .with_label_values(&[&result.report_type.to_string()])
            .inc();
        if result.warning.is_some() {
            REPORT_TYPE_COERCIONS_TOTAL.inc();
        }
        info!(
            request_id = %ctx.request_id,
            fingerprint = ctx.fingerprint.as_deref().unwrap_or("-"),
            source = source.as_str(),
            report_type = %result.report_type,
            coerced = result.warning.is_some(),
            "Image classified"
        );
    }

    fn on_degraded(&self, ctx: &RequestContext, error: &ClassificationError) {
        CLASSIFICATIONS_TOTAL.with_label_values(&["degraded"]).inc();
        warn!(
            request_id = %ctx.request_id,
            fingerprint = ctx.fingerprint.as_deref().unwrap_or("-"),
            error_kind = error.kind(),
            error = %error,
            "Image analysis failed, returning fallback response"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::models::ReportType;
    use crate::metrics::{gather_metrics, init_metrics};

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestContext::new(10);
        let b = RequestContext::new(10);
        assert_ne!(a.request_id, b.request_id);
        assert!(a.fingerprint.is_none());
    }

    #[test]
    fn test_tracing_observer_records_metrics() {
        init_metrics().unwrap();
        let observer = TracingObserver;
        let ctx = RequestContext::new(200);

        let result = ClassificationResult {
            title: "Flood".to_string(),
            report_type: ReportType::NaturalDisaster,
            description: "Water".to_string(),
            warning: None,
            error: None,
        };
        observer.on_classified(&ctx, &result, ReplySource::Json);
        observer.on_degraded(&ctx, &ClassificationError::UpstreamTimeout(20));

        let output = gather_metrics();
        assert!(output.contains("outcome=\"parsed_json\""));
        assert!(output.contains("outcome=\"degraded\""));
        assert!(output.contains("report_type=\"Natural Disaster\""));
    }
}
