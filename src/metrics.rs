use axum::{body::Body, http::Request, response::Response};
use lazy_static::lazy_static;
use prometheus::{self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use tracing::Span;

use crate::error::InsightsError;

lazy_static! {
    // Registry for holding metric state
    pub static ref REGISTRY: Registry = Registry::new();
    // Simple request counter
    pub static ref INCOMING_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("incoming_requests", "The number of HTTP requests received"),
        &["http_method"]
    ).unwrap();
    // Request counter by status code
    pub static ref RESPONSE_CODE_COLLECTOR: IntCounterVec = IntCounterVec::new(
        Opts::new("outgoing_response", "The number of responses sent."),
        &["status_code"]
    ).unwrap();
    // Request histogram by response time
    pub static ref RESPONSE_TIME_COLLECTOR: HistogramVec = HistogramVec::new(
        HistogramOpts{
            common_opts: Opts::new("response_time", "The time taken to respond to each request"),
            buckets: prometheus::DEFAULT_BUCKETS.to_vec(),
        },
        &[],
    ).unwrap();
    // Repository fetches issued by analysis
    pub static ref FETCHES_ISSUED: IntCounterVec = IntCounterVec::new(
        Opts::new("fetches_issued", "The number of repository fetches issued"),
        &["analysis"]
    ).unwrap();
    // Fetch outcomes by analysis and outcome (applied, stale or failed)
    pub static ref FETCH_OUTCOMES: IntCounterVec = IntCounterVec::new(
        Opts::new("fetch_outcomes", "The number of fetch outcomes applied to a dashboard"),
        &["analysis", "outcome"]
    ).unwrap();
}

pub fn register_metrics() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(INCOMING_REQUESTS.clone()))?;
    REGISTRY.register(Box::new(RESPONSE_CODE_COLLECTOR.clone()))?;
    REGISTRY.register(Box::new(RESPONSE_TIME_COLLECTOR.clone()))?;
    REGISTRY.register(Box::new(FETCHES_ISSUED.clone()))?;
    REGISTRY.register(Box::new(FETCH_OUTCOMES.clone()))?;
    Ok(())
}

/// Prometheus text exposition of the registry
pub async fn metrics_handler() -> Result<String, InsightsError> {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|error| InsightsError::ServerConfig {
            reason: format!("failed to encode metrics: {error}"),
        })?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Increments the prometheus counter on all incoming requests, labelled by http method
pub fn request_counter(request: &Request<Body>, _span: &Span) {
    INCOMING_REQUESTS
        .with_label_values(&[&request.method().to_string().to_ascii_uppercase()])
        .inc();
}

/// Increment the prometheus counter on all outgoing responses, labelled by status code
pub fn record_response_metrics<B>(
    response: &Response<B>,
    latency: std::time::Duration,
    _span: &Span,
) {
    RESPONSE_CODE_COLLECTOR
        .with_label_values(&[response.status().as_str()])
        .inc();

    RESPONSE_TIME_COLLECTOR
        .with_label_values(&[])
        .observe(latency.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_counters() {
        let before = FETCH_OUTCOMES
            .with_label_values(&["traffic", "stale"])
            .get();
        FETCH_OUTCOMES
            .with_label_values(&["traffic", "stale"])
            .inc();
        assert_eq!(
            before + 1,
            FETCH_OUTCOMES
                .with_label_values(&["traffic", "stale"])
                .get()
        );
    }

    #[tokio::test]
    async fn test_metrics_handler() {
        // Registration fails if another test already registered.
        let _ = register_metrics();
        FETCHES_ISSUED.with_label_values(&["variations"]).inc();
        let text = metrics_handler().await.unwrap();
        assert!(text.contains("fetches_issued{analysis=\"variations\"}"));
    }
}
