//! Prometheus collectors owned by the app state, rendered on `/metrics`.
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use umbrella_core::StageTrace;

pub struct ApiMetrics {
    registry: Registry,
    requests: IntCounterVec,
    stage_latency: HistogramVec,
}

impl ApiMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("umbrella_requests_total", "Requests handled, by endpoint and outcome"),
            &["endpoint", "outcome"],
        )?;
        let stage_latency = HistogramVec::new(
            HistogramOpts::new(
                "umbrella_stage_latency_seconds",
                "Inference latency per pipeline stage",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0]),
            &["stage"],
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(stage_latency.clone()))?;

        Ok(Self {
            registry,
            requests,
            stage_latency,
        })
    }

    pub fn record_request(&self, endpoint: &str, outcome: &str) {
        self.requests.with_label_values(&[endpoint, outcome]).inc();
    }

    pub fn observe_stages(&self, traces: &[StageTrace]) {
        for trace in traces {
            self.stage_latency
                .with_label_values(&[trace.id.as_str()])
                .observe(trace.latency_ms as f64 / 1000.0);
        }
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        encode(&self.registry)
    }
}

pub fn encode(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}
