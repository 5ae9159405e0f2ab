//! Request metrics — per-endpoint request counters and response-time
//! histograms, recorded by an axum middleware and exposed as JSON.
//!
//! Purely in-process; nothing here affects request handling.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;
use tokio::sync::Mutex;

/// Upper bounds (seconds) of the latency histogram buckets.
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

const UNMATCHED: &str = "<unmatched>";

#[derive(Debug, Default)]
struct Histogram {
    /// Cumulative counts, one per entry in [`LATENCY_BUCKETS`].
    buckets: Vec<u64>,
    count: u64,
    sum: f64,
}

impl Histogram {
    fn observe(&mut self, seconds: f64) {
        if self.buckets.is_empty() {
            self.buckets = vec![0; LATENCY_BUCKETS.len()];
        }
        for (bound, slot) in LATENCY_BUCKETS.iter().zip(self.buckets.iter_mut()) {
            if seconds <= *bound {
                *slot += 1;
            }
        }
        self.count += 1;
        self.sum += seconds;
    }
}

#[derive(Debug, Default)]
struct Registry {
    /// (method, endpoint, status) → count
    requests: BTreeMap<(String, String, u16), u64>,
    /// (method, endpoint) → latency
    latency: BTreeMap<(String, String), Histogram>,
}

/// Shared metrics sink. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<Mutex<Registry>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, method: &str, endpoint: &str, status: u16, seconds: f64) {
        let mut reg = self.inner.lock().await;
        *reg
            .requests
            .entry((method.to_string(), endpoint.to_string(), status))
            .or_insert(0) += 1;
        reg.latency
            .entry((method.to_string(), endpoint.to_string()))
            .or_default()
            .observe(seconds);
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        let reg = self.inner.lock().await;
        MetricsSnapshot {
            requests: reg
                .requests
                .iter()
                .map(|((method, endpoint, status), count)| RequestCount {
                    method: method.clone(),
                    endpoint: endpoint.clone(),
                    status: *status,
                    count: *count,
                })
                .collect(),
            latency: reg
                .latency
                .iter()
                .map(|((method, endpoint), h)| LatencySummary {
                    method: method.clone(),
                    endpoint: endpoint.clone(),
                    count: h.count,
                    sum_seconds: h.sum,
                    buckets: LATENCY_BUCKETS
                        .iter()
                        .zip(&h.buckets)
                        .map(|(le, count)| Bucket { le: *le, count: *count })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub requests: Vec<RequestCount>,
    pub latency: Vec<LatencySummary>,
}

#[derive(Debug, Serialize)]
pub struct RequestCount {
    pub method: String,
    pub endpoint: String,
    pub status: u16,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct LatencySummary {
    pub method: String,
    pub endpoint: String,
    pub count: u64,
    pub sum_seconds: f64,
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Serialize)]
pub struct Bucket {
    pub le: f64,
    pub count: u64,
}

/// Axum middleware: time the request and record it under its route pattern.
pub async fn track(State(metrics): State<Metrics>, req: Request, next: Next) -> Response {
    let method = req.method().as_str().to_string();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED.to_string());

    let started = Instant::now();
    let response = next.run(req).await;
    let elapsed = started.elapsed().as_secs_f64();

    metrics
        .record(&method, &endpoint, response.status().as_u16(), elapsed)
        .await;
    response
}
