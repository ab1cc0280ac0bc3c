use std::{
    collections::BTreeMap,
    fmt::Write,
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};

use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    web, Error, HttpResponse,
};
use actix_web_lab::middleware::Next;

use crate::consts::consts::{DEFAULT_METRICS_ENDPOINT, UNKNOWN_ROUTE};

/// Upper bounds (seconds) of the response time histogram buckets
const LATENCY_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

#[derive(Default)]
struct Histogram {
    /// Non cumulative, one slot per bucket
    buckets: [u64; LATENCY_BUCKETS.len()],
    sum: f64,
    count: u64,
}

impl Histogram {
    fn observe(&mut self, seconds: f64) {
        if let Some(slot) = LATENCY_BUCKETS.iter().position(|bound| seconds <= *bound) {
            self.buckets[slot] += 1;
        }
        self.sum += seconds;
        self.count += 1;
    }
}

#[derive(Default)]
struct MetricsState {
    /// (path, method)
    requests: BTreeMap<(String, String), u64>,
    /// (status, method)
    statuses: BTreeMap<(u16, String), u64>,
    /// (path, method)
    latencies: BTreeMap<(String, String), Histogram>,
}

/// Request counters and response times, rendered in the Prometheus text format
pub struct RequestMetrics {
    endpoint: String,
    state: Mutex<MetricsState>,
}

impl Default for RequestMetrics {
    fn default() -> Self {
        RequestMetrics::new(DEFAULT_METRICS_ENDPOINT)
    }
}

impl RequestMetrics {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            state: Mutex::new(MetricsState::default()),
        }
    }

    /// Path the metrics are served on, requests to it are not observed
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn state(&self) -> MutexGuard<'_, MetricsState> {
        // Counters stay usable even if a thread panicked while holding the lock
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn observe(&self, path: &str, method: &str, status: u16, elapsed: Duration) {
        let mut state = self.state();
        let key = (path.to_string(), method.to_string());

        *state.requests.entry(key.clone()).or_default() += 1;
        *state
            .statuses
            .entry((status, method.to_string()))
            .or_default() += 1;
        state
            .latencies
            .entry(key)
            .or_default()
            .observe(elapsed.as_secs_f64());
    }

    pub fn render(&self) -> String {
        let state = self.state();
        let mut out = String::new();

        let _ = writeln!(out, "# HELP http_requests_total Number of get requests.");
        let _ = writeln!(out, "# TYPE http_requests_total counter");
        for ((path, method), count) in state.requests.iter() {
            let _ = writeln!(
                out,
                "http_requests_total{{path=\"{}\",method=\"{}\"}} {}",
                path, method, count
            );
        }

        let _ = writeln!(out, "# HELP response_status Status of HTTP response");
        let _ = writeln!(out, "# TYPE response_status counter");
        for ((status, method), count) in state.statuses.iter() {
            let _ = writeln!(
                out,
                "response_status{{status=\"{}\",method=\"{}\"}} {}",
                status, method, count
            );
        }

        let _ = writeln!(out, "# HELP http_response_time_seconds Duration of HTTP requests.");
        let _ = writeln!(out, "# TYPE http_response_time_seconds histogram");
        for ((path, method), histogram) in state.latencies.iter() {
            let labels = format!("path=\"{}\",method=\"{}\"", path, method);

            let mut cumulative = 0;
            for (bound, count) in LATENCY_BUCKETS.iter().zip(histogram.buckets.iter()) {
                cumulative += count;
                let _ = writeln!(
                    out,
                    "http_response_time_seconds_bucket{{{},le=\"{}\"}} {}",
                    labels, bound, cumulative
                );
            }
            let _ = writeln!(
                out,
                "http_response_time_seconds_bucket{{{},le=\"+Inf\"}} {}",
                labels, histogram.count
            );
            let _ = writeln!(
                out,
                "http_response_time_seconds_sum{{{}}} {}",
                labels, histogram.sum
            );
            let _ = writeln!(
                out,
                "http_response_time_seconds_count{{{}}} {}",
                labels, histogram.count
            );
        }

        out
    }
}

/// Times every request and records it against its route template
pub async fn observe_requests(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let metrics = req
        .app_data::<web::Data<RequestMetrics>>()
        .filter(|metrics| req.path() != metrics.endpoint())
        .cloned();

    let metrics = match metrics {
        Some(metrics) => metrics,
        None => return next.call(req).await,
    };

    let path = req
        .match_pattern()
        .unwrap_or_else(|| UNKNOWN_ROUTE.to_string());
    let method = req.method().to_string();
    let start = Instant::now();

    let response = next.call(req).await;

    let status = match &response {
        Ok(response) => response.status(),
        Err(err) => err.as_response_error().status_code(),
    };

    metrics.observe(&path, &method, status.as_u16(), start.elapsed());

    response
}

/// Serves the rendered metrics
pub async fn render_metrics(metrics: web::Data<RequestMetrics>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics.render())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod registry {
        use super::*;

        #[test]
        fn renders_counters_per_label_set() {
            let metrics = RequestMetrics::default();

            metrics.observe("/person/{id}", "GET", 200, Duration::from_millis(3));
            metrics.observe("/person/{id}", "GET", 404, Duration::from_millis(3));
            metrics.observe("/people", "GET", 200, Duration::from_millis(3));

            let rendered = metrics.render();

            assert!(rendered.contains("http_requests_total{path=\"/person/{id}\",method=\"GET\"} 2"));
            assert!(rendered.contains("http_requests_total{path=\"/people\",method=\"GET\"} 1"));
            assert!(rendered.contains("response_status{status=\"200\",method=\"GET\"} 2"));
            assert!(rendered.contains("response_status{status=\"404\",method=\"GET\"} 1"));
        }

        #[test]
        fn histogram_buckets_are_cumulative() {
            let metrics = RequestMetrics::default();

            metrics.observe("/people", "GET", 200, Duration::from_millis(3));
            metrics.observe("/people", "GET", 200, Duration::from_millis(200));
            metrics.observe("/people", "GET", 200, Duration::from_secs(30));

            let rendered = metrics.render();
            let labels = "path=\"/people\",method=\"GET\"";

            assert!(rendered.contains(&format!("http_response_time_seconds_bucket{{{},le=\"0.005\"}} 1", labels)));
            assert!(rendered.contains(&format!("http_response_time_seconds_bucket{{{},le=\"0.25\"}} 2", labels)));
            assert!(rendered.contains(&format!("http_response_time_seconds_bucket{{{},le=\"10\"}} 2", labels)));
            assert!(rendered.contains(&format!("http_response_time_seconds_bucket{{{},le=\"+Inf\"}} 3", labels)));
            assert!(rendered.contains(&format!("http_response_time_seconds_count{{{}}} 3", labels)));
        }

        #[test]
        fn empty_registry_renders_headers_only() {
            let rendered = RequestMetrics::default().render();

            assert!(rendered.contains("# TYPE http_requests_total counter"));
            assert!(!rendered.contains("http_requests_total{"));
        }
    }

    mod middleware {
        use actix_web::{test, App};
        use actix_web_lab::middleware::from_fn;

        use super::*;

        async fn ok() -> HttpResponse {
            HttpResponse::Ok().finish()
        }

        #[actix_web::test]
        async fn observes_requests_but_not_the_metrics_endpoint() {
            // Given an app with one route and the metrics endpoint
            let metrics = web::Data::new(RequestMetrics::new("/metrics"));
            let app = test::init_service(
                App::new()
                    .app_data(metrics.clone())
                    .wrap(from_fn(observe_requests))
                    .route("/person/{id}", web::get().to(ok))
                    .route("/metrics", web::get().to(render_metrics)),
            )
            .await;

            // When a route, an unknown path and the metrics endpoint are hit
            for uri in ["/person/abc", "/nowhere", "/metrics"] {
                let req = test::TestRequest::get().uri(uri).to_request();
                test::call_service(&app, req).await;
            }

            // Then routes are labeled by template and the metrics endpoint is left out
            let rendered = metrics.render();
            assert!(rendered.contains("http_requests_total{path=\"/person/{id}\",method=\"GET\"} 1"));
            assert!(rendered.contains("http_requests_total{path=\"unknown\",method=\"GET\"} 1"));
            assert!(rendered.contains("response_status{status=\"404\",method=\"GET\"} 1"));
            assert!(!rendered.contains("path=\"/metrics\""));
        }
    }
}
