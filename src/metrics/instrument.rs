//! Per-request instrumentation middleware.

use super::MetricsRegistry;
use crate::logging::{Fields, StructuredLogger};
use axum::extract::{ConnectInfo, MatchedPath, Request, State};
use axum::http::header::USER_AGENT;
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Route label for requests that matched no registered route.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Status recorded when the request future is dropped before a response exists.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Times every request and records it once in metrics and the access log.
#[derive(Debug, Clone)]
pub struct RequestInstrumentor {
    metrics: Arc<MetricsRegistry>,
    logger: StructuredLogger,
}

impl RequestInstrumentor {
    /// Creates an instrumentor feeding the given sinks.
    pub fn new(metrics: Arc<MetricsRegistry>, logger: StructuredLogger) -> Self {
        Self { metrics, logger }
    }

    /// Wraps the downstream chain. Use with `axum::middleware::from_fn_with_state`.
    pub async fn wrap(
        State(instrumentor): State<RequestInstrumentor>,
        request: Request,
        next: Next,
    ) -> Response {
        let mut in_flight = InFlight::start(instrumentor, &request);
        let response = next.run(request).await;
        in_flight.finish(response.status().as_u16());
        response
    }
}

/// Guard that records a request exactly once, on completion or on drop.
struct InFlight {
    instrumentor: RequestInstrumentor,
    started: Instant,
    method: String,
    route: String,
    path: String,
    ip: Option<String>,
    user_agent: Option<String>,
    recorded: bool,
}

impl InFlight {
    fn start(instrumentor: RequestInstrumentor, request: &Request) -> Self {
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_owned())
            .unwrap_or_else(|| UNMATCHED_ROUTE.to_owned());
        let ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        let user_agent = request
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        Self {
            instrumentor,
            started: Instant::now(),
            method: request.method().as_str().to_owned(),
            route,
            path: request.uri().path().to_owned(),
            ip,
            user_agent,
            recorded: false,
        }
    }

    fn finish(&mut self, status_code: u16) {
        if self.recorded {
            return;
        }
        self.recorded = true;

        let elapsed = self.started.elapsed().as_secs_f64();
        self.instrumentor
            .metrics
            .record_request(&self.method, &self.route, status_code, elapsed);

        let fields = Fields::new()
            .with("method", &self.method)
            .with("path", &self.path)
            .with("route", &self.route)
            .with("statusCode", &status_code)
            .with("durationMs", &(elapsed * 1_000.0))
            .with("ip", &self.ip)
            .with("userAgent", &self.user_agent);

        if status_code == CLIENT_CLOSED_REQUEST {
            self.instrumentor
                .logger
                .warn("Request aborted before completion", fields);
        } else {
            self.instrumentor.logger.info("Request completed", fields);
        }

        tracing::debug!(
            method = %self.method,
            route = %self.route,
            status = status_code,
            elapsed_s = elapsed,
            "Request recorded"
        );
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.finish(CLIENT_CLOSED_REQUEST);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::middleware;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn setup() -> (RequestInstrumentor, Arc<MetricsRegistry>, MemorySink) {
        let sink = MemorySink::default();
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let instrumentor =
            RequestInstrumentor::new(Arc::clone(&metrics), StructuredLogger::with_writer(sink.clone()));
        (instrumentor, metrics, sink)
    }

    fn router(instrumentor: RequestInstrumentor) -> Router {
        Router::new()
            .route("/items/:id", get(|| async { "ok" }))
            .route("/teapot", get(|| async { StatusCode::IM_A_TEAPOT }))
            .layer(middleware::from_fn_with_state(instrumentor, RequestInstrumentor::wrap))
    }

    #[tokio::test]
    async fn test_records_route_pattern_not_path() {
        let (instrumentor, metrics, sink) = setup();
        let request = HttpRequest::builder()
            .uri("/items/42")
            .header(USER_AGENT, "curl/8.4.0")
            .body(Body::empty())
            .unwrap();

        let response = router(instrumentor).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(metrics.request_count("GET", "/items/:id", 200), 1);
        assert_eq!(metrics.observation_count("GET", "/items/:id", 200), 1);

        let access = sink.find("Request completed");
        assert_eq!(access.len(), 1);
        assert_eq!(access[0]["path"], "/items/42");
        assert_eq!(access[0]["route"], "/items/:id");
        assert_eq!(access[0]["statusCode"], 200);
        assert_eq!(access[0]["userAgent"], "curl/8.4.0");
    }

    #[tokio::test]
    async fn test_records_final_status() {
        let (instrumentor, metrics, _) = setup();
        let request = HttpRequest::builder().uri("/teapot").body(Body::empty()).unwrap();

        router(instrumentor).oneshot(request).await.unwrap();
        assert_eq!(metrics.request_count("GET", "/teapot", 418), 1);
    }

    #[test]
    fn test_drop_records_once_as_aborted() {
        let (instrumentor, metrics, sink) = setup();
        let request = HttpRequest::builder().uri("/slow").body(Body::empty()).unwrap();

        let in_flight = InFlight::start(instrumentor, &request);
        drop(in_flight);

        assert_eq!(metrics.request_count("GET", UNMATCHED_ROUTE, CLIENT_CLOSED_REQUEST), 1);
        assert_eq!(sink.find("Request aborted before completion").len(), 1);
        assert!(sink.find("Request completed").is_empty());
    }

    #[test]
    fn test_finish_then_drop_records_once() {
        let (instrumentor, metrics, sink) = setup();
        let request = HttpRequest::builder().uri("/x").body(Body::empty()).unwrap();

        let mut in_flight = InFlight::start(instrumentor, &request);
        in_flight.finish(200);
        drop(in_flight);

        assert_eq!(metrics.request_count("GET", UNMATCHED_ROUTE, 200), 1);
        assert_eq!(metrics.request_count("GET", UNMATCHED_ROUTE, CLIENT_CLOSED_REQUEST), 0);
        assert_eq!(sink.records().len(), 1);
    }
}
