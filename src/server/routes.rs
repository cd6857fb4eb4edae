//! Route table and handlers.

use super::state::AppState;
use crate::logging::{Fields, StructuredLogger};
use crate::process::MemorySnapshot;
use axum::{
    extract::State,
    handler::Handler,
    http::{header::CONTENT_TYPE, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use std::any::Any;
use std::backtrace::Backtrace;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;

/// Name reported by the root route.
pub const SERVICE_NAME: &str = "Fault Harness";

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/", get_only(root_handler))
        .route("/health", get_only(health_handler))
        .route("/metrics", get_only(metrics_handler))
        .route("/error/500", get_only(internal_error_handler))
        .route("/error/timeout", get_only(timeout_handler))
        .route("/error/memory-leak", get_only(memory_leak_handler))
        .route("/error/cpu-spike", get_only(cpu_spike_handler))
        .route("/error/disable-health", get_only(disable_health_handler))
        .route("/error/enable-health", get_only(enable_health_handler))
        .route("/error/clear-memory", get_only(clear_memory_handler));

    instrumented(routes, state)
}

/// GET route whose other methods fall through to the 404 handler instead of 405.
fn get_only<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    get(handler).fallback(not_found_handler)
}

/// Adds the 404 fallback, panic recovery and request instrumentation.
///
/// Instrumentation is outermost so recovered panics and 404s are still
/// timed and counted.
pub fn instrumented(routes: Router<AppState>, state: AppState) -> Router {
    let logger = state.logger.clone();
    let instrumentor = state.instrumentor();

    routes
        .fallback(not_found_handler)
        .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
            panic_response(&logger, panic)
        }))
        .layer(middleware::from_fn_with_state(
            instrumentor,
            crate::metrics::RequestInstrumentor::wrap,
        ))
        .with_state(state)
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RootResponse<'a> {
    service: &'static str,
    version: &'a str,
    timestamp: String,
    request_count: u64,
    environment: &'a str,
}

/// Handler for `/`.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_count = state.faults.increment_request_count();

    Json(RootResponse {
        service: SERVICE_NAME,
        version: &state.info.version,
        timestamp: timestamp(),
        request_count,
        environment: &state.info.environment,
    })
    .into_response()
}

/// Handler for `/health`.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let verdict = state.health.evaluate();
    let status = if verdict.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(verdict))
}

/// Handler for `/metrics`.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(output) => (
            StatusCode::OK,
            [(CONTENT_TYPE, state.metrics.content_type())],
            output,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(CONTENT_TYPE, "text/plain; charset=utf-8")],
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

/// Handler for `/error/500`.
async fn internal_error_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.logger.error(
        "Intentional 500 error triggered",
        Fields::new().with("stack", &Backtrace::force_capture().to_string()),
    );

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal Server Error",
            "message": "Something went wrong!",
        })),
    )
}

/// Handler for `/error/timeout`.
///
/// The delay runs in its own task so it completes even if the client goes
/// away and this handler is dropped.
async fn timeout_handler(State(state): State<AppState>) -> impl IntoResponse {
    let delay = state.fault_config.timeout_delay();
    state
        .logger
        .error("Database timeout simulation started", Fields::new());

    let logger = state.logger.clone();
    let waited = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        logger.error(
            "Database connection timeout",
            Fields::new().with(
                "error",
                &format!("Connection timeout after {}ms", delay.as_millis()),
            ),
        );
    });

    if let Err(e) = waited.await {
        tracing::warn!(error = %e, "Timeout simulation task did not complete");
    }

    (
        StatusCode::GATEWAY_TIMEOUT,
        Json(json!({
            "error": "Gateway Timeout",
            "message": "Database query timed out",
        })),
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LeakResponse {
    message: &'static str,
    array_size: usize,
    memory: MemorySnapshot,
}

/// Handler for `/error/memory-leak`.
async fn memory_leak_handler(State(state): State<AppState>) -> impl IntoResponse {
    let config = &state.fault_config;
    let array_size = state
        .faults
        .trigger_leak(config.leak_block_count, config.leak_block_size);

    Json(LeakResponse {
        message: "Memory leak triggered",
        array_size,
        memory: MemorySnapshot::capture(),
    })
}

/// Handler for `/error/cpu-spike`.
///
/// Inline by default: the busy-wait holds the worker thread and, on the
/// single-threaded runtime, stalls every other request.
async fn cpu_spike_handler(State(state): State<AppState>) -> Response {
    let duration = state.fault_config.cpu_spike();

    let outcome = if state.fault_config.isolate_cpu_spike {
        let faults = Arc::clone(&state.faults);
        match tokio::task::spawn_blocking(move || faults.burn_cpu(duration)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                state.logger.error(
                    "CPU spike worker failed",
                    Fields::new().with("error", &e.to_string()),
                );
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error" })),
                )
                    .into_response();
            }
        }
    } else {
        state.faults.burn_cpu(duration)
    };

    Json(json!({
        "message": "CPU spike completed",
        "result": outcome.result,
        "duration": outcome.elapsed_ms,
    }))
    .into_response()
}

/// Handler for `/error/disable-health`.
async fn disable_health_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.faults.disable_health();
    Json(json!({ "message": "Health check disabled" }))
}

/// Handler for `/error/enable-health`.
async fn enable_health_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.faults.enable_health();
    Json(json!({ "message": "Health check enabled" }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClearResponse {
    message: &'static str,
    cleared_items: usize,
    memory: MemorySnapshot,
}

/// Handler for `/error/clear-memory`.
async fn clear_memory_handler(State(state): State<AppState>) -> impl IntoResponse {
    let cleared_items = state.faults.clear_leak();

    Json(ClearResponse {
        message: "Memory cleared",
        cleared_items,
        memory: MemorySnapshot::capture(),
    })
}

/// Fallback for unmatched routes.
async fn not_found_handler(State(state): State<AppState>, uri: Uri) -> impl IntoResponse {
    state
        .logger
        .warn("Route not found", Fields::new().with("path", uri.path()));
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" })))
}

/// Terminal recovery for panics escaping a handler.
fn panic_response(logger: &StructuredLogger, panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_owned()
    };

    logger.error(
        &message,
        Fields::new().with("stack", &Backtrace::force_capture().to_string()),
    );

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal Server Error" })),
    )
        .into_response()
}
