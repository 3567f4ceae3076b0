pub mod handlers;
pub mod state;
pub mod url_validation;

use crate::config::Config;
use crate::metrics;
use axum::{
    Router,
    extract::{Request, State},
    http::{Method, StatusCode, header},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use state::AppState;
use std::sync::atomic::Ordering;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info};

/// Cache directives attached to every proxy-shaped response.
pub const NO_STORE: &str = "no-store, no-cache, must-revalidate, max-age=0";

/// Open CORS for player clients: any origin, Range-capable, with the
/// content-size headers exposed so players can drive byte-range requests.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([header::RANGE, header::ACCEPT, header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_RANGE])
}

/// Build the full router with middleware and shared state.
pub fn build_router(config: Config) -> Router {
    let state = AppState::new(config);

    Router::new()
        .route("/", get(handlers::health::health_check))
        .route("/health", get(handlers::health::health_check))
        .route("/{channel}/{file}", get(handlers::stream::serve))
        .fallback(usage)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            track_requests,
        ))
        .layer(cors_layer())
        .with_state(state)
}

/// Start the Axum HTTP server
pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);

    // Prometheus recorder is process-global, so it is installed here and
    // not in build_router (tests build routers freely).
    let prometheus = PrometheusBuilder::new().install_recorder()?;
    metrics::describe();

    let app = build_router(config).route(
        "/metrics",
        get(move || {
            let prometheus = prometheus.clone();
            async move { prometheus.render() }
        }),
    );

    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("🚀 Server listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}

/// Anything that does not match a route gets the one-line usage hint.
async fn usage() -> (StatusCode, &'static str) {
    (StatusCode::BAD_REQUEST, "Usage: /@handle/stream.m3u8")
}

/// Maintain the in-flight request count around each request.
///
/// The count is logged and exported; it never gates admission.
async fn track_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let active = state.active_requests.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_inflight(active);
    debug!("Active requests: {}", active);

    let response = next.run(request).await;

    let active = state.active_requests.fetch_sub(1, Ordering::SeqCst) - 1;
    metrics::set_inflight(active);
    response
}
