use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::{HeaderMap, HeaderName, header},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod gate;
pub mod models;
pub mod path;
pub mod routes;

// --- Public Re-exports ---

pub use auth::{Claims, CredentialVerifier, VerifyError};
pub use config::{AppConfig, ConfigError};
pub use gate::{Gate, GateState};
pub use models::{Credential, GateDecision, Role, RouteClass};
pub use routes::RouteTable;

/// AppState
///
/// The state shared by every request: the swappable gate snapshot and the
/// configuration it was built from.
#[derive(Clone)]
pub struct AppState {
    pub gate: GateState,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            gate: GateState::from_config(&config),
            config,
        }
    }
}

impl FromRef<AppState> for GateState {
    fn from_ref(app_state: &AppState) -> GateState {
        app_state.gate.clone()
    }
}

/// parse_cookie
///
/// Returns the value of cookie `name` from the request's `Cookie` headers.
pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// gate_middleware
///
/// Applies the gate to every request passing through the layer. A `Forward`
/// decision runs the inner service on the untouched request; a redirect
/// answers `307 Temporary Redirect` to the decision's target, carrying the
/// original query string along.
pub async fn gate_middleware(State(gate): State<GateState>, request: Request, next: Next) -> Response {
    let snapshot = gate.snapshot();
    let token = parse_cookie(request.headers(), &gate.cookie_name);

    match snapshot.evaluate(request.uri().path(), token.as_deref()) {
        GateDecision::Forward => next.run(request).await,
        GateDecision::RedirectTo(target) => {
            let location = match request.uri().query() {
                Some(query) => format!("{target}?{query}"),
                None => target,
            };
            Redirect::temporary(&location).into_response()
        }
    }
}

/// with_gate
///
/// Puts the gate in front of every route and the fallback of `router`.
pub fn with_gate(router: Router, gate: GateState) -> Router {
    router.layer(middleware::from_fn_with_state(gate, gate_middleware))
}

/// forwarded
///
/// Stand-in for the application behind the gate when the server runs on its
/// own: it only confirms which path made it through.
async fn forwarded(request: Request) -> impl IntoResponse {
    format!("forwarded {}", request.uri().path())
}

/// create_router
///
/// Builds the standalone gate server: `/api/health` (bypassed through the
/// `/api` prefix) plus a gated fallback, wrapped in the request-id and
/// tracing layers.
pub fn create_router(state: AppState) -> Router {
    // Header name used for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 1. Base Router
    // The health check lives under `/api`, so the gate forwards it untouched.
    // Everything else lands on the fallback once the gate lets it through.
    let base_router = Router::new()
        .route("/api/health", get(|| async { "ok" }))
        .fallback(forwarded);

    // 2. Gate Layer
    // Added after the fallback so the fallback is gated too.
    let gated = with_gate(base_router, GateState::from_ref(&state));

    // 3. Observability Layers (outermost)
    gated.layer(
        ServiceBuilder::new()
            // 3a. Generate an x-request-id for every incoming request.
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            // 3b. One span per request, tagged with the request id.
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // 3c. Echo the request id back on the response, redirects included.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with method, uri and the request id so
/// every gate log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
