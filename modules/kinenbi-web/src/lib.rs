use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::Local;
use serde_json::json;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};

use kinenbi_common::RunState;
use kinenbi_pipeline::{Orchestrator, RunError};

pub mod templates;

// --- App State ---

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

// --- Router ---

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/api/run", get(api_run_status).post(api_run_trigger))
        .with_state(state)
        // Run state changes underneath every page; never cache it.
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

// --- Handlers ---

async fn index_page(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Html(templates::render_index(&state.orchestrator.snapshot()))
}

async fn api_run_status(State(state): State<Arc<AppState>>) -> Json<RunState> {
    Json(state.orchestrator.snapshot())
}

async fn api_run_trigger(State(state): State<Arc<AppState>>) -> Response {
    let today = Local::now().date_naive();

    match state.orchestrator.clone().spawn(today) {
        Ok(_) => {
            info!(%today, "Run triggered");
            (StatusCode::ACCEPTED, Json(state.orchestrator.snapshot())).into_response()
        }
        Err(RunError::AlreadyRunning) => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": RunError::AlreadyRunning.to_string(),
                "state": state.orchestrator.snapshot(),
            })),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to start run");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
