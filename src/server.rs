//! Axum router for the PDF service.
//!
//! Handlers are thin: they pull [`AppState`] out of the router, call
//! [`generate_pdf`], and turn the result into a response. Static files
//! under the configured directory are served as the fallback so URL
//! sources can point back at this server.
//!
//! # Routes
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | `GET` | `/generate-pdf` | built-in sample document as PDF |
//! | `POST` | `/generate-pdf` | PDF of the JSON [`PdfRequest`] |
//! | `GET` | `/health` | [`HealthResponse`] |
//! | `GET` | `/ready` | [`ReadinessResponse`], `503` when not live |
//! | `GET` | `/stats` | [`EngineStats`](crate::EngineStats) |

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::document::sample_document_now;
use crate::handle::EngineHandle;
use crate::service::{
    GenerationSettings, HealthResponse, PdfRequest, PdfResponse, PdfServiceError,
    ReadinessResponse, generate_pdf,
};

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub handle: Arc<EngineHandle>,
    pub settings: Arc<GenerationSettings>,
}

impl AppState {
    pub fn new(handle: Arc<EngineHandle>, settings: GenerationSettings) -> Self {
        Self {
            handle,
            settings: Arc::new(settings),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let mut app = Router::new()
        .route("/generate-pdf", get(sample_pdf).post(requested_pdf))
        .route("/health", get(health))
        .route("/ready", get(readiness))
        .route("/stats", get(stats))
        .with_state(state);

    if let Some(dir) = static_dir {
        log::info!("Serving static files from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(CorsLayer::permissive())
}

async fn sample_pdf(State(state): State<AppState>) -> Response {
    let request = PdfRequest::from_html(sample_document_now());
    respond(generate_pdf(&state.handle, &state.settings, &request).await)
}

async fn requested_pdf(
    State(state): State<AppState>,
    Json(request): Json<PdfRequest>,
) -> Response {
    respond(generate_pdf(&state.handle, &state.settings, &request).await)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

async fn readiness(State(state): State<AppState>) -> Response {
    let body = if state.handle.is_shutting_down() {
        ReadinessResponse::not_ready()
    } else {
        match state.handle.live_engine().await {
            Some(engine) => ReadinessResponse::ready(engine.generation()),
            None => ReadinessResponse::not_ready(),
        }
    };

    let status = if body.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}

async fn stats(State(state): State<AppState>) -> Response {
    Json(state.handle.stats()).into_response()
}

fn respond(result: Result<PdfResponse, PdfServiceError>) -> Response {
    match result {
        Ok(pdf) => {
            let disposition = pdf.content_disposition();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                pdf.document.into_bytes(),
            )
                .into_response()
        }
        Err(e) => {
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, e.client_message()).into_response()
        }
    }
}
