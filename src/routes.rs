//! HTTP surface – request schema, handlers, and router assembly.
//!
//! `POST /generate-pdf` runs the two-stage pipeline (render, then
//! generate) and returns the PDF as a download. `GET /` and `GET /health`
//! are liveness probes. CORS is wide open: any origin, method, header.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::error::ApiError;
use crate::generator::DocumentGenerator;
use crate::templates::TemplateRenderer;

/// The template every price-list request renders against.
pub const PRICE_LIST_TEMPLATE: &str = "price_list.html";

/// Shared per-process state: renderer and generator are built once at
/// startup and never mutated, so handlers borrow them concurrently.
#[derive(Clone)]
pub struct AppState {
    pub renderer: Arc<TemplateRenderer>,
    pub generator: Arc<DocumentGenerator>,
}

/// The request body for `POST /generate-pdf`. `title` and `date` are
/// required; everything else passes through to the template context
/// untouched.
#[derive(Debug, Serialize, Deserialize)]
pub struct PdfRequest {
    pub title: String,
    pub date: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Assemble the service router with CORS and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/generate-pdf", post(generate_pdf))
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn generate_pdf(
    State(state): State<AppState>,
    Json(request): Json<PdfRequest>,
) -> Result<Response, ApiError> {
    if request.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }
    tracing::info!(title = %request.title, "generating PDF");

    let html = state.renderer.render(PRICE_LIST_TEMPLATE, &request)?;
    let pdf_bytes = state.generator.generate(&html, None)?;

    let filename = attachment_filename(&request.title, &request.date);
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={filename}"),
        )
        .body(pdf_bytes.into())
        .map_err(|e| ApiError::BadRequest(format!("invalid response headers: {e}")))?;
    Ok(response)
}

/// Download filename: lowercased title with spaces as underscores, then the
/// date verbatim, then `.pdf`.
pub fn attachment_filename(title: &str, date: &str) -> String {
    format!("{}_{}.pdf", title.replace(' ', "_").to_lowercase(), date)
}
