//! Error types for the rendering and generation pipeline, plus the mapping
//! onto HTTP responses.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Failures while turning a template name + context into HTML.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The named template is not present in the template directory. Never a
    /// silent fallback: the caller asked for a specific file.
    #[error("template '{name}' not found in '{}'", .dir.display())]
    TemplateNotFound { name: String, dir: PathBuf },

    /// Any other rendering failure: missing variable, bad filter argument,
    /// syntax error surfacing at render time.
    #[error("failed to render template '{name}': {source}")]
    Render { name: String, source: tera::Error },

    /// The context value did not serialize to a JSON object.
    #[error("template context must be a JSON object: {0}")]
    Context(#[source] tera::Error),
}

/// Failures while converting HTML into PDF bytes.
#[derive(Debug, Error)]
pub enum PdfGenerationError {
    #[error("layout computation failed: {0}")]
    Layout(#[from] taffy::TaffyError),

    #[error("PDF rendering failed: {0}")]
    Render(String),
}

/// What the HTTP layer returns when a handler fails.
#[derive(Debug)]
pub enum ApiError {
    /// Request was syntactically valid JSON but semantically unusable.
    BadRequest(String),
    /// Anything that went wrong between "request accepted" and "PDF bytes
    /// ready". The response body always carries the same prefix so clients
    /// have one string to match on.
    PdfGeneration(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::PdfGeneration(cause) => {
                tracing::error!("PDF generation failed: {cause}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to generate PDF: {cause}"),
                )
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<RenderError> for ApiError {
    fn from(e: RenderError) -> Self {
        ApiError::PdfGeneration(e.to_string())
    }
}

impl From<PdfGenerationError> for ApiError {
    fn from(e: PdfGenerationError) -> Self {
        ApiError::PdfGeneration(e.to_string())
    }
}
