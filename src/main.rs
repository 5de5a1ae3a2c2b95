//! pricepress – price-list PDF generation service.
//!
//! Configuration comes from the environment:
//! - `PRICEPRESS_ADDR` – bind address (default `0.0.0.0:8000`)
//! - `PRICEPRESS_TEMPLATE_DIR` – template directory (default `templates`)
//! - `RUST_LOG` – tracing filter

use std::env;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use pricepress::generator::DocumentGenerator;
use pricepress::routes::{self, AppState};
use pricepress::templates::TemplateRenderer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pricepress=info,tower_http=warn")),
        )
        .init();

    let addr = env::var("PRICEPRESS_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let template_dir =
        env::var("PRICEPRESS_TEMPLATE_DIR").unwrap_or_else(|_| "templates".to_string());

    let state = AppState {
        renderer: Arc::new(TemplateRenderer::new(template_dir)),
        generator: Arc::new(DocumentGenerator::new()),
    };
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
