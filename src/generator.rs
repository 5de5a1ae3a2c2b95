//! Document generator – turns rendered HTML (plus optional per-call CSS)
//! into PDF bytes.
//!
//! The generator owns the print defaults: whatever the renderer produced is
//! wrapped in a complete document shell fixing A4 pages, 2 cm margins, and
//! a sans-serif base font before conversion. Per-call `custom_css` is
//! prepended inside the body so it overrides the shell defaults.

use std::sync::Arc;

use crate::error::PdfGenerationError;
use crate::pipeline::PdfPipeline;

/// The conversion seam. Implementations turn a complete HTML document into
/// PDF bytes; the default is the in-crate [`PdfPipeline`], and tests swap
/// in fakes.
pub trait LayoutEngine: Send + Sync {
    fn convert(&self, html: &str) -> Result<Vec<u8>, PdfGenerationError>;
}

/// Maps (HTML text, optional CSS text) to a PDF byte stream.
#[derive(Clone)]
pub struct DocumentGenerator {
    engine: Arc<dyn LayoutEngine>,
}

impl Default for DocumentGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentGenerator {
    /// Generator backed by the in-crate layout pipeline.
    pub fn new() -> Self {
        Self::with_engine(PdfPipeline)
    }

    /// Generator backed by an alternative conversion engine.
    pub fn with_engine(engine: impl LayoutEngine + 'static) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Convert HTML content into PDF bytes. `custom_css` is embedded as an
    /// inline style block ahead of the content when present.
    pub fn generate(
        &self,
        html: &str,
        custom_css: Option<&str>,
    ) -> Result<Vec<u8>, PdfGenerationError> {
        tracing::debug!(css = custom_css.is_some(), "starting PDF generation");
        let body = match custom_css {
            Some(css) => format!("<style>{css}</style>{html}"),
            None => html.to_string(),
        };
        let document = wrap_in_shell(&body);
        let bytes = self.engine.convert(&document)?;
        tracing::debug!(bytes = bytes.len(), "PDF generated");
        Ok(bytes)
    }
}

/// The fixed document shell: baseline print layout applied regardless of
/// what the caller supplied. Content styles come after and win the cascade.
fn wrap_in_shell(content: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"UTF-8\">\n\
         <style>\n\
         @page {{\n    size: A4;\n    margin: 2cm;\n}}\n\
         body {{\n    font-family: Helvetica, Arial, sans-serif;\n}}\n\
         </style>\n\
         </head>\n\
         <body>\n{content}\n</body>\n\
         </html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Engine that records the document it was handed.
    struct CapturingEngine {
        seen: std::sync::Mutex<Option<String>>,
    }

    impl LayoutEngine for CapturingEngine {
        fn convert(&self, html: &str) -> Result<Vec<u8>, PdfGenerationError> {
            *self.seen.lock().unwrap() = Some(html.to_string());
            Ok(b"%PDF-fake".to_vec())
        }
    }

    struct FailingEngine;

    impl LayoutEngine for FailingEngine {
        fn convert(&self, _html: &str) -> Result<Vec<u8>, PdfGenerationError> {
            Err(PdfGenerationError::Render("engine exploded".to_string()))
        }
    }

    fn capture(html: &str, css: Option<&str>) -> String {
        let engine = Arc::new(CapturingEngine {
            seen: std::sync::Mutex::new(None),
        });
        let generator = DocumentGenerator {
            engine: engine.clone(),
        };
        generator.generate(html, css).unwrap();
        let seen = engine.seen.lock().unwrap();
        seen.clone().unwrap()
    }

    #[test]
    fn shell_fixes_page_geometry_and_font() {
        let doc = capture("<p>content</p>", None);
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("size: A4"));
        assert!(doc.contains("margin: 2cm"));
        assert!(doc.contains("font-family: Helvetica, Arial, sans-serif"));
        assert!(doc.contains("<p>content</p>"));
    }

    #[test]
    fn custom_css_is_prepended_inside_the_body() {
        let doc = capture("<p>x</p>", Some("p { color: red; }"));
        let css_pos = doc.find("p { color: red; }").unwrap();
        let content_pos = doc.find("<p>x</p>").unwrap();
        let body_pos = doc.find("<body>").unwrap();
        assert!(body_pos < css_pos && css_pos < content_pos);
    }

    #[test]
    fn real_engine_produces_a_pdf() {
        let generator = DocumentGenerator::new();
        let bytes = generator.generate("<h1>Price List</h1>", None).unwrap();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn custom_css_reaches_the_real_engine() {
        let generator = DocumentGenerator::new();
        let bytes = generator
            .generate("<p>styled</p>", Some("p { font-size: 20pt; }"))
            .unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn engine_failure_propagates() {
        let generator = DocumentGenerator::with_engine(FailingEngine);
        let err = generator.generate("<p>x</p>", None).unwrap_err();
        assert!(err.to_string().contains("engine exploded"));
    }
}
