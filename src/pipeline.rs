//! Pipeline – the in-crate fixed-layout conversion engine: parse, style,
//! lay out, paginate, write. This is the default [`LayoutEngine`] behind
//! [`crate::generator::DocumentGenerator`].

use crate::css::Stylesheet;
use crate::dom::parse_document;
use crate::error::PdfGenerationError;
use crate::generator::LayoutEngine;
use crate::layout::compute_layout;
use crate::pagination::paginate;
use crate::render::write_pdf;

/// Stateless HTML-to-PDF conversion through the staged pipeline. Safe to
/// share across concurrent requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfPipeline;

impl LayoutEngine for PdfPipeline {
    fn convert(&self, html: &str) -> Result<Vec<u8>, PdfGenerationError> {
        convert_html(html)
    }
}

/// Full conversion: HTML string in, PDF bytes out.
pub fn convert_html(html: &str) -> Result<Vec<u8>, PdfGenerationError> {
    let doc = parse_document(html);
    let sheet = Stylesheet::parse_all(&doc.stylesheets);
    let page = sheet.page_setup();
    tracing::debug!(
        stylesheets = doc.stylesheets.len(),
        body_nodes = doc.body.len(),
        "parsed document"
    );

    let styled = crate::css::build_styled_tree(&doc.body, None, &sheet);
    let boxes = compute_layout(&styled, &page)?;

    let title = doc.title.as_deref().unwrap_or("Document");
    let set = paginate(&boxes, &page, title);
    tracing::debug!(pages = set.page_count(), "paginated document");

    write_pdf(&set)
}
