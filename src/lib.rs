//! # pricepress – price-list PDF generation service
//!
//! Accepts JSON describing a price list, renders it into HTML through a
//! named Tera template, converts the HTML into a PDF, and returns the
//! bytes as a downloadable attachment. Two core components sit behind the
//! HTTP layer:
//!
//! 1. **[`templates::TemplateRenderer`]** – (template name, context) → HTML
//! 2. **[`generator::DocumentGenerator`]** – (HTML, optional CSS) → PDF bytes
//!
//! The generator's conversion step is the in-crate fixed-layout engine,
//! staged as parse ([`dom`]) → style ([`css`]) → layout ([`layout`]) →
//! paginate ([`pagination`]) → write ([`render`]), wired together in
//! [`pipeline`] behind the [`generator::LayoutEngine`] seam.

pub mod css;
pub mod dom;
pub mod error;
pub mod generator;
pub mod layout;
pub mod pages;
pub mod pagination;
pub mod pipeline;
pub mod render;
pub mod routes;
pub mod templates;
pub mod text;
