//! Page model – the intermediate representation between pagination and PDF
//! writing. Everything is resolved here: page-absolute positions in points,
//! pre-wrapped lines with alignment offsets baked in, colours as plain RGB
//! arrays.

use crate::text::FontFamily;

/// A fully paginated document ready for the writer.
#[derive(Debug, Clone)]
pub struct PageSet {
    /// Title embedded in the PDF metadata.
    pub title: String,
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    pub pages: Vec<Page>,
}

impl PageSet {
    pub fn new(title: impl Into<String>, width_pt: f32, height_pt: f32) -> Self {
        Self {
            title: title.into(),
            page_width_pt: width_pt,
            page_height_pt: height_pt,
            pages: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// One page of placed frames.
#[derive(Debug, Clone)]
pub struct Page {
    pub number: usize,
    pub frames: Vec<Frame>,
}

/// A positioned rectangle with optional paint and content. Coordinates are
/// relative to the page top-left, in points.
#[derive(Debug, Clone)]
pub struct Frame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub fill: Option<[f32; 3]>,
    pub stroke: Option<Stroke>,
    pub text: Option<TextBlock>,
    pub image: Option<ImageRef>,
    pub children: Vec<Frame>,
}

impl Frame {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            fill: None,
            stroke: None,
            text: None,
            image: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Stroke {
    pub width: f32,
    pub color: [f32; 3],
}

/// Wrapped text ready to be written line by line.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<Line>,
    pub font_family: FontFamily,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: [f32; 3],
    /// Vertical advance per line, in points.
    pub line_height_pt: f32,
    /// List bullet/number prefix drawn left of the frame (e.g. "1.").
    pub marker: Option<String>,
}

/// One laid-out line. `x_offset` carries the text alignment.
#[derive(Debug, Clone)]
pub struct Line {
    pub text: String,
    pub x_offset: f32,
    pub y_offset: f32,
}

/// An image placement; `src` is the data URI from the markup.
#[derive(Debug, Clone)]
pub struct ImageRef {
    pub src: String,
    pub width: f32,
    pub height: f32,
}
