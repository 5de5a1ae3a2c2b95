//! PDF writer – serialises a paginated [`PageSet`] into PDF bytes with
//! `printpdf` (v0.8 ops-based API).
//!
//! Text uses the fourteen built-in fonts, so line content is converted to
//! WinAnsi bytes before writing. Images must be base64 data URIs; anything
//! else is skipped with a warning rather than failing the document.

use std::collections::{HashMap, HashSet};

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use printpdf::*;

use crate::error::PdfGenerationError;
use crate::pages::{Frame, PageSet};
use crate::text::FontFamily;

/// A registered XObject together with the pixel dimensions of its source.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Write a page set into PDF bytes. The output always starts with `%PDF-`
/// and contains one PDF page per [`crate::pages::Page`].
pub fn write_pdf(set: &PageSet) -> Result<Vec<u8>, PdfGenerationError> {
    let page_w = Mm(set.page_width_pt * 0.352778); // pt → mm
    let page_h = Mm(set.page_height_pt * 0.352778);

    let mut doc = PdfDocument::new(&set.title);
    let images = register_images(&mut doc, set);

    let mut pages = Vec::new();
    for page in &set.pages {
        let mut ops = Vec::new();
        for frame in &page.frames {
            write_frame(&mut ops, frame, set.page_height_pt, &images);
        }
        pages.push(PdfPage::new(page_w, page_h, ops));
    }
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    doc.with_pages(pages);
    // secure: false keeps the raw `Tj` ops that carry WinAnsi text bytes.
    let opts = PdfSaveOptions {
        secure: false,
        ..Default::default()
    };
    let bytes = doc.save(&opts, &mut Vec::new());
    if bytes.is_empty() {
        return Err(PdfGenerationError::Render(
            "PDF serialisation produced no bytes".to_string(),
        ));
    }
    Ok(bytes)
}

/// Decode and register every distinct image source once; frames sharing a
/// source reuse the XObject.
fn register_images(doc: &mut PdfDocument, set: &PageSet) -> HashMap<String, ImageResource> {
    let mut srcs: HashSet<&str> = HashSet::new();
    for page in &set.pages {
        for frame in &page.frames {
            collect_image_srcs(frame, &mut srcs);
        }
    }

    let mut resources = HashMap::new();
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    for src in srcs {
        let bytes = match parse_data_uri(src) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("skipping image: {e}");
                continue;
            }
        };
        let dyn_img = match ::image::load_from_memory(&bytes) {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!("skipping image: decode error: {e}");
                continue;
            }
        };
        let raw = match RawImage::decode_from_bytes(&bytes, &mut warnings) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("skipping image: PDF encode error: {e}");
                continue;
            }
        };
        resources.insert(
            src.to_string(),
            ImageResource {
                xobj_id: doc.add_image(&raw),
                px_width: dyn_img.width(),
                px_height: dyn_img.height(),
            },
        );
    }
    resources
}

fn collect_image_srcs<'a>(frame: &'a Frame, srcs: &mut HashSet<&'a str>) {
    if let Some(img) = &frame.image {
        srcs.insert(img.src.as_str());
    }
    for child in &frame.children {
        collect_image_srcs(child, srcs);
    }
}

/// Parse a `data:<mime>;base64,<data>` URI into raw bytes.
fn parse_data_uri(src: &str) -> Result<Vec<u8>, String> {
    if !src.starts_with("data:") {
        let preview: String = src.chars().take(60).collect();
        return Err(format!("image src must be a base64 data URI, got {preview:?}"));
    }
    let rest = &src["data:".len()..];
    let comma = rest
        .find(',')
        .ok_or_else(|| "invalid data URI: missing ',' separator".to_string())?;
    if !rest[..comma].contains(";base64") {
        return Err("only base64-encoded data URIs are supported".to_string());
    }
    BASE64_STD
        .decode(rest[comma + 1..].trim())
        .map_err(|e| format!("base64 decode error: {e}"))
}

fn builtin_font(family: FontFamily, bold: bool, italic: bool) -> BuiltinFont {
    match (family, bold, italic) {
        (FontFamily::Sans, false, false) => BuiltinFont::Helvetica,
        (FontFamily::Sans, true, false) => BuiltinFont::HelveticaBold,
        (FontFamily::Sans, false, true) => BuiltinFont::HelveticaOblique,
        (FontFamily::Sans, true, true) => BuiltinFont::HelveticaBoldOblique,
        (FontFamily::Serif, false, false) => BuiltinFont::TimesRoman,
        (FontFamily::Serif, true, false) => BuiltinFont::TimesBold,
        (FontFamily::Serif, false, true) => BuiltinFont::TimesItalic,
        (FontFamily::Serif, true, true) => BuiltinFont::TimesBoldItalic,
        (FontFamily::Mono, false, false) => BuiltinFont::Courier,
        (FontFamily::Mono, true, false) => BuiltinFont::CourierBold,
        (FontFamily::Mono, false, true) => BuiltinFont::CourierOblique,
        (FontFamily::Mono, true, true) => BuiltinFont::CourierBoldOblique,
    }
}

/// Convert UTF-8 to raw Windows-1252 bytes (built-in fonts use
/// WinAnsiEncoding, one byte per glyph).
fn to_winansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{201A}' => 0x82,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96, // en-dash
            '\u{2014}' => 0x97, // em-dash
            '\u{2122}' => 0x99, // trademark
            '\u{00A0}' => 0x20, // non-breaking space
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect()
}

/// Emit one run of built-in-font text. ASCII goes through printpdf's text
/// op; anything else needs WinAnsi bytes that a valid `TextItem` string
/// cannot hold (printpdf copies string bytes into the content stream
/// verbatim), so those runs become a raw hex `Tj` instead.
fn push_text_run(ops: &mut Vec<Op>, text: &str, font: BuiltinFont) {
    if text.is_ascii() {
        ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text.to_string())],
            font,
        });
    } else {
        // The empty op keeps the font registered in the page resources.
        ops.push(Op::WriteTextBuiltinFont {
            items: Vec::new(),
            font,
        });
        ops.push(Op::Unknown {
            key: "Tj".to_string(),
            value: vec![DictItem::String {
                data: to_winansi(text),
                literal: false,
            }],
        });
    }
}

fn rgb(c: [f32; 3]) -> Color {
    Color::Rgb(Rgb {
        r: c[0],
        g: c[1],
        b: c[2],
        icc_profile: None,
    })
}

fn rect_points(x1: f32, y1: f32, x2: f32, y2: f32) -> Vec<LinePoint> {
    [(x1, y1), (x2, y1), (x2, y2), (x1, y2)]
        .into_iter()
        .map(|(x, y)| LinePoint {
            p: Point { x: Pt(x), y: Pt(y) },
            bezier: false,
        })
        .collect()
}

/// Recursively write a frame and its children into page ops. Layout uses a
/// top-left origin; PDF's is bottom-left, so every y flips against the page
/// height.
fn write_frame(
    ops: &mut Vec<Op>,
    frame: &Frame,
    page_height: f32,
    images: &HashMap<String, ImageResource>,
) {
    let pdf_top = page_height - frame.y;
    let pdf_bottom = pdf_top - frame.height;

    if let Some(fill) = frame.fill {
        ops.push(Op::SetFillColor { col: rgb(fill) });
        ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: rect_points(frame.x, pdf_bottom, frame.x + frame.width, pdf_top),
                }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    if let Some(stroke) = frame.stroke {
        ops.push(Op::SetOutlineColor {
            col: rgb(stroke.color),
        });
        ops.push(Op::SetOutlineThickness {
            pt: Pt(stroke.width),
        });
        ops.push(Op::DrawLine {
            line: Line {
                points: rect_points(frame.x, pdf_bottom, frame.x + frame.width, pdf_top),
                is_closed: true,
            },
        });
    }

    if let Some(text) = &frame.text {
        let font = builtin_font(text.font_family, text.bold, text.italic);
        // Baseline sits roughly one ascender below the line top.
        let ascender = text.font_size * 0.75;

        for line in &text.lines {
            if line.text.is_empty() {
                continue;
            }
            let x = frame.x + line.x_offset;
            let y = pdf_top - line.y_offset - ascender;

            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point { x: Pt(x), y: Pt(y) },
            });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(text.font_size),
                font,
            });
            ops.push(Op::SetLineHeight {
                lh: Pt(text.line_height_pt),
            });
            ops.push(Op::SetFillColor {
                col: rgb(text.color),
            });
            push_text_run(ops, &line.text, font);
            ops.push(Op::EndTextSection);

            if text.underline {
                let width = crate::text::text_width(
                    &line.text,
                    text.font_size,
                    text.font_family,
                    text.bold,
                );
                let underline_y = y - text.font_size * 0.1;
                ops.push(Op::SetOutlineThickness { pt: Pt(0.5) });
                ops.push(Op::SetOutlineColor {
                    col: rgb(text.color),
                });
                ops.push(Op::DrawLine {
                    line: Line {
                        points: vec![
                            LinePoint {
                                p: Point {
                                    x: Pt(x),
                                    y: Pt(underline_y),
                                },
                                bezier: false,
                            },
                            LinePoint {
                                p: Point {
                                    x: Pt(x + width),
                                    y: Pt(underline_y),
                                },
                                bezier: false,
                            },
                        ],
                        is_closed: false,
                    },
                });
            }
        }

        // Bullet / number drawn in the gutter left of the frame.
        if let Some(marker) = &text.marker {
            let font = builtin_font(text.font_family, false, false);
            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(frame.x - 16.0),
                    y: Pt(pdf_top - ascender),
                },
            });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(text.font_size),
                font,
            });
            ops.push(Op::SetFillColor {
                col: rgb(text.color),
            });
            push_text_run(ops, marker, font);
            ops.push(Op::EndTextSection);
        }
    }

    if let Some(img) = &frame.image {
        if let Some(res) = images.get(&img.src) {
            // At dpi=72 printpdf maps 1 px to 1 pt, so the scale factors are
            // desired points over pixel dimensions.
            let scale_x = if res.px_width > 0 {
                img.width / res.px_width as f32
            } else {
                1.0
            };
            let scale_y = if res.px_height > 0 {
                img.height / res.px_height as f32
            } else {
                1.0
            };
            ops.push(Op::UseXobject {
                id: res.xobj_id.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(frame.x)),
                    translate_y: Some(Pt(page_height - frame.y - img.height)),
                    dpi: Some(72.0),
                    scale_x: Some(scale_x),
                    scale_y: Some(scale_y),
                    rotate: None,
                },
            });
        }
    }

    for child in &frame.children {
        write_frame(ops, child, page_height, images);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::{A4_HEIGHT_PT, A4_WIDTH_PT};
    use crate::pages::{Line as TextLine, Page, TextBlock};

    fn empty_set() -> PageSet {
        PageSet::new("test", A4_WIDTH_PT, A4_HEIGHT_PT)
    }

    #[test]
    fn empty_set_still_yields_a_valid_pdf() {
        let bytes = write_pdf(&empty_set()).unwrap();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn text_frame_writes_content() {
        let mut set = empty_set();
        let mut frame = Frame::new(56.0, 56.0, 200.0, 20.0);
        frame.text = Some(TextBlock {
            lines: vec![TextLine {
                text: "Hello".to_string(),
                x_offset: 0.0,
                y_offset: 0.0,
            }],
            font_family: FontFamily::Sans,
            font_size: 12.0,
            bold: false,
            italic: false,
            underline: false,
            color: [0.0, 0.0, 0.0],
            line_height_pt: 16.8,
            marker: None,
        });
        set.pages.push(Page {
            number: 1,
            frames: vec![frame],
        });
        let bytes = write_pdf(&set).unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn winansi_maps_typographic_characters() {
        assert_eq!(to_winansi("a\u{2022}b\u{20AC}"), vec![b'a', 0x95, b'b', 0x80]);
    }

    #[test]
    fn winansi_replaces_unmappable_characters() {
        assert_eq!(to_winansi("\u{4E2D}"), vec![b'?']);
    }

    #[test]
    fn ascii_runs_use_the_plain_text_op() {
        let mut ops = Vec::new();
        push_text_run(&mut ops, "plain", BuiltinFont::Helvetica);
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], Op::WriteTextBuiltinFont { items, .. } if items.len() == 1));
    }

    #[test]
    fn non_ascii_runs_carry_winansi_bytes() {
        let mut ops = Vec::new();
        push_text_run(&mut ops, "Caf\u{E9} \u{2022} 5\u{20AC}", BuiltinFont::Helvetica);
        // Font-registering op first, then the raw byte string.
        assert!(matches!(&ops[0], Op::WriteTextBuiltinFont { items, .. } if items.is_empty()));
        match &ops[1] {
            Op::Unknown { key, value } => {
                assert_eq!(key, "Tj");
                match &value[0] {
                    DictItem::String { data, .. } => {
                        assert_eq!(data.as_slice(), b"Caf\xe9 \x95 5\x80");
                    }
                    other => panic!("unexpected operand: {other:?}"),
                }
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn non_ascii_text_still_yields_a_valid_pdf() {
        let mut set = empty_set();
        let mut frame = Frame::new(56.0, 56.0, 200.0, 20.0);
        frame.text = Some(TextBlock {
            lines: vec![TextLine {
                text: "Caf\u{E9} au lait \u{2013} 3\u{20AC}".to_string(),
                x_offset: 0.0,
                y_offset: 0.0,
            }],
            font_family: FontFamily::Sans,
            font_size: 12.0,
            bold: false,
            italic: false,
            underline: false,
            color: [0.0, 0.0, 0.0],
            line_height_pt: 16.8,
            marker: Some("\u{2022}".to_string()),
        });
        set.pages.push(Page {
            number: 1,
            frames: vec![frame],
        });
        let bytes = write_pdf(&set).unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn data_uri_parsing_rejects_plain_paths() {
        assert!(parse_data_uri("logo.png").is_err());
        assert!(parse_data_uri("data:image/png,plain").is_err());
        // 1x1 transparent PNG
        let uri = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";
        assert!(parse_data_uri(uri).is_ok());
    }

    #[test]
    fn serif_and_mono_map_to_their_builtins() {
        assert!(matches!(
            builtin_font(FontFamily::Serif, true, false),
            BuiltinFont::TimesBold
        ));
        assert!(matches!(
            builtin_font(FontFamily::Mono, false, true),
            BuiltinFont::CourierOblique
        ));
    }
}
