//! Pagination – splits positioned boxes in document coordinates into pages.
//!
//! Handles:
//! - page boundaries from the resolved `@page` geometry
//! - forced `page-break-before` / `page-break-after`
//! - `page-break-inside: avoid` (the box moves to the next page whole)
//! - tables split between rows, never through one; row groups are
//!   transparent to splitting
//!
//! Text alignment is baked in here: each wrapped line gets an `x_offset`
//! computed from its measured width against the box it sits in.

use crate::css::{Display, PageSetup, TextAlign};
use crate::layout::{BoxContent, PositionedBox};
use crate::pages::{Frame, Line, Page, PageSet, Stroke, TextBlock};
use crate::text;

/// Split laid-out boxes into pages. X positions already carry the page
/// margin; Y positions are document-space and get rebased per page.
pub fn paginate(boxes: &[PositionedBox], page: &PageSetup, title: &str) -> PageSet {
    let content_height = page.height_pt - 2.0 * page.margin_pt;
    let mut set = PageSet::new(title, page.width_pt, page.height_pt);

    // Oversized pure containers are expanded so their children can land on
    // different pages individually.
    let flat = flatten_for_pagination(boxes, content_height);

    let mut current: Vec<Frame> = Vec::new();
    // Document-space y at which the current page begins.
    let mut page_start = 0.0f32;

    for pbox in flat {
        if pbox.style.break_before && !current.is_empty() {
            finish_page(&mut set, &mut current);
            page_start = pbox.y;
        }

        let y_on_page = (pbox.y - page_start).max(0.0);
        let overflows = y_on_page + pbox.height > content_height;

        if overflows {
            if pbox.style.display == Display::Table && !pbox.style.break_inside_avoid {
                split_table(
                    pbox,
                    &mut set,
                    &mut current,
                    &mut page_start,
                    content_height,
                    page.margin_pt,
                );
                continue;
            }
            if !current.is_empty() {
                finish_page(&mut set, &mut current);
                page_start = pbox.y;
            }
        }

        let y_on_page = (pbox.y - page_start).max(0.0);
        current.push(build_frame(pbox, pbox.x, page.margin_pt + y_on_page));

        if pbox.style.break_after {
            finish_page(&mut set, &mut current);
            page_start = pbox.y + pbox.height;
        }
    }

    if !current.is_empty() || set.pages.is_empty() {
        finish_page(&mut set, &mut current);
    }
    set
}

fn finish_page(set: &mut PageSet, frames: &mut Vec<Frame>) {
    set.pages.push(Page {
        number: set.pages.len() + 1,
        frames: std::mem::take(frames),
    });
}

/// Expand any content-free container taller than one page so its children
/// paginate individually.
fn flatten_for_pagination<'a>(
    boxes: &'a [PositionedBox],
    content_height: f32,
) -> Vec<&'a PositionedBox> {
    let mut result = Vec::new();
    for pbox in boxes {
        if pbox.height > content_height
            && matches!(pbox.content, BoxContent::None)
            && pbox.style.display != Display::Table
            && !pbox.children.is_empty()
        {
            result.extend(flatten_for_pagination(&pbox.children, content_height));
        } else {
            result.push(pbox);
        }
    }
    result
}

/// Rows of a table, looking through `thead`/`tbody`/`tfoot` wrappers. The
/// returned boxes are the units pagination may separate.
fn table_rows(table: &PositionedBox) -> Vec<&PositionedBox> {
    let mut rows = Vec::new();
    for child in &table.children {
        if child.style.display == Display::TableRowGroup {
            rows.extend(child.children.iter());
        } else {
            rows.push(child);
        }
    }
    rows
}

fn split_table(
    table: &PositionedBox,
    set: &mut PageSet,
    current: &mut Vec<Frame>,
    page_start: &mut f32,
    content_height: f32,
    margin: f32,
) {
    for row in table_rows(table) {
        let y_on_page = (row.y - *page_start).max(0.0);
        if y_on_page + row.height > content_height && !current.is_empty() {
            finish_page(set, current);
            *page_start = row.y;
        }
        let y = (row.y - *page_start).max(0.0);
        current.push(build_frame(row, row.x, margin + y));
    }
}

/// Convert a positioned box (and its subtree) into a frame with
/// page-absolute coordinates. Child offsets are differences of the
/// document-space positions, so the rebasing applied at the top level
/// propagates unchanged.
fn build_frame(pbox: &PositionedBox, abs_x: f32, abs_y: f32) -> Frame {
    let mut frame = Frame::new(abs_x, abs_y, pbox.width, pbox.height);

    frame.fill = pbox.style.background.map(|c| c.to_array());
    if pbox.style.border_width > 0.0 {
        frame.stroke = Some(Stroke {
            width: pbox.style.border_width,
            color: pbox.style.border_color.to_array(),
        });
    }

    match &pbox.content {
        BoxContent::Text { lines } => {
            frame.text = Some(text_block(pbox, lines));
        }
        BoxContent::Image { src } => {
            frame.image = Some(crate::pages::ImageRef {
                src: src.clone(),
                width: pbox.width,
                height: pbox.height,
            });
        }
        BoxContent::None => {}
    }

    // A marker with no text content of its own still needs a text block to
    // carry it (the li's words live in child boxes).
    if let Some(marker) = &pbox.marker {
        match &mut frame.text {
            Some(block) => block.marker = Some(marker.clone()),
            None => {
                let mut block = text_block(pbox, &[]);
                block.marker = Some(marker.clone());
                frame.text = Some(block);
            }
        }
    }

    for child in &pbox.children {
        let child_abs_y = abs_y + (child.y - pbox.y);
        frame.children.push(build_frame(child, child.x, child_abs_y));
    }

    frame
}

fn text_block(pbox: &PositionedBox, lines: &[String]) -> TextBlock {
    let s = &pbox.style;
    let line_height = text::line_height(s.font_size, s.line_height);
    let placed = lines
        .iter()
        .enumerate()
        .map(|(i, line)| Line {
            text: line.clone(),
            x_offset: align_offset(line, pbox),
            y_offset: i as f32 * line_height,
        })
        .collect();
    TextBlock {
        lines: placed,
        font_family: s.font_family,
        font_size: s.font_size,
        bold: s.bold,
        italic: s.italic,
        underline: s.underline,
        color: s.color.to_array(),
        line_height_pt: line_height,
        marker: None,
    }
}

/// Horizontal offset of one line inside its box, from `text-align` and the
/// measured line width. Never negative, so an over-wide line stays pinned
/// to the left edge.
fn align_offset(line: &str, pbox: &PositionedBox) -> f32 {
    let s = &pbox.style;
    if s.text_align == TextAlign::Left {
        return 0.0;
    }
    let w = text::text_width(line, s.font_size, s.font_family, s.bold);
    let slack = (pbox.width - w).max(0.0);
    match s.text_align {
        TextAlign::Center => slack / 2.0,
        TextAlign::Right => slack,
        TextAlign::Left => 0.0,
    }
}
