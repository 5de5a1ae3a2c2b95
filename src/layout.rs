//! Layout – builds a Taffy flex tree from the styled DOM tree and extracts
//! positioned boxes in document coordinates (pre-pagination).
//!
//! Tables ride on flexbox: the table is a column of stretch rows whose cells
//! share the row width (equal basis unless a cell has an explicit width).
//! Row groups (`thead`/`tbody`/`tfoot`) are transparent full-width columns.

use std::collections::HashMap;

use taffy::prelude::*;

use crate::css::{self, ComputedStyle, PageSetup, StyledNode};
use crate::dom::Tag;
use crate::error::PdfGenerationError;
use crate::text;

// ---------------------------------------------------------------------------
// Intermediate layout tree (pre-pagination)
// ---------------------------------------------------------------------------

/// A positioned box in document coordinates (before page splitting).
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: ComputedStyle,
    pub content: BoxContent,
    /// List bullet/number for `li` boxes, drawn in the left gutter.
    pub marker: Option<String>,
    pub children: Vec<PositionedBox>,
}

#[derive(Debug, Clone)]
pub enum BoxContent {
    None,
    Text { lines: Vec<String> },
    Image { src: String },
}

// ---------------------------------------------------------------------------
// Inline handling
// ---------------------------------------------------------------------------

/// True when the node contributes to an inline run: text, or an inline
/// element whose subtree is inline too. Inline-block (images) is excluded –
/// those keep their own box.
fn is_inline_node(node: &StyledNode) -> bool {
    match node {
        StyledNode::Text { .. } => true,
        StyledNode::Element {
            style, children, ..
        } => style.display == css::Display::Inline && children.iter().all(is_inline_node),
    }
}

/// Flatten an inline subtree to text. `<br>` becomes a hard line break.
fn collect_inline_text(node: &StyledNode) -> String {
    match node {
        StyledNode::Text { text, .. } => text.clone(),
        StyledNode::Element { tag: Tag::Br, .. } => "\n".to_string(),
        StyledNode::Element { children, .. } => children.iter().map(collect_inline_text).collect(),
    }
}

/// Collapse whitespace runs within each line while keeping hard breaks.
fn normalize_inline(raw: &str) -> String {
    raw.split('\n')
        .map(|seg| seg.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}

/// The style the merged text run should carry. A block holding exactly one
/// inline element (plus blank text) adopts its text styling, so
/// `<td><strong>Total</strong></td>` stays bold after merging.
fn merged_text_style(block: &ComputedStyle, children: &[StyledNode]) -> ComputedStyle {
    let mut elements = children.iter().filter_map(|c| match c {
        StyledNode::Element { style, .. } => Some(style),
        StyledNode::Text { .. } => None,
    });
    let only_blank_text = children.iter().all(|c| match c {
        StyledNode::Text { text, .. } => text.trim().is_empty(),
        StyledNode::Element { .. } => true,
    });
    match (elements.next(), elements.next()) {
        (Some(inline), None) if only_blank_text => {
            let mut s = block.clone();
            s.font_size = inline.font_size;
            s.font_family = inline.font_family;
            s.bold = inline.bold;
            s.italic = inline.italic;
            s.underline = inline.underline;
            s.color = inline.color;
            s
        }
        _ => block.clone(),
    }
}

// ---------------------------------------------------------------------------
// Build Taffy tree from styled nodes
// ---------------------------------------------------------------------------

struct LayoutBuilder {
    taffy: TaffyTree<()>,
    node_styles: HashMap<NodeId, ComputedStyle>,
    node_content: HashMap<NodeId, BoxContent>,
    node_markers: HashMap<NodeId, String>,
    available_width: f32,
}

impl LayoutBuilder {
    fn new(available_width: f32) -> Self {
        let mut taffy = TaffyTree::new();
        // Taffy rounds layout output to whole points otherwise; the text
        // metrics and alignment offsets need fractional widths.
        taffy.disable_rounding();
        Self {
            taffy,
            node_styles: HashMap::new(),
            node_content: HashMap::new(),
            node_markers: HashMap::new(),
            available_width,
        }
    }

    fn build_node(
        &mut self,
        styled: &StyledNode,
        parent_width: f32,
    ) -> Result<NodeId, PdfGenerationError> {
        match styled {
            StyledNode::Text { text, style } => self.build_text_node(text, style, parent_width),
            StyledNode::Element {
                tag,
                style,
                children,
                attrs,
            } => self.build_element_node(tag, style, children, attrs, parent_width),
        }
    }

    fn build_text_node(
        &mut self,
        raw: &str,
        style: &ComputedStyle,
        parent_width: f32,
    ) -> Result<NodeId, PdfGenerationError> {
        let max_w = if parent_width > 0.0 {
            parent_width
        } else {
            self.available_width
        };
        let content = normalize_inline(raw);
        // A whitespace-only node in a mixed container has no line of its
        // own; give it a zero-size box instead of an empty line.
        if content.is_empty() {
            let node = self.taffy.new_leaf(Style::default())?;
            self.node_styles.insert(node, style.clone());
            return Ok(node);
        }
        let lines = text::wrap(&content, style.font_size, style.font_family, style.bold, max_w);

        let line_height = text::line_height(style.font_size, style.line_height);
        let widest = lines
            .iter()
            .map(|l| text::text_width(l, style.font_size, style.font_family, style.bold))
            .fold(0.0f32, f32::max);
        let height = lines.len() as f32 * line_height;
        // Centered/right text needs the box to span the column so the
        // per-line alignment offsets have room to work with.
        let box_width = if style.text_align == css::TextAlign::Left {
            widest
        } else {
            max_w.max(widest)
        };

        let node = self.taffy.new_leaf(Style {
            size: Size {
                width: Dimension::Length(box_width),
                height: Dimension::Length(height),
            },
            ..Default::default()
        })?;
        self.node_styles.insert(node, style.clone());
        self.node_content.insert(node, BoxContent::Text { lines });
        Ok(node)
    }

    fn build_element_node(
        &mut self,
        tag: &Tag,
        style: &ComputedStyle,
        children: &[StyledNode],
        attrs: &HashMap<String, String>,
        parent_width: f32,
    ) -> Result<NodeId, PdfGenerationError> {
        let style = if *tag == Tag::Img {
            resolve_image_dimensions(attrs.get("src").map(|s| s.as_str()), style, parent_width)
        } else {
            style.clone()
        };

        let my_width = match style.width {
            css::Dimension::Pt(w) => w,
            css::Dimension::Percent(p) => parent_width * p / 100.0,
            css::Dimension::Auto => parent_width,
        };
        let inner_width = (my_width - style.padding.left - style.padding.right).max(1.0);

        // A block whose children are all inline gets one merged, wrapped text
        // child; the element keeps its own box (margins, borders, background).
        if !children.is_empty() && children.iter().all(is_inline_node) {
            let raw: String = children.iter().map(collect_inline_text).collect();
            let merged = normalize_inline(&raw);
            let child_ids = if merged.is_empty() {
                Vec::new()
            } else {
                let text_style = merged_text_style(&style, children);
                vec![self.build_text_node(&merged, &text_style, inner_width)?]
            };
            let taffy_style = self.computed_to_taffy(&style);
            let node = self.taffy.new_with_children(taffy_style, &child_ids)?;
            self.node_styles.insert(node, style);
            return Ok(node);
        }

        // Estimated width for each child, so text wraps close to its final
        // column. Fixed-width children keep theirs; the rest share what is
        // left.
        let share_row = style.display == css::Display::TableRow
            || (style.display == css::Display::Flex
                && style.flex_direction == css::FlexDirection::Row);
        let child_widths = if share_row {
            row_child_estimates(children, inner_width, style.gap)
        } else {
            None
        };

        let mut child_ids = Vec::new();
        let mut list_counter: u32 = attrs
            .get("start")
            .and_then(|v| v.parse::<u32>().ok())
            .map(|s| s.saturating_sub(1))
            .unwrap_or(0);
        let mut element_index = 0usize;

        for child in children {
            let child_width = match &child_widths {
                Some(widths) => match child {
                    StyledNode::Element { .. } => {
                        let w = widths.get(element_index).copied().unwrap_or(inner_width);
                        element_index += 1;
                        w
                    }
                    StyledNode::Text { .. } => inner_width,
                },
                None => inner_width,
            };

            let marker: Option<String> = match child {
                StyledNode::Element { tag: Tag::Li, .. } => {
                    list_counter += 1;
                    Some(if *tag == Tag::Ol {
                        format!("{list_counter}.")
                    } else {
                        "\u{2022}".to_string()
                    })
                }
                _ => None,
            };

            let child_id = self.build_node(child, child_width)?;
            if let Some(marker) = marker {
                self.node_markers.insert(child_id, marker);
            }
            child_ids.push(child_id);
        }

        let taffy_style = self.computed_to_taffy(&style);
        let node = self.taffy.new_with_children(taffy_style, &child_ids)?;
        self.node_styles.insert(node, style);

        if *tag == Tag::Img {
            let src = attrs.get("src").cloned().unwrap_or_default();
            self.node_content.insert(node, BoxContent::Image { src });
        }

        Ok(node)
    }

    fn computed_to_taffy(&self, s: &ComputedStyle) -> Style {
        let margin = Rect {
            top: LengthPercentageAuto::Length(s.margin.top),
            right: LengthPercentageAuto::Length(s.margin.right),
            bottom: LengthPercentageAuto::Length(s.margin.bottom),
            left: LengthPercentageAuto::Length(s.margin.left),
        };
        let padding = Rect {
            top: LengthPercentage::Length(s.padding.top),
            right: LengthPercentage::Length(s.padding.right),
            bottom: LengthPercentage::Length(s.padding.bottom),
            left: LengthPercentage::Length(s.padding.left),
        };
        let border = Rect {
            top: LengthPercentage::Length(s.border_width),
            right: LengthPercentage::Length(s.border_width),
            bottom: LengthPercentage::Length(s.border_width),
            left: LengthPercentage::Length(s.border_width),
        };

        match s.display {
            css::Display::Table => Style {
                display: taffy::Display::Flex,
                flex_direction: taffy::FlexDirection::Column,
                size: Size {
                    width: self.dim_to_taffy(s.width),
                    height: self.dim_to_taffy(s.height),
                },
                min_size: Size {
                    width: Dimension::Length(0.0),
                    height: Dimension::Auto,
                },
                margin,
                padding,
                ..Default::default()
            },
            css::Display::TableRowGroup => Style {
                display: taffy::Display::Flex,
                flex_direction: taffy::FlexDirection::Column,
                size: Size {
                    width: Dimension::Percent(1.0),
                    height: Dimension::Auto,
                },
                min_size: Size {
                    width: Dimension::Length(0.0),
                    height: Dimension::Auto,
                },
                ..Default::default()
            },
            css::Display::TableRow => Style {
                display: taffy::Display::Flex,
                flex_direction: taffy::FlexDirection::Row,
                align_items: Some(taffy::AlignItems::Stretch),
                size: Size {
                    width: Dimension::Percent(1.0),
                    height: Dimension::Auto,
                },
                min_size: Size {
                    width: Dimension::Length(0.0),
                    height: Dimension::Auto,
                },
                margin,
                ..Default::default()
            },
            css::Display::TableCell => {
                // Equal columns unless the cell pins its width.
                let (basis, grow) = match s.width {
                    css::Dimension::Auto => (Dimension::Length(0.0), 1.0),
                    other => (self.dim_to_taffy(other), 0.0),
                };
                Style {
                    display: taffy::Display::Flex,
                    flex_direction: taffy::FlexDirection::Column,
                    flex_grow: grow,
                    flex_shrink: 1.0,
                    flex_basis: basis,
                    min_size: Size {
                        width: Dimension::Length(0.0),
                        height: Dimension::Auto,
                    },
                    padding,
                    border,
                    ..Default::default()
                }
            }
            _ => {
                let mut ts = Style::default();
                match s.display {
                    css::Display::Flex => {
                        ts.display = taffy::Display::Flex;
                        ts.flex_direction = match s.flex_direction {
                            css::FlexDirection::Row => taffy::FlexDirection::Row,
                            css::FlexDirection::Column => taffy::FlexDirection::Column,
                        };
                        ts.flex_wrap = match s.flex_wrap {
                            css::FlexWrap::NoWrap => taffy::FlexWrap::NoWrap,
                            css::FlexWrap::Wrap => taffy::FlexWrap::Wrap,
                        };
                        ts.justify_content = Some(match s.justify_content {
                            css::JustifyContent::Start => taffy::JustifyContent::Start,
                            css::JustifyContent::End => taffy::JustifyContent::End,
                            css::JustifyContent::Center => taffy::JustifyContent::Center,
                            css::JustifyContent::SpaceBetween => taffy::JustifyContent::SpaceBetween,
                            css::JustifyContent::SpaceAround => taffy::JustifyContent::SpaceAround,
                            css::JustifyContent::SpaceEvenly => taffy::JustifyContent::SpaceEvenly,
                        });
                        ts.align_items = Some(match s.align_items {
                            css::AlignItems::Start => taffy::AlignItems::Start,
                            css::AlignItems::End => taffy::AlignItems::End,
                            css::AlignItems::Center => taffy::AlignItems::Center,
                            css::AlignItems::Stretch => taffy::AlignItems::Stretch,
                        });
                    }
                    css::Display::Inline => {
                        ts.display = taffy::Display::Flex;
                        ts.flex_direction = taffy::FlexDirection::Row;
                        ts.flex_wrap = taffy::FlexWrap::Wrap;
                    }
                    css::Display::None => {
                        ts.display = taffy::Display::None;
                    }
                    // Block-level elements stack vertically.
                    _ => {
                        ts.display = taffy::Display::Flex;
                        ts.flex_direction = taffy::FlexDirection::Column;
                    }
                }

                ts.size = Size {
                    width: self.dim_to_taffy(s.width),
                    height: self.dim_to_taffy(s.height),
                };
                // Flex items may compress below their natural content size.
                ts.min_size = Size {
                    width: if s.flex_shrink > 0.0 || s.flex_grow > 0.0 {
                        Dimension::Length(0.0)
                    } else {
                        self.dim_to_taffy(s.min_width)
                    },
                    height: Dimension::Auto,
                };
                ts.max_size = Size {
                    width: self.dim_to_taffy(s.max_width),
                    height: Dimension::Auto,
                };
                ts.flex_grow = s.flex_grow;
                ts.flex_shrink = s.flex_shrink;
                ts.margin = margin;
                ts.padding = padding;
                ts.border = border;
                ts.gap = Size {
                    width: LengthPercentage::Length(s.gap),
                    height: LengthPercentage::Length(s.gap),
                };
                ts
            }
        }
    }

    fn dim_to_taffy(&self, d: css::Dimension) -> Dimension {
        match d {
            css::Dimension::Auto => Dimension::Auto,
            css::Dimension::Pt(v) => Dimension::Length(v),
            css::Dimension::Percent(v) => Dimension::Percent(v / 100.0),
        }
    }

    /// Extract positioned boxes after layout computation.
    fn extract(
        &self,
        node: NodeId,
        offset_x: f32,
        offset_y: f32,
    ) -> Result<PositionedBox, PdfGenerationError> {
        let layout = self.taffy.layout(node)?;
        let style = self.node_styles.get(&node).cloned().unwrap_or_default();
        let content = self
            .node_content
            .get(&node)
            .cloned()
            .unwrap_or(BoxContent::None);

        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;
        let width = layout.size.width;
        let height = layout.size.height;

        let mut children = Vec::new();
        for child in self.taffy.children(node)? {
            children.push(self.extract(child, x, y)?);
        }

        Ok(PositionedBox {
            x,
            y,
            width,
            height,
            style,
            content,
            marker: self.node_markers.get(&node).cloned(),
            children,
        })
    }
}

/// Per-cell width estimates for a row: fixed widths are honoured, the rest
/// share the remainder. Only used to pick word-wrap widths; the real widths
/// come from Taffy.
fn row_child_estimates(children: &[StyledNode], inner_width: f32, gap: f32) -> Option<Vec<f32>> {
    let styles: Vec<&ComputedStyle> = children
        .iter()
        .filter_map(|c| match c {
            StyledNode::Element { style, .. } => Some(style),
            StyledNode::Text { .. } => None,
        })
        .collect();
    if styles.is_empty() {
        return None;
    }

    let gap_total = gap * styles.len().saturating_sub(1) as f32;
    let mut fixed_total = 0.0f32;
    let mut auto_count = 0usize;
    for s in &styles {
        match s.width {
            css::Dimension::Pt(w) => fixed_total += w,
            css::Dimension::Percent(p) => fixed_total += inner_width * p / 100.0,
            css::Dimension::Auto => auto_count += 1,
        }
    }
    let auto_width =
        ((inner_width - gap_total - fixed_total) / auto_count.max(1) as f32).max(1.0);

    Some(
        styles
            .iter()
            .map(|s| match s.width {
                css::Dimension::Pt(w) => w.max(1.0),
                css::Dimension::Percent(p) => (inner_width * p / 100.0).max(1.0),
                css::Dimension::Auto => auto_width,
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Image intrinsic-size helper
// ---------------------------------------------------------------------------

/// Resolve `auto` image dimensions from the intrinsic size of a base64 data
/// URI (1 px = 0.75 pt), keeping the aspect ratio when one side is fixed.
/// Without this an image with no explicit size computes to 0×0 in Taffy.
fn resolve_image_dimensions(
    src: Option<&str>,
    style: &ComputedStyle,
    parent_width: f32,
) -> ComputedStyle {
    let known_w: Option<f32> = match style.width {
        css::Dimension::Pt(v) => Some(v),
        css::Dimension::Percent(p) => Some(parent_width * p / 100.0),
        css::Dimension::Auto => None,
    };
    let known_h: Option<f32> = match style.height {
        css::Dimension::Pt(v) => Some(v),
        _ => None,
    };
    if known_w.is_some() && known_h.is_some() {
        return style.clone();
    }

    let Some((px_w, px_h)) = decode_intrinsic_size(src) else {
        return style.clone();
    };
    let aspect = px_w / px_h;

    let mut s = style.clone();
    match (known_w, known_h) {
        (Some(w), None) => s.height = css::Dimension::Pt((w / aspect).max(1.0)),
        (None, Some(h)) => s.width = css::Dimension::Pt((h * aspect).max(1.0)),
        (None, None) => {
            s.width = css::Dimension::Pt(px_w * css::PX_TO_PT);
            s.height = css::Dimension::Pt(px_h * css::PX_TO_PT);
        }
        (Some(_), Some(_)) => {}
    }
    s
}

fn decode_intrinsic_size(src: Option<&str>) -> Option<(f32, f32)> {
    use base64::{engine::general_purpose, Engine as _};

    let src = src?;
    if !src.starts_with("data:") || !src.contains(";base64,") {
        return None;
    }
    let comma = src.find(',')?;
    let bytes = general_purpose::STANDARD.decode(src[comma + 1..].trim()).ok()?;
    let img = image::load_from_memory(&bytes).ok()?;
    let (w, h) = (img.width() as f32, img.height() as f32);
    if w == 0.0 || h == 0.0 {
        None
    } else {
        Some((w, h))
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute layout for a styled tree, returning top-level positioned boxes in
/// document coordinates. X positions already include the page margin.
pub fn compute_layout(
    styled_nodes: &[StyledNode],
    page: &PageSetup,
) -> Result<Vec<PositionedBox>, PdfGenerationError> {
    let content_width = page.width_pt - 2.0 * page.margin_pt;
    let mut builder = LayoutBuilder::new(content_width);

    let mut child_ids = Vec::new();
    for node in styled_nodes {
        child_ids.push(builder.build_node(node, content_width)?);
    }

    let root_style = Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        size: Size {
            width: Dimension::Length(content_width),
            height: Dimension::Auto,
        },
        ..Default::default()
    };
    let root = builder.taffy.new_with_children(root_style, &child_ids)?;

    builder.taffy.compute_layout(
        root,
        Size {
            width: AvailableSpace::Definite(content_width),
            height: AvailableSpace::MaxContent,
        },
    )?;

    let root_box = builder.extract(root, page.margin_pt, 0.0)?;
    Ok(root_box.children)
}
