//! CSS resolver – parses the document's `<style>` blocks and inline `style`
//! attributes into flat [`ComputedStyle`] values consumed by the layout
//! engine, plus the `@page` setup that fixes the page geometry.
//!
//! The supported subset is deliberately small: simple selectors (`tag`,
//! `.class`, `tag.class`, `*`, comma lists), no combinators. Cascade order
//! is tag defaults, then stylesheet rules by specificity and source order,
//! then the inline attribute.

use crate::dom::{DomNode, ElementNode, Tag};
use crate::text::FontFamily;

// Unit conversions. Everything is points internally.
pub const PX_TO_PT: f32 = 0.75;
pub const CM_TO_PT: f32 = 28.3465;
pub const MM_TO_PT: f32 = 2.83465;
pub const PT_PER_INCH: f32 = 72.0;

/// A4 portrait in points.
pub const A4_WIDTH_PT: f32 = 595.28;
pub const A4_HEIGHT_PT: f32 = 841.89;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// RGB colour, components 0.0 – 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Self = Self { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Self = Self { r: 1.0, g: 1.0, b: 1.0 };

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().strip_prefix('#')?;
        let (r, g, b) = match hex.len() {
            6 => (
                u8::from_str_radix(&hex[0..2], 16).ok()?,
                u8::from_str_radix(&hex[2..4], 16).ok()?,
                u8::from_str_radix(&hex[4..6], 16).ok()?,
            ),
            3 => (
                u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?,
                u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?,
                u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?,
            ),
            _ => return None,
        };
        Some(Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        })
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

const NAMED_COLORS: &[(&str, &str)] = &[
    ("black", "#000000"),
    ("white", "#ffffff"),
    ("red", "#ff0000"),
    ("green", "#008000"),
    ("lime", "#00ff00"),
    ("blue", "#0000ff"),
    ("yellow", "#ffff00"),
    ("orange", "#ffa500"),
    ("purple", "#800080"),
    ("gray", "#808080"),
    ("grey", "#808080"),
    ("silver", "#c0c0c0"),
    ("lightgray", "#d3d3d3"),
    ("lightgrey", "#d3d3d3"),
    ("darkgray", "#a9a9a9"),
    ("darkgrey", "#a9a9a9"),
    ("navy", "#000080"),
    ("teal", "#008080"),
    ("maroon", "#800000"),
    ("olive", "#808000"),
    ("aqua", "#00ffff"),
    ("cyan", "#00ffff"),
    ("fuchsia", "#ff00ff"),
    ("magenta", "#ff00ff"),
];

/// Parse a colour value: `#rgb`, `#rrggbb`, `rgb(r, g, b)`, or a keyword.
pub fn parse_color(value: &str) -> Option<Color> {
    let value = value.trim();
    if value.starts_with('#') {
        return Color::from_hex(value);
    }
    if let Some(args) = value
        .strip_prefix("rgb(")
        .or_else(|| value.strip_prefix("rgba("))
        .and_then(|v| v.strip_suffix(')'))
    {
        let mut parts = args.split(',').map(|p| p.trim().parse::<f32>());
        let r = parts.next()?.ok()?;
        let g = parts.next()?.ok()?;
        let b = parts.next()?.ok()?;
        return Some(Color {
            r: (r / 255.0).clamp(0.0, 1.0),
            g: (g / 255.0).clamp(0.0, 1.0),
            b: (b / 255.0).clamp(0.0, 1.0),
        });
    }
    let lower = value.to_ascii_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lower)
        .and_then(|(_, hex)| Color::from_hex(hex))
}

/// Parse a length into points. Bare numbers are taken as points; `em` and
/// other unsupported units return `None` and leave the property untouched.
pub fn parse_length(value: &str) -> Option<f32> {
    let value = value.trim();
    let (number, factor) = if let Some(n) = value.strip_suffix("pt") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix("px") {
        (n, PX_TO_PT)
    } else if let Some(n) = value.strip_suffix("cm") {
        (n, CM_TO_PT)
    } else if let Some(n) = value.strip_suffix("mm") {
        (n, MM_TO_PT)
    } else if let Some(n) = value.strip_suffix("in") {
        (n, PT_PER_INCH)
    } else {
        (value, 1.0)
    };
    number.trim().parse::<f32>().ok().map(|v| v * factor)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Dimension {
    #[default]
    Auto,
    Pt(f32),
    Percent(f32),
}

fn parse_dimension(value: &str) -> Dimension {
    let value = value.trim();
    if value == "auto" {
        Dimension::Auto
    } else if let Some(pct) = value.strip_suffix('%') {
        pct.trim()
            .parse::<f32>()
            .map(Dimension::Percent)
            .unwrap_or(Dimension::Auto)
    } else {
        parse_length(value).map(Dimension::Pt).unwrap_or(Dimension::Auto)
    }
}

/// Four box edges in points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub fn uniform(v: f32) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    /// CSS shorthand: 1, 2, or 4 values.
    fn apply_shorthand(&mut self, value: &str) {
        let parts: Vec<f32> = value.split_whitespace().filter_map(parse_length).collect();
        match parts.len() {
            1 => *self = Self::uniform(parts[0]),
            2 => {
                self.top = parts[0];
                self.bottom = parts[0];
                self.right = parts[1];
                self.left = parts[1];
            }
            4 => {
                self.top = parts[0];
                self.right = parts[1];
                self.bottom = parts[2];
                self.left = parts[3];
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Supporting enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Inline,
    InlineBlock,
    ListItem,
    Table,
    TableRowGroup,
    TableRow,
    TableCell,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexWrap {
    NoWrap,
    Wrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyContent {
    Start,
    End,
    Center,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignItems {
    Start,
    End,
    Center,
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

// ---------------------------------------------------------------------------
// Computed style
// ---------------------------------------------------------------------------

/// Fully resolved style for a single element.
#[derive(Debug, Clone)]
pub struct ComputedStyle {
    // Display / layout
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub flex_wrap: FlexWrap,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub gap: f32,

    // Sizing
    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Dimension,
    pub max_width: Dimension,

    // Box (points)
    pub margin: Edges,
    pub padding: Edges,
    pub border_width: f32,
    pub border_color: Color,
    pub background: Option<Color>,

    // Typography
    pub font_size: f32,
    pub font_family: FontFamily,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Color,
    pub text_align: TextAlign,
    pub line_height: f32,

    // Pagination hints
    pub break_before: bool,
    pub break_after: bool,
    pub break_inside_avoid: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            flex_direction: FlexDirection::Row,
            flex_wrap: FlexWrap::NoWrap,
            flex_grow: 0.0,
            flex_shrink: 1.0,
            justify_content: JustifyContent::Start,
            align_items: AlignItems::Stretch,
            gap: 0.0,
            width: Dimension::Auto,
            height: Dimension::Auto,
            min_width: Dimension::Auto,
            max_width: Dimension::Auto,
            margin: Edges::default(),
            padding: Edges::default(),
            border_width: 0.0,
            border_color: Color::BLACK,
            background: None,
            // 12 pt is the CSS default 16 px expressed in points.
            font_size: 12.0,
            font_family: FontFamily::Sans,
            bold: false,
            italic: false,
            underline: false,
            color: Color::BLACK,
            text_align: TextAlign::Left,
            line_height: 1.4,
            break_before: false,
            break_after: false,
            break_inside_avoid: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Page setup
// ---------------------------------------------------------------------------

/// Resolved `@page` geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    pub width_pt: f32,
    pub height_pt: f32,
    pub margin_pt: f32,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            width_pt: A4_WIDTH_PT,
            height_pt: A4_HEIGHT_PT,
            margin_pt: 2.0 * CM_TO_PT,
        }
    }
}

impl PageSetup {
    fn apply(&mut self, prop: &str, value: &str) {
        match prop {
            "size" => self.apply_size(value),
            "margin" => {
                if let Some(first) = value.split_whitespace().next().and_then(parse_length) {
                    self.margin_pt = first;
                }
            }
            _ => {}
        }
    }

    fn apply_size(&mut self, value: &str) {
        let mut lengths: Vec<f32> = Vec::new();
        let mut landscape = false;
        for token in value.split_whitespace() {
            match token.to_ascii_lowercase().as_str() {
                "a3" => (self.width_pt, self.height_pt) = (841.89, 1190.55),
                "a4" => (self.width_pt, self.height_pt) = (A4_WIDTH_PT, A4_HEIGHT_PT),
                "a5" => (self.width_pt, self.height_pt) = (419.53, A4_WIDTH_PT),
                "letter" => (self.width_pt, self.height_pt) = (612.0, 792.0),
                "legal" => (self.width_pt, self.height_pt) = (612.0, 1008.0),
                "landscape" => landscape = true,
                "portrait" => landscape = false,
                other => {
                    if let Some(len) = parse_length(other) {
                        lengths.push(len);
                    }
                }
            }
        }
        if lengths.len() == 2 {
            (self.width_pt, self.height_pt) = (lengths[0], lengths[1]);
        }
        if landscape && self.width_pt < self.height_pt {
            std::mem::swap(&mut self.width_pt, &mut self.height_pt);
        }
    }
}

// ---------------------------------------------------------------------------
// Stylesheet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Declaration {
    property: String,
    value: String,
}

#[derive(Debug, Clone)]
pub struct Selector {
    tag: Option<Tag>,
    class: Option<String>,
}

impl Selector {
    fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        if s == "*" {
            return Some(Self {
                tag: None,
                class: None,
            });
        }
        // Combinators, pseudo-classes, ids, and attribute selectors are out
        // of subset; the whole selector is skipped, not the rule.
        if s.chars()
            .any(|c| c.is_whitespace() || matches!(c, '>' | '+' | '~' | ':' | '[' | ']' | '#'))
        {
            return None;
        }
        if let Some(class) = s.strip_prefix('.') {
            if class.is_empty() {
                return None;
            }
            return Some(Self {
                tag: None,
                class: Some(class.to_string()),
            });
        }
        match s.split_once('.') {
            Some((tag, class)) if !class.is_empty() => Some(Self {
                tag: Some(Tag::from_name(tag)),
                class: Some(class.to_string()),
            }),
            _ => Some(Self {
                tag: Some(Tag::from_name(s)),
                class: None,
            }),
        }
    }

    fn specificity(&self) -> u32 {
        let mut spec = 0;
        if self.class.is_some() {
            spec += 10;
        }
        if self.tag.is_some() {
            spec += 1;
        }
        spec
    }

    fn matches(&self, element: &ElementNode) -> bool {
        if let Some(tag) = &self.tag {
            if *tag != element.tag {
                return false;
            }
        }
        if let Some(class) = &self.class {
            if !element.classes().iter().any(|c| c == class) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
struct Rule {
    selectors: Vec<Selector>,
    declarations: Vec<Declaration>,
}

/// Parsed rules from every `<style>` block, in document order.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    rules: Vec<Rule>,
    /// `@page` declarations in source order; resolved lazily so later
    /// blocks override individual properties, not the whole setup.
    page_declarations: Vec<Declaration>,
}

impl Stylesheet {
    /// Parse one CSS text block.
    pub fn parse(css: &str) -> Self {
        let mut sheet = Self::default();
        sheet.parse_into(css);
        sheet
    }

    /// Parse several blocks, cascading in order (head first, then body).
    pub fn parse_all(blocks: &[String]) -> Self {
        let mut sheet = Self::default();
        for block in blocks {
            sheet.parse_into(block);
        }
        sheet
    }

    /// Resolve the `@page` geometry against the A4 / 2 cm defaults.
    pub fn page_setup(&self) -> PageSetup {
        let mut page = PageSetup::default();
        for decl in &self.page_declarations {
            page.apply(&decl.property, &decl.value);
        }
        page
    }

    fn parse_into(&mut self, css: &str) {
        let css = strip_comments(css);
        let mut rest = css.as_str();
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            if rest.starts_with('@') {
                rest = self.parse_at_rule(rest);
                continue;
            }
            let Some(brace) = rest.find('{') else { break };
            let selector_text = &rest[..brace];
            let Some((body, after)) = read_block(&rest[brace..]) else {
                break;
            };
            let selectors: Vec<Selector> =
                selector_text.split(',').filter_map(Selector::parse).collect();
            let declarations = parse_declarations(body);
            if !selectors.is_empty() && !declarations.is_empty() {
                self.rules.push(Rule {
                    selectors,
                    declarations,
                });
            }
            rest = after;
        }
    }

    /// Handle an at-rule: `@page` bodies are kept, everything else is
    /// skipped whole (including nested blocks).
    fn parse_at_rule<'a>(&mut self, rest: &'a str) -> &'a str {
        let name: String = rest[1..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        match rest.find(|c| c == '{' || c == ';') {
            Some(i) if rest.as_bytes()[i] == b';' => &rest[i + 1..],
            Some(i) => match read_block(&rest[i..]) {
                Some((body, after)) => {
                    if name.eq_ignore_ascii_case("page") {
                        self.page_declarations.extend(parse_declarations(body));
                    }
                    after
                }
                None => "",
            },
            None => "",
        }
    }
}

/// Read a `{ ... }` block with brace counting. Returns (body, remainder).
fn read_block(s: &str) -> Option<(&str, &str)> {
    debug_assert!(s.starts_with('{'));
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&s[1..i], &s[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_declarations(body: &str) -> Vec<Declaration> {
    body.split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim().to_string();
            if prop.is_empty() || value.is_empty() {
                None
            } else {
                Some(Declaration {
                    property: prop,
                    value,
                })
            }
        })
        .collect()
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start..].find("*/") {
            Some(end) => rest = &rest[start + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Resolve the style for an element: inherited text properties, then tag
/// defaults, then matching stylesheet rules, then the inline attribute.
pub fn resolve_style(
    element: &ElementNode,
    parent: Option<&ComputedStyle>,
    sheet: &Stylesheet,
) -> ComputedStyle {
    let mut style = ComputedStyle::default();

    if let Some(p) = parent {
        style.font_size = p.font_size;
        style.font_family = p.font_family;
        style.bold = p.bold;
        style.italic = p.italic;
        style.underline = p.underline;
        style.color = p.color;
        style.text_align = p.text_align;
        style.line_height = p.line_height;
    }

    apply_tag_defaults(&mut style, &element.tag);

    // Presentational width/height attributes on images (px).
    if element.tag == Tag::Img {
        if let Some(w) = element.attr("width").and_then(|v| v.trim().parse::<f32>().ok()) {
            style.width = Dimension::Pt(w * PX_TO_PT);
        }
        if let Some(h) = element.attr("height").and_then(|v| v.trim().parse::<f32>().ok()) {
            style.height = Dimension::Pt(h * PX_TO_PT);
        }
    }

    // Matching rules, lowest specificity first; source order breaks ties.
    let mut matched: Vec<(u32, usize, &Rule)> = Vec::new();
    for (index, rule) in sheet.rules.iter().enumerate() {
        let best = rule
            .selectors
            .iter()
            .filter(|sel| sel.matches(element))
            .map(Selector::specificity)
            .max();
        if let Some(spec) = best {
            matched.push((spec, index, rule));
        }
    }
    matched.sort_by_key(|(spec, index, _)| (*spec, *index));
    for (_, _, rule) in matched {
        for decl in &rule.declarations {
            apply_declaration(&mut style, &decl.property, &decl.value);
        }
    }

    if let Some(inline) = element.inline_style() {
        for decl in parse_declarations(inline) {
            apply_declaration(&mut style, &decl.property, &decl.value);
        }
    }

    style
}

/// Defaults based on tag semantics, applied over inherited values.
fn apply_tag_defaults(s: &mut ComputedStyle, tag: &Tag) {
    match tag {
        Tag::H1 => {
            s.font_size = 24.0;
            s.bold = true;
            s.margin.top = 12.0;
            s.margin.bottom = 9.0;
        }
        Tag::H2 => {
            s.font_size = 18.0;
            s.bold = true;
            s.margin.top = 10.5;
            s.margin.bottom = 7.5;
        }
        Tag::H3 => {
            s.font_size = 15.0;
            s.bold = true;
            s.margin.top = 9.0;
            s.margin.bottom = 6.0;
        }
        Tag::H4 => {
            s.bold = true;
            s.margin.top = 8.0;
            s.margin.bottom = 6.0;
        }
        Tag::P => {
            s.margin.bottom = 7.5;
        }
        Tag::Ul | Tag::Ol => {
            s.margin.bottom = 7.5;
            s.padding.left = 18.0;
        }
        Tag::Li => {
            s.display = Display::ListItem;
            s.margin.bottom = 3.0;
        }
        Tag::Table => {
            s.display = Display::Table;
            s.border_width = 0.75;
        }
        Tag::Thead | Tag::Tbody | Tag::Tfoot => {
            s.display = Display::TableRowGroup;
        }
        Tag::Tr => {
            s.display = Display::TableRow;
        }
        Tag::Td | Tag::Th => {
            s.display = Display::TableCell;
            s.padding = Edges {
                top: 3.0,
                right: 6.0,
                bottom: 3.0,
                left: 6.0,
            };
            s.border_width = 0.75;
            if *tag == Tag::Th {
                s.bold = true;
                s.background = Some(Color {
                    r: 0.93,
                    g: 0.93,
                    b: 0.93,
                });
            }
        }
        Tag::Span | Tag::A | Tag::Br => {
            s.display = Display::Inline;
        }
        Tag::Strong | Tag::B => {
            s.display = Display::Inline;
            s.bold = true;
        }
        Tag::Em | Tag::I => {
            s.display = Display::Inline;
            s.italic = true;
        }
        Tag::U => {
            s.display = Display::Inline;
            s.underline = true;
        }
        Tag::Img => {
            s.display = Display::InlineBlock;
        }
        // Unknown tags behave like plain divs so unexpected markup still
        // shows its content.
        _ => {}
    }
}

fn apply_declaration(s: &mut ComputedStyle, prop: &str, value: &str) {
    match prop {
        "display" => {
            s.display = match value {
                "block" => Display::Block,
                "flex" => Display::Flex,
                "inline" => Display::Inline,
                "inline-block" => Display::InlineBlock,
                "list-item" => Display::ListItem,
                "table" => Display::Table,
                "table-row-group" | "table-header-group" | "table-footer-group" => {
                    Display::TableRowGroup
                }
                "table-row" => Display::TableRow,
                "table-cell" => Display::TableCell,
                "none" => Display::None,
                _ => s.display,
            }
        }
        "flex-direction" => {
            s.flex_direction = match value {
                "row" => FlexDirection::Row,
                "column" => FlexDirection::Column,
                _ => s.flex_direction,
            }
        }
        "flex-wrap" => {
            s.flex_wrap = match value {
                "wrap" => FlexWrap::Wrap,
                "nowrap" => FlexWrap::NoWrap,
                _ => s.flex_wrap,
            }
        }
        "flex-grow" => {
            if let Ok(v) = value.parse() {
                s.flex_grow = v;
            }
        }
        "flex-shrink" => {
            if let Ok(v) = value.parse() {
                s.flex_shrink = v;
            }
        }
        "justify-content" => {
            s.justify_content = match value {
                "flex-start" | "start" => JustifyContent::Start,
                "flex-end" | "end" => JustifyContent::End,
                "center" => JustifyContent::Center,
                "space-between" => JustifyContent::SpaceBetween,
                "space-around" => JustifyContent::SpaceAround,
                "space-evenly" => JustifyContent::SpaceEvenly,
                _ => s.justify_content,
            }
        }
        "align-items" => {
            s.align_items = match value {
                "flex-start" | "start" => AlignItems::Start,
                "flex-end" | "end" => AlignItems::End,
                "center" => AlignItems::Center,
                "stretch" => AlignItems::Stretch,
                _ => s.align_items,
            }
        }
        "gap" => {
            if let Some(v) = parse_length(value) {
                s.gap = v;
            }
        }
        "width" => s.width = parse_dimension(value),
        "height" => s.height = parse_dimension(value),
        "min-width" => s.min_width = parse_dimension(value),
        "max-width" => s.max_width = parse_dimension(value),
        "margin" => s.margin.apply_shorthand(value),
        "margin-top" => {
            if let Some(v) = parse_length(value) {
                s.margin.top = v;
            }
        }
        "margin-right" => {
            if let Some(v) = parse_length(value) {
                s.margin.right = v;
            }
        }
        "margin-bottom" => {
            if let Some(v) = parse_length(value) {
                s.margin.bottom = v;
            }
        }
        "margin-left" => {
            if let Some(v) = parse_length(value) {
                s.margin.left = v;
            }
        }
        "padding" => s.padding.apply_shorthand(value),
        "padding-top" => {
            if let Some(v) = parse_length(value) {
                s.padding.top = v;
            }
        }
        "padding-right" => {
            if let Some(v) = parse_length(value) {
                s.padding.right = v;
            }
        }
        "padding-bottom" => {
            if let Some(v) = parse_length(value) {
                s.padding.bottom = v;
            }
        }
        "padding-left" => {
            if let Some(v) = parse_length(value) {
                s.padding.left = v;
            }
        }
        "border" => {
            // Shorthand: any length token is the width, any colour token the
            // colour; the line style keyword is ignored (everything is solid).
            if value == "none" {
                s.border_width = 0.0;
                return;
            }
            for token in value.split_whitespace() {
                if let Some(w) = parse_length(token) {
                    s.border_width = w;
                } else if let Some(c) = parse_color(token) {
                    s.border_color = c;
                }
            }
        }
        "border-width" => {
            if let Some(v) = parse_length(value) {
                s.border_width = v;
            }
        }
        "border-color" => {
            if let Some(c) = parse_color(value) {
                s.border_color = c;
            }
        }
        "font-size" => {
            if let Some(v) = parse_length(value) {
                s.font_size = v;
            }
        }
        "font-family" => s.font_family = FontFamily::from_css(value),
        "font-weight" => {
            s.bold = match value {
                "bold" | "bolder" => true,
                "normal" | "lighter" => false,
                num => num.parse::<f32>().map(|v| v >= 600.0).unwrap_or(s.bold),
            }
        }
        "font-style" => {
            s.italic = match value {
                "italic" | "oblique" => true,
                "normal" => false,
                _ => s.italic,
            }
        }
        "text-decoration" | "text-decoration-line" => {
            if value.contains("underline") {
                s.underline = true;
            } else if value == "none" {
                s.underline = false;
            }
        }
        "text-align" => {
            s.text_align = match value {
                "left" => TextAlign::Left,
                "center" => TextAlign::Center,
                "right" => TextAlign::Right,
                _ => s.text_align,
            }
        }
        "color" => {
            if let Some(c) = parse_color(value) {
                s.color = c;
            }
        }
        "background-color" | "background" => {
            if value == "transparent" || value == "none" {
                s.background = None;
            } else if let Some(c) = value.split_whitespace().find_map(parse_color) {
                s.background = Some(c);
            }
        }
        "line-height" => {
            if let Ok(factor) = value.parse::<f32>() {
                s.line_height = factor;
            } else if let Some(v) = parse_length(value) {
                if s.font_size > 0.0 {
                    s.line_height = v / s.font_size;
                }
            }
        }
        "page-break-before" | "break-before" => {
            s.break_before = value == "always" || value == "page";
        }
        "page-break-after" | "break-after" => {
            s.break_after = value == "always" || value == "page";
        }
        "page-break-inside" | "break-inside" => {
            s.break_inside_avoid = value == "avoid" || value == "avoid-page";
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Styled DOM tree
// ---------------------------------------------------------------------------

/// A DOM node annotated with its computed style.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
        /// Original attributes (image src, list numbering, etc.)
        attrs: std::collections::HashMap<String, String>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

/// Build a styled tree from the body flow, resolving styles top-down.
pub fn build_styled_tree(
    nodes: &[DomNode],
    parent_style: Option<&ComputedStyle>,
    sheet: &Stylesheet,
) -> Vec<StyledNode> {
    let mut result = Vec::new();
    for node in nodes {
        match node {
            DomNode::Element(e) => {
                let style = resolve_style(e, parent_style, sheet);
                if style.display == Display::None {
                    continue;
                }
                let children = build_styled_tree(&e.children, Some(&style), sheet);
                result.push(StyledNode::Element {
                    tag: e.tag.clone(),
                    style,
                    children,
                    attrs: e.attributes.clone(),
                });
            }
            DomNode::Text(text) => {
                // Whitespace-only text is a deliberate word gap from the
                // parser; keep it so inline runs merge with spaces intact.
                if !text.is_empty() {
                    let mut style = parent_style.cloned().unwrap_or_default();
                    // Text nodes carry only typography; box properties stay
                    // on the element that owns them.
                    style.margin = Edges::default();
                    style.padding = Edges::default();
                    style.border_width = 0.0;
                    style.background = None;
                    result.push(StyledNode::Text {
                        text: text.clone(),
                        style,
                    });
                }
            }
        }
    }
    result
}

impl StyledNode {
    pub fn style(&self) -> &ComputedStyle {
        match self {
            StyledNode::Element { style, .. } => style,
            StyledNode::Text { style, .. } => style,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn styled(html: &str, css: &str) -> Vec<StyledNode> {
        let nodes = parse_html(html);
        let sheet = Stylesheet::parse(css);
        build_styled_tree(&nodes, None, &sheet)
    }

    fn element_style(node: &StyledNode) -> &ComputedStyle {
        match node {
            StyledNode::Element { style, .. } => style,
            StyledNode::Text { .. } => panic!("expected element"),
        }
    }

    #[test]
    fn length_units_convert_to_points() {
        assert!((parse_length("2cm").unwrap() - 56.693).abs() < 0.01);
        assert!((parse_length("16px").unwrap() - 12.0).abs() < 0.001);
        assert!((parse_length("10mm").unwrap() - 28.3465).abs() < 0.001);
        assert!((parse_length("1in").unwrap() - 72.0).abs() < 0.001);
        assert!((parse_length("11pt").unwrap() - 11.0).abs() < 0.001);
        assert!((parse_length("7").unwrap() - 7.0).abs() < 0.001);
        assert!(parse_length("2em").is_none());
    }

    #[test]
    fn colors_parse_from_all_forms() {
        assert_eq!(parse_color("#ff0000"), Some(Color { r: 1.0, g: 0.0, b: 0.0 }));
        assert_eq!(parse_color("#fff"), Some(Color::WHITE));
        assert_eq!(parse_color("navy"), Color::from_hex("#000080"));
        let c = parse_color("rgb(255, 128, 0)").unwrap();
        assert!((c.g - 0.502).abs() < 0.01);
        assert!(parse_color("blurple").is_none());
    }

    #[test]
    fn tag_rule_overrides_defaults() {
        let nodes = styled("<p>x</p>", "p { color: red; margin-bottom: 20pt; }");
        let style = element_style(&nodes[0]);
        assert_eq!(style.color, Color { r: 1.0, g: 0.0, b: 0.0 });
        assert!((style.margin.bottom - 20.0).abs() < 0.001);
    }

    #[test]
    fn class_beats_tag_regardless_of_order() {
        let css = ".fancy { color: blue; } p { color: red; }";
        let nodes = styled("<p class=\"fancy\">x</p>", css);
        assert_eq!(element_style(&nodes[0]).color, Color { r: 0.0, g: 0.0, b: 1.0 });
    }

    #[test]
    fn later_rule_wins_at_equal_specificity() {
        let css = "p { color: red; } p { color: green; }";
        let nodes = styled("<p>x</p>", css);
        assert_eq!(element_style(&nodes[0]).color, Color::from_hex("#008000").unwrap());
    }

    #[test]
    fn inline_style_beats_everything() {
        let css = "p.loud { color: blue; font-size: 30pt; }";
        let nodes = styled("<p class=\"loud\" style=\"color: black\">x</p>", css);
        let style = element_style(&nodes[0]);
        assert_eq!(style.color, Color::BLACK);
        assert!((style.font_size - 30.0).abs() < 0.001);
    }

    #[test]
    fn compound_selector_requires_both_parts() {
        let css = "td.num { text-align: right; }";
        let nodes = styled("<table><tr><td class=\"num\">1</td><td>x</td></tr></table>", css);
        let StyledNode::Element { children: rows, .. } = &nodes[0] else {
            panic!("expected table")
        };
        let StyledNode::Element { children: cells, .. } = &rows[0] else {
            panic!("expected row")
        };
        assert_eq!(element_style(&cells[0]).text_align, TextAlign::Right);
        assert_eq!(element_style(&cells[1]).text_align, TextAlign::Left);
    }

    #[test]
    fn text_properties_inherit_box_properties_do_not() {
        let css = "div { color: red; padding: 10pt; border: 2pt solid black; }";
        let nodes = styled("<div><p>x</p></div>", css);
        let StyledNode::Element { children, .. } = &nodes[0] else {
            panic!("expected div")
        };
        let p = element_style(&children[0]);
        assert_eq!(p.color, Color { r: 1.0, g: 0.0, b: 0.0 });
        assert!((p.padding.top - 0.0).abs() < 0.001);
        assert!((p.border_width - 0.0).abs() < 0.001);
    }

    #[test]
    fn heading_keeps_its_size_under_a_styled_parent() {
        let nodes = styled("<div style=\"font-size: 10pt\"><h1>Big</h1></div>", "");
        let StyledNode::Element { children, .. } = &nodes[0] else {
            panic!("expected div")
        };
        let h1 = element_style(&children[0]);
        assert!((h1.font_size - 24.0).abs() < 0.001);
        assert!(h1.bold);
    }

    #[test]
    fn th_defaults_are_bold_with_a_tinted_background() {
        let nodes = styled("<table><tr><th>Name</th></tr></table>", "");
        let StyledNode::Element { children: rows, .. } = &nodes[0] else {
            panic!("expected table")
        };
        let StyledNode::Element { children: cells, .. } = &rows[0] else {
            panic!("expected row")
        };
        let th = element_style(&cells[0]);
        assert!(th.bold);
        assert!(th.background.is_some());
    }

    #[test]
    fn border_shorthand_sets_width_and_color() {
        let nodes = styled("<div style=\"border: 2px solid #336699\">x</div>", "");
        let style = element_style(&nodes[0]);
        assert!((style.border_width - 1.5).abs() < 0.001);
        assert_eq!(style.border_color, Color::from_hex("#336699").unwrap());
    }

    #[test]
    fn word_gaps_between_inline_siblings_survive_styling() {
        let nodes = styled("<p><strong>a</strong> <em>b</em></p>", "");
        let StyledNode::Element { children, .. } = &nodes[0] else {
            panic!("expected p")
        };
        assert_eq!(children.len(), 3);
        assert!(matches!(&children[1], StyledNode::Text { text, .. } if text == " "));
    }

    #[test]
    fn display_none_drops_the_subtree() {
        let nodes = styled("<div class=\"hide\"><p>gone</p></div><p>kept</p>", ".hide { display: none; }");
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn page_setup_defaults_to_a4_with_2cm_margin() {
        let page = Stylesheet::parse("").page_setup();
        assert!((page.width_pt - A4_WIDTH_PT).abs() < 0.01);
        assert!((page.height_pt - A4_HEIGHT_PT).abs() < 0.01);
        assert!((page.margin_pt - 56.693).abs() < 0.01);
    }

    #[test]
    fn page_rule_overrides_size_and_margin() {
        let page = Stylesheet::parse("@page { size: letter landscape; margin: 1cm; }").page_setup();
        assert!((page.width_pt - 792.0).abs() < 0.01);
        assert!((page.height_pt - 612.0).abs() < 0.01);
        assert!((page.margin_pt - CM_TO_PT).abs() < 0.01);
    }

    #[test]
    fn later_page_rule_overrides_only_what_it_sets() {
        let blocks = vec![
            "@page { size: A4; margin: 2cm; }".to_string(),
            "@page { margin: 12pt; }".to_string(),
        ];
        let page = Stylesheet::parse_all(&blocks).page_setup();
        assert!((page.width_pt - A4_WIDTH_PT).abs() < 0.01);
        assert!((page.margin_pt - 12.0).abs() < 0.01);
    }

    #[test]
    fn unsupported_at_rules_and_comments_are_skipped() {
        let css = "/* banner */ @media print { p { color: red; } } p { color: navy; }";
        let nodes = styled("<p>x</p>", css);
        assert_eq!(element_style(&nodes[0]).color, Color::from_hex("#000080").unwrap());
    }

    #[test]
    fn descendant_selectors_are_out_of_subset() {
        let css = "table td { color: red; } td { color: navy; }";
        let nodes = styled("<table><tr><td>x</td></tr></table>", css);
        let StyledNode::Element { children: rows, .. } = &nodes[0] else {
            panic!("expected table")
        };
        let StyledNode::Element { children: cells, .. } = &rows[0] else {
            panic!("expected row")
        };
        assert_eq!(element_style(&cells[0]).color, Color::from_hex("#000080").unwrap());
    }
}
