//! HTML parser – converts an HTML string into a simple DOM tree.
//!
//! The input is always machine-generated (template output wrapped in the
//! generator's document shell), so a hand-written parser over a controlled
//! subset is enough. Beyond the tree itself, [`parse_document`] pulls out
//! what the later stages need: `<style>` payloads in document order, the
//! `<title>`, and the body flow with non-rendering elements stripped.

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

/// The tag name of a supported element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Html,
    Head,
    Body,
    Style,
    Script,
    Title,
    Meta,
    Link,
    Div,
    P,
    H1,
    H2,
    H3,
    H4,
    Ul,
    Ol,
    Li,
    Table,
    Thead,
    Tbody,
    Tfoot,
    Tr,
    Td,
    Th,
    Span,
    A,
    Strong,
    Em,
    B,
    I,
    U,
    Br,
    Img,
    /// Catch-all for anything else – kept in the tree and laid out as a
    /// plain block container so unexpected markup degrades gracefully.
    Other(String),
}

impl Tag {
    pub fn from_name(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "html" => Tag::Html,
            "head" => Tag::Head,
            "body" => Tag::Body,
            "style" => Tag::Style,
            "script" => Tag::Script,
            "title" => Tag::Title,
            "meta" => Tag::Meta,
            "link" => Tag::Link,
            "div" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "h4" => Tag::H4,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "table" => Tag::Table,
            "thead" => Tag::Thead,
            "tbody" => Tag::Tbody,
            "tfoot" => Tag::Tfoot,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "span" => Tag::Span,
            "a" => Tag::A,
            "strong" => Tag::Strong,
            "em" => Tag::Em,
            "b" => Tag::B,
            "i" => Tag::I,
            "u" => Tag::U,
            "br" => Tag::Br,
            "img" => Tag::Img,
            _ => Tag::Other(s.to_ascii_lowercase()),
        }
    }

    /// Inline elements flow inside a paragraph rather than stacking.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Tag::Span | Tag::A | Tag::Strong | Tag::Em | Tag::B | Tag::I | Tag::U | Tag::Br
        )
    }

    /// Elements whose content is raw text, not child markup.
    fn is_raw_text(&self) -> bool {
        matches!(self, Tag::Style | Tag::Script | Tag::Title)
    }

    /// Elements that never render and are dropped from the body flow.
    pub fn is_non_rendering(&self) -> bool {
        matches!(
            self,
            Tag::Style | Tag::Script | Tag::Title | Tag::Meta | Tag::Link | Tag::Head
        )
    }
}

/// HTML void elements: no children, no closing tag.
fn is_void_element(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "br" | "img" | "meta" | "link" | "hr" | "input" | "area" | "base" | "col" | "embed"
            | "source" | "track" | "wbr"
    )
}

/// A node in the DOM tree.
#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// Text, or an element that flows inline. Decides whether skipped
/// whitespace between siblings was a word gap.
fn is_inline_content(node: &DomNode) -> bool {
    match node {
        DomNode::Text(_) => true,
        DomNode::Element(e) => e.tag.is_inline(),
    }
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attr("style")
    }

    pub fn src(&self) -> Option<&str> {
        self.attr("src")
    }

    /// Concatenated raw text of the direct text children.
    fn raw_text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let DomNode::Text(t) = child {
                out.push_str(t);
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Document extraction
// ---------------------------------------------------------------------------

/// Parsed document split into the parts the pipeline cares about.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// `<title>` content, if any.
    pub title: Option<String>,
    /// Raw `<style>` payloads in document order; head blocks come before
    /// body blocks, so later blocks override earlier ones in the cascade.
    pub stylesheets: Vec<String>,
    /// Body flow with non-rendering elements stripped.
    pub body: Vec<DomNode>,
}

/// Parse a complete HTML document (or a bare fragment).
pub fn parse_document(html: &str) -> Document {
    let nodes = parse_html(html);
    let mut doc = Document::default();
    collect_metadata(&nodes, &mut doc);
    doc.body = strip_non_rendering(body_children(&nodes));
    doc
}

fn collect_metadata(nodes: &[DomNode], doc: &mut Document) {
    for node in nodes {
        if let DomNode::Element(e) = node {
            match &e.tag {
                Tag::Style => {
                    let css = e.raw_text();
                    if !css.trim().is_empty() {
                        doc.stylesheets.push(css);
                    }
                }
                Tag::Title => {
                    if doc.title.is_none() {
                        let t = e.raw_text().trim().to_string();
                        if !t.is_empty() {
                            doc.title = Some(t);
                        }
                    }
                }
                _ => collect_metadata(&e.children, doc),
            }
        }
    }
}

fn strip_non_rendering(nodes: Vec<DomNode>) -> Vec<DomNode> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            DomNode::Element(mut e) => {
                if e.tag.is_non_rendering() {
                    return None;
                }
                e.children = strip_non_rendering(e.children);
                Some(DomNode::Element(e))
            }
            text => Some(text),
        })
        .collect()
}

/// Find the `<body>` element and return its children, or all nodes if no
/// `<body>` is present (bare fragments).
pub fn body_children(nodes: &[DomNode]) -> Vec<DomNode> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Body {
                return e.children.clone();
            }
            if e.tag == Tag::Html {
                let inner = body_children(&e.children);
                if !inner.is_empty() {
                    return inner;
                }
            }
        }
    }
    nodes.to_vec()
}

// ---------------------------------------------------------------------------
// Parser – recursive descent with an open-tag stack for recovery
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of DOM nodes.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    parser.parse_nodes()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    /// Names of currently open elements, innermost last. Used to decide
    /// whether a closing tag belongs to an ancestor or is stray.
    open: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            open: Vec::new(),
        }
    }

    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        loop {
            let skipped_space = self.skip_whitespace_between_tags();
            if self.eof() {
                break;
            }
            if self.starts_with("</") {
                match self.peek_close_name() {
                    // A close tag for an open ancestor ends this level.
                    Some(name) if self.open.iter().any(|o| o.eq_ignore_ascii_case(&name)) => break,
                    // Stray close tag: drop it and keep going.
                    _ => {
                        self.consume_close_tag();
                        continue;
                    }
                }
            }
            if let Some(node) = self.parse_node() {
                // Whitespace between two inline siblings is a word gap:
                // "<strong>a</strong> <em>b</em>" must not fuse into "ab".
                if skipped_space
                    && is_inline_content(&node)
                    && nodes.last().is_some_and(is_inline_content)
                {
                    nodes.push(DomNode::Text(" ".to_string()));
                }
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_comment();
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            // Doctype / processing instructions
            while !self.eof() && !self.starts_with(">") {
                self.advance(1);
            }
            if !self.eof() {
                self.advance(1);
            }
            return None;
        }
        if self.starts_with("<") {
            Some(self.parse_element())
        } else {
            Some(self.parse_text())
        }
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        while !self.eof() && !self.starts_with("<") {
            self.advance(1);
        }
        let text = &self.input[start..self.pos];
        DomNode::Text(decode_entities(text))
    }

    fn parse_element(&mut self) -> DomNode {
        self.advance(1); // '<'
        let tag_name = self.parse_tag_name();
        let tag = Tag::from_name(&tag_name);
        let mut elem = ElementNode::new(tag.clone());

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let before = self.pos;
            let (key, value) = self.parse_attribute();
            if !key.is_empty() {
                elem.attributes.insert(key, value);
            }
            if self.pos == before {
                // Malformed attribute junk must not stall the parser.
                self.advance(1);
            }
        }

        if self.starts_with("/>") {
            self.advance(2);
            return DomNode::Element(elem);
        }
        if self.starts_with(">") {
            self.advance(1);
        }
        if is_void_element(&tag_name) {
            return DomNode::Element(elem);
        }

        if tag.is_raw_text() {
            let raw = self.parse_raw_text(&tag_name);
            let content = if tag == Tag::Title {
                decode_entities(&raw)
            } else {
                raw
            };
            if !content.is_empty() {
                elem.children.push(DomNode::Text(content));
            }
            return DomNode::Element(elem);
        }

        self.open.push(tag_name.clone());
        elem.children = self.parse_nodes();
        self.open.pop();

        // Consume our own closing tag; a mismatch is left for an ancestor.
        if self.at_close_tag_for(&tag_name) {
            self.consume_close_tag();
        }

        DomNode::Element(elem)
    }

    /// Consume raw content up to (but not including) `</name`, then the
    /// closing tag itself. Style and script payloads get no entity decoding.
    fn parse_raw_text(&mut self, name: &str) -> String {
        let start = self.pos;
        while !self.eof() && !self.at_close_tag_for(name) {
            self.advance(1);
        }
        let raw = self.input[start..self.pos].to_string();
        if !self.eof() {
            self.consume_close_tag();
        }
        raw
    }

    fn parse_tag_name(&mut self) -> String {
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' {
                self.advance(1);
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_tag_name().to_ascii_lowercase();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.advance(1);
        self.skip_whitespace();
        let value = self.parse_attr_value();
        (key, value)
    }

    fn parse_attr_value(&mut self) -> String {
        for quote in ['"', '\''] {
            if self.starts_with_char(quote) {
                self.advance(1);
                let start = self.pos;
                while !self.eof() && !self.starts_with_char(quote) {
                    self.advance(1);
                }
                let val = self.input[start..self.pos].to_string();
                if !self.eof() {
                    self.advance(1);
                }
                return decode_entities(&val);
            }
        }
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_whitespace() || c == '>' || c == '/' {
                break;
            }
            self.advance(1);
        }
        self.input[start..self.pos].to_string()
    }

    /// True when the cursor sits on `</name` followed by `>` or whitespace.
    fn at_close_tag_for(&self, name: &str) -> bool {
        if !self.starts_with("</") {
            return false;
        }
        let after = &self.input[self.pos + 2..];
        let Some(head) = after.get(..name.len()) else {
            return false;
        };
        if !head.eq_ignore_ascii_case(name) {
            return false;
        }
        match after[name.len()..].chars().next() {
            None | Some('>') => true,
            Some(c) => c.is_whitespace(),
        }
    }

    fn peek_close_name(&self) -> Option<String> {
        let after = &self.input[self.pos + 2..];
        let name: String = after
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    fn consume_close_tag(&mut self) {
        self.advance(2); // "</"
        self.parse_tag_name();
        self.skip_whitespace();
        if self.starts_with(">") {
            self.advance(1);
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
    }

    /// Skip a run of pure whitespace between elements, reverting if the run
    /// turns out to precede text content. Returns whether anything was
    /// skipped, so the caller can reinstate a word gap between inline
    /// siblings.
    fn skip_whitespace_between_tags(&mut self) -> bool {
        let saved = self.pos;
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
        if !self.eof() && !self.starts_with("<") {
            self.pos = saved;
            return false;
        }
        self.pos != saved
    }

    fn skip_comment(&mut self) {
        self.advance(4); // "<!--"
        while !self.eof() && !self.starts_with("-->") {
            self.advance(1);
        }
        if !self.eof() {
            self.advance(3);
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn starts_with_char(&self, c: char) -> bool {
        self.input[self.pos..].starts_with(c)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn advance(&mut self, n: usize) {
        // Advance by `n` characters (not bytes).
        for _ in 0..n {
            if let Some(c) = self.input[self.pos..].chars().next() {
                self.pos += c.len_utf8();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Decode named and numeric character references. Unknown references are
/// left verbatim.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        // An entity ends with ';' within a short window.
        let decoded = tail[1..]
            .char_indices()
            .take(10)
            .find(|(_, c)| *c == ';')
            .and_then(|(i, _)| decode_entity(&tail[1..1 + i]).map(|c| (c, i + 2)));
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "bull" => '\u{2022}',
        "middot" => '\u{00B7}',
        "copy" => '\u{00A9}',
        "reg" => '\u{00AE}',
        "trade" => '\u{2122}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "euro" => '\u{20AC}',
        "pound" => '\u{00A3}',
        "yen" => '\u{00A5}',
        "cent" => '\u{00A2}',
        "deg" => '\u{00B0}',
        "sect" => '\u{00A7}',
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse().ok()?
            } else {
                return None;
            };
            return char::from_u32(code);
        }
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(nodes: &[DomNode]) -> &ElementNode {
        match &nodes[0] {
            DomNode::Element(e) => e,
            DomNode::Text(t) => panic!("expected element, got text {t:?}"),
        }
    }

    fn flatten_text(e: &ElementNode) -> String {
        let mut out = String::new();
        for child in &e.children {
            match child {
                DomNode::Text(t) => out.push_str(t),
                DomNode::Element(e) => out.push_str(&flatten_text(e)),
            }
        }
        out
    }

    #[test]
    fn parse_simple_div() {
        let html = r#"<div class="totals highlight"><p>Hello</p></div>"#;
        let nodes = parse_html(html);
        assert_eq!(nodes.len(), 1);
        let e = first_element(&nodes);
        assert_eq!(e.tag, Tag::Div);
        assert_eq!(e.classes(), vec!["totals", "highlight"]);
        assert_eq!(e.children.len(), 1);
    }

    #[test]
    fn parse_void_elements() {
        let nodes = parse_html(r#"<p>line one<br>line two</p><img src="logo.png">"#);
        assert_eq!(nodes.len(), 2);
        let p = first_element(&nodes);
        assert_eq!(p.children.len(), 3);
        match &nodes[1] {
            DomNode::Element(img) => {
                assert_eq!(img.tag, Tag::Img);
                assert_eq!(img.src(), Some("logo.png"));
            }
            other => panic!("expected img, got {other:?}"),
        }
    }

    #[test]
    fn parse_table_with_sections() {
        let html = "<table><thead><tr><th>Item</th></tr></thead>\
                    <tbody><tr><td>Tea</td></tr><tr><td>Coffee</td></tr></tbody></table>";
        let nodes = parse_html(html);
        let table = first_element(&nodes);
        assert_eq!(table.tag, Tag::Table);
        assert_eq!(table.children.len(), 2);
        match &table.children[1] {
            DomNode::Element(tbody) => {
                assert_eq!(tbody.tag, Tag::Tbody);
                assert_eq!(tbody.children.len(), 2);
            }
            other => panic!("expected tbody, got {other:?}"),
        }
    }

    #[test]
    fn document_collects_styles_in_order() {
        let html = "<html><head><style>p { color: red; }</style></head>\
                    <body><style>p { color: blue; }</style><p>x</p></body></html>";
        let doc = parse_document(html);
        assert_eq!(doc.stylesheets.len(), 2);
        assert!(doc.stylesheets[0].contains("red"));
        assert!(doc.stylesheets[1].contains("blue"));
        // The style element itself is gone from the body flow.
        assert_eq!(doc.body.len(), 1);
        assert_eq!(first_element(&doc.body).tag, Tag::P);
    }

    #[test]
    fn document_title_and_fragment_body() {
        let doc = parse_document("<html><head><title>Price &amp; List</title></head><body><p>x</p></body></html>");
        assert_eq!(doc.title.as_deref(), Some("Price & List"));

        let fragment = parse_document("<p>standalone</p>");
        assert_eq!(fragment.body.len(), 1);
        assert!(fragment.title.is_none());
    }

    #[test]
    fn style_payload_is_not_entity_decoded() {
        let doc = parse_document("<style>td::before { content: \"&amp;\"; }</style><p>x</p>");
        assert!(doc.stylesheets[0].contains("&amp;"));
    }

    #[test]
    fn script_content_never_reaches_the_body() {
        let doc = parse_document("<body><script>if (a < b) { alert(1); }</script><p>x</p></body>");
        assert_eq!(doc.body.len(), 1);
        assert_eq!(first_element(&doc.body).tag, Tag::P);
    }

    #[test]
    fn unknown_tags_are_kept() {
        let nodes = parse_html("<article><p>inside</p></article>");
        let e = first_element(&nodes);
        assert_eq!(e.tag, Tag::Other("article".to_string()));
        assert_eq!(e.children.len(), 1);
    }

    #[test]
    fn stray_close_tag_is_dropped() {
        let nodes = parse_html("<div><p>one</p></span><p>two</p></div>");
        let div = first_element(&nodes);
        assert_eq!(div.tag, Tag::Div);
        assert_eq!(div.children.len(), 2);
    }

    #[test]
    fn unclosed_child_is_ended_by_ancestor_close() {
        let nodes = parse_html("<ul><li>one<li>two</ul><p>after</p>");
        assert_eq!(nodes.len(), 2);
        let ul = first_element(&nodes);
        assert_eq!(ul.tag, Tag::Ul);
        // The first li swallows the second as a child (no auto-close), but
        // the ul boundary still holds and trailing content survives.
        assert!(!ul.children.is_empty());
        match &nodes[1] {
            DomNode::Element(p) => assert_eq!(p.tag, Tag::P),
            other => panic!("expected p, got {other:?}"),
        }
    }

    #[test]
    fn space_between_inline_siblings_survives() {
        let nodes = parse_html("<p>See <strong>bold</strong> <em>italic</em> text</p>");
        let p = first_element(&nodes);
        assert_eq!(flatten_text(p), "See bold italic text");
    }

    #[test]
    fn whitespace_between_block_siblings_stays_dropped() {
        let nodes = parse_html("<div>\n  <p>one</p>\n  <p>two</p>\n</div>");
        let div = first_element(&nodes);
        assert_eq!(div.children.len(), 2);
        assert!(div
            .children
            .iter()
            .all(|c| matches!(c, DomNode::Element(_))));
    }

    #[test]
    fn entities_decode_including_numeric() {
        assert_eq!(decode_entities("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(decode_entities("&lt;b&gt;"), "<b>");
        assert_eq!(decode_entities("it&#x27;s &#8364;5"), "it's \u{20AC}5");
        assert_eq!(decode_entities("A &unknown; B"), "A &unknown; B");
        assert_eq!(decode_entities("50 & 60"), "50 & 60");
    }
}
