//! Text measurement for the built-in PDF fonts.
//!
//! The writer only ever uses the standard fourteen PDF fonts, so no font
//! files are parsed. Widths come from the Adobe AFM advance tables for
//! Helvetica and Helvetica-Bold (1/1000 em); the serif and monospace
//! families are derived from those. Oblique variants share the upright
//! advances, so there is no italic dimension here.

/// One of the three built-in font families the PDF writer can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontFamily {
    /// Helvetica.
    #[default]
    Sans,
    /// Times.
    Serif,
    /// Courier.
    Mono,
}

impl FontFamily {
    /// Map a CSS `font-family` list onto a built-in family. The first
    /// recognised name wins; anything unrecognised falls through to the
    /// next entry, and an exhausted list defaults to sans.
    pub fn from_css(value: &str) -> Self {
        for name in value.split(',') {
            let name = name
                .trim()
                .trim_matches(|c| c == '"' || c == '\'')
                .to_ascii_lowercase();
            match name.as_str() {
                "helvetica" | "arial" | "verdana" | "sans-serif" => return FontFamily::Sans,
                "times" | "times new roman" | "georgia" | "serif" => return FontFamily::Serif,
                "courier" | "courier new" | "monospace" => return FontFamily::Mono,
                _ => {}
            }
        }
        FontFamily::Sans
    }
}

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, //
    278, 278, 556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, //
    584, 584, 584, 556, 1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, //
    500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944, //
    667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556, //
    278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500, //
    278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, //
    278, 278, 556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, //
    584, 584, 584, 611, 975, 722, 722, 722, 722, 667, 611, 778, 722, 278, //
    556, 722, 611, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944, //
    667, 667, 611, 333, 278, 333, 584, 556, 333, 556, 611, 556, 611, 556, //
    333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389, 556, //
    333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Times runs narrower than Helvetica; a flat factor is close enough for
/// line breaking (the writer never positions individual glyphs).
const SERIF_FACTOR: f32 = 0.90;
/// Courier is fixed-pitch at 600/1000 em.
const MONO_ADVANCE: f32 = 600.0;
/// Fallback for characters outside the table.
const DEFAULT_ADVANCE: f32 = 556.0;

fn advance_units(c: char, family: FontFamily, bold: bool) -> f32 {
    if family == FontFamily::Mono {
        return MONO_ADVANCE;
    }
    let base = match c {
        ' '..='~' => {
            let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
            table[c as usize - 32] as f32
        }
        '\u{00A0}' => 278.0,
        '\u{2022}' => 350.0,
        _ => DEFAULT_ADVANCE,
    };
    match family {
        FontFamily::Serif => base * SERIF_FACTOR,
        _ => base,
    }
}

/// Width of `text` at `size` points, in points.
pub fn text_width(text: &str, size: f32, family: FontFamily, bold: bool) -> f32 {
    let units: f32 = text.chars().map(|c| advance_units(c, family, bold)).sum();
    units * size / 1000.0
}

/// Line height in points for a font size and a unitless factor.
pub fn line_height(size: f32, factor: f32) -> f32 {
    size * factor
}

/// Word-wrap `text` to fit within `max_width` points. Explicit newlines are
/// hard breaks; within a segment the wrap is greedy on whitespace. A word
/// wider than the line is emitted on its own line rather than split.
pub fn wrap(text: &str, size: f32, family: FontFamily, bold: bool, max_width: f32) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    for segment in text.split('\n') {
        let words: Vec<&str> = segment.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in &words {
            let candidate = if current.is_empty() {
                (*word).to_string()
            } else {
                format!("{current} {word}")
            };
            if text_width(&candidate, size, family, bold) > max_width && !current.is_empty() {
                lines.push(current);
                current = (*word).to_string();
            } else {
                current = candidate;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_share_a_width() {
        let zeros = text_width("000", 12.0, FontFamily::Sans, false);
        let nines = text_width("999", 12.0, FontFamily::Sans, false);
        assert!((zeros - nines).abs() < f32::EPSILON, "{zeros} vs {nines}");
    }

    #[test]
    fn narrow_glyphs_measure_narrower() {
        let narrow = text_width("il", 12.0, FontFamily::Sans, false);
        let wide = text_width("mw", 12.0, FontFamily::Sans, false);
        assert!(narrow < wide, "{narrow} not < {wide}");
    }

    #[test]
    fn bold_is_wider_than_regular() {
        let regular = text_width("illustration", 12.0, FontFamily::Sans, false);
        let bold = text_width("illustration", 12.0, FontFamily::Sans, true);
        assert!(bold > regular);
    }

    #[test]
    fn mono_is_fixed_pitch() {
        let a = text_width("iii", 10.0, FontFamily::Mono, false);
        let b = text_width("mmm", 10.0, FontFamily::Mono, false);
        assert!((a - b).abs() < f32::EPSILON);
        assert!((a - 3.0 * 6.0).abs() < 0.01);
    }

    #[test]
    fn css_family_mapping() {
        assert_eq!(FontFamily::from_css("Helvetica, Arial, sans-serif"), FontFamily::Sans);
        assert_eq!(FontFamily::from_css("\"Times New Roman\", serif"), FontFamily::Serif);
        assert_eq!(FontFamily::from_css("Courier New"), FontFamily::Mono);
        assert_eq!(FontFamily::from_css("Comic Sans MS"), FontFamily::Sans);
    }

    #[test]
    fn wrap_splits_long_text() {
        let lines = wrap("alpha beta gamma delta", 12.0, FontFamily::Sans, false, 50.0);
        assert!(lines.len() >= 2, "expected wrapping, got {lines:?}");
    }

    #[test]
    fn wrap_honours_hard_breaks() {
        let lines = wrap("first\nsecond", 12.0, FontFamily::Sans, false, 500.0);
        assert_eq!(lines, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn oversized_word_gets_its_own_line() {
        let lines = wrap("a incomprehensibilities b", 12.0, FontFamily::Sans, false, 40.0);
        assert!(lines.iter().any(|l| l == "incomprehensibilities"), "{lines:?}");
    }
}
