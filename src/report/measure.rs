//! Text measurement: greedy word wrap against estimated glyph advances.
//!
//! Widths are estimated from static advance tables rather than real font
//! files, which is exact for the PDF builtin Helvetica and Courier faces the
//! report is drawn with.

use tracing::warn;

const PT_TO_MM: f32 = 25.4 / 72.0;

/// Courier advance in 1/1000 em.
const MONOSPACE_ADVANCE: u16 = 600;

/// Helvetica advance for characters outside printable ASCII.
const FALLBACK_ADVANCE: u16 = 556;

/// Helvetica AFM advances for ' ' (0x20) through '~' (0x7E).
const HELVETICA_ADVANCES: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFamily {
    Proportional,
    Monospace,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontProfile {
    pub size_pt: f32,
    pub family: FontFamily,
    /// Baseline-to-baseline distance in mm.
    pub line_height: f32,
}

impl FontProfile {
    pub fn proportional(size_pt: f32, line_height: f32) -> Self {
        Self { size_pt, family: FontFamily::Proportional, line_height }
    }

    fn advance(&self, c: char) -> u16 {
        match self.family {
            FontFamily::Monospace => MONOSPACE_ADVANCE,
            FontFamily::Proportional => match c {
                ' '..='~' => HELVETICA_ADVANCES[c as usize - 0x20],
                _ => FALLBACK_ADVANCE,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Measured {
    pub lines: Vec<String>,
    pub height: f32,
}

impl Measured {
    fn empty(profile: &FontProfile) -> Self {
        Self { lines: vec![String::new()], height: profile.line_height }
    }
}

/// Rendered width of `text` in mm on a single line.
pub fn text_width(text: &str, profile: &FontProfile) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(profile.advance(c))).sum();
    units as f32 / 1000.0 * profile.size_pt * PT_TO_MM
}

/// Wraps `text` into lines no wider than `max_width` mm. A token that is wider
/// than `max_width` on its own occupies a line by itself and is never split.
pub fn measure(text: &str, max_width: f32, profile: &FontProfile) -> Measured {
    if !max_width.is_finite() || max_width <= 0.0 {
        warn!(max_width, "invalid wrap width, rendering cell as an empty line");
        return Measured::empty(profile);
    }

    let space = text_width(" ", profile);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0_f32;

    for token in text.split_whitespace() {
        let token_width = text_width(token, profile);
        if current.is_empty() {
            current.push_str(token);
            current_width = token_width;
        } else if current_width + space + token_width <= max_width {
            current.push(' ');
            current.push_str(token);
            current_width += space + token_width;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(token);
            current_width = token_width;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        return Measured::empty(profile);
    }

    let height = lines.len() as f32 * profile.line_height;
    Measured { lines, height }
}
