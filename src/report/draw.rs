//! Positioned drawing primitives produced by the layout engine.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Top-left anchored rectangle in page space (mm, y downward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn bottom(&self) -> f32 { self.y + self.height }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self { Self { r, g, b } }

    pub const fn gray(v: u8) -> Self { Self::rgb(v, v, v) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    /// Baseline of the first line.
    pub y: f32,
    pub lines: Vec<String>,
    pub size_pt: f32,
    pub weight: FontWeight,
    pub color: Color,
    pub line_height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Rect { rect: Rect, fill: Option<Color>, stroke: Option<Color> },
    Line { from: Point, to: Point, color: Color, thickness: f32 },
    Text(TextRun),
    /// Horizontal slice `src_y..src_y + src_height` (pixels) of the table
    /// snapshot, stretched into `rect`.
    Raster { rect: Rect, src_y: u32, src_height: u32 },
    /// Footer page counter whose total is not known yet. Replaced by a
    /// `Text` run before the page is rendered.
    PageNumber { right: f32, baseline: f32, page: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub page_number: usize,
    pub commands: Vec<DrawCommand>,
    /// Indices of the result rows placed on this page.
    pub rows: Range<usize>,
}

impl PageLayout {
    pub fn new(page_number: usize, first_row: usize) -> Self {
        Self { page_number, commands: Vec::new(), rows: first_row..first_row }
    }

    #[cfg(test)]
    pub fn texts(&self) -> impl Iterator<Item = &TextRun> + '_ {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text(run) => Some(run),
            _ => None,
        })
    }

    #[cfg(test)]
    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().any(|run| run.lines.iter().any(|l| l.contains(needle)))
    }
}
