//! Page-break layout for the report template.
//!
//! Pages are built in one forward pass: header band, optional metrics band
//! (first page only), table header, then rows until the next row would cross
//! the content bottom. Footers carry a `PageNumber` placeholder because the
//! page total is only known once the pass completes; `patch_page_numbers`
//! resolves them afterwards.

use chrono::Datelike;
use tracing::{debug, warn};

use super::document::ReportDocument;
use super::draw::{Color, DrawCommand, FontWeight, PageLayout, Point, Rect, TextRun};
use super::geometry::PageGeometry;
use super::measure::{measure, text_width, FontProfile};
use crate::models::{MetricsSet, ResultRow};

pub const TABLE_LABELS: [&str; 3] = ["User Query", "Generated Response", "Reference Answer"];
pub const RASTER_DISCLOSURE: &str = "Note: the results table was rendered as an image.";
pub const METRIC_PLACEHOLDER: &str = "-";

const TITLE_SIZE: f32 = 16.0;
const TIMESTAMP_SIZE: f32 = 10.0;
const SECTION_SIZE: f32 = 12.0;
const LABEL_SIZE: f32 = 10.0;
const METRIC_VALUE_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 9.0;
const FOOTER_SIZE: f32 = 8.0;

/// First baseline sits this far down its line box.
const BASELINE_SHARE: f32 = 0.75;

const SECTION_ADVANCE: f32 = 8.0;
const METRIC_NAME_ROW: f32 = 8.0;
const METRIC_VALUE_ROW: f32 = 10.0;
const METRICS_TRAILING_GAP: f32 = 8.0;

const HEADER_FILL: Color = Color::rgb(0, 102, 255);
const HEADER_RULE: Color = Color::rgb(0, 71, 179);
const HEADER_TEXT: Color = Color::gray(255);
const SECTION_TEXT: Color = Color::gray(70);
const BAND_FILL: Color = Color::gray(240);
const BAND_STROKE: Color = Color::gray(220);
const METRIC_VALUES_FILL: Color = Color::gray(250);
const METRIC_VALUE_TEXT: Color = Color::rgb(0, 102, 255);
const BODY_TEXT: Color = Color::gray(50);
pub(crate) const EVEN_ROW_FILL: Color = Color::gray(255);
pub(crate) const ODD_ROW_FILL: Color = Color::gray(245);
const FOOTER_FILL: Color = Color::gray(240);
const FOOTER_TEXT: Color = Color::gray(100);

/// Lays out the full report with the results table drawn as vector rows.
pub fn layout(document: &ReportDocument, geometry: &PageGeometry) -> Vec<PageLayout> {
    let mut pager = Paginator::new(document, geometry);
    pager.front_matter();
    pager.table_header();
    for (index, row) in document.rows().iter().enumerate() {
        pager.place_row(index, row);
    }
    pager.finish()
}

/// Lays out the report with the results table replaced by a `(width, height)`
/// pixel snapshot, scaled to the content width and sliced across pages.
pub fn layout_raster_table(document: &ReportDocument, geometry: &PageGeometry, snapshot: (u32, u32)) -> Vec<PageLayout> {
    let (px_width, px_height) = snapshot;
    let mut pager = Paginator::new(document, geometry);
    pager.front_matter();

    if px_width > 0 {
        let mm_per_px = geometry.content_width() / px_width as f32;
        let mut src_y = 0;
        while src_y < px_height {
            let available = geometry.content_bottom() - pager.cursor;
            let fits = (available / mm_per_px).floor().max(0.0) as u32;
            if fits == 0 && !pager.is_fresh() {
                pager.break_page(false);
                continue;
            }
            let src_height = fits.max(1).min(px_height - src_y);
            let rect = Rect::new(geometry.margin, pager.cursor, geometry.content_width(), src_height as f32 * mm_per_px);
            pager.push(DrawCommand::Raster { rect, src_y, src_height });
            pager.cursor = rect.bottom();
            src_y += src_height;
            if src_y < px_height {
                pager.break_page(false);
            }
        }
    }

    if pager.cursor + geometry.line_height > geometry.content_bottom() {
        pager.break_page(false);
    }
    pager.cursor += geometry.line_height;
    let (x, y) = (geometry.margin, pager.cursor);
    pager.push(label(x, y, RASTER_DISCLOSURE, BODY_SIZE, FontWeight::Regular, SECTION_TEXT));
    pager.finish()
}

/// `0.923` -> `"92.3%"`. Missing, NaN and out-of-range values become a dash.
pub fn format_percentage(value: Option<f64>) -> String {
    match value {
        Some(v) if (0.0..=1.0).contains(&v) => format!("{:.1}%", (v * 1000.0).round() / 10.0),
        other => {
            warn!(value = ?other, "invalid metric value, rendering placeholder");
            METRIC_PLACEHOLDER.to_string()
        }
    }
}

/// Replaces every footer `PageNumber` placeholder with its final
/// "Page X of N" text, right-aligned on the placeholder's anchor.
pub fn patch_page_numbers(pages: &mut [PageLayout]) {
    let total = pages.len();
    let footer = profile(FOOTER_SIZE);
    for command in pages.iter_mut().flat_map(|p| p.commands.iter_mut()) {
        let resolved = match command {
            DrawCommand::PageNumber { right, baseline, page } => {
                let text = format!("Page {page} of {total}");
                let x = *right - text_width(&text, &footer);
                label(x, *baseline, &text, FOOTER_SIZE, FontWeight::Regular, FOOTER_TEXT)
            }
            _ => continue,
        };
        *command = resolved;
    }
}

fn profile(size_pt: f32) -> FontProfile {
    // 1.2 x font size, in mm
    FontProfile::proportional(size_pt, size_pt * 1.2 * 25.4 / 72.0)
}

fn label(x: f32, y: f32, text: &str, size_pt: f32, weight: FontWeight, color: Color) -> DrawCommand {
    DrawCommand::Text(TextRun {
        x,
        y,
        lines: vec![text.to_string()],
        size_pt,
        weight,
        color,
        line_height: profile(size_pt).line_height,
    })
}

struct Paginator<'a> {
    document: &'a ReportDocument,
    geometry: &'a PageGeometry,
    body: FontProfile,
    pages: Vec<PageLayout>,
    current: PageLayout,
    cursor: f32,
}

impl<'a> Paginator<'a> {
    fn new(document: &'a ReportDocument, geometry: &'a PageGeometry) -> Self {
        let mut pager = Self {
            document,
            geometry,
            body: FontProfile::proportional(BODY_SIZE, geometry.line_height),
            pages: Vec::new(),
            current: PageLayout::new(1, 0),
            cursor: 0.0,
        };
        pager.header_band(false);
        pager
    }

    fn push(&mut self, command: DrawCommand) {
        self.current.commands.push(command);
    }

    /// A continuation page on which nothing has been placed below its header yet.
    fn is_fresh(&self) -> bool {
        self.current.page_number > 1 && self.current.rows.is_empty() && self.cursor <= self.geometry.content_top() + self.geometry.table_header_height
    }

    fn header_band(&mut self, continued: bool) {
        let g = self.geometry;
        self.push(DrawCommand::Rect {
            rect: Rect::new(0.0, 0.0, g.width, g.header_band_height),
            fill: Some(HEADER_FILL),
            stroke: None,
        });

        let baseline = g.header_band_height * 0.65;
        let title = if continued {
            format!("{} (Continued)", self.document.title())
        } else {
            self.document.title().to_string()
        };
        self.push(label(g.margin, baseline, &title, TITLE_SIZE, FontWeight::Bold, HEADER_TEXT));

        let stamp = format!("Generated: {}", self.document.generated_at().format("%Y-%m-%d %H:%M:%S UTC"));
        let x = g.width - g.margin - text_width(&stamp, &profile(TIMESTAMP_SIZE));
        self.push(label(x, baseline, &stamp, TIMESTAMP_SIZE, FontWeight::Regular, HEADER_TEXT));

        self.push(DrawCommand::Line {
            from: Point { x: 0.0, y: g.header_band_height },
            to: Point { x: g.width, y: g.header_band_height },
            color: HEADER_RULE,
            thickness: 0.8,
        });
        self.cursor = g.content_top();
    }

    fn section_label(&mut self, text: &str) {
        self.push(label(self.geometry.margin, self.cursor, text, SECTION_SIZE, FontWeight::Bold, SECTION_TEXT));
        self.cursor += SECTION_ADVANCE;
    }

    /// Metrics band and the results section label; first page only.
    fn front_matter(&mut self) {
        if let Some(metrics) = self.document.metrics() {
            self.metrics_band(metrics);
        }
        self.section_label("Results Table");
    }

    fn metrics_band(&mut self, metrics: &MetricsSet) {
        self.section_label("Evaluation Metrics");
        let g = self.geometry;
        let column = g.content_width() / metrics.len() as f32;

        self.push(DrawCommand::Rect {
            rect: Rect::new(g.margin, self.cursor, g.content_width(), METRIC_NAME_ROW),
            fill: Some(BAND_FILL),
            stroke: Some(BAND_STROKE),
        });
        let baseline = self.cursor + 5.5;
        for (i, (name, _)) in metrics.iter().enumerate() {
            let x = g.margin + g.cell_padding + column * i as f32;
            self.push(label(x, baseline, name, LABEL_SIZE, FontWeight::Bold, SECTION_TEXT));
        }
        self.cursor += METRIC_NAME_ROW;

        self.push(DrawCommand::Rect {
            rect: Rect::new(g.margin, self.cursor, g.content_width(), METRIC_VALUE_ROW),
            fill: Some(METRIC_VALUES_FILL),
            stroke: Some(BAND_STROKE),
        });
        let baseline = self.cursor + 6.5;
        for (i, (_, value)) in metrics.iter().enumerate() {
            let x = g.margin + g.cell_padding + column * i as f32;
            let text = format_percentage(value);
            self.push(label(x, baseline, &text, METRIC_VALUE_SIZE, FontWeight::Bold, METRIC_VALUE_TEXT));
        }
        self.cursor += METRIC_VALUE_ROW + METRICS_TRAILING_GAP;
    }

    fn table_header(&mut self) {
        let g = self.geometry;
        self.push(DrawCommand::Rect {
            rect: Rect::new(g.margin, self.cursor, g.content_width(), g.table_header_height),
            fill: Some(BAND_FILL),
            stroke: Some(BAND_STROKE),
        });
        let baseline = self.cursor + g.table_header_height * 0.6;
        for ((x, _), text) in g.columns().into_iter().zip(TABLE_LABELS) {
            self.push(label(x + g.cell_padding, baseline, text, LABEL_SIZE, FontWeight::Bold, SECTION_TEXT));
        }
        self.cursor += g.table_header_height;
    }

    fn footer_band(&mut self) {
        let g = self.geometry;
        self.push(DrawCommand::Rect {
            rect: Rect::new(0.0, g.height - g.footer_band_height, g.width, g.footer_band_height),
            fill: Some(FOOTER_FILL),
            stroke: None,
        });
        let baseline = g.height - g.footer_band_height * 0.3;
        let copyright = format!("© {} ARGUS RAG Evaluation System", self.document.generated_at().year());
        self.push(label(g.margin, baseline, &copyright, FOOTER_SIZE, FontWeight::Regular, FOOTER_TEXT));
        let page = self.current.page_number;
        self.push(DrawCommand::PageNumber { right: g.width - g.margin, baseline, page });
    }

    fn break_page(&mut self, with_table_header: bool) {
        self.footer_band();
        let next = PageLayout::new(self.current.page_number + 1, self.current.rows.end);
        let done = std::mem::replace(&mut self.current, next);
        debug!(page = done.page_number, rows = done.rows.len(), "page closed");
        self.pages.push(done);
        self.header_band(true);
        if with_table_header {
            self.table_header();
        }
    }

    fn place_row(&mut self, index: usize, row: &ResultRow) {
        let g = self.geometry;
        let columns = g.columns();
        let cells: Vec<_> = [&row.query, &row.response, &row.reference]
            .into_iter()
            .zip(columns)
            .map(|(text, (_, width))| measure(text, width - 2.0 * g.cell_padding, &self.body))
            .collect();
        let row_height = cells.iter().map(|m| m.height).fold(g.min_row_height, f32::max);

        // A row taller than a whole page still has to go somewhere; placing it
        // on an empty continuation page avoids breaking forever.
        if self.cursor + row_height > g.content_bottom() && !self.is_fresh() {
            self.break_page(true);
        }

        let fill = if index % 2 == 0 { EVEN_ROW_FILL } else { ODD_ROW_FILL };
        self.push(DrawCommand::Rect {
            rect: Rect::new(g.margin, self.cursor, g.content_width(), row_height),
            fill: Some(fill),
            stroke: Some(BAND_STROKE),
        });
        for ((x, _), cell) in columns.into_iter().zip(cells) {
            // The block starts `cell_padding` down, pulled up as far as needed
            // to keep its last line inside the row.
            let inset = g.cell_padding.min(row_height - cell.height).max(0.0);
            self.push(DrawCommand::Text(TextRun {
                x: x + g.cell_padding,
                y: self.cursor + inset + g.line_height * BASELINE_SHARE,
                lines: cell.lines,
                size_pt: BODY_SIZE,
                weight: FontWeight::Regular,
                color: BODY_TEXT,
                line_height: g.line_height,
            }));
        }
        self.current.rows.end = index + 1;
        self.cursor += row_height;
    }

    fn finish(mut self) -> Vec<PageLayout> {
        self.footer_band();
        self.pages.push(self.current);
        patch_page_numbers(&mut self.pages);
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn doc(rows: Vec<ResultRow>, metrics: Option<MetricsSet>) -> ReportDocument {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        ReportDocument::new("ARGUS RAG Evaluation Results", at, metrics, rows)
    }

    fn short_rows(n: usize) -> Vec<ResultRow> {
        (0..n).map(|i| ResultRow::new(format!("Query {i}"), format!("Answer {i}"), format!("Reference {i}"))).collect()
    }

    fn three_metrics() -> MetricsSet {
        [("Context Recall", 0.4), ("Faithfulness", 0.92), ("Factual Correctness", 0.88)].into_iter().collect()
    }

    fn random_rows(seed: u64, n: usize) -> Vec<ResultRow> {
        let mut rng = StdRng::seed_from_u64(seed);
        // at most ~25 wrapped lines per cell, so any row fits on one page
        fn text(rng: &mut StdRng) -> String {
            let words = rng.gen_range(0..50);
            (0..words).map(|_| "w".repeat(rng.gen_range(1..12))).collect::<Vec<_>>().join(" ")
        }
        (0..n).map(|_| ResultRow::new(text(&mut rng), text(&mut rng), text(&mut rng))).collect()
    }

    /// Row background rectangles on a page, as (top, height, fill).
    fn row_rects(page: &PageLayout) -> Vec<(f32, f32, Color)> {
        page.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Rect { rect, fill: Some(fill), .. } if *fill == EVEN_ROW_FILL || *fill == ODD_ROW_FILL => {
                    Some((rect.y, rect.height, *fill))
                }
                _ => None,
            })
            .collect()
    }

    fn body_runs(page: &PageLayout) -> usize {
        page.texts().filter(|t| t.size_pt == BODY_SIZE && t.color == BODY_TEXT).count()
    }

    fn footer_labels(pages: &[PageLayout]) -> Vec<String> {
        pages
            .iter()
            .flat_map(|p| p.texts().flat_map(|t| t.lines.iter()).filter(|l| l.starts_with("Page ")).cloned())
            .collect()
    }

    #[test]
    fn every_row_lands_on_exactly_one_page_in_order() {
        let rows = random_rows(7, 60);
        let pages = layout(&doc(rows, Some(three_metrics())), &PageGeometry::default());
        assert!(pages.len() > 1);

        let mut next = 0;
        for page in &pages {
            assert_eq!(page.rows.start, next);
            next = page.rows.end;
        }
        assert_eq!(next, 60);
        assert_eq!(pages.iter().map(|p| p.rows.len()).sum::<usize>(), 60);
    }

    #[test]
    fn rows_are_never_split_across_pages() {
        let pages = layout(&doc(random_rows(11, 40), None), &PageGeometry::default());
        for page in &pages {
            assert_eq!(row_rects(page).len(), page.rows.len());
            assert_eq!(body_runs(page), 3 * page.rows.len());
        }
    }

    #[test]
    fn identical_inputs_give_identical_pages() {
        let rows = random_rows(3, 25);
        let a = layout(&doc(rows.clone(), Some(three_metrics())), &PageGeometry::default());
        let b = layout(&doc(rows, Some(three_metrics())), &PageGeometry::default());
        assert_eq!(a, b);
    }

    #[test]
    fn rows_stay_inside_the_content_area() {
        let g = PageGeometry::default();
        for page in layout(&doc(random_rows(5, 50), Some(three_metrics())), &g) {
            for (top, height, _) in row_rects(&page) {
                assert!(top + height <= g.content_bottom() + 1e-3);
            }
        }
    }

    #[test]
    fn row_ending_exactly_on_content_bottom_stays() {
        // No metrics: rows start at 30 + 8 (section label) + 10 (table header) = 48.
        // Six 20mm rows end at 168 == content bottom for a 193mm page.
        let exact = PageGeometry { height: 193.0, ..PageGeometry::default() };
        assert_eq!(exact.content_bottom(), 168.0);
        let pages = layout(&doc(short_rows(7), None), &exact);
        assert_eq!(pages[0].rows, 0..6);
        assert_eq!(pages[1].rows, 6..7);

        let short = PageGeometry { height: 192.9, ..PageGeometry::default() };
        let pages = layout(&doc(short_rows(7), None), &short);
        assert_eq!(pages[0].rows, 0..5);
    }

    #[test]
    fn five_rows_three_per_page() {
        // First page content: 30 + 8 label + 8 names + 18 values + 8 label + 10 header = 82,
        // three rows end at 142; content bottom 150 leaves no room for a fourth.
        let g = PageGeometry { height: 175.0, ..PageGeometry::default() };
        let pages = layout(&doc(short_rows(5), Some(three_metrics())), &g);
        assert_eq!(pages.len(), 2);

        let (first, second) = (&pages[0], &pages[1]);
        assert_eq!(first.page_number, 1);
        assert_eq!(first.rows, 0..3);
        assert!(first.contains_text("ARGUS RAG Evaluation Results"));
        assert!(!first.contains_text("(Continued)"));
        assert!(first.contains_text("Generated: 2026-10-19 12:00:00 UTC"));
        assert!(first.contains_text("Evaluation Metrics"));
        assert!(first.contains_text("92.0%"));
        assert!(TABLE_LABELS.iter().all(|l| first.contains_text(l)));
        assert!(first.contains_text("Page 1 of 2"));

        assert_eq!(second.page_number, 2);
        assert_eq!(second.rows, 3..5);
        assert!(second.contains_text("ARGUS RAG Evaluation Results (Continued)"));
        assert!(!second.contains_text("Evaluation Metrics"));
        assert!(TABLE_LABELS.iter().all(|l| second.contains_text(l)));
        assert!(second.contains_text("Page 2 of 2"));
        assert!(second.contains_text("© 2026 ARGUS RAG Evaluation System"));
    }

    #[test]
    fn tall_row_moves_whole_to_a_fresh_page() {
        // 30 'x' glyphs at 9pt are ~47.6mm: two never share a 92.7mm response line.
        let token = "x".repeat(30);
        let response = vec![token.as_str(); 6].join(" ");
        let mut rows = short_rows(6);
        rows.push(ResultRow::new("Long one", response, "ref"));

        let g = PageGeometry::default();
        let pages = layout(&doc(rows, None), &g);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].rows, 0..6);
        assert_eq!(pages[1].rows, 6..7);

        let rects = row_rects(&pages[1]);
        assert_eq!(rects.len(), 1);
        let (top, height, fill) = rects[0];
        assert_eq!(height, 6.0 * g.line_height);
        assert_eq!(top, g.content_top() + g.table_header_height);
        assert_eq!(fill, EVEN_ROW_FILL);
        assert!(pages[1].texts().any(|t| t.lines.len() == 6));
    }

    #[test]
    fn cell_text_stays_inside_its_row() {
        let g = PageGeometry::default();
        let token = "x".repeat(30);
        let mut rows = random_rows(13, 30);
        rows.push(ResultRow::new("Long one", vec![token.as_str(); 6].join(" "), "ref"));
        for page in layout(&doc(rows, None), &g) {
            let mut row_bottom = None;
            for command in &page.commands {
                match command {
                    DrawCommand::Rect { rect, fill: Some(fill), .. } if *fill == EVEN_ROW_FILL || *fill == ODD_ROW_FILL => {
                        row_bottom = Some((rect.y, rect.bottom()));
                    }
                    DrawCommand::Text(run) if run.size_pt == BODY_SIZE && run.color == BODY_TEXT => {
                        let (top, bottom) = row_bottom.unwrap();
                        let last = run.y + (run.lines.len() - 1) as f32 * run.line_height;
                        assert!(run.y > top);
                        assert!(last <= bottom + 1e-3, "baseline {last} below row bottom {bottom}");
                    }
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn row_taller_than_a_page_does_not_loop() {
        let huge = vec!["word"; 4000].join(" ");
        let rows = vec![ResultRow::new("q", huge, "r"), ResultRow::new("q2", "a2", "r2")];
        let pages = layout(&doc(rows, None), &PageGeometry::default());
        let placed: usize = pages.iter().map(|p| p.rows.len()).sum();
        assert_eq!(placed, 2);
        assert!(pages.len() <= 3);
    }

    #[test]
    fn fills_alternate_by_original_index() {
        let g = PageGeometry { height: 175.0, ..PageGeometry::default() };
        let pages = layout(&doc(short_rows(5), Some(three_metrics())), &g);
        let fills: Vec<Color> = pages.iter().flat_map(|p| row_rects(p).into_iter().map(|r| r.2)).collect();
        assert_eq!(fills, vec![EVEN_ROW_FILL, ODD_ROW_FILL, EVEN_ROW_FILL, ODD_ROW_FILL, EVEN_ROW_FILL]);
    }

    #[test]
    fn footers_count_one_to_n() {
        let pages = layout(&doc(random_rows(21, 70), Some(three_metrics())), &PageGeometry::default());
        let n = pages.len();
        let expected: Vec<String> = (1..=n).map(|i| format!("Page {i} of {n}")).collect();
        assert_eq!(footer_labels(&pages), expected);
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(page.page_number, i + 1);
            assert!(!page.commands.iter().any(|c| matches!(c, DrawCommand::PageNumber { .. })));
        }
    }

    #[test]
    fn metrics_columns_divide_width_by_count() {
        let metrics: MetricsSet = (0..5).map(|i| (format!("m{i}"), 0.5)).collect();
        let g = PageGeometry::default();
        let pages = layout(&doc(short_rows(1), Some(metrics)), &g);
        let xs: Vec<f32> = pages[0]
            .texts()
            .filter(|t| t.lines[0].starts_with('m'))
            .map(|t| t.x)
            .collect();
        assert_eq!(xs.len(), 5);
        for (i, x) in xs.iter().enumerate() {
            let expected = g.margin + g.cell_padding + g.content_width() / 5.0 * i as f32;
            assert!((x - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn empty_metrics_are_skipped() {
        let pages = layout(&doc(short_rows(2), Some(MetricsSet::new())), &PageGeometry::default());
        assert!(!pages[0].contains_text("Evaluation Metrics"));
    }

    #[test]
    fn percentages() {
        assert_eq!(format_percentage(Some(0.923)), "92.3%");
        assert_eq!(format_percentage(Some(0.0)), "0.0%");
        assert_eq!(format_percentage(Some(1.0)), "100.0%");
        assert_eq!(format_percentage(Some(0.88)), "88.0%");
        assert_eq!(format_percentage(Some(0.4)), "40.0%");
        for bad in [None, Some(f64::NAN), Some(-0.1), Some(1.2), Some(f64::INFINITY)] {
            assert_eq!(format_percentage(bad), METRIC_PLACEHOLDER);
        }
    }

    fn raster_slices(pages: &[PageLayout]) -> Vec<(usize, u32, u32, Rect)> {
        pages
            .iter()
            .flat_map(|p| {
                p.commands.iter().filter_map(move |c| match c {
                    DrawCommand::Raster { rect, src_y, src_height } => Some((p.page_number, *src_y, *src_height, *rect)),
                    _ => None,
                })
            })
            .collect()
    }

    #[test]
    fn raster_table_is_sliced_across_pages() {
        let g = PageGeometry::default();
        let pages = layout_raster_table(&doc(short_rows(40), Some(three_metrics())), &g, (1000, 3000));
        let slices = raster_slices(&pages);
        assert!(pages.len() >= 5);

        let mut next = 0;
        for (_, src_y, src_height, rect) in &slices {
            assert_eq!(*src_y, next);
            next += src_height;
            assert_eq!(rect.width, g.content_width());
            assert!(rect.bottom() <= g.content_bottom() + 1e-3);
        }
        assert_eq!(next, 3000);

        let last = pages.last().unwrap();
        assert!(last.contains_text(RASTER_DISCLOSURE));
        assert!(pages[0].contains_text("Evaluation Metrics"));
        assert!(pages[1].contains_text("(Continued)"));
        assert!(!pages[1].contains_text("User Query"));
        assert_eq!(footer_labels(&pages).len(), pages.len());
        assert!(pages.iter().all(|p| p.rows.is_empty()));
    }

    #[test]
    fn small_snapshot_fits_on_first_page() {
        let pages = layout_raster_table(&doc(short_rows(3), None), &PageGeometry::default(), (800, 200));
        assert_eq!(pages.len(), 1);
        let slices = raster_slices(&pages);
        assert_eq!(slices.len(), 1);
        let (_, _, _, rect) = slices[0];
        // aspect ratio preserved: 267mm wide -> 66.75mm tall
        assert!((rect.height - 66.75).abs() < 1e-3);
        assert!(pages[0].contains_text(RASTER_DISCLOSURE));
    }
}
