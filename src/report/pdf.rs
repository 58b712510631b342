use std::io::BufWriter;

use image::RgbImage;
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerIndex, PdfLayerReference, PdfPageIndex, Polygon, Px, Rgb,
};

use super::backend::{RenderBackend, RenderError};
use super::document::ReportDocument;
use super::draw::{Color, DrawCommand, FontWeight, Point, Rect, TextRun};
use super::geometry::PageGeometry;

const PT_TO_MM: f32 = 25.4 / 72.0;

/// Vector backend writing straight into a printpdf document with the builtin
/// Helvetica faces, so all text stays selectable and searchable.
pub struct PdfBackend {
    doc: PdfDocumentReference,
    width: f32,
    height: f32,
    first_page: Option<(PdfPageIndex, PdfLayerIndex)>,
    layer: Option<PdfLayerReference>,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    force_raster_tables: bool,
}

impl PdfBackend {
    pub fn new(title: &str, geometry: &PageGeometry, force_raster_tables: bool) -> Result<Self, RenderError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(geometry.width), Mm(geometry.height), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(|e| RenderError::Pdf(format!("font: {e}")))?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(|e| RenderError::Pdf(format!("font: {e}")))?;
        Ok(Self {
            doc,
            width: geometry.width,
            height: geometry.height,
            first_page: Some((page, layer)),
            layer: None,
            regular,
            bold,
            force_raster_tables,
        })
    }

    fn layer(&self) -> Result<&PdfLayerReference, RenderError> {
        self.layer.as_ref().ok_or(RenderError::NoPage)
    }

    fn point(&self, x: f32, y: f32) -> printpdf::Point {
        printpdf::Point::new(Mm(x), Mm(self.height - y))
    }

    fn draw_rect(&self, rect: Rect, fill: Option<Color>, stroke: Option<Color>) -> Result<(), RenderError> {
        let layer = self.layer()?;
        let points = vec![
            (self.point(rect.x, rect.y), false),
            (self.point(rect.x + rect.width, rect.y), false),
            (self.point(rect.x + rect.width, rect.bottom()), false),
            (self.point(rect.x, rect.bottom()), false),
        ];
        if let Some(color) = stroke {
            layer.set_outline_color(pdf_color(color));
            layer.set_outline_thickness(0.5);
        }
        match (fill, stroke) {
            (Some(color), _) => {
                layer.set_fill_color(pdf_color(color));
                let mode = if stroke.is_some() { PaintMode::FillStroke } else { PaintMode::Fill };
                layer.add_polygon(Polygon { rings: vec![points], mode, winding_order: WindingOrder::NonZero });
            }
            (None, Some(_)) => layer.add_line(printpdf::Line { points, is_closed: true }),
            (None, None) => {}
        }
        Ok(())
    }

    fn draw_text(&self, run: &TextRun) -> Result<(), RenderError> {
        let layer = self.layer()?;
        let font = match run.weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        };
        layer.set_fill_color(pdf_color(run.color));
        for (i, line) in run.lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let baseline = run.y + i as f32 * run.line_height;
            layer.use_text(line.as_str(), run.size_pt, Mm(run.x), Mm(self.height - baseline), font);
        }
        Ok(())
    }

    fn draw_line(&self, from: Point, to: Point, color: Color, thickness: f32) -> Result<(), RenderError> {
        let layer = self.layer()?;
        layer.set_outline_color(pdf_color(color));
        layer.set_outline_thickness(thickness);
        layer.add_line(printpdf::Line {
            points: vec![(self.point(from.x, from.y), false), (self.point(to.x, to.y), false)],
            is_closed: false,
        });
        Ok(())
    }
}

impl RenderBackend for PdfBackend {
    fn probe_tables(&self, document: &ReportDocument) -> Result<(), RenderError> {
        if self.force_raster_tables {
            return Err(RenderError::Capability("vector tables disabled by configuration".into()));
        }
        match document.table_text().flat_map(str::chars).find(|c| !builtin_encodable(*c)) {
            Some(c) => Err(RenderError::Capability(format!(
                "builtin fonts cannot encode {c:?} (U+{:04X})",
                c as u32
            ))),
            None => Ok(()),
        }
    }

    fn begin_page(&mut self, _page_number: usize) -> Result<(), RenderError> {
        let (page, layer) = match self.first_page.take() {
            Some(first) => first,
            None => self.doc.add_page(Mm(self.width), Mm(self.height), "Layer 1"),
        };
        self.layer = Some(self.doc.get_page(page).get_layer(layer));
        Ok(())
    }

    fn draw(&mut self, command: &DrawCommand) -> Result<(), RenderError> {
        match command {
            DrawCommand::Rect { rect, fill, stroke } => self.draw_rect(*rect, *fill, *stroke),
            DrawCommand::Line { from, to, color, thickness } => self.draw_line(*from, *to, *color, *thickness),
            DrawCommand::Text(run) => self.draw_text(run),
            DrawCommand::Raster { .. } => Err(RenderError::UnresolvedCommand("raster")),
            DrawCommand::PageNumber { .. } => Err(RenderError::UnresolvedCommand("page number")),
        }
    }

    fn place_raster(&mut self, raster: &RgbImage, rect: Rect) -> Result<(), RenderError> {
        let layer = self.layer()?.clone();
        let (width, height) = raster.dimensions();
        if width == 0 || height == 0 {
            return Ok(());
        }
        let image = Image::from(ImageXObject {
            width: Px(width as usize),
            height: Px(height as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: raster.as_raw().clone(),
            image_filter: None,
            clipping_bbox: None,
            smask: None,
        });
        // At 72 DPI one pixel is one point; scale from there to the target box.
        image.add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(rect.x)),
                translate_y: Some(Mm(self.height - rect.bottom())),
                scale_x: Some(rect.width / (width as f32 * PT_TO_MM)),
                scale_y: Some(rect.height / (height as f32 * PT_TO_MM)),
                dpi: Some(72.0),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>, RenderError> {
        let mut writer = BufWriter::new(Vec::new());
        self.doc.save(&mut writer).map_err(|e| RenderError::Pdf(e.to_string()))?;
        writer.into_inner().map_err(|e| RenderError::Pdf(format!("failed to finalize PDF: {e}")))
    }
}

/// Builtin fonts are written with WinAnsiEncoding: Latin-1 plus the
/// punctuation and letters WinAnsi maps into 0x80..=0x9F.
fn builtin_encodable(c: char) -> bool {
    c.is_whitespace()
        || matches!(c as u32, 0x20..=0x7E | 0xA0..=0xFF)
        || matches!(
            c,
            '€' | '‚' | 'ƒ' | '„' | '…' | '†' | '‡' | 'ˆ' | '‰' | 'Š' | '‹' | 'Œ' | 'Ž' | '‘' | '’' | '“' | '”' | '•'
                | '–' | '—' | '˜' | '™' | 'š' | '›' | 'œ' | 'ž' | 'Ÿ'
        )
}

fn pdf_color(color: Color) -> printpdf::Color {
    printpdf::Color::Rgb(Rgb::new(
        f32::from(color.r) / 255.0,
        f32::from(color.g) / 255.0,
        f32::from(color.b) / 255.0,
        None,
    ))
}
