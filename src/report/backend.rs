use image::RgbImage;
use thiserror::Error;
use tracing::debug;

use super::document::ReportDocument;
use super::draw::{DrawCommand, PageLayout, Rect};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("structured table drawing unavailable: {0}")] Capability(String),
    #[error("PDF error: {0}")] Pdf(String),
    #[error("backend cannot draw unresolved {0} command")] UnresolvedCommand(&'static str),
    #[error("draw command issued before any page was started")] NoPage,
}

/// Drawing surface the layout engine's pages are replayed onto.
pub trait RenderBackend {
    /// Checks, without drawing anything, whether the results table of
    /// `document` can be drawn as structured vector rows.
    fn probe_tables(&self, document: &ReportDocument) -> Result<(), RenderError>;

    fn begin_page(&mut self, page_number: usize) -> Result<(), RenderError>;

    fn draw(&mut self, command: &DrawCommand) -> Result<(), RenderError>;

    fn place_raster(&mut self, raster: &RgbImage, rect: Rect) -> Result<(), RenderError>;

    fn finish(self) -> Result<Vec<u8>, RenderError>
    where
        Self: Sized;
}

/// Replays every page onto `backend`; the layouts are consumed.
pub fn render_pages<B: RenderBackend>(backend: &mut B, pages: Vec<PageLayout>) -> Result<(), RenderError> {
    for page in pages {
        backend.begin_page(page.page_number)?;
        for command in &page.commands {
            backend.draw(command)?;
        }
        debug!(page = page.page_number, commands = page.commands.len(), "page rendered");
    }
    Ok(())
}
