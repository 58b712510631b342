//! Raster fallback for the results table.
//!
//! When the vector backend cannot draw the table, the client's snapshot of
//! the on-screen table is embedded instead, sliced across pages by
//! `layout_raster_table`. Everything that is not a raster slice still goes
//! to the wrapped backend.

use image::{imageops, RgbImage};
use thiserror::Error;

use super::backend::{RenderBackend, RenderError};
use super::document::ReportDocument;
use super::draw::{DrawCommand, Rect};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no table snapshot available")] Unavailable,
    #[error("table snapshot could not be decoded: {0}")] Decode(String),
    #[error("table snapshot is empty")] Empty,
}

/// Source of a raster image of the on-screen results table.
pub trait TableSnapshot {
    fn capture(&self) -> Result<RgbImage, CaptureError>;
}

/// PNG or JPEG bytes supplied by the client alongside the export request.
#[derive(Debug, Clone, Default)]
pub struct EncodedSnapshot {
    bytes: Option<Vec<u8>>,
}

impl EncodedSnapshot {
    pub fn new(bytes: Option<Vec<u8>>) -> Self {
        Self { bytes }
    }
}

impl TableSnapshot for EncodedSnapshot {
    fn capture(&self) -> Result<RgbImage, CaptureError> {
        let bytes = self.bytes.as_deref().ok_or(CaptureError::Unavailable)?;
        let decoded = image::load_from_memory(bytes).map_err(|e| CaptureError::Decode(e.to_string()))?;
        let rgb = decoded.to_rgb8();
        if rgb.width() == 0 || rgb.height() == 0 {
            return Err(CaptureError::Empty);
        }
        Ok(rgb)
    }
}

pub struct FallbackBackend<B> {
    inner: B,
    snapshot: RgbImage,
}

impl<B: RenderBackend> FallbackBackend<B> {
    pub fn new(inner: B, snapshot: RgbImage) -> Self {
        Self { inner, snapshot }
    }

    pub fn into_inner(self) -> B {
        self.inner
    }
}

impl<B: RenderBackend> RenderBackend for FallbackBackend<B> {
    fn probe_tables(&self, _document: &ReportDocument) -> Result<(), RenderError> {
        Ok(())
    }

    fn begin_page(&mut self, page_number: usize) -> Result<(), RenderError> {
        self.inner.begin_page(page_number)
    }

    fn draw(&mut self, command: &DrawCommand) -> Result<(), RenderError> {
        match *command {
            DrawCommand::Raster { rect, src_y, src_height } => {
                let (width, height) = self.snapshot.dimensions();
                let src_y = src_y.min(height);
                let src_height = src_height.min(height - src_y);
                let slice = imageops::crop_imm(&self.snapshot, 0, src_y, width, src_height).to_image();
                self.inner.place_raster(&slice, rect)
            }
            _ => self.inner.draw(command),
        }
    }

    fn place_raster(&mut self, raster: &RgbImage, rect: Rect) -> Result<(), RenderError> {
        self.inner.place_raster(raster, rect)
    }

    fn finish(self) -> Result<Vec<u8>, RenderError> {
        self.inner.finish()
    }
}
