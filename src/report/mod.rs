//! Paginated PDF export of evaluation results.

pub mod backend;
pub mod document;
pub mod draw;
pub mod fallback;
pub mod geometry;
pub mod layout;
pub mod measure;
pub mod pdf;
pub mod table_csv;

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::{ExportStatus, MetricsSet, ResultRow};
use backend::{render_pages, RenderBackend, RenderError};
use document::ReportDocument;
use fallback::{CaptureError, FallbackBackend, TableSnapshot};
use geometry::{GeometryError, PageGeometry};

pub const REPORT_FILE_NAME: &str = "argus_rag_evaluation_results.pdf";
pub const REPORT_TITLE: &str = "ARGUS RAG Evaluation Results";
pub const BUSY_MESSAGE: &str = "Generating high-quality PDF...";
pub const EXPORT_FAILED_MESSAGE: &str = "export failed, please retry";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid page geometry: {0}")] Geometry(#[from] GeometryError),
    #[error("table snapshot unavailable: {0}")] Capture(#[from] CaptureError),
    #[error("rendering failed: {0}")] Render(#[from] RenderError),
    #[error("CSV encoding failed: {0}")] Csv(String),
}

impl ExportError {
    /// What the user is told, whatever went wrong underneath.
    pub fn user_message(&self) -> &'static str {
        EXPORT_FAILED_MESSAGE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRendering {
    Vector,
    Raster,
}

#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: &'static str,
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub table: TableRendering,
}

/// Process-wide "generating..." indicator. Held through a guard so that it is
/// cleared on every exit path of an export.
#[derive(Debug, Clone, Default)]
pub struct BusyIndicator {
    message: Arc<Mutex<Option<String>>>,
}

pub struct BusyGuard {
    message: Arc<Mutex<Option<String>>>,
}

impl BusyIndicator {
    pub fn acquire(&self, message: &str) -> BusyGuard {
        *self.message.lock() = Some(message.to_string());
        BusyGuard { message: Arc::clone(&self.message) }
    }

    pub fn status(&self) -> ExportStatus {
        let message = self.message.lock().clone();
        ExportStatus { busy: message.is_some(), message }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        *self.message.lock() = None;
    }
}

pub struct ReportController {
    geometry: PageGeometry,
    busy: BusyIndicator,
}

impl ReportController {
    pub fn new(geometry: PageGeometry, busy: BusyIndicator) -> Self {
        Self { geometry, busy }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Builds the report for `rows`. Returns `Ok(None)` when there is nothing
    /// to export. The table is drawn by `backend` when its capability probe
    /// passes, otherwise from `snapshot`.
    pub fn generate<B: RenderBackend>(
        &self,
        rows: Vec<ResultRow>,
        metrics: Option<MetricsSet>,
        backend: B,
        snapshot: &dyn TableSnapshot,
    ) -> Result<Option<ExportArtifact>, ExportError> {
        if rows.is_empty() {
            info!("nothing to export");
            return Ok(None);
        }

        let _busy = self.busy.acquire(BUSY_MESSAGE);
        let row_count = rows.len();
        let document = ReportDocument::new(REPORT_TITLE, Utc::now(), metrics, rows);

        let result = self.render(&document, backend, snapshot);
        match &result {
            Ok(artifact) => info!(
                rows = row_count,
                pages = artifact.page_count,
                table = ?artifact.table,
                bytes = artifact.bytes.len(),
                "📄 report exported"
            ),
            Err(e) => error!(rows = row_count, error = %e, "❌ report export failed"),
        }
        result.map(Some)
    }

    fn render<B: RenderBackend>(
        &self,
        document: &ReportDocument,
        mut backend: B,
        snapshot: &dyn TableSnapshot,
    ) -> Result<ExportArtifact, ExportError> {
        self.geometry.validate()?;

        let (backend, page_count, table) = match backend.probe_tables(document) {
            Ok(()) => {
                let pages = layout::layout(document, &self.geometry);
                let page_count = pages.len();
                render_pages(&mut backend, pages)?;
                (backend, page_count, TableRendering::Vector)
            }
            Err(RenderError::Capability(reason)) => {
                warn!(%reason, "🔄 vector table unavailable, falling back to table snapshot");
                let raster = snapshot.capture()?;
                let pages = layout::layout_raster_table(document, &self.geometry, raster.dimensions());
                let page_count = pages.len();
                let mut fallback = FallbackBackend::new(backend, raster);
                render_pages(&mut fallback, pages)?;
                (fallback.into_inner(), page_count, TableRendering::Raster)
            }
            Err(other) => return Err(other.into()),
        };

        let bytes = backend.finish()?;
        Ok(ExportArtifact { file_name: REPORT_FILE_NAME, bytes, page_count, table })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::backend::testing::RecordingBackend;
    use crate::report::draw::DrawCommand;
    use crate::report::fallback::EncodedSnapshot;
    use crate::report::pdf::PdfBackend;
    use image::{ImageFormat, Rgb, RgbImage};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    struct FixedSnapshot(u32, u32);

    impl TableSnapshot for FixedSnapshot {
        fn capture(&self) -> Result<RgbImage, CaptureError> {
            Ok(RgbImage::from_pixel(self.0, self.1, Rgb([255, 255, 255])))
        }
    }

    /// Asserts the busy indicator is held while capturing.
    struct ObservingSnapshot(BusyIndicator);

    impl TableSnapshot for ObservingSnapshot {
        fn capture(&self) -> Result<RgbImage, CaptureError> {
            assert_eq!(self.0.status().message.as_deref(), Some(BUSY_MESSAGE));
            Err(CaptureError::Unavailable)
        }
    }

    fn rows(n: usize) -> Vec<ResultRow> {
        (0..n).map(|i| ResultRow::new(format!("Query {i}"), format!("Answer {i}"), format!("Reference {i}"))).collect()
    }

    fn metrics() -> MetricsSet {
        [("Context Recall", 0.0), ("Faithfulness", 0.92), ("Factual Correctness", 0.88)].into_iter().collect()
    }

    fn controller() -> (ReportController, BusyIndicator) {
        let busy = BusyIndicator::default();
        (ReportController::new(PageGeometry::default(), busy.clone()), busy)
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let (controller, busy) = controller();
        let out = controller.generate(Vec::new(), Some(metrics()), RecordingBackend::default(), &FixedSnapshot(1, 1));
        assert!(matches!(out, Ok(None)));
        assert_eq!(busy.status(), ExportStatus { busy: false, message: None });
    }

    #[test]
    fn vector_path_renders_every_page() {
        let (controller, busy) = controller();
        let artifact = controller
            .generate(rows(20), Some(metrics()), RecordingBackend::default(), &EncodedSnapshot::default())
            .unwrap()
            .unwrap();
        assert_eq!(artifact.file_name, REPORT_FILE_NAME);
        assert_eq!(artifact.table, TableRendering::Vector);
        let expected: Vec<usize> = (1..=artifact.page_count).collect();
        assert_eq!(String::from_utf8(artifact.bytes).unwrap(), format!("pages={expected:?}"));
        assert!(!busy.status().busy);
    }

    #[test]
    fn capability_error_switches_to_snapshot() {
        let (controller, busy) = controller();
        let backend = RecordingBackend { tables_unavailable: true, ..Default::default() };
        let artifact = controller.generate(rows(5), Some(metrics()), backend, &FixedSnapshot(1200, 400)).unwrap().unwrap();
        assert_eq!(artifact.table, TableRendering::Raster);
        assert_eq!(artifact.page_count, 1);
        assert!(!busy.status().busy);
    }

    #[test]
    fn fallback_capture_failure_fails_export_and_clears_busy() {
        let (controller, busy) = controller();
        let backend = RecordingBackend { tables_unavailable: true, ..Default::default() };
        let err = controller
            .generate(rows(3), None, backend, &ObservingSnapshot(busy.clone()))
            .unwrap_err();
        assert!(matches!(err, ExportError::Capture(CaptureError::Unavailable)));
        assert_eq!(err.user_message(), EXPORT_FAILED_MESSAGE);
        assert!(!busy.status().busy);
    }

    #[test]
    fn finish_failure_leaves_no_artifact() {
        let (controller, busy) = controller();
        let backend = RecordingBackend { fail_on_finish: true, ..Default::default() };
        let err = controller.generate(rows(3), None, backend, &FixedSnapshot(1, 1)).unwrap_err();
        assert!(matches!(err, ExportError::Render(RenderError::Pdf(_))));
        assert!(!busy.status().busy);
    }

    #[test]
    fn invalid_geometry_is_reported() {
        let busy = BusyIndicator::default();
        let geometry = PageGeometry { line_height: -1.0, ..PageGeometry::default() };
        let controller = ReportController::new(geometry, busy.clone());
        let err = controller.generate(rows(1), None, RecordingBackend::default(), &FixedSnapshot(1, 1)).unwrap_err();
        assert!(matches!(err, ExportError::Geometry(_)));
        assert!(!busy.status().busy);
    }

    #[test]
    fn pdf_backend_end_to_end() {
        let (controller, _) = controller();
        let backend = PdfBackend::new(REPORT_TITLE, controller.geometry(), false).unwrap();
        let artifact = controller.generate(rows(40), Some(metrics()), backend, &FixedSnapshot(1, 1)).unwrap().unwrap();
        assert_eq!(&artifact.bytes[0..4], b"%PDF");
        assert!(artifact.page_count > 1);
    }

    #[test]
    fn typographic_punctuation_stays_vector_without_snapshot() {
        let (controller, busy) = controller();
        let mut input = rows(3);
        input[1].response = "It’s Einstein — relativity “explained”…".to_string();
        let backend = PdfBackend::new(REPORT_TITLE, controller.geometry(), false).unwrap();
        let artifact = controller
            .generate(input, Some(metrics()), backend, &EncodedSnapshot::default())
            .unwrap()
            .unwrap();
        assert_eq!(artifact.table, TableRendering::Vector);
        assert_eq!(&artifact.bytes[0..4], b"%PDF");
        assert!(!busy.status().busy);
    }

    #[test]
    fn pdf_backend_falls_back_for_unencodable_text() {
        let (controller, _) = controller();
        let mut input = rows(4);
        input[2].response = "アインシュタイン".to_string();
        let mut png = Cursor::new(Vec::new());
        RgbImage::from_pixel(600, 900, Rgb([240, 240, 240])).write_to(&mut png, ImageFormat::Png).unwrap();
        let snapshot = EncodedSnapshot::new(Some(png.into_inner()));

        let backend = PdfBackend::new(REPORT_TITLE, controller.geometry(), false).unwrap();
        let artifact = controller.generate(input, Some(metrics()), backend, &snapshot).unwrap().unwrap();
        assert_eq!(artifact.table, TableRendering::Raster);
        assert!(artifact.page_count >= 2);
        assert_eq!(&artifact.bytes[0..4], b"%PDF");
    }

    #[test]
    fn recorded_commands_have_no_placeholders() {
        let mut backend = RecordingBackend::default();
        let document = ReportDocument::new(REPORT_TITLE, Utc::now(), Some(metrics()), rows(12));
        render_pages(&mut backend, layout::layout(&document, &PageGeometry::default())).unwrap();
        assert!(!backend.commands.iter().any(|c| matches!(c, DrawCommand::PageNumber { .. })));
    }
}
