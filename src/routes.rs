use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    evaluator::{compute_metrics, run_evaluation, RagClient, SAMPLES},
    models::{EvaluateRequest, EvaluationRun, ExportRequest, ExportStatus, MetricsSet, ReportRequest, ResultRow},
    report::{
        fallback::EncodedSnapshot,
        geometry::PageGeometry,
        pdf::PdfBackend,
        table_csv::{results_csv, CSV_FILE_NAME},
        BusyIndicator, ExportArtifact, ReportController, TableRendering, EXPORT_FAILED_MESSAGE, REPORT_TITLE,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<HashMap<Uuid, EvaluationRun>>>,
    pub config: Arc<AppConfig>,
    pub busy: BusyIndicator,
    /// One export at a time; the busy indicator is process-wide.
    pub export_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            store: Arc::default(),
            config: Arc::new(config),
            busy: BusyIndicator::default(),
            export_lock: Arc::default(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/evaluations", post(create_evaluation))
        .route("/api/evaluations/:id", get(get_evaluation))
        .route("/api/evaluations/:id/pdf", post(export_evaluation_pdf))
        .route("/api/evaluations/:id/csv", get(export_evaluation_csv))
        .route("/api/report/pdf", post(export_report_pdf))
        .route("/api/export/status", get(export_status))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

pub async fn create_evaluation(State(state): State<AppState>, Json(body): Json<EvaluateRequest>) -> Response {
    let client = match RagClient::new(&state.config, body.endpoint) {
        Ok(client) => client,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    tracing::info!("🚀 Running evaluation against {}", client.endpoint());
    let results = run_evaluation(&client, &SAMPLES).await;
    let metrics = compute_metrics(&results);

    let run = EvaluationRun {
        id: Uuid::new_v4(),
        endpoint: client.endpoint().to_string(),
        results,
        metrics,
        created_at: Utc::now(),
    };
    tracing::info!("✅ Evaluation {} finished with {} rows", run.id, run.results.len());
    state.store.write().insert(run.id, run.clone());
    Json(run).into_response()
}

pub async fn get_evaluation(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    let run = state.store.read().get(&id).cloned();
    match run {
        Some(run) => Json(run).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn export_evaluation_pdf(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    body: Option<Json<ExportRequest>>,
) -> Response {
    let run = state.store.read().get(&id).cloned();
    let Some(run) = run else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let snapshot = body.and_then(|Json(b)| b.table_snapshot);
    export(&state, run.results, Some(run.metrics), snapshot).await
}

pub async fn export_evaluation_csv(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    let run = state.store.read().get(&id).cloned();
    let Some(run) = run else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match results_csv(&run.results) {
        Ok(bytes) => {
            tracing::info!("📄 CSV exported for {} ({} rows)", id, run.results.len());
            let headers = [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{CSV_FILE_NAME}\"")),
            ];
            (StatusCode::OK, headers, Bytes::from(bytes)).into_response()
        }
        Err(e) => {
            tracing::error!("❌ CSV export failed for {}: {}", id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.user_message())
        }
    }
}

pub async fn export_report_pdf(State(state): State<AppState>, Json(body): Json<ReportRequest>) -> Response {
    export(&state, body.results, body.metrics, body.table_snapshot).await
}

pub async fn export_status(State(state): State<AppState>) -> Json<ExportStatus> {
    Json(state.busy.status())
}

async fn export(state: &AppState, rows: Vec<ResultRow>, metrics: Option<MetricsSet>, table_snapshot: Option<String>) -> Response {
    let snapshot = match table_snapshot.as_deref().map(decode_snapshot).transpose() {
        Ok(bytes) => EncodedSnapshot::new(bytes),
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("invalid table_snapshot: {e}")),
    };

    let _serial = state.export_lock.lock().await;
    let controller = ReportController::new(PageGeometry::default(), state.busy.clone());
    let force_raster = state.config.force_raster_table;
    let outcome = tokio::task::spawn_blocking(move || {
        let backend = PdfBackend::new(REPORT_TITLE, controller.geometry(), force_raster)?;
        controller.generate(rows, metrics, backend, &snapshot)
    })
    .await;

    match outcome {
        Ok(Ok(Some(artifact))) => pdf_response(artifact),
        Ok(Ok(None)) => StatusCode::NO_CONTENT.into_response(),
        Ok(Err(e)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.user_message()),
        Err(e) => {
            tracing::error!("❌ export task panicked: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, EXPORT_FAILED_MESSAGE)
        }
    }
}

/// Accepts raw base64 or a `data:image/...;base64,` URL.
fn decode_snapshot(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match encoded.split_once(',') {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    base64::engine::general_purpose::STANDARD.decode(payload.trim())
}

fn pdf_response(artifact: ExportArtifact) -> Response {
    let table = match artifact.table {
        TableRendering::Vector => "vector",
        TableRendering::Raster => "raster",
    };
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", artifact.file_name)),
        (header::HeaderName::from_static("x-page-count"), artifact.page_count.to_string()),
        (header::HeaderName::from_static("x-table-rendering"), table.to_string()),
    ];
    (StatusCode::OK, headers, Bytes::from(artifact.bytes)).into_response()
}
