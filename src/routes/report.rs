use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::{error::AppError, models::ReportEntry, AppState};

const REPORT_FILENAME: &str = "Data_Insights_Report.pdf";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/report", get(download_report))
        .route("/report/charts", get(report_charts))
}

async fn report_charts(State(state): State<Arc<AppState>>) -> Json<Vec<ReportEntry>> {
    let session = state.session.lock();
    let entries = session
        .report()
        .artifacts()
        .iter()
        .enumerate()
        .map(|(index, artifact)| ReportEntry {
            index,
            kind: artifact.kind,
            title: artifact.title.clone(),
        })
        .collect();
    Json(entries)
}

async fn download_report(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let artifacts = state.session.lock().report().artifacts().to_vec();
    tracing::info!("Generating report from {} charts", artifacts.len());

    let task_state = state.clone();
    let document = tokio::task::spawn_blocking(move || task_state.assembler.assemble(&artifacts))
        .await
        .map_err(|e| AppError::Internal(format!("Report task failed: {}", e)))??;

    tracing::info!("Report ready: {} pages, {} bytes", document.pages, document.bytes.len());
    let disposition = format!("attachment; filename=\"{}\"", REPORT_FILENAME);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    ))
}
