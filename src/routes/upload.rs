use axum::{
    extract::{Multipart, State},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{SummaryResponse, UploadResponse},
    services::{dataset, summary::summarize},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload", post(upload))
        .route("/summary", get(summary))
}

async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let start = std::time::Instant::now();
    let (filename, data) = read_file_part(&mut multipart).await?;
    tracing::info!("Received {} ({}KB)", filename, data.len() / 1024);

    let path = state.config.upload_dir.join(&filename);
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        tracing::warn!("Overwriting existing upload {}", path.display());
    }
    tokio::fs::write(&path, &data).await?;

    let (dataset, insights) = tokio::task::spawn_blocking(move || {
        let dataset = dataset::load(&path)?;
        let insights = summarize(&dataset)?;
        Ok::<_, AppError>((dataset, insights))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Load task failed: {}", e)))??;
    tracing::info!(
        "Loaded {} rows x {} columns from {}",
        dataset.height(),
        dataset.width(),
        filename
    );

    let warnings = {
        let mut session = state.session.lock();
        session.begin(filename.clone(), dataset, insights.clone());
        session.request_default_charts()?
    };
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    tracing::info!("Upload of {} processed in {:?}", filename, start.elapsed());
    Ok(Json(UploadResponse { insights, filename, warnings }))
}

/// Finds the `file` part. A part without a filename is an ordinary form
/// field, not a file.
async fn read_file_part(multipart: &mut Multipart) -> Result<(String, Bytes), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let Some(raw) = field.file_name().map(str::to_string) else {
            continue;
        };
        let filename = sanitize_filename(&raw).ok_or(AppError::NoFilename)?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        return Ok((filename, data));
    }
    Err(AppError::NoFilePart)
}

/// Last path component of a client-supplied name.
fn sanitize_filename(raw: &str) -> Option<String> {
    let name = raw.rsplit(&['/', '\\'][..]).next()?.trim();
    match name {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

async fn summary(State(state): State<Arc<AppState>>) -> Result<Json<SummaryResponse>, AppError> {
    let session = state.session.lock();
    let active = session.active()?;
    Ok(Json(SummaryResponse {
        filename: active.filename.clone(),
        rows: active.dataset.height(),
        insights: active.summary.clone(),
    }))
}
