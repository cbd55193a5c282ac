use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::{
    error::AppError,
    models::CatalogEntry,
    services::charts::{eligible_charts, ChartKind},
    session::ChartRequest,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/charts", get(catalog))
        .route("/charts/:kind", post(request_chart))
}

async fn catalog(State(state): State<Arc<AppState>>) -> Result<Json<Vec<CatalogEntry>>, AppError> {
    let session = state.session.lock();
    let active = session.active()?;
    let entries = eligible_charts(&active.dataset)
        .into_iter()
        .map(|e| CatalogEntry::from_eligibility(&active.dataset, e))
        .collect();
    Ok(Json(entries))
}

/// Ineligible or failed charts still answer 200; the reason travels in `warning`.
async fn request_chart(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<Json<ChartRequest>, AppError> {
    let kind: ChartKind = kind.parse()?;
    let request = state.session.lock().request_chart(kind)?;
    if let Some(warning) = &request.warning {
        tracing::info!("{} not added: {}", kind, warning);
    }
    Ok(Json(request))
}
