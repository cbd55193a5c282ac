use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use serde_json::json;
use axum::Json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No file uploaded")]
    NoFilePart,
    #[error("No selected file")]
    NoFilename,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unreadable file: {0}")]
    UnreadableFile(String),
    #[error("Dataset has no columns")]
    EmptyDataset,
    #[error("No dataset loaded, upload a file first")]
    NoDataset,
    #[error("Unknown chart kind: {0}")]
    UnknownChart(String),
    #[error("No visualizations available, generate charts from the dashboard first")]
    NoContent,
    #[error("Image export is not supported in this environment, try generating the report locally: {0}")]
    RenderingUnavailable(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable code sent next to the human message.
    pub fn reason(&self) -> &'static str {
        match self {
            AppError::NoFilePart => "no_file_part",
            AppError::NoFilename => "no_filename",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::UnreadableFile(_) => "unreadable_file",
            AppError::EmptyDataset => "empty_dataset",
            AppError::NoDataset => "no_dataset",
            AppError::UnknownChart(_) => "unknown_chart",
            AppError::NoContent => "no_content",
            AppError::RenderingUnavailable(_) => "rendering_unavailable",
            AppError::IoError(_) => "io_error",
            AppError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NoFilePart
            | AppError::NoFilename
            | AppError::InvalidInput(_)
            | AppError::UnreadableFile(_)
            | AppError::EmptyDataset
            | AppError::NoDataset => StatusCode::BAD_REQUEST,
            AppError::UnknownChart(_) => StatusCode::NOT_FOUND,
            AppError::NoContent => StatusCode::CONFLICT,
            AppError::RenderingUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::IoError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::UnreadableFile(err.to_string())
    }
}

impl From<calamine::Error> for AppError {
    fn from(err: calamine::Error) -> Self {
        AppError::UnreadableFile(err.to_string())
    }
}

impl From<polars::prelude::PolarsError> for AppError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
            "reason": self.reason(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_errors_are_client_errors() {
        assert_eq!(AppError::NoFilePart.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NoFilename.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NoFilePart.reason(), "no_file_part");
        assert_eq!(AppError::NoFilename.reason(), "no_filename");
    }

    #[test]
    fn assembly_errors_keep_distinct_codes() {
        assert_eq!(AppError::NoContent.status(), StatusCode::CONFLICT);
        let unavailable = AppError::RenderingUnavailable("no fonts".to_string());
        assert_eq!(unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(unavailable.to_string().contains("no fonts"));
    }
}
