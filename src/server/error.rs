use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::ocr::OcrError;
use crate::store::StoreError;

use super::models::ErrorResponse;

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    pub(crate) fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        error!("request failed: {:#}", err);
        ServerError::internal(err.to_string())
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::UserNotFound | StoreError::FolderNotFound | StoreError::ProblemNotFound => {
                StatusCode::NOT_FOUND
            }
            StoreError::UsernameTaken | StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
            StoreError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            StoreError::Forbidden => StatusCode::FORBIDDEN,
            StoreError::Persist(inner) => {
                error!("store write failed: {:#}", inner);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ServerError::new(status, err.to_string())
    }
}

impl From<OcrError> for ServerError {
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::InvalidImage(_) => ServerError::new(StatusCode::BAD_REQUEST, err.to_string()),
            OcrError::EmptyFieldList => ServerError::new(
                StatusCode::BAD_REQUEST,
                "no text could be extracted from the image",
            ),
            OcrError::MalformedUpstreamResponse(detail) => {
                warn!("ocr: malformed upstream response: {}", detail);
                ServerError::new(StatusCode::BAD_GATEWAY, "could not read the image")
            }
            OcrError::Upstream { status, body } => {
                warn!("ocr: upstream status {}: {}", status, body);
                ServerError::new(
                    StatusCode::BAD_GATEWAY,
                    format!("OCR provider returned status {}", status),
                )
            }
            OcrError::Transport(detail) => {
                warn!("ocr: transport failure: {}", detail);
                ServerError::new(StatusCode::BAD_GATEWAY, "OCR provider is unreachable")
            }
            OcrError::NotConfigured(_) => {
                error!("ocr: {}", err);
                ServerError::internal(err.to_string())
            }
        }
    }
}
