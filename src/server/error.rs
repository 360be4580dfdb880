use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::flashcards::FlashcardStorageError;
use crate::study::StudyError;

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub message: String,
    pub error: &'static str,
    pub status_code: u16,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR",
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "INVALID_INPUT",
            message: message.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_input(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid_input(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::invalid_input(rejection.body_text())
    }
}

/// `Json` body whose rejections use the API error format
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query` string whose rejections use the API error format
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `Path` parameters whose rejections use the API error format
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

impl From<StudyError> for ApiError {
    fn from(err: StudyError) -> Self {
        let status = match &err {
            StudyError::Flashcards(inner) => match inner {
                FlashcardStorageError::InvalidQuality(_) | FlashcardStorageError::InvalidInput(_) => {
                    StatusCode::BAD_REQUEST
                }
                FlashcardStorageError::DeckNotFound(_) | FlashcardStorageError::CardNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                FlashcardStorageError::StaleState { .. } => StatusCode::CONFLICT,
                FlashcardStorageError::Io(_) | FlashcardStorageError::Json(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            StudyError::Activity(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            log::error!("Request failed: {}", err);
        }

        Self {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<FlashcardStorageError> for ApiError {
    fn from(err: FlashcardStorageError) -> Self {
        StudyError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            message: self.message,
            error: self.code,
            status_code: self.status.as_u16(),
        };
        (self.status, Json(body)).into_response()
    }
}
