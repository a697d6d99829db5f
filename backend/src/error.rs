//! Error handling for the LivFlow store operations server
//!
//! Provides consistent error responses in English and Korean

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{CostError, PayloadError, StockError};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_ko: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_ko: String,
    },

    // Business logic errors
    #[error("Insufficient stock for {ingredient_name}")]
    InsufficientStock {
        ingredient_name: String,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Storage error: {0}")]
    StorageError(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Field-level validation error
    pub fn validation(field: &str, message: &str, message_ko: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_ko: message_ko.to_string(),
        }
    }

    /// Wrap a shared validation message for `field`
    pub fn invalid_field(field: &str, message: &'static str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_ko: format!("{} 값이 올바르지 않습니다", field),
        }
    }

    /// Another writer changed stock between lock and update
    pub fn stock_conflict() -> Self {
        AppError::Conflict {
            resource: "inventory".to_string(),
            message: "Stock changed concurrently, please retry".to_string(),
            message_ko: "재고가 동시에 변경되었습니다. 다시 시도해 주세요".to_string(),
        }
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::UnknownIngredient(id) => AppError::NotFound(format!("Ingredient {}", id)),
            StockError::Insufficient {
                ingredient_name,
                available,
                requested,
                ..
            } => AppError::InsufficientStock {
                ingredient_name,
                available,
                requested,
            },
            StockError::NonPositiveQuantity => AppError::validation(
                "used_stock",
                "Used stock must be greater than zero",
                "사용량은 0보다 커야 합니다",
            ),
        }
    }
}

impl From<PayloadError> for AppError {
    fn from(err: PayloadError) -> Self {
        AppError::Validation {
            field: "ingredients".to_string(),
            message: err.to_string(),
            message_ko: "재료 목록 형식이 올바르지 않습니다".to_string(),
        }
    }
}

impl From<CostError> for AppError {
    fn from(err: CostError) -> Self {
        AppError::Validation {
            field: "ingredients".to_string(),
            message: err.to_string(),
            message_ko: "원가 계산 범위를 초과했습니다".to_string(),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_ko: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    pub fn unauthorized(message: &str) -> Self {
        ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message_en: message.to_string(),
            message_ko: "인증이 필요합니다".to_string(),
            field: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, ErrorDetail::unauthorized(message))
            }
            AppError::Validation {
                field,
                message,
                message_ko,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_ko: message_ko.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_ko: format!("{}을(를) 찾을 수 없습니다", resource),
                    field: None,
                },
            ),
            AppError::Conflict {
                resource,
                message,
                message_ko,
            } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message_en: message.clone(),
                    message_ko: message_ko.clone(),
                    field: Some(resource.clone()),
                },
            ),
            AppError::InsufficientStock {
                ingredient_name,
                available,
                requested,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message_en: format!(
                        "Not enough {}: {} available, {} requested",
                        ingredient_name, available, requested
                    ),
                    message_ko: format!(
                        "{} 재고가 부족합니다 (남은 재고: {}, 요청: {})",
                        ingredient_name, available, requested
                    ),
                    field: None,
                },
            ),
            AppError::StorageError(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail {
                    code: "STORAGE_ERROR".to_string(),
                    message_en: format!("Storage error: {}", msg),
                    message_ko: "파일 저장 중 오류가 발생했습니다".to_string(),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message_en: "A database error occurred".to_string(),
                    message_ko: "데이터베이스 오류가 발생했습니다".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(_) | AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "An internal server error occurred".to_string(),
                    message_ko: "서버 내부 오류가 발생했습니다".to_string(),
                    field: None,
                },
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
