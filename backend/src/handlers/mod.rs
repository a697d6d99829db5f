//! HTTP handlers

pub mod health;
pub mod ingredient;
pub mod inventory;
pub mod ledger;
pub mod recipe;
pub mod store;

pub use health::*;
pub use ingredient::*;
pub use inventory::*;
pub use ledger::*;
pub use recipe::*;
pub use store::*;

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::StoreService;
use crate::AppState;

/// Reject access to stores the caller does not own
pub(crate) async fn authorize_store(
    state: &AppState,
    current_user: &CurrentUser,
    store_id: Uuid,
) -> AppResult<()> {
    StoreService::new(state.db.clone())
        .ensure_owned(current_user.0.user_id, store_id)
        .await
}

/// Request body that could not be read or decoded
pub(crate) fn malformed_body(detail: &str) -> AppError {
    AppError::Validation {
        field: "body".to_string(),
        message: detail.to_string(),
        message_ko: "요청 본문 형식이 올바르지 않습니다".to_string(),
    }
}

/// JSON body whose rejection is reported in the API error format
#[derive(Debug)]
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| malformed_body(&e.body_text()))?;
        Ok(AppJson(value))
    }
}
