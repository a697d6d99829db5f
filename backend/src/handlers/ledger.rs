//! HTTP handlers for ledger endpoints

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use shared::DateRange;
use uuid::Uuid;

use super::{authorize_store, AppJson};
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::ledger::{
    Category, CreateCategoryInput, CreateTransactionInput, DailyTransactions, LedgerService,
    LedgerTransaction, PeriodSummary, UpdateTransactionInput,
};
use crate::AppState;

/// Optional `year`/`month` filter, kept as text so bad input becomes a validation error
#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub year: Option<String>,
    pub month: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
}

fn month_filter(query: &MonthQuery) -> AppResult<Option<DateRange>> {
    shared::parse_month_filter(query.year.as_deref(), query.month.as_deref())
        .map_err(|m| AppError::invalid_field("month", m))
}

/// The requested month, or the current one when none is given
fn month_or_current(query: &MonthQuery) -> AppResult<DateRange> {
    if let Some(range) = month_filter(query)? {
        return Ok(range);
    }
    let today = Utc::now().date_naive();
    DateRange::month(today.year(), today.month())
        .ok_or_else(|| AppError::Internal("Current month out of range".to_string()))
}

// ============================================================================
// Categories
// ============================================================================

pub async fn list_categories(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
) -> AppResult<Json<Vec<Category>>> {
    authorize_store(&state, &current_user, store_id).await?;
    let service = LedgerService::new(state.db);
    let categories = service.list_categories(store_id).await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
    AppJson(input): AppJson<CreateCategoryInput>,
) -> AppResult<(StatusCode, Json<Category>)> {
    authorize_store(&state, &current_user, store_id).await?;
    let service = LedgerService::new(state.db);
    let category = service.create_category(store_id, input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn delete_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((store_id, category_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    authorize_store(&state, &current_user, store_id).await?;
    let service = LedgerService::new(state.db);
    service.delete_category(store_id, category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Transactions
// ============================================================================

/// List transactions, optionally for one month
pub async fn list_transactions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<Vec<LedgerTransaction>>> {
    authorize_store(&state, &current_user, store_id).await?;
    let range = month_filter(&query)?;
    let service = LedgerService::new(state.db);
    let transactions = service.list_transactions(store_id, range).await?;
    Ok(Json(transactions))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
    AppJson(input): AppJson<CreateTransactionInput>,
) -> AppResult<(StatusCode, Json<LedgerTransaction>)> {
    authorize_store(&state, &current_user, store_id).await?;
    let service = LedgerService::new(state.db);
    let transaction = service
        .create_transaction(store_id, current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((store_id, transaction_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<LedgerTransaction>> {
    authorize_store(&state, &current_user, store_id).await?;
    let service = LedgerService::new(state.db);
    let transaction = service.get_transaction(store_id, transaction_id).await?;
    Ok(Json(transaction))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((store_id, transaction_id)): Path<(Uuid, Uuid)>,
    AppJson(input): AppJson<UpdateTransactionInput>,
) -> AppResult<Json<LedgerTransaction>> {
    authorize_store(&state, &current_user, store_id).await?;
    let service = LedgerService::new(state.db);
    let transaction = service
        .update_transaction(store_id, transaction_id, input)
        .await?;
    Ok(Json(transaction))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((store_id, transaction_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    authorize_store(&state, &current_user, store_id).await?;
    let service = LedgerService::new(state.db);
    service.delete_transaction(store_id, transaction_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Transactions of one day; `year`, `month` and `day` are all required
pub async fn transactions_by_date(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> AppResult<Json<DailyTransactions>> {
    let date = shared::parse_ymd(
        query.year.as_deref().unwrap_or_default(),
        query.month.as_deref().unwrap_or_default(),
        query.day.as_deref().unwrap_or_default(),
    )
    .map_err(|m| {
        AppError::validation("date", m, "year, month, day는 숫자여야 합니다")
    })?;

    authorize_store(&state, &current_user, store_id).await?;
    let service = LedgerService::new(state.db);
    let daily = service.transactions_on(store_id, date).await?;
    Ok(Json(daily))
}

/// Income, expense and balance of a month
pub async fn ledger_summary(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<PeriodSummary>> {
    authorize_store(&state, &current_user, store_id).await?;
    let range = month_or_current(&query)?;
    let service = LedgerService::new(state.db);
    let summary = service.summarize(store_id, range).await?;
    Ok(Json(summary))
}

/// Download a month of transactions as CSV
pub async fn export_ledger(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
    Query(query): Query<MonthQuery>,
) -> AppResult<impl IntoResponse> {
    authorize_store(&state, &current_user, store_id).await?;
    let range = month_or_current(&query)?;
    let service = LedgerService::new(state.db);
    let csv = service.export_csv(store_id, range).await?;

    let disposition = format!("attachment; filename=\"ledger_{}.csv\"", range.month_label());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
