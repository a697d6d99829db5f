//! Ledger service: income/expense categories and transactions

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{DateRange, LedgerSummary, TransactionType};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    #[serde(rename = "category_id")]
    pub id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LedgerTransaction {
    #[serde(rename = "transaction_id")]
    pub id: Uuid,
    pub store_id: Uuid,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub transaction_type: String,
    pub amount: Decimal,
    #[serde(rename = "date")]
    pub transaction_date: NaiveDate,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionInput {
    pub category_id: Option<Uuid>,
    pub transaction_type: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTransactionInput {
    pub category_id: Option<Uuid>,
    pub transaction_type: Option<String>,
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
}

/// Entry of the daily view
#[derive(Debug, Clone, Serialize)]
pub struct DailyEntry {
    pub transaction_id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub category: Option<String>,
    pub detail: Option<String>,
    pub cost: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyTransactions {
    pub date: String,
    pub transactions: Vec<DailyEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodSummary {
    pub period: String,
    #[serde(flatten)]
    pub summary: LedgerSummary,
}

/// One line of the CSV export
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    date: NaiveDate,
    #[serde(rename = "type")]
    transaction_type: &'a str,
    category: &'a str,
    amount: Decimal,
    description: &'a str,
}

#[derive(Debug, FromRow)]
struct AmountRow {
    transaction_type: String,
    amount: Decimal,
}

const SELECT_TRANSACTION: &str = r#"
    SELECT t.id, t.store_id, t.user_id, t.category_id, c.name AS category_name,
           t.transaction_type, t.amount, t.transaction_date, t.description,
           t.created_at, t.updated_at
    FROM ledger_transactions t
    LEFT JOIN ledger_categories c ON c.id = t.category_id
"#;

fn parse_type(raw: &str) -> AppResult<TransactionType> {
    TransactionType::from_str(raw.trim()).ok_or_else(|| {
        AppError::validation(
            "transaction_type",
            "transaction_type must be income or expense",
            "거래 유형은 income 또는 expense여야 합니다",
        )
    })
}

fn validate_amount(amount: Decimal) -> AppResult<()> {
    shared::validate_positive(amount)
        .and_then(|_| shared::validate_currency_scale(amount))
        .map_err(|m| AppError::invalid_field("amount", m))
}

impl LedgerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Categories
    // ========================================================================

    pub async fn list_categories(&self, store_id: Uuid) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, store_id, name, created_at FROM ledger_categories WHERE store_id = $1 ORDER BY name",
        )
        .bind(store_id)
        .fetch_all(&self.db)
        .await?;
        Ok(categories)
    }

    pub async fn create_category(
        &self,
        store_id: Uuid,
        input: CreateCategoryInput,
    ) -> AppResult<Category> {
        shared::validate_name(&input.name).map_err(|m| AppError::invalid_field("name", m))?;
        let name = input.name.trim();

        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO ledger_categories (store_id, name) VALUES ($1, $2)
            ON CONFLICT (store_id, name) DO NOTHING
            RETURNING id, store_id, name, created_at
            "#,
        )
        .bind(store_id)
        .bind(name)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Conflict {
            resource: "name".to_string(),
            message: format!("Category '{}' already exists", name),
            message_ko: format!("'{}' 카테고리가 이미 존재합니다", name),
        })
    }

    /// Delete a category; its transactions keep existing without one
    pub async fn delete_category(&self, store_id: Uuid, category_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM ledger_categories WHERE id = $1 AND store_id = $2")
            .bind(category_id)
            .bind(store_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Category".to_string()));
        }
        Ok(())
    }

    async fn ensure_category(&self, store_id: Uuid, category_id: Option<Uuid>) -> AppResult<()> {
        let Some(category_id) = category_id else {
            return Ok(());
        };

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM ledger_categories WHERE id = $1 AND store_id = $2)",
        )
        .bind(category_id)
        .bind(store_id)
        .fetch_one(&self.db)
        .await?;

        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound("Category".to_string()))
        }
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    pub async fn list_transactions(
        &self,
        store_id: Uuid,
        range: Option<DateRange>,
    ) -> AppResult<Vec<LedgerTransaction>> {
        let query = format!(
            r#"{}
            WHERE t.store_id = $1
              AND ($2::date IS NULL OR t.transaction_date >= $2)
              AND ($3::date IS NULL OR t.transaction_date < $3)
            ORDER BY t.transaction_date DESC, t.created_at DESC
            "#,
            SELECT_TRANSACTION
        );
        let transactions = sqlx::query_as::<_, LedgerTransaction>(&query)
            .bind(store_id)
            .bind(range.map(|r| r.start))
            .bind(range.map(|r| r.end))
            .fetch_all(&self.db)
            .await?;
        Ok(transactions)
    }

    pub async fn get_transaction(
        &self,
        store_id: Uuid,
        transaction_id: Uuid,
    ) -> AppResult<LedgerTransaction> {
        let query = format!("{} WHERE t.store_id = $1 AND t.id = $2", SELECT_TRANSACTION);
        sqlx::query_as::<_, LedgerTransaction>(&query)
            .bind(store_id)
            .bind(transaction_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction".to_string()))
    }

    pub async fn create_transaction(
        &self,
        store_id: Uuid,
        user_id: Uuid,
        input: CreateTransactionInput,
    ) -> AppResult<LedgerTransaction> {
        let kind = parse_type(&input.transaction_type)?;
        validate_amount(input.amount)?;
        self.ensure_category(store_id, input.category_id).await?;

        let transaction_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO ledger_transactions (store_id, user_id, category_id, transaction_type,
                                             amount, transaction_date, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(store_id)
        .bind(user_id)
        .bind(input.category_id)
        .bind(kind.as_str())
        .bind(input.amount)
        .bind(input.date)
        .bind(input.description)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%store_id, %transaction_id, kind = kind.as_str(), "Recorded ledger transaction");
        self.get_transaction(store_id, transaction_id).await
    }

    /// Partially update a transaction
    pub async fn update_transaction(
        &self,
        store_id: Uuid,
        transaction_id: Uuid,
        input: UpdateTransactionInput,
    ) -> AppResult<LedgerTransaction> {
        let current = self.get_transaction(store_id, transaction_id).await?;

        let kind = match &input.transaction_type {
            Some(raw) => parse_type(raw)?,
            None => parse_type(&current.transaction_type)?,
        };
        let amount = input.amount.unwrap_or(current.amount);
        validate_amount(amount)?;
        if input.category_id.is_some() {
            self.ensure_category(store_id, input.category_id).await?;
        }

        sqlx::query(
            r#"
            UPDATE ledger_transactions SET
                category_id = $3, transaction_type = $4, amount = $5,
                transaction_date = $6, description = $7, updated_at = NOW()
            WHERE id = $1 AND store_id = $2
            "#,
        )
        .bind(transaction_id)
        .bind(store_id)
        .bind(input.category_id.or(current.category_id))
        .bind(kind.as_str())
        .bind(amount)
        .bind(input.date.unwrap_or(current.transaction_date))
        .bind(input.description.or(current.description))
        .execute(&self.db)
        .await?;

        self.get_transaction(store_id, transaction_id).await
    }

    pub async fn delete_transaction(&self, store_id: Uuid, transaction_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM ledger_transactions WHERE id = $1 AND store_id = $2")
            .bind(transaction_id)
            .bind(store_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Transaction".to_string()));
        }
        Ok(())
    }

    /// Transactions of a single day in the compact daily shape
    pub async fn transactions_on(&self, store_id: Uuid, date: NaiveDate) -> AppResult<DailyTransactions> {
        let range = DateRange::day(date)
            .ok_or_else(|| AppError::invalid_field("day", "Date does not exist"))?;

        let transactions = self
            .list_transactions(store_id, Some(range))
            .await?
            .into_iter()
            .map(|t| DailyEntry {
                transaction_id: t.id,
                transaction_type: t.transaction_type,
                category: t.category_name,
                detail: t.description,
                cost: t.amount,
            })
            .collect();

        Ok(DailyTransactions {
            date: date.format("%Y-%m-%d").to_string(),
            transactions,
        })
    }

    /// Income, expense and balance over a month
    pub async fn summarize(&self, store_id: Uuid, range: DateRange) -> AppResult<PeriodSummary> {
        let rows = sqlx::query_as::<_, AmountRow>(
            r#"
            SELECT transaction_type, amount FROM ledger_transactions
            WHERE store_id = $1 AND transaction_date >= $2 AND transaction_date < $3
            "#,
        )
        .bind(store_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push((parse_type(&row.transaction_type)?, &row.amount));
        }

        Ok(PeriodSummary {
            period: range.month_label(),
            summary: LedgerSummary::from_entries(entries),
        })
    }

    /// Month of transactions as CSV, oldest first
    pub async fn export_csv(&self, store_id: Uuid, range: DateRange) -> AppResult<String> {
        let mut transactions = self.list_transactions(store_id, Some(range)).await?;
        transactions.reverse();

        let rows: Vec<ExportRow<'_>> = transactions
            .iter()
            .map(|t| ExportRow {
                date: t.transaction_date,
                transaction_type: &t.transaction_type,
                category: t.category_name.as_deref().unwrap_or(""),
                amount: t.amount,
                description: t.description.as_deref().unwrap_or(""),
            })
            .collect();

        Self::export_to_csv(&rows)
    }

    /// Serialize records as CSV with a header row
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}
