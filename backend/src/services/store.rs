//! Store service: the tenant boundary every other resource hangs off

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct StoreService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Store {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStoreInput {
    pub name: String,
}

impl StoreService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_stores(&self, user_id: Uuid) -> AppResult<Vec<Store>> {
        let stores = sqlx::query_as::<_, Store>(
            "SELECT * FROM stores WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(stores)
    }

    pub async fn create_store(&self, user_id: Uuid, input: CreateStoreInput) -> AppResult<Store> {
        shared::validate_name(&input.name).map_err(|m| AppError::invalid_field("name", m))?;

        let store = sqlx::query_as::<_, Store>(
            "INSERT INTO stores (user_id, name) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(input.name.trim())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(store_id = %store.id, %user_id, "Created store");
        Ok(store)
    }

    pub async fn get_store(&self, user_id: Uuid, store_id: Uuid) -> AppResult<Store> {
        sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = $1 AND user_id = $2")
            .bind(store_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Store".to_string()))
    }

    /// Fail with not-found unless `store_id` belongs to `user_id`
    pub async fn ensure_owned(&self, user_id: Uuid, store_id: Uuid) -> AppResult<()> {
        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM stores WHERE id = $1 AND user_id = $2)",
        )
        .bind(store_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        if owned {
            Ok(())
        } else {
            Err(AppError::NotFound("Store".to_string()))
        }
    }
}
