//! Item persistence over the shared connection pool

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::Result,
    models::{CreateItem, Item, UpdateItem},
    pagination::{paginate, PageParams, Paginated},
    query::QueryCriteria,
};

const TABLE: &str = "items";

const COLUMNS: &str = "id, name, stock, price, created_at, updated_at";

/// Repository for [`Item`] rows
///
/// Each call acquires a connection from the pool for the duration of one
/// statement; no multi-statement transactions are used.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: PgPool,
}

impl ItemRepository {
    /// Create a repository over a shared pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up a single item by id
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {COLUMNS} FROM {TABLE} WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Fetch one page of items matching the criteria
    pub async fn list(
        &self,
        criteria: &QueryCriteria,
        params: &PageParams,
    ) -> Result<Paginated<Item>> {
        paginate(&self.pool, TABLE, criteria, params).await
    }

    /// Count all items
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {TABLE}"))
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Insert a new item, generating an id when the caller supplied none
    ///
    /// Timestamps come back from the database defaults.
    pub async fn create(&self, input: CreateItem) -> Result<Item> {
        let id = input.id.unwrap_or_else(Uuid::new_v4);

        let item = sqlx::query_as::<_, Item>(&format!(
            "INSERT INTO {TABLE} (id, name, stock, price) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(&input.name)
        .bind(input.stock)
        .bind(input.price)
        .fetch_one(&self.pool)
        .await?;

        Ok(item)
    }

    /// Partially update an item
    ///
    /// Absent fields keep their prior values via COALESCE; `updated_at`
    /// always advances. Returns None without writing anything when the id
    /// does not exist.
    pub async fn update(&self, id: Uuid, changes: UpdateItem) -> Result<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "UPDATE {TABLE} SET \
                name = COALESCE($2, name), \
                stock = COALESCE($3, stock), \
                price = COALESCE($4, price), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.stock)
        .bind(changes.price)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Delete an item, reporting whether a row was removed
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM {TABLE} WHERE id = $1"))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
