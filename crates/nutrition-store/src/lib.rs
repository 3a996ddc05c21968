//! # Nutrition Store
//!
//! The system of record: one relational table, `food_nutritions`, accessed
//! through a `sqlx` connection pool.
//!
//! - `food_cd` carries a unique index; a duplicate insert or update surfaces
//!   as `NutritionError::Conflict` even when a concurrent request slipped
//!   past the orchestrator's pre-check.
//! - Partial updates run read-merge-write inside one transaction.
//! - Deletes return the removed row so the caller can mirror the removal.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let store = SqlRecordStore::connect(&config.database).await?;
//! store.ensure_schema().await?;
//! let record = store.create(&NewRecord::new("T1", "Rice")).await?;
//! ```

pub mod schema;

use async_trait::async_trait;
use nutrition_core::prelude::*;
use nutrition_core::{DatabaseConfig, StoreMetrics};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

use crate::schema::{COLUMNS, TABLE};

/// SQLite-backed record store
#[derive(Clone)]
pub struct SqlRecordStore {
    pool: SqlitePool,
    metrics: StoreMetrics,
}

impl SqlRecordStore {
    /// Connect a pool using the database configuration
    ///
    /// In-memory databases live only as long as their connection, so they get
    /// a single connection that is never recycled.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| NutritionError::store_with_source("Invalid database URL", e))?
            .create_if_missing(true);

        let in_memory = config.url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new().acquire_timeout(config.acquire_timeout);
        pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(config.max_connections)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| NutritionError::store_with_source("Failed to connect to database", e))?;

        info!(url = %config.url, in_memory, "Connected to record store");

        Ok(Self {
            pool,
            metrics: StoreMetrics::new("record_store"),
        })
    }

    /// Fresh in-memory store with the schema applied (for testing)
    pub async fn in_memory() -> Result<Self> {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            ..Default::default()
        };
        let store = Self::connect(&config).await?;
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create the table and its indexes if absent
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in schema::DDL {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| NutritionError::store_with_source("Failed to apply schema", e))?;
        }
        debug!(table = TABLE, "Schema ensured");
        Ok(())
    }

    /// Close connection pool gracefully
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn observe<T>(&self, operation: &'static str, result: Result<T>) -> Result<T> {
        self.metrics.record_operation(operation, result.is_ok());
        result
    }

    async fn insert(&self, input: &NewRecord) -> Result<NutritionRecord> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            TABLE,
            COLUMNS.join(", "),
            vec!["?"; COLUMNS.len()].join(", ")
        );

        let draft = input.clone().into_record(0);
        let done = bind_columns(sqlx::query(&sql), &draft)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, &draft.food_cd))?;

        let id = done.last_insert_rowid();
        debug!(id, food_cd = %draft.food_cd, "Inserted record");
        Ok(input.clone().into_record(id))
    }

    async fn find_one(&self, column: &str, value: Key<'_>) -> Result<Option<NutritionRecord>> {
        let sql = format!("SELECT id, {} FROM {} WHERE {} = ?", COLUMNS.join(", "), TABLE, column);
        let query = sqlx::query(&sql);
        let query = match value {
            Key::Id(id) => query.bind(id),
            Key::Code(code) => query.bind(code),
        };

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| NutritionError::store_with_source("Lookup failed", e))?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn merge(&self, id: i64, patch: &RecordPatch) -> Result<Option<NutritionRecord>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| NutritionError::store_with_source("Failed to begin transaction", e))?;

        let select = format!("SELECT id, {} FROM {} WHERE id = ?", COLUMNS.join(", "), TABLE);
        let row = sqlx::query(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| NutritionError::store_with_source("Lookup failed", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut record = row_to_record(&row)?;
        record.apply(patch);

        let assignments: Vec<String> = COLUMNS.iter().map(|c| format!("{} = ?", c)).collect();
        let update = format!("UPDATE {} SET {} WHERE id = ?", TABLE, assignments.join(", "));
        bind_columns(sqlx::query(&update), &record)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error(e, &record.food_cd))?;

        tx.commit()
            .await
            .map_err(|e| write_error(e, &record.food_cd))?;

        debug!(id, "Updated record");
        Ok(Some(record))
    }

    async fn remove(&self, id: i64) -> Result<Option<NutritionRecord>> {
        let sql = format!(
            "DELETE FROM {} WHERE id = ? RETURNING id, {}",
            TABLE,
            COLUMNS.join(", ")
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| NutritionError::store_with_source("Delete failed", e))?;

        if row.is_some() {
            debug!(id, "Deleted record");
        }
        row.as_ref().map(row_to_record).transpose()
    }
}

enum Key<'a> {
    Id(i64),
    Code(&'a str),
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

/// Bind every data column in `COLUMNS` order
fn bind_columns<'q>(query: SqliteQuery<'q>, r: &'q NutritionRecord) -> SqliteQuery<'q> {
    query
        .bind(&r.food_cd)
        .bind(&r.group_name)
        .bind(&r.food_name)
        .bind(&r.research_year)
        .bind(&r.maker_name)
        .bind(&r.ref_name)
        .bind(r.serving_size)
        .bind(r.calorie)
        .bind(r.carbohydrate)
        .bind(r.protein)
        .bind(r.fat)
        .bind(r.sugars)
        .bind(r.salt)
        .bind(r.cholesterol)
        .bind(r.saturated_fatty_acids)
        .bind(r.trans_fat)
}

fn row_to_record(row: &SqliteRow) -> Result<NutritionRecord> {
    let get_err = |e: sqlx::Error| NutritionError::store_with_source("Malformed row", e);

    Ok(NutritionRecord {
        id: row.try_get("id").map_err(get_err)?,
        food_cd: row.try_get("food_cd").map_err(get_err)?,
        food_name: row.try_get("food_name").map_err(get_err)?,
        group_name: row.try_get("group_name").map_err(get_err)?,
        research_year: row.try_get("research_year").map_err(get_err)?,
        maker_name: row.try_get("maker_name").map_err(get_err)?,
        ref_name: row.try_get("ref_name").map_err(get_err)?,
        serving_size: row.try_get("serving_size").map_err(get_err)?,
        calorie: row.try_get("calorie").map_err(get_err)?,
        carbohydrate: row.try_get("carbohydrate").map_err(get_err)?,
        protein: row.try_get("protein").map_err(get_err)?,
        fat: row.try_get("fat").map_err(get_err)?,
        sugars: row.try_get("sugars").map_err(get_err)?,
        salt: row.try_get("salt").map_err(get_err)?,
        cholesterol: row.try_get("cholesterol").map_err(get_err)?,
        saturated_fatty_acids: row.try_get("saturated_fatty_acids").map_err(get_err)?,
        trans_fat: row.try_get("trans_fat").map_err(get_err)?,
    })
}

/// Map a write failure, turning a unique-constraint violation into `Conflict`
fn write_error(e: sqlx::Error, food_cd: &str) -> NutritionError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return NutritionError::conflict(food_cd);
        }
    }
    NutritionError::store_with_source("Write failed", e)
}

#[async_trait]
impl HealthCheck for SqlRecordStore {
    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| NutritionError::store_with_source("Health check failed", e))?;
        Ok(())
    }

    fn component_name(&self) -> &'static str {
        "record_store"
    }
}

#[async_trait]
impl RecordStore for SqlRecordStore {
    async fn create(&self, record: &NewRecord) -> Result<NutritionRecord> {
        let result = self.insert(record).await;
        self.observe("create", result)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<NutritionRecord>> {
        let result = self.find_one("id", Key::Id(id)).await;
        self.observe("get_by_id", result)
    }

    async fn get_by_code(&self, food_cd: &str) -> Result<Option<NutritionRecord>> {
        let result = self.find_one("food_cd", Key::Code(food_cd)).await;
        self.observe("get_by_code", result)
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<NutritionRecord>> {
        let sql = format!(
            "SELECT id, {} FROM {} ORDER BY id LIMIT ? OFFSET ?",
            COLUMNS.join(", "),
            TABLE
        );
        let result = sqlx::query(&sql)
            .bind(clamp_i64(limit))
            .bind(clamp_i64(offset))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| NutritionError::store_with_source("List failed", e))
            .and_then(|rows| rows.iter().map(row_to_record).collect());
        self.observe("list", result)
    }

    async fn update(&self, id: i64, patch: &RecordPatch) -> Result<Option<NutritionRecord>> {
        let result = self.merge(id, patch).await;
        self.observe("update", result)
    }

    async fn delete(&self, id: i64) -> Result<Option<NutritionRecord>> {
        let result = self.remove(id).await;
        self.observe("delete", result)
    }

    async fn count(&self) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", TABLE);
        let result = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.pool)
            .await
            .map(|n| n.max(0) as u64)
            .map_err(|e| NutritionError::store_with_source("Count failed", e));
        self.observe("count", result)
    }
}

fn clamp_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqlRecordStore {
        SqlRecordStore::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_id() {
        let store = store().await;
        let input = NewRecord {
            research_year: Some("2024".into()),
            maker_name: Some("Test Maker".into()),
            ..NewRecord::new("TEST001", "Test Food")
        };

        let created = store.create(&input).await.unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(created.food_cd, "TEST001");
        assert_eq!(created.food_name, "Test Food");

        let second = store.create(&NewRecord::new("TEST002", "Other")).await.unwrap();
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_get_by_id_round_trips_every_field() {
        let store = store().await;
        let input = NewRecord {
            group_name: Some("Grains - Rice".into()),
            research_year: Some("2019".into()),
            maker_name: Some("Nationwide".into()),
            ref_name: Some("Food Composition Table".into()),
            serving_size: Some(210.0),
            calorie: Some(313.0),
            carbohydrate: Some(68.2),
            protein: Some(5.9),
            fat: Some(0.6),
            sugars: Some(0.0),
            salt: Some(4.0),
            cholesterol: None,
            saturated_fatty_acids: Some(0.1),
            trans_fat: Some(-1.0),
            ..NewRecord::new("D000001", "Cooked rice")
        };

        let created = store.create(&input).await.unwrap();
        let fetched = store.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, input.into_record(created.id));

        assert!(store.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_code() {
        let store = store().await;
        store.create(&NewRecord::new("UNIQUECD01", "Unique")).await.unwrap();

        let found = store.get_by_code("UNIQUECD01").await.unwrap().unwrap();
        assert_eq!(found.food_name, "Unique");
        assert!(store.get_by_code("NONEXISTENTCD").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_constraint_surfaces_as_conflict() {
        let store = store().await;
        store.create(&NewRecord::new("DUP", "First")).await.unwrap();

        let err = store.create(&NewRecord::new("DUP", "Second")).await.unwrap_err();
        assert!(matches!(err, NutritionError::Conflict { ref food_cd } if food_cd == "DUP"));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_pages_in_id_order() {
        let store = store().await;
        store.create(&NewRecord::new("LIST001", "One")).await.unwrap();
        store.create(&NewRecord::new("LIST002", "Two")).await.unwrap();

        assert_eq!(store.list(0, 100).await.unwrap().len(), 2);
        assert_eq!(store.list(0, 1).await.unwrap().len(), 1);

        let skipped = store.list(1, 1).await.unwrap();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].food_cd, "LIST002");

        assert!(store.list(5, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_changes_only_supplied_fields() {
        let store = store().await;
        let created = store
            .create(&NewRecord {
                calorie: Some(100.0),
                protein: Some(3.0),
                ..NewRecord::new("UPDATE001", "Before")
            })
            .await
            .unwrap();

        let patch = RecordPatch {
            food_name: Some("After".into()),
            maker_name: Some(Some("New Maker".into())),
            protein: Some(None),
            ..Default::default()
        };
        let updated = store.update(created.id, &patch).await.unwrap().unwrap();

        assert_eq!(updated.food_name, "After");
        assert_eq!(updated.maker_name.as_deref(), Some("New Maker"));
        assert_eq!(updated.protein, None);
        assert_eq!(updated.calorie, Some(100.0));
        assert_eq!(updated.food_cd, "UPDATE001");

        let stored = store.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored, updated);

        assert!(store.update(999, &patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_into_taken_code_conflicts() {
        let store = store().await;
        store.create(&NewRecord::new("A", "a")).await.unwrap();
        let b = store.create(&NewRecord::new("B", "b")).await.unwrap();

        let patch = RecordPatch {
            food_cd: Some("A".into()),
            ..Default::default()
        };
        let err = store.update(b.id, &patch).await.unwrap_err();
        assert!(matches!(err, NutritionError::Conflict { .. }));

        // Rolled back
        assert_eq!(store.get_by_id(b.id).await.unwrap().unwrap().food_cd, "B");
    }

    #[tokio::test]
    async fn test_delete_returns_last_state() {
        let store = store().await;
        let created = store.create(&NewRecord::new("DELETE001", "Gone")).await.unwrap();

        let deleted = store.delete(created.id).await.unwrap().unwrap();
        assert_eq!(deleted, created);
        assert!(store.get_by_id(created.id).await.unwrap().is_none());

        assert!(store.delete(created.id).await.unwrap().is_none());
        assert!(store.delete(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_database_persists_across_pools() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("food.db").display()),
            ..Default::default()
        };

        let first = SqlRecordStore::connect(&config).await.unwrap();
        first.ensure_schema().await.unwrap();
        first.create(&NewRecord::new("P1", "Kept")).await.unwrap();
        first.close().await;

        let second = SqlRecordStore::connect(&config).await.unwrap();
        second.ensure_schema().await.unwrap();
        assert_eq!(second.count().await.unwrap(), 1);
        assert!(second.health_check().await.is_ok());
    }
}
