//! PostgreSQL-backed record store for the `locations` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use antiradar_core::config::PostgresConfig;
use antiradar_core::{LocationRecord, NewLocationRecord, StoredRecord};

use crate::error::StoreError;
use crate::store::RecordStore;

const SELECT_COLUMNS: &str = "SELECT id, town, street, lat, long, message, post_time FROM locations";

/// `ILIKE` pattern matching `town` anywhere, with LIKE metacharacters escaped.
fn contains_pattern(town: &str) -> String {
    let mut pattern = String::with_capacity(town.len() + 2);
    pattern.push('%');
    for c in town.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[derive(Debug, sqlx::FromRow)]
struct LocationRow {
    id: i64,
    town: String,
    street: String,
    lat: Option<f64>,
    long: Option<f64>,
    message: String,
    post_time: DateTime<Utc>,
}

impl From<LocationRow> for LocationRecord {
    fn from(row: LocationRow) -> Self {
        Self {
            id: row.id,
            town: row.town,
            street: row.street,
            latitude: row.lat,
            longitude: row.long,
            message: row.message,
            post_time: row.post_time,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InsertedRow {
    id: i64,
    post_time: DateTime<Utc>,
}

pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Connect and apply pending migrations.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StoreError> {
        if !config.is_configured() {
            return Err(StoreError::NotConfigured(
                "DATABASE_URL or PG_HOST/PG_DATABASE not set".into(),
            ));
        }
        Self::connect_url(&config.connection_string(), config.max_connections).await
    }

    pub async fn connect_url(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        info!("PostgreSQL connected");

        sqlx::migrate!("../../migrations").run(&pool).await?;
        info!("Database migrations applied successfully");

        Ok(Self { pool })
    }

    /// Wrap an existing pool. Migrations are the caller's business.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn append(&self, record: &NewLocationRecord) -> Result<StoredRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, InsertedRow>(
            "INSERT INTO locations (town, street, lat, long, message)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, post_time",
        )
        .bind(&record.town)
        .bind(&record.street)
        .bind(record.latitude())
        .bind(record.longitude())
        .bind(&record.message)
        .fetch_one(&mut *tx)
        .await?;

        // An early return above drops `tx`, which rolls back.
        tx.commit().await?;

        Ok(StoredRecord {
            id: row.id,
            post_time: row.post_time,
        })
    }

    async fn query_range(&self, since: DateTime<Utc>) -> Result<Vec<LocationRecord>, StoreError> {
        let rows = sqlx::query_as::<_, LocationRow>(&format!(
            "{SELECT_COLUMNS} WHERE post_time >= $1 ORDER BY post_time ASC, id ASC"
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LocationRecord::from).collect())
    }

    async fn by_town(
        &self,
        town: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LocationRecord>, StoreError> {
        let rows = sqlx::query_as::<_, LocationRow>(&format!(
            r"{SELECT_COLUMNS} WHERE town ILIKE $1 ESCAPE '\'
             ORDER BY post_time DESC, id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(contains_pattern(town))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LocationRecord::from).collect())
    }

    async fn get(&self, id: i64) -> Result<Option<LocationRecord>, StoreError> {
        let row = sqlx::query_as::<_, LocationRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(LocationRecord::from))
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM locations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
