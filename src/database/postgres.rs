//! PostgreSQL-backed record store: one JSONB table per entity kind.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::{PgPool, Postgres, Row};
use std::time::Duration;
use tracing::info;

use super::record::ID_FIELD;
use super::store::{RecordStore, StoreError};
use crate::config::DatabaseConfig;
use crate::filter::Filter;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using `DATABASE_URL` from the database config
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config.url.as_deref().ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;
        let parsed = url::Url::parse(url).map_err(|_| StoreError::InvalidDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        // Never log credentials
        info!(
            "Connected to PostgreSQL at {}{}",
            parsed.host_str().unwrap_or("localhost"),
            parsed.path()
        );
        Ok(Self::new(pool))
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Validated, quoted table name for a kind
    fn table(kind: &str) -> Result<String, StoreError> {
        let filter = Filter::new(kind)?;
        Ok(format!("\"{}\"", filter.table_name()))
    }
}

fn decode_row(row: &sqlx::postgres::PgRow) -> Result<Map<String, Value>, StoreError> {
    let data: Value = row.try_get("data")?;
    match data {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Corrupt(format!("expected object, found {}", other))),
    }
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    // Every filter parameter is compared as jsonb
    q.bind(sqlx::types::Json(v))
}

#[async_trait]
impl RecordStore for PgStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn prepare(&self, kind: &str) -> Result<(), StoreError> {
        let table = Self::table(kind)?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \"id\" TEXT PRIMARY KEY,\n    \"data\" JSONB NOT NULL\n)",
            table
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        info!("Prepared table {}", table);
        Ok(())
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Map<String, Value>>, StoreError> {
        let sql_result = filter.to_sql()?;

        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn get(&self, kind: &str, id: &str) -> Result<Option<Map<String, Value>>, StoreError> {
        let query = format!("SELECT \"data\" FROM {} WHERE \"id\" = $1", Self::table(kind)?);
        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn insert(&self, kind: &str, id: &str, mut record: Map<String, Value>) -> Result<(), StoreError> {
        record.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        let query = format!("INSERT INTO {} (\"id\", \"data\") VALUES ($1, $2)", Self::table(kind)?);
        let result = sqlx::query(&query)
            .bind(id)
            .bind(sqlx::types::Json(Value::Object(record)))
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateId(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(&self, kind: &str, id: &str, mut record: Map<String, Value>) -> Result<bool, StoreError> {
        record.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        let query = format!("UPDATE {} SET \"data\" = $2 WHERE \"id\" = $1", Self::table(kind)?);
        let result = sqlx::query(&query)
            .bind(id)
            .bind(sqlx::types::Json(Value::Object(record)))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, kind: &str, id: &str) -> Result<bool, StoreError> {
        let query = format!("DELETE FROM {} WHERE \"id\" = $1", Self::table(kind)?);
        let result = sqlx::query(&query).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
