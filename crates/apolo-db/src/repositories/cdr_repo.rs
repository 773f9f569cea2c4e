//! CDR (Call Detail Record) storage
//!
//! PostgreSQL-backed storage for CDRs synthesized by `*cdrlog`. Records are
//! keyed by `(cgrid, run_id)`. Uses runtime queries (not compile-time
//! macros) to avoid requiring a database connection at build time.

use apolo_core::{models::Cdr, traits::CdrStorage, AppError, AppResult};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, error, instrument};

/// PostgreSQL implementation of CdrStorage
pub struct PgCdrStorage {
    pool: PgPool,
}

impl PgCdrStorage {
    /// Create a new CDR storage
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `cdrs` table when missing
    pub async fn ensure_schema(&self) -> AppResult<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to create cdrs table: {}", e);
                AppError::Database(format!("Failed to create cdrs table: {}", e))
            })?;
        Ok(())
    }
}

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS cdrs (
        cgrid TEXT NOT NULL,
        run_id TEXT NOT NULL,
        order_id BIGINT NOT NULL DEFAULT 0,
        origin_host TEXT NOT NULL,
        source TEXT NOT NULL,
        origin_id TEXT NOT NULL,
        tor TEXT NOT NULL,
        request_type TEXT NOT NULL,
        tenant TEXT NOT NULL,
        category TEXT NOT NULL,
        account TEXT NOT NULL,
        subject TEXT NOT NULL,
        destination TEXT NOT NULL,
        setup_time TIMESTAMPTZ NOT NULL,
        answer_time TIMESTAMPTZ NOT NULL,
        usage_ns BIGINT NOT NULL,
        extra_fields JSONB NOT NULL DEFAULT '{}',
        extra_info TEXT NOT NULL DEFAULT '',
        partial BOOLEAN NOT NULL DEFAULT FALSE,
        pre_rated BOOLEAN NOT NULL DEFAULT FALSE,
        cost_source TEXT NOT NULL DEFAULT '',
        cost DOUBLE PRECISION NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (cgrid, run_id)
    )
"#;

const INSERT_CDR: &str = r#"
    INSERT INTO cdrs (
        cgrid, run_id, order_id, origin_host, source, origin_id,
        tor, request_type, tenant, category, account, subject, destination,
        setup_time, answer_time, usage_ns,
        extra_fields, extra_info, partial, pre_rated, cost_source, cost
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
"#;

const UPSERT_SUFFIX: &str = r#"
    ON CONFLICT (cgrid, run_id) DO UPDATE SET
        order_id = EXCLUDED.order_id,
        origin_host = EXCLUDED.origin_host,
        source = EXCLUDED.source,
        origin_id = EXCLUDED.origin_id,
        tor = EXCLUDED.tor,
        request_type = EXCLUDED.request_type,
        tenant = EXCLUDED.tenant,
        category = EXCLUDED.category,
        account = EXCLUDED.account,
        subject = EXCLUDED.subject,
        destination = EXCLUDED.destination,
        setup_time = EXCLUDED.setup_time,
        answer_time = EXCLUDED.answer_time,
        usage_ns = EXCLUDED.usage_ns,
        extra_fields = EXCLUDED.extra_fields,
        extra_info = EXCLUDED.extra_info,
        partial = EXCLUDED.partial,
        pre_rated = EXCLUDED.pre_rated,
        cost_source = EXCLUDED.cost_source,
        cost = EXCLUDED.cost
"#;

#[async_trait]
impl CdrStorage for PgCdrStorage {
    #[instrument(skip(self, cdr), fields(cgrid = %cdr.cgrid, run_id = %cdr.run_id))]
    async fn set_cdr(&self, cdr: &Cdr, allow_update: bool) -> AppResult<()> {
        debug!("Storing CDR for account {}", cdr.account);

        let query = if allow_update {
            format!("{}{}", INSERT_CDR, UPSERT_SUFFIX)
        } else {
            INSERT_CDR.to_string()
        };

        sqlx::query(&query)
            .bind(&cdr.cgrid)
            .bind(&cdr.run_id)
            .bind(cdr.order_id)
            .bind(&cdr.origin_host)
            .bind(&cdr.source)
            .bind(&cdr.origin_id)
            .bind(&cdr.tor)
            .bind(&cdr.request_type)
            .bind(&cdr.tenant)
            .bind(&cdr.category)
            .bind(&cdr.account)
            .bind(&cdr.subject)
            .bind(&cdr.destination)
            .bind(cdr.setup_time)
            .bind(cdr.answer_time)
            .bind(cdr.usage)
            .bind(Json(&cdr.extra_fields))
            .bind(&cdr.extra_info)
            .bind(cdr.partial)
            .bind(cdr.pre_rated)
            .bind(&cdr.cost_source)
            .bind(cdr.cost)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AppError::AlreadyExists(format!("CDR {}/{}", cdr.cgrid, cdr.run_id))
                }
                other => {
                    error!("Database error storing CDR {}: {}", cdr.cgrid, other);
                    AppError::Database(format!("Failed to store CDR: {}", other))
                }
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::create_pool;
    use apolo_core::config::DatabaseConfig;
    use chrono::Utc;

    async fn storage() -> PgCdrStorage {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/apolo_actions".to_string());
        let config = DatabaseConfig {
            url: Some(database_url),
            max_connections: 2,
        };
        let pool = create_pool(&config).await.unwrap().unwrap();
        let storage = PgCdrStorage::new(pool);
        storage.ensure_schema().await.unwrap();
        storage
    }

    fn sample_cdr(cgrid: &str) -> Cdr {
        Cdr {
            cgrid: cgrid.to_string(),
            run_id: "*debit".to_string(),
            source: "*cdrlog".to_string(),
            tenant: "cgrates.org".to_string(),
            account: "1001".to_string(),
            setup_time: Utc::now(),
            answer_time: Utc::now(),
            usage: 1,
            cost: 5.0,
            ..Default::default()
        }
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_upsert_and_duplicate() {
        let storage = storage().await;
        let cgrid = format!("test-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());
        let cdr = sample_cdr(&cgrid);

        storage.set_cdr(&cdr, false).await.unwrap();
        let dup = storage.set_cdr(&cdr, false).await.unwrap_err();
        assert!(matches!(dup, AppError::AlreadyExists(_)));
        storage.set_cdr(&cdr, true).await.unwrap();
    }
}
