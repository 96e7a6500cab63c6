//! Postgres-backed planning store.
//!
//! Every record lives as a JSONB document in `planning_documents`, keyed by
//! `(tenant_id, collection, id)`. Each query binds the tenant id, so a
//! collection can never read or write another tenant's rows.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | PoolTimedOut, PoolClosed, Io | `Unavailable` |
//! | Decode, ColumnDecode | `Serialization` |
//! | anything else | `Backend` |

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{Span, debug, instrument};
use uuid::Uuid;

use impactline_core::{JobId, MappingId, OutcomeId, OutputId, TenantId};
use impactline_planning::{
    ImpactReport, Job, JobOutputMapping, Outcome, Output, OutputOutcomeMapping,
};

use super::{ImpactWriteSummary, PlanningStore, StoreError, StoreResult, TenantStore};

const SCHEMA: &str = include_str!("../../migrations/0001_planning_documents.sql");

const JOBS: &str = "jobs";
const OUTPUTS: &str = "outputs";
const OUTCOMES: &str = "outcomes";
const JOB_OUTPUTS: &str = "job_output_mappings";
const OUTPUT_OUTCOMES: &str = "output_outcome_mappings";

/// One collection of JSONB documents.
#[derive(Debug, Clone)]
pub struct PostgresDocumentStore<K, V> {
    pool: PgPool,
    collection: &'static str,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> PostgresDocumentStore<K, V> {
    pub fn new(pool: PgPool, collection: &'static str) -> Self {
        Self {
            pool,
            collection,
            _marker: PhantomData,
        }
    }

    fn record_collection(&self) {
        Span::current().record("collection", self.collection);
    }
}

fn decode<V: DeserializeOwned>(row: &PgRow) -> StoreResult<V> {
    let Json(value) = row
        .try_get::<Json<V>, _>("body")
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(value)
}

#[async_trait]
impl<K, V> TenantStore<K, V> for PostgresDocumentStore<K, V>
where
    K: Copy + Into<Uuid> + Send + Sync + 'static,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    #[instrument(skip(self, key), fields(collection = tracing::field::Empty, tenant_id = %tenant_id), err)]
    async fn get(&self, tenant_id: TenantId, key: &K) -> StoreResult<Option<V>> {
        self.record_collection();
        let id: Uuid = (*key).into();
        let row = sqlx::query(
            r#"
            SELECT body
            FROM planning_documents
            WHERE tenant_id = $1 AND collection = $2 AND id = $3
            "#,
        )
        .bind(Uuid::from(tenant_id))
        .bind(self.collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get", e))?;

        row.as_ref().map(decode::<V>).transpose()
    }

    #[instrument(skip(self, key, value), fields(collection = tracing::field::Empty, tenant_id = %tenant_id), err)]
    async fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> StoreResult<()> {
        self.record_collection();
        let id: Uuid = key.into();
        let body =
            serde_json::to_value(&value).map_err(|e| StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO planning_documents (tenant_id, collection, id, body)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, collection, id)
            DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()
            "#,
        )
        .bind(Uuid::from(tenant_id))
        .bind(self.collection)
        .bind(id)
        .bind(Json(body))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert", e))?;

        debug!("document upserted");
        Ok(())
    }

    #[instrument(skip(self, key), fields(collection = tracing::field::Empty, tenant_id = %tenant_id), err)]
    async fn remove(&self, tenant_id: TenantId, key: &K) -> StoreResult<Option<V>> {
        self.record_collection();
        let id: Uuid = (*key).into();
        let row = sqlx::query(
            r#"
            DELETE FROM planning_documents
            WHERE tenant_id = $1 AND collection = $2 AND id = $3
            RETURNING body
            "#,
        )
        .bind(Uuid::from(tenant_id))
        .bind(self.collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove", e))?;

        row.as_ref().map(decode::<V>).transpose()
    }

    #[instrument(skip(self), fields(collection = tracing::field::Empty, tenant_id = %tenant_id), err)]
    async fn list(&self, tenant_id: TenantId) -> StoreResult<Vec<V>> {
        self.record_collection();
        let rows = sqlx::query(
            r#"
            SELECT body
            FROM planning_documents
            WHERE tenant_id = $1 AND collection = $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(Uuid::from(tenant_id))
        .bind(self.collection)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list", e))?;

        rows.iter().map(decode::<V>).collect()
    }
}

/// All planning collections over one connection pool.
#[derive(Debug, Clone)]
pub struct PostgresPlanningStore {
    pool: PgPool,
    jobs: PostgresDocumentStore<JobId, Job>,
    outputs: PostgresDocumentStore<OutputId, Output>,
    outcomes: PostgresDocumentStore<OutcomeId, Outcome>,
    job_outputs: PostgresDocumentStore<MappingId, JobOutputMapping>,
    output_outcomes: PostgresDocumentStore<MappingId, OutputOutcomeMapping>,
}

impl PostgresPlanningStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            jobs: PostgresDocumentStore::new(pool.clone(), JOBS),
            outputs: PostgresDocumentStore::new(pool.clone(), OUTPUTS),
            outcomes: PostgresDocumentStore::new(pool.clone(), OUTCOMES),
            job_outputs: PostgresDocumentStore::new(pool.clone(), JOB_OUTPUTS),
            output_outcomes: PostgresDocumentStore::new(pool.clone(), OUTPUT_OUTCOMES),
            pool,
        }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the documents table if it does not exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl PlanningStore for PostgresPlanningStore {
    fn jobs(&self) -> &dyn TenantStore<JobId, Job> {
        &self.jobs
    }

    fn outputs(&self) -> &dyn TenantStore<OutputId, Output> {
        &self.outputs
    }

    fn outcomes(&self) -> &dyn TenantStore<OutcomeId, Outcome> {
        &self.outcomes
    }

    fn job_outputs(&self) -> &dyn TenantStore<MappingId, JobOutputMapping> {
        &self.job_outputs
    }

    fn output_outcomes(&self) -> &dyn TenantStore<MappingId, OutputOutcomeMapping> {
        &self.output_outcomes
    }

    /// One transaction; `jsonb_set` rewrites only the derived key of each body.
    #[instrument(skip(self, report), fields(tenant_id = %tenant_id), err)]
    async fn write_impacts(
        &self,
        tenant_id: TenantId,
        report: &ImpactReport,
    ) -> StoreResult<ImpactWriteSummary> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        let mut summary = ImpactWriteSummary::default();

        for (id, value) in &report.job_impacts {
            let result = sqlx::query(
                r#"
                UPDATE planning_documents
                SET body = jsonb_set(body, '{impactValue}', to_jsonb($4::float8)),
                    updated_at = NOW()
                WHERE tenant_id = $1 AND collection = $2 AND id = $3
                "#,
            )
            .bind(Uuid::from(tenant_id))
            .bind(JOBS)
            .bind(Uuid::from(*id))
            .bind(*value)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("write_job_impact", e))?;
            summary.jobs_updated += result.rows_affected() as usize;
        }

        for (id, points) in &report.outcome_points {
            let result = sqlx::query(
                r#"
                UPDATE planning_documents
                SET body = jsonb_set(body, '{points}', to_jsonb($4::float8)),
                    updated_at = NOW()
                WHERE tenant_id = $1 AND collection = $2 AND id = $3
                "#,
            )
            .bind(Uuid::from(tenant_id))
            .bind(OUTCOMES)
            .bind(Uuid::from(*id))
            .bind(*points)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("write_outcome_points", e))?;
            summary.outcomes_updated += result.rows_affected() as usize;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(summary)
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    let msg = format!("{operation}: {err}");
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(msg)
        }
        sqlx::Error::Decode(_) | sqlx::Error::ColumnDecode { .. } => StoreError::Serialization(msg),
        _ => StoreError::Backend(msg),
    }
}
