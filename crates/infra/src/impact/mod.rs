//! Impact Propagation Aggregator.
//!
//! Loads one tenant's planning graph, runs the pure computation from
//! [`impactline_planning::impact`], and writes every Job `impact_value` and
//! Outcome `points` back in a single batch.
//!
//! Runs for the same tenant are serialized by [`TenantLocks`], so a slow run
//! can never overwrite the result of a newer one. Failures never escape as
//! errors or panics: they come back as a [`RecomputeResult`] with
//! `success == false`.

mod locks;

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, instrument, warn};

use impactline_core::TenantId;
use impactline_planning::{ImpactReport, compute};

use crate::store::{ImpactWriteSummary, PlanningStore, StoreError};

pub use locks::TenantLocks;

#[derive(Debug, Error)]
pub enum ImpactError {
    #[error("invalid tenant id `{0}`")]
    InvalidTenant(TenantId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one recomputation, returned to the trigger point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub jobs_updated: usize,
    pub outcomes_updated: usize,
    pub dangling_skipped: usize,
    pub computed_at: DateTime<Utc>,
}

impl RecomputeResult {
    fn succeeded(written: ImpactWriteSummary, report: &ImpactReport, at: DateTime<Utc>) -> Self {
        Self {
            success: true,
            message: None,
            jobs_updated: written.jobs_updated,
            outcomes_updated: written.outcomes_updated,
            dangling_skipped: report.dangling_skipped,
            computed_at: at,
        }
    }

    fn failed(err: &ImpactError, at: DateTime<Utc>) -> Self {
        Self {
            success: false,
            message: Some(err.to_string()),
            jobs_updated: 0,
            outcomes_updated: 0,
            dangling_skipped: 0,
            computed_at: at,
        }
    }
}

/// Per-tenant record of recomputations, used as a staleness marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactRun {
    pub last: RecomputeResult,
    /// Most recent successful run, if any.
    pub last_success_at: Option<DateTime<Utc>>,
    pub runs: u64,
    pub failures: u64,
}

impl ImpactRun {
    /// Derived fields may be out of date when the latest run failed.
    pub fn is_stale(&self) -> bool {
        !self.last.success
    }
}

pub struct ImpactAggregator<S> {
    store: S,
    locks: TenantLocks,
    runs: RwLock<HashMap<TenantId, ImpactRun>>,
}

impl<S: PlanningStore> ImpactAggregator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: TenantLocks::new(),
            runs: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Hold the tenant's recompute slot.
    ///
    /// Writers that read a record carrying a derived field and write it back
    /// whole must do so under this guard, or a concurrent run's result could
    /// be overwritten with a stale value.
    pub async fn lock(&self, tenant_id: TenantId) -> OwnedMutexGuard<()> {
        self.locks.acquire(tenant_id).await
    }

    /// Recompute and persist all derived impact fields of one tenant.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn recompute_impacts(&self, tenant_id: TenantId) -> RecomputeResult {
        let started = Instant::now();
        let outcome = self.recompute(tenant_id).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let now = Utc::now();

        let result = match outcome {
            Ok((written, report)) => {
                if report.foreign_skipped > 0 {
                    warn!(
                        foreign_skipped = report.foreign_skipped,
                        "ignored records tagged with another tenant"
                    );
                }
                info!(
                    jobs_updated = written.jobs_updated,
                    outcomes_updated = written.outcomes_updated,
                    dangling_skipped = report.dangling_skipped,
                    elapsed_ms,
                    "impact recomputation complete"
                );
                RecomputeResult::succeeded(written, &report, now)
            }
            Err(err) => {
                warn!(error = %err, elapsed_ms, "impact recomputation failed");
                RecomputeResult::failed(&err, now)
            }
        };

        if !tenant_id.is_nil() {
            self.record(tenant_id, &result);
        }
        result
    }

    async fn recompute(
        &self,
        tenant_id: TenantId,
    ) -> Result<(ImpactWriteSummary, ImpactReport), ImpactError> {
        let tenant_id = valid_tenant(tenant_id)?;
        let _guard = self.locks.acquire(tenant_id).await;

        let graph = self.store.load_graph(tenant_id).await?;
        let report = compute(&graph);
        let written = self.store.write_impacts(tenant_id, &report).await?;
        Ok((written, report))
    }

    /// Compute the derived values without writing them.
    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    pub async fn preview(&self, tenant_id: TenantId) -> Result<ImpactReport, ImpactError> {
        let tenant_id = valid_tenant(tenant_id)?;
        let graph = self.store.load_graph(tenant_id).await?;
        Ok(compute(&graph))
    }

    /// The latest recomputation of `tenant_id`, if any ran in this process.
    pub fn status(&self, tenant_id: TenantId) -> Option<ImpactRun> {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        runs.get(&tenant_id).cloned()
    }

    fn record(&self, tenant_id: TenantId, result: &RecomputeResult) {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        let run = runs.entry(tenant_id).or_insert_with(|| ImpactRun {
            last: result.clone(),
            last_success_at: None,
            runs: 0,
            failures: 0,
        });
        run.last = result.clone();
        run.runs += 1;
        if result.success {
            run.last_success_at = Some(result.computed_at);
        } else {
            run.failures += 1;
        }
    }
}

fn valid_tenant(tenant_id: TenantId) -> Result<TenantId, ImpactError> {
    tenant_id
        .ensure_valid()
        .map_err(|_| ImpactError::InvalidTenant(tenant_id))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use impactline_core::{JobId, OutcomeId};
    use impactline_planning::{
        Job, JobDraft, JobOutputMapping, JobOutputMappingDraft, Outcome, OutcomeDraft, Output,
        OutputDraft, OutputOutcomeMapping, OutputOutcomeMappingDraft,
    };

    use super::*;
    use crate::store::testing::ProbeStore;
    use crate::store::InMemoryPlanningStore;

    /// J1 → O1 (2), J1 → O2 (5), O1 → Q1 (10), O2 unmapped, Q2 unmapped.
    struct Scenario {
        j1: Job,
        q1: Outcome,
        q2: Outcome,
        o1_q1: OutputOutcomeMapping,
    }

    async fn seed(store: &impl PlanningStore, tenant: TenantId) -> Scenario {
        let now = Utc::now();
        let j1 = Job::create(
            tenant,
            JobDraft {
                title: "J1".to_string(),
                ..JobDraft::default()
            },
            now,
        )
        .unwrap();
        let output = |name: &str| {
            Output::create(
                tenant,
                OutputDraft {
                    name: name.to_string(),
                    ..OutputDraft::default()
                },
                now,
            )
            .unwrap()
        };
        let outcome = |name: &str| {
            Outcome::create(
                tenant,
                OutcomeDraft {
                    name: name.to_string(),
                    ..OutcomeDraft::default()
                },
                now,
            )
            .unwrap()
        };
        let (o1, o2) = (output("O1"), output("O2"));
        let (q1, q2) = (outcome("Q1"), outcome("Q2"));

        let job_output = |o: &Output, w: f64| {
            let draft = JobOutputMappingDraft {
                job_id: j1.id,
                output_id: o.id,
                pi_impact_value: w,
                pi_target: None,
            };
            JobOutputMapping::link(tenant, draft, &j1, o, now).unwrap()
        };
        let (j1_o1, j1_o2) = (job_output(&o1, 2.0), job_output(&o2, 5.0));
        let o1_q1 = OutputOutcomeMapping::link(
            tenant,
            OutputOutcomeMappingDraft {
                output_id: o1.id,
                outcome_id: q1.id,
                qbo_impact: 10.0,
                pi_target: None,
                qbo_target: None,
            },
            &o1,
            &q1,
            now,
        )
        .unwrap();

        store.jobs().upsert(tenant, j1.id, j1.clone()).await.unwrap();
        for o in [&o1, &o2] {
            store.outputs().upsert(tenant, o.id, o.clone()).await.unwrap();
        }
        for q in [&q1, &q2] {
            store.outcomes().upsert(tenant, q.id, q.clone()).await.unwrap();
        }
        for m in [j1_o1, j1_o2] {
            store.job_outputs().upsert(tenant, m.id, m).await.unwrap();
        }
        store
            .output_outcomes()
            .upsert(tenant, o1_q1.id, o1_q1.clone())
            .await
            .unwrap();

        Scenario { j1, q1, q2, o1_q1 }
    }

    async fn job_impact(store: &impl PlanningStore, tenant: TenantId, id: JobId) -> f64 {
        store.jobs().get(tenant, &id).await.unwrap().unwrap().impact_value
    }

    async fn outcome_points(store: &impl PlanningStore, tenant: TenantId, id: OutcomeId) -> f64 {
        store.outcomes().get(tenant, &id).await.unwrap().unwrap().points
    }

    #[tokio::test]
    async fn weighted_fan_in_is_persisted() {
        let aggregator = ImpactAggregator::new(InMemoryPlanningStore::new());
        let tenant = TenantId::new();
        let s = seed(aggregator.store(), tenant).await;

        let result = aggregator.recompute_impacts(tenant).await;

        assert!(result.success, "{result:?}");
        assert_eq!(result.jobs_updated, 1);
        assert_eq!(result.outcomes_updated, 2);
        assert_eq!(result.dangling_skipped, 0);
        assert_eq!(job_impact(aggregator.store(), tenant, s.j1.id).await, 20.0);
        assert_eq!(outcome_points(aggregator.store(), tenant, s.q1.id).await, 10.0);
        assert_eq!(outcome_points(aggregator.store(), tenant, s.q2.id).await, 0.0);
    }

    #[tokio::test]
    async fn removing_the_only_outcome_edge_drops_the_job_to_zero() {
        let aggregator = ImpactAggregator::new(InMemoryPlanningStore::new());
        let tenant = TenantId::new();
        let s = seed(aggregator.store(), tenant).await;
        aggregator.recompute_impacts(tenant).await;

        aggregator
            .store()
            .output_outcomes()
            .remove(tenant, &s.o1_q1.id)
            .await
            .unwrap();
        let result = aggregator.recompute_impacts(tenant).await;

        assert!(result.success);
        assert_eq!(job_impact(aggregator.store(), tenant, s.j1.id).await, 0.0);
        assert_eq!(outcome_points(aggregator.store(), tenant, s.q1.id).await, 0.0);
    }

    #[tokio::test]
    async fn deleted_outcome_leaves_a_tolerated_dangling_edge() {
        let aggregator = ImpactAggregator::new(InMemoryPlanningStore::new());
        let tenant = TenantId::new();
        let s = seed(aggregator.store(), tenant).await;

        aggregator.store().outcomes().remove(tenant, &s.q1.id).await.unwrap();
        let result = aggregator.recompute_impacts(tenant).await;

        assert!(result.success);
        assert_eq!(result.dangling_skipped, 1);
        assert_eq!(job_impact(aggregator.store(), tenant, s.j1.id).await, 0.0);
    }

    #[tokio::test]
    async fn repeated_runs_are_idempotent() {
        let aggregator = ImpactAggregator::new(InMemoryPlanningStore::new());
        let tenant = TenantId::new();
        seed(aggregator.store(), tenant).await;

        aggregator.recompute_impacts(tenant).await;
        let first = aggregator.store().load_graph(tenant).await.unwrap();
        aggregator.recompute_impacts(tenant).await;
        let second = aggregator.store().load_graph(tenant).await.unwrap();

        let mut a = first.jobs;
        let mut b = second.jobs;
        a.sort_by_key(|j| j.id);
        b.sort_by_key(|j| j.id);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn other_tenants_are_untouched() {
        let aggregator = ImpactAggregator::new(InMemoryPlanningStore::new());
        let (tenant, other) = (TenantId::new(), TenantId::new());
        seed(aggregator.store(), tenant).await;
        let theirs = seed(aggregator.store(), other).await;

        aggregator.recompute_impacts(tenant).await;

        assert_eq!(job_impact(aggregator.store(), other, theirs.j1.id).await, 0.0);
        assert!(aggregator.status(other).is_none());
    }

    #[tokio::test]
    async fn nil_tenant_fails_fast_without_store_access() {
        let aggregator = ImpactAggregator::new(ProbeStore::default());

        let result = aggregator.recompute_impacts(TenantId::from(uuid::Uuid::nil())).await;

        assert!(!result.success);
        assert!(result.message.unwrap().contains("invalid tenant id"));
        assert_eq!(aggregator.store().loads.load(Ordering::SeqCst), 0);
        assert!(aggregator.status(TenantId::from(uuid::Uuid::nil())).is_none());
    }

    #[tokio::test]
    async fn store_failure_is_reported_and_leaves_values_unchanged() {
        let aggregator = ImpactAggregator::new(ProbeStore::failing_writes());
        let tenant = TenantId::new();
        let s = seed(aggregator.store(), tenant).await;

        let result = aggregator.recompute_impacts(tenant).await;

        assert!(!result.success);
        assert!(result.message.unwrap().contains("connection refused"));
        assert_eq!(job_impact(aggregator.store(), tenant, s.j1.id).await, 0.0);

        let run = aggregator.status(tenant).unwrap();
        assert!(run.is_stale());
        assert_eq!((run.runs, run.failures), (1, 1));
        assert_eq!(run.last_success_at, None);
    }

    #[tokio::test]
    async fn preview_does_not_write() {
        let aggregator = ImpactAggregator::new(InMemoryPlanningStore::new());
        let tenant = TenantId::new();
        let s = seed(aggregator.store(), tenant).await;

        let report = aggregator.preview(tenant).await.unwrap();

        assert_eq!(report.job_impact(&s.j1.id), 20.0);
        assert_eq!(job_impact(aggregator.store(), tenant, s.j1.id).await, 0.0);
        assert!(aggregator.status(tenant).is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn runs_for_one_tenant_never_overlap() {
        let aggregator = Arc::new(ImpactAggregator::new(ProbeStore {
            write_delay: Some(Duration::from_millis(5)),
            ..ProbeStore::default()
        }));
        let tenant = TenantId::new();
        let s = seed(aggregator.store(), tenant).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let aggregator = Arc::clone(&aggregator);
                tokio::spawn(async move { aggregator.recompute_impacts(tenant).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().success);
        }

        assert_eq!(aggregator.store().max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(aggregator.status(tenant).unwrap().runs, 8);
        assert_eq!(job_impact(aggregator.store(), tenant, s.j1.id).await, 20.0);
    }
}
