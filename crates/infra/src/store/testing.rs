//! Store doubles shared by the async tests of this crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use impactline_core::{JobId, MappingId, OutcomeId, OutputId, TenantId};
use impactline_planning::{
    ImpactGraph, ImpactReport, Job, JobOutputMapping, Outcome, Output, OutputOutcomeMapping,
};

use super::{
    ImpactWriteSummary, InMemoryPlanningStore, PlanningStore, StoreError, StoreResult, TenantStore,
};

/// Wraps the in-memory store to inject failures and observe overlap.
#[derive(Default)]
pub(crate) struct ProbeStore {
    pub(crate) inner: InMemoryPlanningStore,
    pub(crate) fail_writes: bool,
    pub(crate) write_delay: Option<Duration>,
    pub(crate) loads: AtomicUsize,
    pub(crate) in_flight: AtomicUsize,
    pub(crate) max_in_flight: AtomicUsize,
}

impl ProbeStore {
    pub(crate) fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl PlanningStore for ProbeStore {
    fn jobs(&self) -> &dyn TenantStore<JobId, Job> {
        self.inner.jobs()
    }

    fn outputs(&self) -> &dyn TenantStore<OutputId, Output> {
        self.inner.outputs()
    }

    fn outcomes(&self) -> &dyn TenantStore<OutcomeId, Outcome> {
        self.inner.outcomes()
    }

    fn job_outputs(&self) -> &dyn TenantStore<MappingId, JobOutputMapping> {
        self.inner.job_outputs()
    }

    fn output_outcomes(&self) -> &dyn TenantStore<MappingId, OutputOutcomeMapping> {
        self.inner.output_outcomes()
    }

    async fn load_graph(&self, tenant_id: TenantId) -> StoreResult<ImpactGraph> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load_graph(tenant_id).await
    }

    async fn write_impacts(
        &self,
        tenant_id: TenantId,
        report: &ImpactReport,
    ) -> StoreResult<ImpactWriteSummary> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        let written = self.inner.write_impacts(tenant_id, report).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        written
    }
}
