use std::sync::Arc;

use async_trait::async_trait;
use impactline_core::{JobId, MappingId, OutcomeId, OutputId, TenantId};
use impactline_planning::{
    ImpactGraph, ImpactReport, Job, JobOutputMapping, Outcome, Output, OutputOutcomeMapping,
};

use super::{StoreResult, TenantStore};

/// How many derived fields one batch write touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImpactWriteSummary {
    pub jobs_updated: usize,
    pub outcomes_updated: usize,
}

/// The five planning collections plus the derived-field batch write.
///
/// Collection accessors hand out plain [`TenantStore`]s so services can do
/// ordinary CRUD; `write_impacts` is the only path that touches
/// `Job::impact_value` and `Outcome::points`.
#[async_trait]
pub trait PlanningStore: Send + Sync {
    fn jobs(&self) -> &dyn TenantStore<JobId, Job>;
    fn outputs(&self) -> &dyn TenantStore<OutputId, Output>;
    fn outcomes(&self) -> &dyn TenantStore<OutcomeId, Outcome>;
    fn job_outputs(&self) -> &dyn TenantStore<MappingId, JobOutputMapping>;
    fn output_outcomes(&self) -> &dyn TenantStore<MappingId, OutputOutcomeMapping>;

    /// Read everything the impact computation needs for one tenant.
    async fn load_graph(&self, tenant_id: TenantId) -> StoreResult<ImpactGraph> {
        Ok(ImpactGraph {
            tenant_id: Some(tenant_id),
            jobs: self.jobs().list(tenant_id).await?,
            outputs: self.outputs().list(tenant_id).await?,
            outcomes: self.outcomes().list(tenant_id).await?,
            job_outputs: self.job_outputs().list(tenant_id).await?,
            output_outcomes: self.output_outcomes().list(tenant_id).await?,
        })
    }

    /// Persist `report` as one atomic batch.
    ///
    /// Only records present both in the store and in the report are written;
    /// a record created after the graph was loaded keeps its current value
    /// until the next run. Either every field is written or none is.
    async fn write_impacts(
        &self,
        tenant_id: TenantId,
        report: &ImpactReport,
    ) -> StoreResult<ImpactWriteSummary>;
}

#[async_trait]
impl<S> PlanningStore for Arc<S>
where
    S: PlanningStore + ?Sized,
{
    fn jobs(&self) -> &dyn TenantStore<JobId, Job> {
        (**self).jobs()
    }

    fn outputs(&self) -> &dyn TenantStore<OutputId, Output> {
        (**self).outputs()
    }

    fn outcomes(&self) -> &dyn TenantStore<OutcomeId, Outcome> {
        (**self).outcomes()
    }

    fn job_outputs(&self) -> &dyn TenantStore<MappingId, JobOutputMapping> {
        (**self).job_outputs()
    }

    fn output_outcomes(&self) -> &dyn TenantStore<MappingId, OutputOutcomeMapping> {
        (**self).output_outcomes()
    }

    async fn load_graph(&self, tenant_id: TenantId) -> StoreResult<ImpactGraph> {
        (**self).load_graph(tenant_id).await
    }

    async fn write_impacts(
        &self,
        tenant_id: TenantId,
        report: &ImpactReport,
    ) -> StoreResult<ImpactWriteSummary> {
        (**self).write_impacts(tenant_id, report).await
    }
}
