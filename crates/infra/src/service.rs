//! Planning use cases and the impact trigger points.
//!
//! Every mutation that can change the mapping graph persists its change and
//! then runs [`ImpactAggregator::recompute_impacts`] before returning. The
//! result rides along in [`Mutation::impact`]; a failed recomputation is
//! reported there and never undoes the mutation.
//!
//! | Collection | create | update | delete |
//! |---|---|---|---|
//! | Job | – | – | – |
//! | Output | – | recompute | recompute |
//! | Outcome | recompute | recompute | recompute |
//! | Job → Output mapping | recompute | recompute | recompute |
//! | Output → Outcome mapping | recompute | recompute | recompute |
//!
//! Updates of records that carry a derived field (Job `impact_value`, Outcome
//! `points`) read and write back under the tenant's recompute lock.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use impactline_core::{DomainError, JobId, MappingId, OutcomeId, OutputId, TenantId};
use impactline_planning::{
    ImpactReport, Job, JobDraft, JobOutputMapping, JobOutputMappingDraft, JobOutputMappingPatch,
    JobPatch, Outcome, OutcomeDraft, OutcomePatch, Output, OutputDraft, OutputOutcomeMapping,
    OutputOutcomeMappingDraft, OutputOutcomeMappingPatch, OutputPatch, RankedJob, rank_jobs,
};

use crate::impact::{ImpactAggregator, ImpactError, ImpactRun, RecomputeResult};
use crate::store::{PlanningStore, StoreError, TenantStore};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Impact(#[from] ImpactError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// A persisted change plus the recomputation it triggered, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mutation<T> {
    pub item: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<RecomputeResult>,
}

/// Optional endpoint filters for mapping listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingFilter {
    pub job_id: Option<JobId>,
    #[serde(rename = "piId")]
    pub output_id: Option<OutputId>,
    #[serde(rename = "qboId")]
    pub outcome_id: Option<OutcomeId>,
}

impl MappingFilter {
    fn admits_job_output(&self, m: &JobOutputMapping) -> bool {
        self.job_id.is_none_or(|id| id == m.job_id)
            && self.output_id.is_none_or(|id| id == m.output_id)
    }

    fn admits_output_outcome(&self, m: &OutputOutcomeMapping) -> bool {
        self.output_id.is_none_or(|id| id == m.output_id)
            && self.outcome_id.is_none_or(|id| id == m.outcome_id)
    }
}

pub struct PlanningService<S> {
    aggregator: ImpactAggregator<S>,
}

fn scope(tenant_id: TenantId) -> ServiceResult<TenantId> {
    Ok(tenant_id.ensure_valid()?)
}

async fn require<K, V>(
    store: &dyn TenantStore<K, V>,
    tenant_id: TenantId,
    id: &K,
    entity: &'static str,
) -> ServiceResult<V>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    store
        .get(tenant_id, id)
        .await?
        .ok_or(ServiceError::Domain(DomainError::not_found(entity)))
}

impl<S: PlanningStore> PlanningService<S> {
    pub fn new(store: S) -> Self {
        Self {
            aggregator: ImpactAggregator::new(store),
        }
    }

    pub fn store(&self) -> &S {
        self.aggregator.store()
    }

    async fn triggered<T>(&self, tenant_id: TenantId, item: T) -> Mutation<T> {
        let impact = self.aggregator.recompute_impacts(tenant_id).await;
        Mutation {
            item,
            impact: Some(impact),
        }
    }

    // ----- jobs -----

    /// Jobs in manual order.
    pub async fn list_jobs(&self, tenant_id: TenantId) -> ServiceResult<Vec<Job>> {
        let mut jobs = self.store().jobs().list(scope(tenant_id)?).await?;
        jobs.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(jobs)
    }

    /// Open jobs, highest impact first.
    pub async fn ranked_jobs(&self, tenant_id: TenantId) -> ServiceResult<Vec<RankedJob>> {
        let jobs = self.store().jobs().list(scope(tenant_id)?).await?;
        Ok(rank_jobs(jobs))
    }

    pub async fn get_job(&self, tenant_id: TenantId, id: JobId) -> ServiceResult<Job> {
        require(self.store().jobs(), scope(tenant_id)?, &id, "job").await
    }

    pub async fn create_job(&self, tenant_id: TenantId, draft: JobDraft) -> ServiceResult<Mutation<Job>> {
        let job = Job::create(tenant_id, draft, Utc::now())?;
        self.store().jobs().upsert(job.tenant_id, job.id, job.clone()).await?;
        info!(tenant_id = %job.tenant_id, job_id = %job.id, "job created");
        Ok(Mutation {
            item: job,
            impact: None,
        })
    }

    pub async fn update_job(
        &self,
        tenant_id: TenantId,
        id: JobId,
        patch: JobPatch,
    ) -> ServiceResult<Mutation<Job>> {
        let tenant_id = scope(tenant_id)?;
        let _guard = self.aggregator.lock(tenant_id).await;
        let mut job = require(self.store().jobs(), tenant_id, &id, "job").await?;
        job.apply_patch(patch, Utc::now())?;
        self.store().jobs().upsert(tenant_id, id, job.clone()).await?;
        Ok(Mutation {
            item: job,
            impact: None,
        })
    }

    /// Mappings that pointed at the job stay behind as dangling edges.
    pub async fn delete_job(&self, tenant_id: TenantId, id: JobId) -> ServiceResult<Mutation<Job>> {
        let tenant_id = scope(tenant_id)?;
        let job = self
            .store()
            .jobs()
            .remove(tenant_id, &id)
            .await?
            .ok_or(DomainError::not_found("job"))?;
        info!(tenant_id = %tenant_id, job_id = %id, "job deleted");
        Ok(Mutation {
            item: job,
            impact: None,
        })
    }

    // ----- outputs -----

    pub async fn list_outputs(&self, tenant_id: TenantId) -> ServiceResult<Vec<Output>> {
        let mut outputs = self.store().outputs().list(scope(tenant_id)?).await?;
        outputs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(outputs)
    }

    pub async fn get_output(&self, tenant_id: TenantId, id: OutputId) -> ServiceResult<Output> {
        require(self.store().outputs(), scope(tenant_id)?, &id, "output").await
    }

    /// A fresh Output has no edges yet, so nothing is recomputed.
    pub async fn create_output(
        &self,
        tenant_id: TenantId,
        draft: OutputDraft,
    ) -> ServiceResult<Mutation<Output>> {
        let output = Output::create(tenant_id, draft, Utc::now())?;
        self.store()
            .outputs()
            .upsert(output.tenant_id, output.id, output.clone())
            .await?;
        info!(tenant_id = %output.tenant_id, output_id = %output.id, "output created");
        Ok(Mutation {
            item: output,
            impact: None,
        })
    }

    pub async fn update_output(
        &self,
        tenant_id: TenantId,
        id: OutputId,
        patch: OutputPatch,
    ) -> ServiceResult<Mutation<Output>> {
        let tenant_id = scope(tenant_id)?;
        let mut output = require(self.store().outputs(), tenant_id, &id, "output").await?;
        output.apply_patch(patch, Utc::now())?;
        self.store().outputs().upsert(tenant_id, id, output.clone()).await?;
        Ok(self.triggered(tenant_id, output).await)
    }

    pub async fn delete_output(
        &self,
        tenant_id: TenantId,
        id: OutputId,
    ) -> ServiceResult<Mutation<Output>> {
        let tenant_id = scope(tenant_id)?;
        let output = self
            .store()
            .outputs()
            .remove(tenant_id, &id)
            .await?
            .ok_or(DomainError::not_found("output"))?;
        info!(tenant_id = %tenant_id, output_id = %id, "output deleted");
        Ok(self.triggered(tenant_id, output).await)
    }

    // ----- outcomes -----

    pub async fn list_outcomes(&self, tenant_id: TenantId) -> ServiceResult<Vec<Outcome>> {
        let mut outcomes = self.store().outcomes().list(scope(tenant_id)?).await?;
        outcomes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(outcomes)
    }

    pub async fn get_outcome(&self, tenant_id: TenantId, id: OutcomeId) -> ServiceResult<Outcome> {
        require(self.store().outcomes(), scope(tenant_id)?, &id, "outcome").await
    }

    pub async fn create_outcome(
        &self,
        tenant_id: TenantId,
        draft: OutcomeDraft,
    ) -> ServiceResult<Mutation<Outcome>> {
        let outcome = Outcome::create(tenant_id, draft, Utc::now())?;
        let tenant_id = outcome.tenant_id;
        self.store()
            .outcomes()
            .upsert(tenant_id, outcome.id, outcome.clone())
            .await?;
        info!(tenant_id = %tenant_id, outcome_id = %outcome.id, "outcome created");
        Ok(self.triggered(tenant_id, outcome).await)
    }

    pub async fn update_outcome(
        &self,
        tenant_id: TenantId,
        id: OutcomeId,
        patch: OutcomePatch,
    ) -> ServiceResult<Mutation<Outcome>> {
        let tenant_id = scope(tenant_id)?;
        let outcome = {
            let _guard = self.aggregator.lock(tenant_id).await;
            let mut outcome = require(self.store().outcomes(), tenant_id, &id, "outcome").await?;
            outcome.apply_patch(patch, Utc::now())?;
            self.store().outcomes().upsert(tenant_id, id, outcome.clone()).await?;
            outcome
        };
        Ok(self.triggered(tenant_id, outcome).await)
    }

    pub async fn delete_outcome(
        &self,
        tenant_id: TenantId,
        id: OutcomeId,
    ) -> ServiceResult<Mutation<Outcome>> {
        let tenant_id = scope(tenant_id)?;
        let outcome = self
            .store()
            .outcomes()
            .remove(tenant_id, &id)
            .await?
            .ok_or(DomainError::not_found("outcome"))?;
        info!(tenant_id = %tenant_id, outcome_id = %id, "outcome deleted");
        Ok(self.triggered(tenant_id, outcome).await)
    }

    // ----- job → output mappings -----

    pub async fn list_job_outputs(
        &self,
        tenant_id: TenantId,
        filter: MappingFilter,
    ) -> ServiceResult<Vec<JobOutputMapping>> {
        let mut mappings: Vec<_> = self
            .store()
            .job_outputs()
            .list(scope(tenant_id)?)
            .await?
            .into_iter()
            .filter(|m| filter.admits_job_output(m))
            .collect();
        mappings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(mappings)
    }

    pub async fn get_job_output(
        &self,
        tenant_id: TenantId,
        id: MappingId,
    ) -> ServiceResult<JobOutputMapping> {
        require(self.store().job_outputs(), scope(tenant_id)?, &id, "job-output mapping").await
    }

    pub async fn create_job_output(
        &self,
        tenant_id: TenantId,
        draft: JobOutputMappingDraft,
    ) -> ServiceResult<Mutation<JobOutputMapping>> {
        let tenant_id = scope(tenant_id)?;
        let job = require(self.store().jobs(), tenant_id, &draft.job_id, "job").await?;
        let output = require(self.store().outputs(), tenant_id, &draft.output_id, "output").await?;

        let mapping = JobOutputMapping::link(tenant_id, draft, &job, &output, Utc::now())?;
        self.store()
            .job_outputs()
            .upsert(tenant_id, mapping.id, mapping.clone())
            .await?;
        info!(tenant_id = %tenant_id, mapping_id = %mapping.id, "job-output mapping created");
        Ok(self.triggered(tenant_id, mapping).await)
    }

    pub async fn update_job_output(
        &self,
        tenant_id: TenantId,
        id: MappingId,
        patch: JobOutputMappingPatch,
    ) -> ServiceResult<Mutation<JobOutputMapping>> {
        let tenant_id = scope(tenant_id)?;
        let mut mapping = require(self.store().job_outputs(), tenant_id, &id, "job-output mapping").await?;
        mapping.apply_patch(patch, Utc::now())?;
        self.store().job_outputs().upsert(tenant_id, id, mapping.clone()).await?;
        Ok(self.triggered(tenant_id, mapping).await)
    }

    pub async fn delete_job_output(
        &self,
        tenant_id: TenantId,
        id: MappingId,
    ) -> ServiceResult<Mutation<JobOutputMapping>> {
        let tenant_id = scope(tenant_id)?;
        let mapping = self
            .store()
            .job_outputs()
            .remove(tenant_id, &id)
            .await?
            .ok_or(DomainError::not_found("job-output mapping"))?;
        info!(tenant_id = %tenant_id, mapping_id = %id, "job-output mapping deleted");
        Ok(self.triggered(tenant_id, mapping).await)
    }

    // ----- output → outcome mappings -----

    pub async fn list_output_outcomes(
        &self,
        tenant_id: TenantId,
        filter: MappingFilter,
    ) -> ServiceResult<Vec<OutputOutcomeMapping>> {
        let mut mappings: Vec<_> = self
            .store()
            .output_outcomes()
            .list(scope(tenant_id)?)
            .await?
            .into_iter()
            .filter(|m| filter.admits_output_outcome(m))
            .collect();
        mappings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(mappings)
    }

    pub async fn get_output_outcome(
        &self,
        tenant_id: TenantId,
        id: MappingId,
    ) -> ServiceResult<OutputOutcomeMapping> {
        require(
            self.store().output_outcomes(),
            scope(tenant_id)?,
            &id,
            "output-outcome mapping",
        )
        .await
    }

    pub async fn create_output_outcome(
        &self,
        tenant_id: TenantId,
        draft: OutputOutcomeMappingDraft,
    ) -> ServiceResult<Mutation<OutputOutcomeMapping>> {
        let tenant_id = scope(tenant_id)?;
        let output = require(self.store().outputs(), tenant_id, &draft.output_id, "output").await?;
        let outcome = require(self.store().outcomes(), tenant_id, &draft.outcome_id, "outcome").await?;

        let mapping = OutputOutcomeMapping::link(tenant_id, draft, &output, &outcome, Utc::now())?;
        self.store()
            .output_outcomes()
            .upsert(tenant_id, mapping.id, mapping.clone())
            .await?;
        info!(tenant_id = %tenant_id, mapping_id = %mapping.id, "output-outcome mapping created");
        Ok(self.triggered(tenant_id, mapping).await)
    }

    pub async fn update_output_outcome(
        &self,
        tenant_id: TenantId,
        id: MappingId,
        patch: OutputOutcomeMappingPatch,
    ) -> ServiceResult<Mutation<OutputOutcomeMapping>> {
        let tenant_id = scope(tenant_id)?;
        let mut mapping = require(
            self.store().output_outcomes(),
            tenant_id,
            &id,
            "output-outcome mapping",
        )
        .await?;
        mapping.apply_patch(patch, Utc::now())?;
        self.store()
            .output_outcomes()
            .upsert(tenant_id, id, mapping.clone())
            .await?;
        Ok(self.triggered(tenant_id, mapping).await)
    }

    pub async fn delete_output_outcome(
        &self,
        tenant_id: TenantId,
        id: MappingId,
    ) -> ServiceResult<Mutation<OutputOutcomeMapping>> {
        let tenant_id = scope(tenant_id)?;
        let mapping = self
            .store()
            .output_outcomes()
            .remove(tenant_id, &id)
            .await?
            .ok_or(DomainError::not_found("output-outcome mapping"))?;
        info!(tenant_id = %tenant_id, mapping_id = %id, "output-outcome mapping deleted");
        Ok(self.triggered(tenant_id, mapping).await)
    }

    // ----- impacts -----

    /// Manual trigger; always returns a result, even for an invalid tenant.
    pub async fn recompute(&self, tenant_id: TenantId) -> RecomputeResult {
        self.aggregator.recompute_impacts(tenant_id).await
    }

    pub async fn preview(&self, tenant_id: TenantId) -> ServiceResult<ImpactReport> {
        Ok(self.aggregator.preview(tenant_id).await?)
    }

    pub fn impact_status(&self, tenant_id: TenantId) -> Option<ImpactRun> {
        self.aggregator.status(tenant_id)
    }
}
