use async_trait::async_trait;
use impactline_core::{JobId, MappingId, OutcomeId, OutputId, TenantId};
use impactline_planning::{
    ImpactReport, Job, JobOutputMapping, Outcome, Output, OutputOutcomeMapping,
};

use super::{ImpactWriteSummary, InMemoryTenantStore, PlanningStore, StoreResult, TenantStore};

/// Process-local planning store for tests and single-node dev.
#[derive(Debug, Default)]
pub struct InMemoryPlanningStore {
    jobs: InMemoryTenantStore<JobId, Job>,
    outputs: InMemoryTenantStore<OutputId, Output>,
    outcomes: InMemoryTenantStore<OutcomeId, Outcome>,
    job_outputs: InMemoryTenantStore<MappingId, JobOutputMapping>,
    output_outcomes: InMemoryTenantStore<MappingId, OutputOutcomeMapping>,
}

impl InMemoryPlanningStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanningStore for InMemoryPlanningStore {
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

    async fn write_impacts(
        &self,
        tenant_id: TenantId,
        report: &ImpactReport,
    ) -> StoreResult<ImpactWriteSummary> {
        // Both guards are taken before anything is written; lock order is
        // always jobs then outcomes.
        let mut jobs = self.jobs.write()?;
        let mut outcomes = self.outcomes.write()?;

        let mut summary = ImpactWriteSummary::default();
        for (id, value) in &report.job_impacts {
            if let Some(job) = jobs.get_mut(&(tenant_id, *id)) {
                job.impact_value = *value;
                summary.jobs_updated += 1;
            }
        }
        for (id, points) in &report.outcome_points {
            if let Some(outcome) = outcomes.get_mut(&(tenant_id, *id)) {
                outcome.points = *points;
                summary.outcomes_updated += 1;
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use impactline_planning::{JobDraft, OutcomeDraft};

    fn job(tenant_id: TenantId, title: &str) -> Job {
        let draft = JobDraft {
            title: title.to_string(),
            ..JobDraft::default()
        };
        Job::create(tenant_id, draft, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn write_impacts_touches_only_derived_fields_of_the_tenant() {
        let store = InMemoryPlanningStore::new();
        let (tenant, other) = (TenantId::new(), TenantId::new());
        let mine = job(tenant, "mine");
        let theirs = job(other, "theirs");
        let outcome = Outcome::create(
            tenant,
            OutcomeDraft {
                name: "Revenue".to_string(),
                ..OutcomeDraft::default()
            },
            Utc::now(),
        )
        .unwrap();
        store.jobs().upsert(tenant, mine.id, mine.clone()).await.unwrap();
        store.jobs().upsert(other, theirs.id, theirs.clone()).await.unwrap();
        store.outcomes().upsert(tenant, outcome.id, outcome.clone()).await.unwrap();

        let mut report = ImpactReport::default();
        report.job_impacts.insert(mine.id, 12.5);
        report.job_impacts.insert(theirs.id, 99.0);
        report.outcome_points.insert(outcome.id, 3.0);

        let summary = store.write_impacts(tenant, &report).await.unwrap();
        assert_eq!(
            summary,
            ImpactWriteSummary {
                jobs_updated: 1,
                outcomes_updated: 1
            }
        );

        let stored = store.jobs().get(tenant, &mine.id).await.unwrap().unwrap();
        assert_eq!(stored.impact_value, 12.5);
        assert_eq!(stored.title, mine.title);
        assert_eq!(stored.updated_at, mine.updated_at);

        let untouched = store.jobs().get(other, &theirs.id).await.unwrap().unwrap();
        assert_eq!(untouched.impact_value, 0.0);

        let stored = store.outcomes().get(tenant, &outcome.id).await.unwrap().unwrap();
        assert_eq!(stored.points, 3.0);
    }

    #[tokio::test]
    async fn load_graph_reads_one_tenant() {
        let store = InMemoryPlanningStore::new();
        let (tenant, other) = (TenantId::new(), TenantId::new());
        let a = job(tenant, "a");
        let b = job(other, "b");
        store.jobs().upsert(tenant, a.id, a.clone()).await.unwrap();
        store.jobs().upsert(other, b.id, b).await.unwrap();

        let graph = store.load_graph(tenant).await.unwrap();
        assert_eq!(graph.tenant_id, Some(tenant));
        assert_eq!(graph.jobs, vec![a]);
        assert!(graph.outputs.is_empty());
    }
}
