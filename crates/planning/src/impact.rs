//! Impact propagation: a two-stage weighted fan-in over one tenant's graph.
//!
//! ```text
//!  Outcome ◄──qboImpact── Output ◄──piImpactValue── Job
//!
//!  stage 1:  weight(O)      = Σ qboImpact        (O → existing Outcomes)
//!  stage 2:  impactValue(J) = Σ piImpactValue × weight(O)   (J → existing Outputs)
//!  points:   points(Q)      = Σ qboImpact        (existing Outputs → Q)
//! ```
//!
//! This is a raw weighted sum: no normalization, no clamping, no division.
//! The whole graph is recomputed every time; nothing is patched incrementally.
//!
//! Inputs are sorted by id before summation so the result does not depend on
//! the order a store happens to return records in.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use impactline_core::{JobId, OutcomeId, OutputId, TenantId, TenantOwned};

use crate::{Job, JobOutputMapping, Outcome, Output, OutputOutcomeMapping};

/// Everything the computation reads for one tenant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImpactGraph {
    pub tenant_id: Option<TenantId>,
    pub jobs: Vec<Job>,
    pub outputs: Vec<Output>,
    pub outcomes: Vec<Outcome>,
    pub job_outputs: Vec<JobOutputMapping>,
    pub output_outcomes: Vec<OutputOutcomeMapping>,
}

impl ImpactGraph {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            ..Self::default()
        }
    }
}

/// Derived values for one tenant.
///
/// Every Job / Output / Outcome of the tenant has an entry, zero when nothing
/// flows into it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactReport {
    pub tenant_id: Option<TenantId>,
    /// Stage-1 aggregate per Output (intermediate, never persisted).
    pub output_weights: BTreeMap<OutputId, f64>,
    /// New `impact_value` per Job.
    pub job_impacts: BTreeMap<JobId, f64>,
    /// New `points` per Outcome.
    pub outcome_points: BTreeMap<OutcomeId, f64>,
    /// Mappings that referenced a missing Job, Output or Outcome.
    pub dangling_skipped: usize,
    /// Records that carried a different tenant id and were ignored.
    pub foreign_skipped: usize,
}

impl ImpactReport {
    pub fn job_impact(&self, id: &JobId) -> f64 {
        self.job_impacts.get(id).copied().unwrap_or(0.0)
    }

    pub fn output_weight(&self, id: &OutputId) -> f64 {
        self.output_weights.get(id).copied().unwrap_or(0.0)
    }

    pub fn outcome_points(&self, id: &OutcomeId) -> f64 {
        self.outcome_points.get(id).copied().unwrap_or(0.0)
    }
}

/// Keep only the records of `tenant_id`, counting the rest.
fn owned<'a, T: TenantOwned>(items: &'a [T], tenant_id: TenantId, foreign: &mut usize) -> Vec<&'a T> {
    let kept: Vec<&T> = items.iter().filter(|i| i.belongs_to(tenant_id)).collect();
    *foreign += items.len() - kept.len();
    kept
}

/// Run both stages over `graph`.
///
/// A graph without a tenant yields an empty report: there is no scope to
/// compute in, and nothing may be read across tenants.
pub fn compute(graph: &ImpactGraph) -> ImpactReport {
    let Some(tenant_id) = graph.tenant_id else {
        return ImpactReport::default();
    };

    let mut report = ImpactReport {
        tenant_id: Some(tenant_id),
        ..ImpactReport::default()
    };
    let mut foreign = 0usize;

    let jobs = owned(&graph.jobs, tenant_id, &mut foreign);
    let outputs = owned(&graph.outputs, tenant_id, &mut foreign);
    let outcomes = owned(&graph.outcomes, tenant_id, &mut foreign);
    let mut job_outputs = owned(&graph.job_outputs, tenant_id, &mut foreign);
    let mut output_outcomes = owned(&graph.output_outcomes, tenant_id, &mut foreign);
    job_outputs.sort_by_key(|m| m.id);
    output_outcomes.sort_by_key(|m| m.id);

    let outcome_ids: HashSet<OutcomeId> = outcomes.iter().map(|q| q.id).collect();

    for output in &outputs {
        report.output_weights.insert(output.id, 0.0);
    }
    for outcome in &outcomes {
        report.outcome_points.insert(outcome.id, 0.0);
    }
    for job in &jobs {
        report.job_impacts.insert(job.id, 0.0);
    }

    // Stage 1: Output weights (and Outcome points, over the same live edges).
    for m in output_outcomes {
        let live = report.output_weights.contains_key(&m.output_id) && outcome_ids.contains(&m.outcome_id);
        if !live {
            report.dangling_skipped += 1;
            continue;
        }
        if let Some(w) = report.output_weights.get_mut(&m.output_id) {
            *w += m.qbo_impact;
        }
        if let Some(p) = report.outcome_points.get_mut(&m.outcome_id) {
            *p += m.qbo_impact;
        }
    }

    // Stage 2: Job impact, each edge scaled by its Output's stage-1 weight.
    for m in job_outputs {
        let Some(weight) = report.output_weights.get(&m.output_id).copied() else {
            report.dangling_skipped += 1;
            continue;
        };
        match report.job_impacts.get_mut(&m.job_id) {
            Some(impact) => *impact += m.pi_impact_value * weight,
            None => report.dangling_skipped += 1,
        }
    }

    report.foreign_skipped = foreign;
    report
}
