//! Weighted many-to-many edges between Jobs, Outputs and Outcomes.
//!
//! Mappings carry denormalized name snapshots taken when the edge is created.
//! The entities they point at may later be deleted; a mapping left pointing at
//! a missing record is "dangling" and simply contributes nothing to impact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use impactline_core::{
    DomainError, DomainResult, Entity, JobId, MappingId, OutcomeId, OutputId, TenantId,
    TenantOwned,
};

use crate::validate::{finite, finite_opt};
use crate::{Job, Outcome, Output};

/// Job → Output edge: how much a Job moves an Output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutputMapping {
    pub id: MappingId,
    pub tenant_id: TenantId,
    pub job_id: JobId,
    #[serde(rename = "piId")]
    pub output_id: OutputId,
    pub pi_impact_value: f64,
    pub pi_target: Option<f64>,
    pub job_name: String,
    #[serde(rename = "piName")]
    pub output_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobOutputMappingDraft {
    pub job_id: JobId,
    #[serde(rename = "piId")]
    pub output_id: OutputId,
    pub pi_impact_value: f64,
    pub pi_target: Option<f64>,
}

/// Endpoints of a mapping are immutable; only weight and target change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobOutputMappingPatch {
    pub pi_impact_value: Option<f64>,
    pub pi_target: Option<f64>,
}

/// Output → Outcome edge: how much an Output matters to an Outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOutcomeMapping {
    pub id: MappingId,
    pub tenant_id: TenantId,
    #[serde(rename = "piId")]
    pub output_id: OutputId,
    #[serde(rename = "qboId")]
    pub outcome_id: OutcomeId,
    pub qbo_impact: f64,
    pub pi_target: Option<f64>,
    pub qbo_target: Option<f64>,
    #[serde(rename = "piName")]
    pub output_name: String,
    #[serde(rename = "qboName")]
    pub outcome_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutputOutcomeMappingDraft {
    #[serde(rename = "piId")]
    pub output_id: OutputId,
    #[serde(rename = "qboId")]
    pub outcome_id: OutcomeId,
    pub qbo_impact: f64,
    pub pi_target: Option<f64>,
    pub qbo_target: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutputOutcomeMappingPatch {
    pub qbo_impact: Option<f64>,
    pub pi_target: Option<f64>,
    pub qbo_target: Option<f64>,
}

fn ensure_same_tenant(tenant_id: TenantId, entity: &impl TenantOwned, what: &str) -> DomainResult<()> {
    if entity.belongs_to(tenant_id) {
        Ok(())
    } else {
        Err(DomainError::invariant(format!("{what} belongs to another tenant")))
    }
}

impl JobOutputMapping {
    /// Create an edge between two live records of the same tenant.
    pub fn link(
        tenant_id: TenantId,
        draft: JobOutputMappingDraft,
        job: &Job,
        output: &Output,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let tenant_id = tenant_id.ensure_valid()?;
        ensure_same_tenant(tenant_id, job, "job")?;
        ensure_same_tenant(tenant_id, output, "output")?;
        if job.id != draft.job_id || output.id != draft.output_id {
            return Err(DomainError::invariant("mapping endpoints do not match the supplied records"));
        }

        Ok(Self {
            id: MappingId::new(),
            tenant_id,
            job_id: job.id,
            output_id: output.id,
            pi_impact_value: finite("piImpactValue", draft.pi_impact_value)?,
            pi_target: finite_opt("piTarget", draft.pi_target)?,
            job_name: job.title.clone(),
            output_name: output.name.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: JobOutputMappingPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let impact = finite_opt("piImpactValue", patch.pi_impact_value)?;
        let target = finite_opt("piTarget", patch.pi_target)?;

        if let Some(v) = impact {
            self.pi_impact_value = v;
        }
        if target.is_some() {
            self.pi_target = target;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl OutputOutcomeMapping {
    /// Create an edge between two live records of the same tenant.
    pub fn link(
        tenant_id: TenantId,
        draft: OutputOutcomeMappingDraft,
        output: &Output,
        outcome: &Outcome,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let tenant_id = tenant_id.ensure_valid()?;
        ensure_same_tenant(tenant_id, output, "output")?;
        ensure_same_tenant(tenant_id, outcome, "outcome")?;
        if output.id != draft.output_id || outcome.id != draft.outcome_id {
            return Err(DomainError::invariant("mapping endpoints do not match the supplied records"));
        }

        Ok(Self {
            id: MappingId::new(),
            tenant_id,
            output_id: output.id,
            outcome_id: outcome.id,
            qbo_impact: finite("qboImpact", draft.qbo_impact)?,
            pi_target: finite_opt("piTarget", draft.pi_target)?,
            qbo_target: finite_opt("qboTarget", draft.qbo_target)?,
            output_name: output.name.clone(),
            outcome_name: outcome.name.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: OutputOutcomeMappingPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let impact = finite_opt("qboImpact", patch.qbo_impact)?;
        let pi_target = finite_opt("piTarget", patch.pi_target)?;
        let qbo_target = finite_opt("qboTarget", patch.qbo_target)?;

        if let Some(v) = impact {
            self.qbo_impact = v;
        }
        if pi_target.is_some() {
            self.pi_target = pi_target;
        }
        if qbo_target.is_some() {
            self.qbo_target = qbo_target;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for JobOutputMapping {
    type Id = MappingId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for JobOutputMapping {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl Entity for OutputOutcomeMapping {
    type Id = MappingId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for OutputOutcomeMapping {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JobDraft, OutputDraft};

    fn job(tenant_id: TenantId) -> Job {
        let draft = JobDraft {
            title: "Launch referral program".to_string(),
            ..JobDraft::default()
        };
        Job::create(tenant_id, draft, Utc::now()).unwrap()
    }

    fn output(tenant_id: TenantId) -> Output {
        let draft = OutputDraft {
            name: "Referrals".to_string(),
            ..OutputDraft::default()
        };
        Output::create(tenant_id, draft, Utc::now()).unwrap()
    }

    #[test]
    fn link_snapshots_names_and_accepts_negative_weight() {
        let tenant_id = TenantId::new();
        let (j, o) = (job(tenant_id), output(tenant_id));
        let draft = JobOutputMappingDraft {
            job_id: j.id,
            output_id: o.id,
            pi_impact_value: -1.5,
            pi_target: None,
        };

        let m = JobOutputMapping::link(tenant_id, draft, &j, &o, Utc::now()).unwrap();
        assert_eq!(m.job_name, "Launch referral program");
        assert_eq!(m.output_name, "Referrals");
        assert_eq!(m.pi_impact_value, -1.5);
    }

    #[test]
    fn link_refuses_cross_tenant_endpoints() {
        let tenant_id = TenantId::new();
        let j = job(tenant_id);
        let foreign = output(TenantId::new());
        let draft = JobOutputMappingDraft {
            job_id: j.id,
            output_id: foreign.id,
            pi_impact_value: 1.0,
            pi_target: None,
        };

        let err = JobOutputMapping::link(tenant_id, draft, &j, &foreign, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn serializes_with_pi_and_qbo_field_names() {
        let tenant_id = TenantId::new();
        let o = output(tenant_id);
        let q = Outcome::create(
            tenant_id,
            crate::OutcomeDraft {
                name: "Retention".to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        let draft = OutputOutcomeMappingDraft {
            output_id: o.id,
            outcome_id: q.id,
            qbo_impact: 10.0,
            pi_target: None,
            qbo_target: Some(95.0),
        };
        let m = OutputOutcomeMapping::link(tenant_id, draft, &o, &q, Utc::now()).unwrap();

        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["piId"], o.id.to_string());
        assert_eq!(json["qboId"], q.id.to_string());
        assert_eq!(json["qboImpact"], 10.0);
        assert_eq!(json["qboName"], "Retention");
    }
}
