use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use impactline_core::{DomainResult, Entity, JobId, TenantId, TenantOwned};

use crate::validate::{optional_text, required_text};

/// A unit of work owned by a tenant.
///
/// `impact_value` is derived state: it is written only by the impact
/// recomputation and is never part of a draft or patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub tenant_id: TenantId,
    pub title: String,
    pub business_function_id: Option<String>,
    #[serde(default)]
    pub impact_value: f64,
    #[serde(default)]
    pub is_done: bool,
    pub next_step: Option<String>,
    pub next_step_due: Option<DateTime<Utc>>,
    #[serde(default)]
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User input for a new Job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobDraft {
    pub title: String,
    pub business_function_id: Option<String>,
    pub next_step: Option<String>,
    pub next_step_due: Option<DateTime<Utc>>,
    pub position: Option<i64>,
}

/// Partial update of a Job; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobPatch {
    pub title: Option<String>,
    pub business_function_id: Option<String>,
    pub is_done: Option<bool>,
    pub next_step: Option<String>,
    pub next_step_due: Option<DateTime<Utc>>,
    pub position: Option<i64>,
}

impl Job {
    pub fn create(tenant_id: TenantId, draft: JobDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        let tenant_id = tenant_id.ensure_valid()?;
        Ok(Self {
            id: JobId::new(),
            tenant_id,
            title: required_text("title", &draft.title)?,
            business_function_id: optional_text(draft.business_function_id),
            impact_value: 0.0,
            is_done: false,
            next_step: optional_text(draft.next_step),
            next_step_due: draft.next_step_due,
            position: draft.position.unwrap_or(0),
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a patch atomically: nothing changes if any field is invalid.
    pub fn apply_patch(&mut self, patch: JobPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let title = patch
            .title
            .as_deref()
            .map(|t| required_text("title", t))
            .transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if patch.business_function_id.is_some() {
            self.business_function_id = optional_text(patch.business_function_id);
        }
        if let Some(done) = patch.is_done {
            self.is_done = done;
        }
        if patch.next_step.is_some() {
            self.next_step = optional_text(patch.next_step);
        }
        if patch.next_step_due.is_some() {
            self.next_step_due = patch.next_step_due;
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Job {
    type Id = JobId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for Job {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use impactline_core::DomainError;

    fn draft(title: &str) -> JobDraft {
        JobDraft {
            title: title.to_string(),
            ..JobDraft::default()
        }
    }

    #[test]
    fn create_starts_with_zero_impact_and_trims_title() {
        let tenant_id = TenantId::new();
        let job = Job::create(tenant_id, draft("  Ship onboarding flow "), Utc::now()).unwrap();

        assert_eq!(job.title, "Ship onboarding flow");
        assert_eq!(job.impact_value, 0.0);
        assert!(!job.is_done);
        assert!(job.belongs_to(tenant_id));
    }

    #[test]
    fn create_rejects_blank_title() {
        let err = Job::create(TenantId::new(), draft("   "), Utc::now()).unwrap_err();
        match err {
            DomainError::Validation { field, .. } => assert_eq!(field, "title"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_rejects_nil_tenant() {
        let nil: TenantId = "00000000-0000-0000-0000-000000000000".parse().unwrap();
        assert!(matches!(
            Job::create(nil, draft("x"), Utc::now()),
            Err(DomainError::InvalidId(_))
        ));
    }

    #[test]
    fn patch_is_all_or_nothing() {
        let mut job = Job::create(TenantId::new(), draft("Original"), Utc::now()).unwrap();
        let before = job.clone();

        let patch = JobPatch {
            title: Some(" ".to_string()),
            is_done: Some(true),
            ..JobPatch::default()
        };
        assert!(job.apply_patch(patch, Utc::now()).is_err());
        assert_eq!(job, before);
    }

    #[test]
    fn patch_leaves_impact_value_alone() {
        let mut job = Job::create(TenantId::new(), draft("Original"), Utc::now()).unwrap();
        job.impact_value = 42.0;

        let patch = JobPatch {
            is_done: Some(true),
            next_step: Some("Call vendor".to_string()),
            ..JobPatch::default()
        };
        job.apply_patch(patch, Utc::now()).unwrap();

        assert!(job.is_done);
        assert_eq!(job.next_step.as_deref(), Some("Call vendor"));
        assert_eq!(job.impact_value, 42.0);
    }

    #[test]
    fn draft_refuses_client_supplied_impact_value() {
        let body = serde_json::json!({ "title": "x", "impactValue": 99.0 });
        assert!(serde_json::from_value::<JobDraft>(body).is_err());
    }
}
