use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use impactline_core::{DomainResult, Entity, OutcomeId, TenantId, TenantOwned};

use crate::validate::{finite, finite_opt, required_text};

/// Outcome (QBO): a higher-level business objective that Outputs roll up into.
///
/// `points` is derived: the summed weight of every existing Output mapped to
/// this Outcome, rewritten on each impact recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub id: OutcomeId,
    pub tenant_id: TenantId,
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub target_value: f64,
    #[serde(default)]
    pub current_value: f64,
    #[serde(default)]
    pub beginning_value: f64,
    #[serde(default)]
    pub points: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutcomeDraft {
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub target_value: f64,
    #[serde(default)]
    pub current_value: f64,
    #[serde(default)]
    pub beginning_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutcomePatch {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub target_value: Option<f64>,
    pub current_value: Option<f64>,
    pub beginning_value: Option<f64>,
}

impl Outcome {
    pub fn create(tenant_id: TenantId, draft: OutcomeDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: OutcomeId::new(),
            tenant_id: tenant_id.ensure_valid()?,
            name: required_text("name", &draft.name)?,
            unit: draft.unit.trim().to_string(),
            target_value: finite("targetValue", draft.target_value)?,
            current_value: finite("currentValue", draft.current_value)?,
            beginning_value: finite("beginningValue", draft.beginning_value)?,
            points: 0.0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: OutcomePatch, now: DateTime<Utc>) -> DomainResult<()> {
        let name = patch
            .name
            .as_deref()
            .map(|n| required_text("name", n))
            .transpose()?;
        let target_value = finite_opt("targetValue", patch.target_value)?;
        let current_value = finite_opt("currentValue", patch.current_value)?;
        let beginning_value = finite_opt("beginningValue", patch.beginning_value)?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(unit) = patch.unit {
            self.unit = unit.trim().to_string();
        }
        if let Some(v) = target_value {
            self.target_value = v;
        }
        if let Some(v) = current_value {
            self.current_value = v;
        }
        if let Some(v) = beginning_value {
            self.beginning_value = v;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Outcome {
    type Id = OutcomeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for Outcome {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_starts_with_zero_points() {
        let draft = OutcomeDraft {
            name: "Grow ARR".to_string(),
            unit: "USD".to_string(),
            target_value: 1_000_000.0,
            current_value: 250_000.0,
            beginning_value: 200_000.0,
        };
        let outcome = Outcome::create(TenantId::new(), draft, Utc::now()).unwrap();
        assert_eq!(outcome.points, 0.0);
        assert_eq!(outcome.current_value, 250_000.0);
    }

    #[test]
    fn draft_refuses_client_supplied_points() {
        let body = serde_json::json!({ "name": "Grow ARR", "points": 3.0 });
        assert!(serde_json::from_value::<OutcomeDraft>(body).is_err());
    }

    #[test]
    fn invalid_patch_changes_nothing() {
        let draft = OutcomeDraft {
            name: "Grow ARR".to_string(),
            ..OutcomeDraft::default()
        };
        let mut outcome = Outcome::create(TenantId::new(), draft, Utc::now()).unwrap();
        let before = outcome.clone();

        let patch = OutcomePatch {
            name: Some("Renamed".to_string()),
            current_value: Some(f64::NAN),
            ..OutcomePatch::default()
        };
        assert!(outcome.apply_patch(patch, Utc::now()).is_err());
        assert_eq!(outcome, before);
    }
}
