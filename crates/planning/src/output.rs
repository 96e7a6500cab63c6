use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use impactline_core::{DomainResult, Entity, OutputId, TenantId, TenantOwned};

use crate::validate::{finite, finite_opt, required_text};

/// Output (PI): a measurable deliverable that Jobs contribute toward and that
/// itself contributes toward Outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    pub id: OutputId,
    pub tenant_id: TenantId,
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub target_value: f64,
    #[serde(default)]
    pub beginning_value: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutputDraft {
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub target_value: f64,
    #[serde(default)]
    pub beginning_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutputPatch {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub target_value: Option<f64>,
    pub beginning_value: Option<f64>,
}

impl Output {
    pub fn create(tenant_id: TenantId, draft: OutputDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: OutputId::new(),
            tenant_id: tenant_id.ensure_valid()?,
            name: required_text("name", &draft.name)?,
            unit: draft.unit.trim().to_string(),
            target_value: finite("targetValue", draft.target_value)?,
            beginning_value: finite("beginningValue", draft.beginning_value)?,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: OutputPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let name = patch
            .name
            .as_deref()
            .map(|n| required_text("name", n))
            .transpose()?;
        let target_value = finite_opt("targetValue", patch.target_value)?;
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
        if let Some(v) = beginning_value {
            self.beginning_value = v;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Output {
    type Id = OutputId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for Output {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
