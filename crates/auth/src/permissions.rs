use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are dotted opaque strings (e.g. "planning.jobs.write").
/// Two wildcard forms are understood by [`Permission::grants`]:
/// - `"*"` grants everything;
/// - a trailing `".*"` grants every permission under that prefix
///   (`"planning.*"` grants `"planning.jobs.write"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }

    /// Whether holding `self` satisfies a check for `required`.
    pub fn grants(&self, required: &Permission) -> bool {
        if self.is_wildcard() || self == required {
            return true;
        }
        match self.as_str().strip_suffix(".*") {
            Some(prefix) => required
                .as_str()
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('.')),
            None => false,
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Permissions checked by the planning endpoints.
pub mod planning {
    use super::Permission;

    pub const JOBS_WRITE: Permission = Permission::from_static("planning.jobs.write");
    pub const OUTPUTS_WRITE: Permission = Permission::from_static("planning.outputs.write");
    pub const OUTCOMES_WRITE: Permission = Permission::from_static("planning.outcomes.write");
    pub const MAPPINGS_WRITE: Permission = Permission::from_static("planning.mappings.write");
    pub const IMPACTS_RECOMPUTE: Permission = Permission::from_static("planning.impacts.recompute");
    pub const ALL: Permission = Permission::from_static("planning.*");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_global_wildcard_grant() {
        let required = planning::JOBS_WRITE;
        assert!(Permission::new("planning.jobs.write").grants(&required));
        assert!(Permission::new("*").grants(&required));
        assert!(!Permission::new("planning.outputs.write").grants(&required));
    }

    #[test]
    fn prefix_wildcard_respects_segment_boundaries() {
        let all = planning::ALL;
        assert!(all.grants(&planning::MAPPINGS_WRITE));
        assert!(!all.grants(&Permission::new("planningx.jobs.write")));
        assert!(!all.grants(&Permission::new("planning")));
    }
}
