//! API-side authorization guard for mutations.
//!
//! Enforced at the HTTP boundary before the service runs, so the planning
//! domain and the stores stay auth-agnostic.

use impactline_auth::permissions::planning;
use impactline_auth::{
    AuthzError, CommandAuthorization, Permission, Principal, Role, TenantMembership, authorize,
};

use crate::context::{PrincipalContext, TenantContext};

/// Check every permission `command` requires in the current request context.
pub fn authorize_command<C: CommandAuthorization>(
    tenant: &TenantContext,
    principal: &PrincipalContext,
    command: &C,
) -> Result<(), AuthzError> {
    let membership = TenantMembership {
        tenant_id: tenant.tenant_id(),
        roles: principal.roles().to_vec(),
        permissions: permissions_from_roles(principal.roles()),
    };

    let principal = Principal {
        principal_id: principal.principal_id(),
        active_tenant_id: tenant.tenant_id(),
        membership,
    };

    for perm in command.required_permissions() {
        authorize(&principal, perm)?;
    }

    Ok(())
}

/// Role policy: `admin` may do anything, `planner` may change planning
/// data, every other role is read-only.
fn permissions_from_roles(roles: &[Role]) -> Vec<Permission> {
    if roles.contains(&Role::ADMIN) {
        return vec![Permission::new("*")];
    }
    if roles.contains(&Role::PLANNER) {
        return vec![planning::ALL];
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use impactline_auth::PrincipalId;
    use impactline_core::TenantId;

    struct Needs(Vec<Permission>);

    impl CommandAuthorization for Needs {
        fn required_permissions(&self) -> &[Permission] {
            &self.0
        }
    }

    fn check(roles: Vec<Role>, required: Permission) -> Result<(), AuthzError> {
        let tenant = TenantContext::new(TenantId::new());
        let principal = PrincipalContext::new(PrincipalId::new(), roles);
        authorize_command(&tenant, &principal, &Needs(vec![required]))
    }

    #[test]
    fn planner_may_write_planning_data() {
        assert!(check(vec![Role::PLANNER], planning::MAPPINGS_WRITE).is_ok());
        assert!(check(vec![Role::PLANNER], planning::IMPACTS_RECOMPUTE).is_ok());
    }

    #[test]
    fn admin_may_do_anything() {
        assert!(check(vec![Role::ADMIN], Permission::new("billing.write")).is_ok());
    }

    #[test]
    fn viewer_and_unknown_roles_are_read_only() {
        assert!(matches!(
            check(vec![Role::VIEWER], planning::JOBS_WRITE),
            Err(AuthzError::Forbidden(_))
        ));
        assert!(check(vec![Role::new("auditor")], planning::OUTCOMES_WRITE).is_err());
        assert!(check(vec![], planning::OUTPUTS_WRITE).is_err());
    }
}
