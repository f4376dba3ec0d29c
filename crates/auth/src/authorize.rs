use thiserror::Error;

use fleetops_core::TenantId;

use crate::{Permission, PrincipalId, TenantMembership};

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub active_tenant_id: TenantId,
    pub membership: TenantMembership,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error("forbidden: role '{0}' required")]
    MissingRole(String),
}

/// Command-side authorization contract (checked before a ledger operation runs).
pub trait CommandAuthorization {
    fn required_permissions(&self) -> &[Permission];
}

/// Authorize a principal within its active tenant context.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.active_tenant_id != principal.membership.tenant_id {
        return Err(AuthzError::TenantMismatch);
    }

    let granted = &principal.membership.permissions;
    if granted.iter().any(|p| p.is_wildcard() || p == required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    fn principal(tenant_id: TenantId, permissions: Vec<Permission>) -> Principal {
        Principal {
            principal_id: PrincipalId::new(),
            active_tenant_id: tenant_id,
            membership: TenantMembership {
                tenant_id,
                roles: vec![Role::OPERATOR],
                permissions,
            },
        }
    }

    #[test]
    fn explicit_permission_is_granted() {
        let p = principal(TenantId::new(), vec![Permission::CARGO_READ]);
        assert!(authorize(&p, &Permission::CARGO_READ).is_ok());
    }

    #[test]
    fn wildcard_grants_everything() {
        let p = principal(TenantId::new(), vec![Permission::WILDCARD]);
        assert!(authorize(&p, &Permission::CARGO_ITEMS_WRITE).is_ok());
    }

    #[test]
    fn missing_permission_is_forbidden() {
        let p = principal(TenantId::new(), vec![Permission::CARGO_READ]);
        assert_eq!(
            authorize(&p, &Permission::CARGO_WRITE),
            Err(AuthzError::Forbidden("cargo.write".to_string()))
        );
    }

    #[test]
    fn foreign_tenant_membership_is_rejected() {
        let mut p = principal(TenantId::new(), vec![Permission::WILDCARD]);
        p.active_tenant_id = TenantId::new();
        assert_eq!(authorize(&p, &Permission::CARGO_READ), Err(AuthzError::TenantMismatch));
    }
}
