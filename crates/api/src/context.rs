use fleetops_auth::{JwtClaims, PrincipalId, Role};
use fleetops_core::TenantId;

/// Tenant context for a request.
///
/// Taken from the bearer token; every cargo route runs inside exactly one
/// tenant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Authenticated caller and the roles its token grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal_id: PrincipalId,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(principal_id: PrincipalId, roles: Vec<Role>) -> Self {
        Self { principal_id, roles }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}

/// Split validated claims into the two request extensions.
pub fn contexts_from_claims(claims: JwtClaims) -> (TenantContext, PrincipalContext) {
    (
        TenantContext::new(claims.tenant_id),
        PrincipalContext::new(claims.sub, claims.roles),
    )
}
