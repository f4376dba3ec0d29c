//! API-side authorization guard for ledger operations.
//!
//! Checked before the ledger service is called; the ledger and the
//! repository stay auth-agnostic.

use fleetops_auth::{
    authorize, require_role, AuthzError, CommandAuthorization, Permission, Principal, Role, TenantMembership,
};

use crate::context::{PrincipalContext, TenantContext};

const READ: &[Permission] = &[Permission::CARGO_READ];
const WRITE: &[Permission] = &[Permission::CARGO_WRITE];
const ITEMS_WRITE: &[Permission] = &[Permission::CARGO_ITEMS_WRITE];
const OPERATOR: &[Permission] = &[Permission::CARGO_READ, Permission::CARGO_WRITE, Permission::CARGO_ITEMS_WRITE];
const NONE: &[Permission] = &[];

/// What a request wants to do with cargo ledgers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CargoAction {
    Read,
    /// Open, relabel, resize.
    Write,
    /// Load or unload line items.
    ItemsWrite,
    /// Remove a ledger entirely; admin role only.
    Delete,
}

impl CargoAction {
    fn required_role(self) -> Option<Role> {
        match self {
            CargoAction::Delete => Some(Role::ADMIN),
            _ => None,
        }
    }
}

impl CommandAuthorization for CargoAction {
    fn required_permissions(&self) -> &[Permission] {
        match self {
            CargoAction::Read => READ,
            CargoAction::Write | CargoAction::Delete => WRITE,
            CargoAction::ItemsWrite => ITEMS_WRITE,
        }
    }
}

/// Check an action in the current request context.
pub fn authorize_action(
    tenant: &TenantContext,
    principal: &PrincipalContext,
    action: CargoAction,
) -> Result<(), AuthzError> {
    if let Some(role) = action.required_role() {
        require_role(principal.roles(), &role)?;
    }
    authorize_command(tenant, principal, &action)
}

/// Check every permission a command needs.
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

/// Static role→permission policy. Unknown roles grant nothing.
pub fn permissions_from_roles(roles: &[Role]) -> Vec<Permission> {
    if roles.iter().any(Role::is_admin) {
        return vec![Permission::WILDCARD];
    }

    let mut granted: Vec<Permission> = Vec::new();
    for role in roles {
        let perms = if *role == Role::OPERATOR {
            OPERATOR
        } else if *role == Role::VIEWER {
            READ
        } else {
            NONE
        };
        for perm in perms {
            if !granted.contains(perm) {
                granted.push(perm.clone());
            }
        }
    }
    granted
}
