use serde::{Deserialize, Serialize};

use fleetops_core::{uuid_id, TenantId};

uuid_id! {
    /// Authenticated caller: a crew member, shore staff or a service account.
    PrincipalId
}

/// What a principal may do inside one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMembership {
    pub tenant_id: TenantId,
    pub roles: Vec<crate::Role>,
    pub permissions: Vec<crate::Permission>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_id_parses_its_own_display() {
        let id = PrincipalId::new();
        assert_eq!(id.to_string().parse::<PrincipalId>(), Ok(id));
        assert!("crew-42".parse::<PrincipalId>().is_err());
    }
}
