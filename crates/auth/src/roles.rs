use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::AuthzError;

/// Role identifier used for RBAC.
///
/// Roles are opaque strings at this layer; mapping roles to permissions is
/// done by the caller's policy layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const OPERATOR: Role = Role(Cow::Borrowed("operator"));
    pub const VIEWER: Role = Role(Cow::Borrowed("viewer"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == Self::ADMIN.as_str()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capability check: does a caller holding `held` roles qualify for `required`?
///
/// Role names compare exactly; `admin` satisfies every requirement.
pub fn require_role(held: &[Role], required: &Role) -> Result<(), AuthzError> {
    if held.iter().any(|r| r.is_admin() || r == required) {
        Ok(())
    } else {
        Err(AuthzError::MissingRole(required.as_str().to_string()))
    }
}
