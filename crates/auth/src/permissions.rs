use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "cargo.read"). The wildcard `"*"`
/// lets policy layers grant everything without listing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));
    /// View ledgers and their items.
    pub const CARGO_READ: Permission = Permission(Cow::Borrowed("cargo.read"));
    /// Open ledgers, relabel owners, resize capacity.
    pub const CARGO_WRITE: Permission = Permission(Cow::Borrowed("cargo.write"));
    /// Load and unload line items.
    pub const CARGO_ITEMS_WRITE: Permission = Permission(Cow::Borrowed("cargo.items.write"));

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
