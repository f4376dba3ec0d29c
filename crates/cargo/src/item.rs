use serde::{Deserialize, Serialize};

use fleetops_core::ValueObject;

/// A named, quantified entry within a ledger (e.g. "Steel: 8 units").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub amount: i64,
}

impl LineItem {
    pub fn new(name: impl Into<String>, amount: i64) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        same_name(&self.name, name)
    }
}

impl ValueObject for LineItem {}

/// Case-insensitive item name comparison (full Unicode lowercase folding).
pub fn same_name(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
