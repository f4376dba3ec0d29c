//! Ledger error taxonomy.

use thiserror::Error;

/// Why a ledger operation was rejected.
///
/// Every variant is a local, recoverable condition; a rejected operation
/// never changes the ledger.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CargoError {
    /// Malformed input: blank name, non-positive amount, negative or
    /// non-finite weight/capacity.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The add would push committed weight past capacity.
    #[error("capacity exceeded: requested {requested}, available {available}")]
    CapacityExceeded { requested: f64, available: f64 },

    /// No line item matches the name (case-insensitive).
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// The line item holds fewer units than the removal asks for.
    #[error("insufficient quantity of '{name}': held {held}, requested {requested}")]
    InsufficientQuantity {
        name: String,
        held: i64,
        requested: i64,
    },
}

impl CargoError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Stable machine-readable code (used in HTTP error bodies).
    pub fn code(&self) -> &'static str {
        match self {
            CargoError::InvalidArgument(_) => "invalid_argument",
            CargoError::CapacityExceeded { .. } => "capacity_exceeded",
            CargoError::ItemNotFound(_) => "item_not_found",
            CargoError::InsufficientQuantity { .. } => "insufficient_quantity",
        }
    }
}
