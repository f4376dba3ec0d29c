//! Cargo ledger domain module (event-sourced).
//!
//! A ledger tracks a weight capacity and the named items loaded against it.
//! Business rules live here as deterministic domain logic (no IO, no HTTP,
//! no storage).

pub mod error;
pub mod item;
pub mod ledger;

pub use error::CargoError;
pub use item::{LineItem, same_name};
pub use ledger::{
    AddItem, CapacityResized, CargoCommand, CargoEvent, CargoId, CargoLedger, ItemLoaded,
    ItemUnloaded, LedgerOpened, LedgerSnapshot, OpenLedger, OwnerRelabeled, RelabelOwner,
    RemoveItem, ResizeCapacity,
};
