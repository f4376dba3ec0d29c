//! `fleetops-core`: identifiers, errors and aggregate traits shared by every
//! FleetOps domain crate. No IO lives here.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::TenantId;
pub use value_object::ValueObject;
