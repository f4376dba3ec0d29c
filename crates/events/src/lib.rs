//! Domain event contract shared by aggregates.

pub mod event;

pub use event::Event;
