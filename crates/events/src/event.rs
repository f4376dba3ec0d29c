use chrono::{DateTime, Utc};

/// Fact recorded when an aggregate changes.
///
/// Applying an aggregate's events in order, starting from its empty state,
/// rebuilds that aggregate exactly.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted, stable name (e.g. "cargo.item.loaded").
    fn event_type(&self) -> &'static str;

    /// Identifier of the aggregate whose history this event belongs to.
    fn stream_id(&self) -> &str;

    /// Payload schema version; bump when a field changes meaning.
    fn schema_version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc>;
}
