/// Values compared by content, with no identity of their own.
///
/// Two line items with the same name and amount are interchangeable.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
