//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. The
/// computed performance metrics of a vendor are one: two metric bundles with
/// the same four numbers are the same observation, whoever computed them.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
