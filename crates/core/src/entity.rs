//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Vendors and purchase orders each carry a surrogate id plus a unique
/// business key (vendor code, PO number); both are stable for the entity's
/// lifetime.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Returns the human-facing business key (e.g. `V001`, `PO1001`).
    fn business_key(&self) -> &str;
}
