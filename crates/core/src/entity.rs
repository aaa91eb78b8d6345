//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Used by records that are not aggregates (users, purchase orders) but are
/// still looked up and compared by identity.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
