//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Repositories in feature modules key their persistence boundaries by
/// `Entity::Id`.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
