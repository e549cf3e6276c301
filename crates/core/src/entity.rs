//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Sale records are entities without being aggregates: they carry an identity
/// but are never mutated after they are written.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
