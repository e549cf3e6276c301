//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have **no identity**: two instances with the same attribute
/// values are interchangeable. They are immutable; "changing" one means
/// building a new value.
///
/// - **Value object**: `Money::from_cents(1000)` equals any other ten-unit amount.
/// - **Entity**: a `Sale` with id 7 is that sale, whatever its fields say.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
