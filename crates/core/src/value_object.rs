//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared entirely by their attribute
/// values; identity does not matter. Two `ProductSpec`s with the same
/// name/type/size/material are the same spec. To "modify" one, build a new
/// one with the new values.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
