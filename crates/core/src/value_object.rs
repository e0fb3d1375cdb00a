//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have **no identity**; two instances with the same attribute
/// values are interchangeable. `UnitCost` and `Actor` are the value objects of
/// this workspace.
///
/// ```ignore
/// let a = UnitCost::new(dec!(2.00))?;
/// let b = UnitCost::new(dec!(2.0))?;
/// assert_eq!(a, b); // equal by value
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
