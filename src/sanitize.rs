//! Finite-or-null serialization for numeric leaves of the produced result.

use serde::Serializer;

/// `Some(v)` when `v` is finite.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Serializes NaN and infinities as `null`.
pub fn finite_f64<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    match finite(*value) {
        Some(v) => serializer.serialize_f64(v),
        None => serializer.serialize_none(),
    }
}
