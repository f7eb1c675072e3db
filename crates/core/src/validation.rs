//! Field-level validation errors.
//!
//! Request payloads are validated by hand against the rules in each payload's
//! `validate` method. Failures are collected per field so a client can show
//! every problem at once.

use std::collections::BTreeMap;

use serde::Serialize;

/// Validation failures keyed by field name (camelCase, as sent by clients).
///
/// Only the first failure recorded for a field is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field` unless one is already present.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    /// Record a failure if `value` (trimmed) is shorter than `min` characters.
    pub fn min_len(&mut self, field: &str, value: &str, min: usize, label: &str) {
        if value.trim().chars().count() < min {
            self.add(field, format!("{label} must be at least {min} characters"));
        }
    }

    /// Merge failures from a nested payload under `prefix.`.
    pub fn nest(&mut self, prefix: &str, other: Self) {
        for (field, message) in other.0 {
            self.add(format!("{prefix}.{field}"), message);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Message recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Iterate over `(field, message)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_per_field_wins() {
        let mut errors = FieldErrors::new();
        errors.add("name", "Name is required");
        errors.add("name", "Name must be at least 3 characters");
        assert_eq!(errors.get("name"), Some("Name is required"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_min_len_counts_trimmed_chars() {
        let mut errors = FieldErrors::new();
        errors.min_len("city", "  ab  ", 3, "City");
        errors.min_len("country", "Pakistan", 3, "Country");
        assert_eq!(errors.get("city"), Some("City must be at least 3 characters"));
        assert!(errors.get("country").is_none());
    }

    #[test]
    fn test_nest_prefixes_fields() {
        let mut inner = FieldErrors::new();
        inner.add("city", "bad");
        let mut outer = FieldErrors::new();
        outer.nest("shippingAddress", inner);
        assert_eq!(outer.get("shippingAddress.city"), Some("bad"));
    }

    #[test]
    fn test_into_result() {
        assert!(FieldErrors::new().into_result().is_ok());
        let mut errors = FieldErrors::new();
        errors.add("email", "Invalid email");
        assert_eq!(errors.clone().into_result(), Err(errors));
    }

    #[test]
    fn test_display_joins_fields() {
        let mut errors = FieldErrors::new();
        errors.add("b", "two");
        errors.add("a", "one");
        assert_eq!(errors.to_string(), "a: one; b: two");
    }
}
