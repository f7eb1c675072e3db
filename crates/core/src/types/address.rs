//! Shipping address stored on users and frozen onto orders.

use serde::{Deserialize, Serialize};

use crate::validation::FieldErrors;

/// A delivery address.
///
/// Persisted as JSON, both as the user's saved address and as the order's
/// frozen copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
    pub full_name: String,
    pub street_address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

impl ShippingAddress {
    /// Check every field, collecting all failures.
    ///
    /// # Errors
    ///
    /// Returns the per-field failures when any rule is violated.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.min_len("fullName", &self.full_name, 3, "Name");
        errors.min_len("streetAddress", &self.street_address, 5, "Address");
        errors.min_len("city", &self.city, 3, "City");
        errors.min_len("postalCode", &self.postal_code, 3, "Postal code");
        errors.min_len("country", &self.country, 3, "Country");
        errors.min_len("phone", &self.phone, 10, "Phone number");

        if self.lat.is_some_and(|lat| !(-90.0..=90.0).contains(&lat)) {
            errors.add("lat", "Latitude must be between -90 and 90");
        }
        if self.lng.is_some_and(|lng| !(-180.0..=180.0).contains(&lng)) {
            errors.add("lng", "Longitude must be between -180 and 180");
        }

        errors.into_result()
    }

    /// Copy with surrounding whitespace removed from every text field.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            full_name: self.full_name.trim().to_owned(),
            street_address: self.street_address.trim().to_owned(),
            city: self.city.trim().to_owned(),
            postal_code: self.postal_code.trim().to_owned(),
            country: self.country.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            lat: self.lat,
            lng: self.lng,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ayesha Khan".to_owned(),
            street_address: "House 12, Street 4, F-7/2".to_owned(),
            city: "Islamabad".to_owned(),
            postal_code: "44000".to_owned(),
            country: "Pakistan".to_owned(),
            phone: "03001234567".to_owned(),
            lat: None,
            lng: None,
        }
    }

    #[test]
    fn test_valid_address() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_collects_every_failure() {
        let address = ShippingAddress {
            full_name: "Al".to_owned(),
            street_address: "x".to_owned(),
            phone: "12345".to_owned(),
            ..sample()
        };
        let errors = address.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.get("fullName").is_some());
        assert!(errors.get("streetAddress").is_some());
        assert_eq!(
            errors.get("phone"),
            Some("Phone number must be at least 10 characters")
        );
    }

    #[test]
    fn test_rejects_out_of_range_coordinates() {
        let address = ShippingAddress {
            lat: Some(91.0),
            lng: Some(73.0),
            ..sample()
        };
        let errors = address.validate().unwrap_err();
        assert!(errors.get("lat").is_some());
        assert!(errors.get("lng").is_none());
    }

    #[test]
    fn test_json_uses_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["fullName"], "Ayesha Khan");
        assert!(json.get("lat").is_none());
    }
}
