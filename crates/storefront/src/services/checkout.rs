//! Checkout payload validation.
//!
//! Guests and signed-in users submit the same payload; guests must also
//! supply an e-mail, which becomes the login of the account created for them.

use serde::Deserialize;

use bazaar_core::{Email, FieldErrors, PaymentMethod, ShippingAddress};

pub use crate::db::orders::{Buyer, CheckoutError, NewOrder, PlacedOrder};

/// The place-order payload as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceOrderForm {
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    /// Required for guests, ignored for signed-in users.
    pub email: Option<String>,
}

/// A payload that passed validation.
#[derive(Debug, Clone)]
pub struct ValidCheckout {
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    /// Present for guests only.
    pub guest_email: Option<Email>,
}

impl PlaceOrderForm {
    /// Validate the payload for a guest (`is_guest`) or a signed-in user.
    ///
    /// Address failures are reported under `shippingAddress.<field>`.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self, is_guest: bool) -> Result<ValidCheckout, FieldErrors> {
        let mut errors = FieldErrors::new();

        let shipping_address = self.shipping_address.trimmed();
        if let Err(address_errors) = shipping_address.validate() {
            errors.nest("shippingAddress", address_errors);
        }

        let payment_method = self.payment_method.trim().parse::<PaymentMethod>();
        if payment_method.is_err() {
            errors.add("paymentMethod", "Invalid payment method");
        }

        let guest_email = if is_guest {
            match self.email.as_deref().map(Email::parse) {
                Some(Ok(email)) => Some(email),
                Some(Err(_)) => {
                    errors.add("email", "Invalid email address");
                    None
                }
                None => {
                    errors.add("email", "Email is required");
                    None
                }
            }
        } else {
            None
        };

        errors.into_result()?;

        Ok(ValidCheckout {
            shipping_address,
            payment_method: payment_method.unwrap_or_default(),
            guest_email,
        })
    }
}
