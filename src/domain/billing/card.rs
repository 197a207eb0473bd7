//! Default payment method snapshot.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Snapshot of the card behind the customer's default payment method.
///
/// Always replaced wholesale; never merged field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSnapshot {
    /// Processor payment method id (pm_...).
    pub payment_method_id: String,
    pub brand: String,
    /// credit, debit, prepaid or unknown.
    pub funding: String,
    pub last4: String,
    pub exp_month: u32,
    pub exp_year: i32,
    pub country: Option<String>,
}

impl CardSnapshot {
    /// Creates a validated card snapshot.
    pub fn new(
        payment_method_id: impl Into<String>,
        brand: impl Into<String>,
        funding: impl Into<String>,
        last4: impl Into<String>,
        exp_month: u32,
        exp_year: i32,
        country: Option<String>,
    ) -> Result<Self, ValidationError> {
        let payment_method_id = payment_method_id.into();
        let brand = brand.into();
        let last4 = last4.into();

        if payment_method_id.is_empty() {
            return Err(ValidationError::empty_field("payment_method_id"));
        }
        if brand.is_empty() {
            return Err(ValidationError::empty_field("brand"));
        }
        if last4.len() != 4 || !last4.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::invalid_format(
                "last4",
                "expected exactly four digits",
            ));
        }
        if !(1..=12).contains(&exp_month) {
            return Err(ValidationError::out_of_range(
                "exp_month",
                1,
                12,
                i64::from(exp_month),
            ));
        }
        if !(2000..=9999).contains(&exp_year) {
            return Err(ValidationError::out_of_range(
                "exp_year",
                2000,
                9999,
                i64::from(exp_year),
            ));
        }

        Ok(Self {
            payment_method_id,
            brand,
            funding: funding.into(),
            last4,
            exp_month,
            exp_year,
            country,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(last4: &str, exp_month: u32) -> Result<CardSnapshot, ValidationError> {
        CardSnapshot::new("pm_1", "visa", "credit", last4, exp_month, 2030, None)
    }

    #[test]
    fn valid_card_is_accepted() {
        let card = card("4242", 12).unwrap();
        assert_eq!(card.brand, "visa");
        assert_eq!(card.last4, "4242");
    }

    #[test]
    fn last4_must_be_four_digits() {
        assert!(card("424", 1).is_err());
        assert!(card("42a2", 1).is_err());
    }

    #[test]
    fn exp_month_must_be_a_month() {
        assert!(matches!(card("4242", 0), Err(ValidationError::OutOfRange { .. })));
        assert!(card("4242", 13).is_err());
    }

    #[test]
    fn empty_brand_is_rejected() {
        let result = CardSnapshot::new("pm_1", "", "credit", "4242", 1, 2030, None);
        assert!(matches!(result, Err(ValidationError::EmptyField { .. })));
    }
}
