//! Checkout session modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::BillingError;

/// Hosted checkout flavour requested by the account holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutMode {
    /// Start a new recurring subscription.
    Subscription,
    /// Replace the card on an existing subscription.
    Setup,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Subscription => "subscription",
            CheckoutMode::Setup => "setup",
        }
    }
}

impl fmt::Display for CheckoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CheckoutMode {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscription" => Ok(CheckoutMode::Subscription),
            "setup" => Ok(CheckoutMode::Setup),
            other => Err(BillingError::invalid_mode(format!(
                "unknown checkout mode '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_modes() {
        assert_eq!("subscription".parse::<CheckoutMode>().unwrap(), CheckoutMode::Subscription);
        assert_eq!("setup".parse::<CheckoutMode>().unwrap(), CheckoutMode::Setup);
    }

    #[test]
    fn payment_mode_is_invalid() {
        assert!(matches!(
            "payment".parse::<CheckoutMode>(),
            Err(BillingError::InvalidMode(_))
        ));
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&CheckoutMode::Setup).unwrap(), "\"setup\"");
    }
}
