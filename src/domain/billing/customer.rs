//! Processor customer snapshot.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, ValidationError};

/// The processor-side customer linked to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    /// Processor customer id (cus_...). Never changes once recorded.
    pub id: String,
    pub created_at: Timestamp,
    pub currency: Option<String>,
    pub description: Option<String>,
}

impl CustomerSnapshot {
    pub fn new(
        id: impl Into<String>,
        created_at: Timestamp,
        currency: Option<String>,
        description: Option<String>,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::empty_field("customer_id"));
        }
        Ok(Self {
            id,
            created_at,
            currency,
            description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_requires_id() {
        assert!(CustomerSnapshot::new("", Timestamp::now(), None, None).is_err());
        let customer = CustomerSnapshot::new("cus_1", Timestamp::now(), Some("usd".into()), None)
            .unwrap();
        assert_eq!(customer.id, "cus_1");
    }
}
