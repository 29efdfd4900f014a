use super::numeric::{lenient, non_negative};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Industry {
    FoodProcessing,
    Packaging,
    Pharmaceutical,
    Automotive,
    Agriculture,
    Construction,
    Other,
}

/// A delivery site of a customer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerLocation {
    pub location_id: String,
    #[serde(default)]
    pub location_name: String,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct Customer {
    pub id: Uuid,
    #[validate(length(
        min = 1,
        max = 200,
        message = "Company name must be between 1 and 200 characters"
    ))]
    pub company_name: String,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub locations: Vec<CustomerLocation>,
    #[serde(default)]
    pub industry: Option<Industry>,
    /// Default quote discount for this customer, in percent.
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_discount_rate")]
    pub discount_rate: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn validate_discount_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if *rate < Decimal::ZERO || *rate > Decimal::ONE_HUNDRED {
        let mut err = ValidationError::new("discount_rate");
        err.message = Some("discount_rate must be between 0 and 100".into());
        return Err(err);
    }
    Ok(())
}

impl Customer {
    pub fn primary_location(&self) -> Option<&CustomerLocation> {
        self.locations
            .iter()
            .find(|l| l.is_primary)
            .or_else(|| self.locations.first())
    }

    pub fn location(&self, location_id: &str) -> Option<&CustomerLocation> {
        self.locations.iter().find(|l| l.location_id == location_id)
    }

    pub fn default_discount(&self) -> Decimal {
        non_negative(self.discount_rate).min(Decimal::ONE_HUNDRED)
    }
}
