use super::customer::Address;
use super::part::default_active;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct Supplier {
    pub id: Uuid,
    #[validate(length(
        min = 1,
        max = 200,
        message = "Supplier name must be between 1 and 200 characters"
    ))]
    pub name: String,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    /// e.g. "Net 30"
    #[serde(default)]
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub lead_time_days: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}
